//! A small, fully populated type graph shared by the unit tests.
//!
//! ```text
//! namespace Demo {
//!     class Pair<K, V>;
//!     delegate R Func<A, R>(A arg);
//!     delegate void Handler<T>(T arg);
//!     delegate void Broken;                     // no Invoke
//!     interface IComparable<T>;
//!     class IsVolatile;                         // used as a custom modifier
//!
//!     class Box<T> {
//!         T value;
//!         T Get();
//!         U Map<U>(Func<T, U> map);
//!         void Sort<V>(V[] items) where V : IComparable<T>;
//!         T Value { get => Get(); }
//!         event Handler<T> Changed { add; }
//!         class Inner { T item; }
//!     }
//!     class SubBox<T> : Box<T>;
//!     class IntBox : Box<int>;
//!
//!     interface INamed;
//!     interface IShape : INamed;
//!     class Base : IShape;
//!     class Derived : Base;
//!     class Other : Base;
//!
//!     enum Color : int;
//!     struct Point { int x; int y; }
//!     struct Bits { bool a : 1; bool b : 1; }
//!     struct Holder<T> { T a; byte b; }
//! }
//! ```

use crate::metadata::typesystem::{
    EventDecl, FieldDecl, MethodDecl, MethodSignature, PropertyDecl, TypeBuilder, TypeHost,
    TypeId,
};

pub struct Fixture {
    pub host: TypeHost,
    pub pair: TypeId,
    pub func: TypeId,
    pub handler: TypeId,
    pub broken_delegate: TypeId,
    pub comparable: TypeId,
    pub is_volatile: TypeId,
    pub boxed: TypeId,
    pub inner: TypeId,
    pub sub_box: TypeId,
    pub int_box: TypeId,
    pub named: TypeId,
    pub shape: TypeId,
    pub base: TypeId,
    pub derived: TypeId,
    pub other: TypeId,
    pub color: TypeId,
    pub point: TypeId,
    pub bits: TypeId,
    pub holder: TypeId,
}

impl Fixture {
    pub fn new() -> Self {
        let host = TypeHost::new();
        let core = *host.core();

        let pair = TypeBuilder::class(&host, "Demo", "Pair`2")
            .generic_params(&["K", "V"])
            .declare()
            .unwrap();

        let func = TypeBuilder::delegate(&host, "Demo", "Func`2")
            .generic_params(&["A", "R"])
            .declare()
            .unwrap();
        let func_params = host.generic_parameters(func);
        host.add_method(func, MethodDecl::new("Invoke"), |_| {
            MethodSignature::instance(func_params[1], vec![func_params[0]])
        })
        .unwrap();

        let handler = TypeBuilder::delegate(&host, "Demo", "Handler`1")
            .generic_params(&["T"])
            .declare()
            .unwrap();
        let handler_t = host.generic_parameters(handler)[0];
        host.add_method(handler, MethodDecl::new("Invoke"), |_| {
            MethodSignature::instance(core.void, vec![handler_t])
        })
        .unwrap();

        let broken_delegate = TypeBuilder::delegate(&host, "Demo", "Broken")
            .declare()
            .unwrap();

        let comparable = TypeBuilder::interface(&host, "Demo", "IComparable`1")
            .generic_params(&["T"])
            .declare()
            .unwrap();

        let is_volatile = TypeBuilder::class(&host, "Demo", "IsVolatile")
            .declare()
            .unwrap();

        let boxed = TypeBuilder::class(&host, "Demo", "Box`1")
            .generic_params(&["T"])
            .declare()
            .unwrap();
        let t = host.generic_parameters(boxed)[0];
        host.add_field(boxed, FieldDecl::new("value", t)).unwrap();
        let get = host
            .add_method(boxed, MethodDecl::new("Get"), |_| {
                MethodSignature::instance(t, vec![])
            })
            .unwrap();
        host.add_method(boxed, MethodDecl::new("Map").generic_params(&["U"]), |params| {
            let map = host.instantiate(func, &[t, params[0]]).unwrap();
            MethodSignature::instance(params[0], vec![map])
        })
        .unwrap();
        let sort = host
            .add_method(boxed, MethodDecl::new("Sort").generic_params(&["V"]), |params| {
                MethodSignature::instance(core.void, vec![host.vector(params[0])])
            })
            .unwrap();
        let v = host.method_generic_parameters(sort)[0];
        host.add_constraint(v, host.instantiate(comparable, &[t]).unwrap())
            .unwrap();
        host.add_property(boxed, PropertyDecl::new("Value", t).getter(get))
            .unwrap();
        let handler_of_t = host.instantiate(handler, &[t]).unwrap();
        let add_changed = host
            .add_method(boxed, MethodDecl::new("add_Changed"), |_| {
                MethodSignature::instance(core.void, vec![handler_of_t])
            })
            .unwrap();
        host.add_event(
            boxed,
            EventDecl::new("Changed", handler_of_t).adder(add_changed),
        )
        .unwrap();

        let inner = TypeBuilder::class(&host, "", "Inner")
            .nested_in(boxed)
            .declare()
            .unwrap();
        host.add_field(inner, FieldDecl::new("item", t)).unwrap();

        let sub_box = TypeBuilder::class(&host, "Demo", "SubBox`1")
            .generic_params(&["T"])
            .deferred_base()
            .declare()
            .unwrap();
        let sub_t = host.generic_parameters(sub_box)[0];
        host.set_base(sub_box, host.instantiate(boxed, &[sub_t]).unwrap())
            .unwrap();

        let int_box = TypeBuilder::class(&host, "Demo", "IntBox")
            .base(host.instantiate(boxed, &[core.int32]).unwrap())
            .declare()
            .unwrap();

        let named = TypeBuilder::interface(&host, "Demo", "INamed")
            .declare()
            .unwrap();
        let shape = TypeBuilder::interface(&host, "Demo", "IShape")
            .interface_impl(named)
            .declare()
            .unwrap();
        let base = TypeBuilder::class(&host, "Demo", "Base")
            .interface_impl(shape)
            .declare()
            .unwrap();
        let derived = TypeBuilder::class(&host, "Demo", "Derived")
            .base(base)
            .declare()
            .unwrap();
        let other = TypeBuilder::class(&host, "Demo", "Other")
            .base(base)
            .declare()
            .unwrap();

        let color = TypeBuilder::enumeration(&host, "Demo", "Color", core.int32)
            .declare()
            .unwrap();

        let point = TypeBuilder::value_type(&host, "Demo", "Point")
            .declare()
            .unwrap();
        host.add_field(point, FieldDecl::new("x", core.int32)).unwrap();
        host.add_field(point, FieldDecl::new("y", core.int32)).unwrap();

        let bits = TypeBuilder::value_type(&host, "Demo", "Bits")
            .declare()
            .unwrap();
        host.add_field(bits, FieldDecl::new("a", core.boolean).bit_width(1))
            .unwrap();
        host.add_field(bits, FieldDecl::new("b", core.boolean).bit_width(1))
            .unwrap();

        let holder = TypeBuilder::value_type(&host, "Demo", "Holder`1")
            .generic_params(&["T"])
            .declare()
            .unwrap();
        let holder_t = host.generic_parameters(holder)[0];
        host.add_field(holder, FieldDecl::new("a", holder_t)).unwrap();
        host.add_field(holder, FieldDecl::new("b", core.uint8)).unwrap();

        Fixture {
            host,
            pair,
            func,
            handler,
            broken_delegate,
            comparable,
            is_volatile,
            boxed,
            inner,
            sub_box,
            int_box,
            named,
            shape,
            base,
            derived,
            other,
            color,
            point,
            bits,
            holder,
        }
    }

    /// `T` of `Box<T>`
    pub fn box_param(&self) -> TypeId {
        self.host.generic_parameters(self.boxed)[0]
    }

    /// `K` and `V` of `Pair<K, V>`
    pub fn pair_params(&self) -> [TypeId; 2] {
        let params = self.host.generic_parameters(self.pair);
        [params[0], params[1]]
    }
}
