//! Structural interning of type shapes.
//!
//! Equality of types is established by comparing [`InternedKey`]s. A key is issued by an
//! [`InternAuthority`] for a [`TypeShape`], the description of a node in terms of the keys of
//! its constituents. Since constituents are already interned, two shapes are equal exactly when
//! the nodes they describe are structurally equal, recursively over element, target and argument
//! graphs, and so are their keys.
//!
//! The authority is an injected service: the [`crate::metadata::typesystem::TypeHost`] holds an
//! `Arc<dyn InternAuthority>`, which lets several hosts (e.g. one per analyzed program) share one
//! key space. It must outlive every node it has interned and never evicts an entry.
//!
//! # Shape Design
//!
//! - **Named types** are identified by unit, namespace, name and generic arity, so a by-name
//!   reference and the definition it names share a key
//! - **Nested types** are identified by the key of their container plus name and arity, so a
//!   nested type of a generic instance is keyed under that instance
//! - **Generic parameters** are identified by the key of their owner and their position, never
//!   by their name
//!
//! # Example Usage
//!
//! ```rust
//! use cilmodel::metadata::typesystem::{InternAuthority, InternTable, TypeShape};
//!
//! let table = InternTable::new();
//! let list = TypeShape::Namespace {
//!     unit: "System.Collections".to_string(),
//!     namespace: "System.Collections.Generic".to_string(),
//!     name: "List`1".to_string(),
//!     arity: 1,
//! };
//!
//! let first = table.interned_key_of(&list);
//! let second = table.interned_key_of(&list.clone());
//! assert_eq!(first, second);
//!
//! let vector = table.interned_key_of(&TypeShape::Vector { element: first });
//! assert_ne!(vector, first);
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;

use crate::metadata::typesystem::{CallingConvention, InternedKey};

/// Structural description of a type, method or method instance in terms of interned keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeShape {
    /// The dummy sentinel
    Dummy,
    /// A top-level named type (definition or by-name reference)
    Namespace {
        /// Name of the defining unit (assembly)
        unit: String,
        /// Namespace
        namespace: String,
        /// Name, including the arity suffix if any
        name: String,
        /// Number of generic parameters
        arity: u16,
    },
    /// A nested type, keyed under its container
    Nested {
        /// Key of the containing type
        container: InternedKey,
        /// Name
        name: String,
        /// Number of generic parameters declared by the nested type itself
        arity: u16,
    },
    /// A generic type instance
    Instance {
        /// Key of the template
        template: InternedKey,
        /// Keys of the positional arguments
        arguments: Vec<InternedKey>,
    },
    /// A single dimensional, zero based array
    Vector {
        /// Key of the element type
        element: InternedKey,
    },
    /// A general array
    Matrix {
        /// Key of the element type
        element: InternedKey,
        /// Number of dimensions
        rank: u32,
        /// Lower bound per leading dimension
        lower_bounds: Vec<i32>,
        /// Size per leading dimension
        sizes: Vec<u32>,
    },
    /// An unmanaged pointer
    Pointer {
        /// Key of the target type
        target: InternedKey,
    },
    /// A managed pointer
    ManagedPointer {
        /// Key of the target type
        target: InternedKey,
    },
    /// A type decorated with custom modifiers
    Modified {
        /// Key of the unmodified type
        unmodified: InternedKey,
        /// `(optional, modifier key)` pairs in declaration order
        modifiers: Vec<(bool, InternedKey)>,
    },
    /// A function pointer
    FunctionPointer {
        /// Calling convention
        calling_convention: CallingConvention,
        /// Implicit `this`
        has_this: bool,
        /// Key of the return type
        returns: InternedKey,
        /// Return by reference
        return_by_ref: bool,
        /// Keys of the parameters
        parameters: Vec<InternedKey>,
        /// Keys of the vararg arguments
        extra_parameters: Vec<InternedKey>,
    },
    /// A generic parameter owned by a type
    TypeParameter {
        /// Key of the owning type
        owner: InternedKey,
        /// Position in the owner's parameter list
        index: u16,
    },
    /// A generic parameter owned by a method
    MethodParameter {
        /// Key of the owning method
        owner: InternedKey,
        /// Position in the owner's parameter list
        index: u16,
    },
    /// A method, keyed under its containing type
    Method {
        /// Key of the containing type
        container: InternedKey,
        /// Name
        name: String,
        /// Number of generic parameters
        arity: u16,
        /// Position in the container's method list, distinguishes overloads
        ordinal: u32,
    },
    /// A generic method instance
    MethodInstance {
        /// Key of the generic method
        method: InternedKey,
        /// Keys of the positional arguments
        arguments: Vec<InternedKey>,
    },
}

/// The interning authority.
///
/// Called whenever the identity of a node has to be established. Implementations must return
/// equal keys for equal shapes, distinct keys for distinct shapes, must never return
/// [`InternedKey::DUMMY`] for anything but [`TypeShape::Dummy`], and must never evict.
pub trait InternAuthority: Send + Sync {
    /// Returns the key of `shape`, issuing a new one on first sight.
    fn interned_key_of(&self, shape: &TypeShape) -> InternedKey;

    /// Returns the key of the nested type `name` with `arity` inside `container`.
    fn nested_interned_key_of(&self, container: InternedKey, name: &str, arity: u16) -> InternedKey {
        self.interned_key_of(&TypeShape::Nested {
            container,
            name: name.to_string(),
            arity,
        })
    }
}

/// Default [`InternAuthority`] backed by a concurrent hash map.
///
/// Keys are handed out sequentially starting at `1`.
#[derive(Debug)]
pub struct InternTable {
    keys: DashMap<TypeShape, InternedKey>,
    next: AtomicU32,
}

impl Default for InternTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InternTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        InternTable {
            keys: DashMap::new(),
            next: AtomicU32::new(1),
        }
    }

    /// Number of shapes interned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if nothing has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl InternAuthority for InternTable {
    fn interned_key_of(&self, shape: &TypeShape) -> InternedKey {
        if matches!(shape, TypeShape::Dummy) {
            return InternedKey::DUMMY;
        }

        if let Some(key) = self.keys.get(shape) {
            return *key;
        }

        *self
            .keys
            .entry(shape.clone())
            .or_insert_with(|| InternedKey(self.next.fetch_add(1, Ordering::Relaxed)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rayon::prelude::*;

    use super::*;

    fn named(name: &str) -> TypeShape {
        TypeShape::Namespace {
            unit: "unit".to_string(),
            namespace: "Demo".to_string(),
            name: name.to_string(),
            arity: 0,
        }
    }

    #[test]
    fn equal_shapes_equal_keys() {
        let table = InternTable::new();
        let a = table.interned_key_of(&named("A"));
        let b = table.interned_key_of(&named("B"));

        assert_ne!(a, b);
        assert_eq!(a, table.interned_key_of(&named("A")));
        assert_eq!(table.len(), 2);
        assert_eq!(table.interned_key_of(&TypeShape::Dummy), InternedKey::DUMMY);
    }

    #[test]
    fn nested_key_matches_shape() {
        let table = InternTable::new();
        let outer = table.interned_key_of(&named("Outer"));

        let via_helper = table.nested_interned_key_of(outer, "Inner", 0);
        let via_shape = table.interned_key_of(&TypeShape::Nested {
            container: outer,
            name: "Inner".to_string(),
            arity: 0,
        });
        assert_eq!(via_helper, via_shape);
        assert_ne!(via_helper, table.nested_interned_key_of(outer, "Inner", 1));
    }

    #[test]
    fn parameters_are_positional() {
        let table = InternTable::new();
        let owner = table.interned_key_of(&named("Box`1"));
        let t0 = table.interned_key_of(&TypeShape::TypeParameter { owner, index: 0 });
        let m0 = table.interned_key_of(&TypeShape::MethodParameter { owner, index: 0 });
        assert_ne!(t0, m0);
    }

    #[test]
    fn concurrent_interning_is_consistent() {
        let table = Arc::new(InternTable::new());
        let keys: Vec<InternedKey> = (0..256)
            .into_par_iter()
            .map(|i| table.interned_key_of(&named(&format!("T{}", i % 16))))
            .collect();

        for (i, key) in keys.iter().enumerate() {
            assert_eq!(*key, keys[i % 16]);
        }
        assert_eq!(table.len(), 16);
    }
}
