// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![allow(clippy::too_many_arguments)]

//! # cilmodel
//!
//! The type-system core of a CLR metadata object model, for compilers, bytecode rewriters and
//! static analyzers that need to reason about .NET types without the .NET runtime.
//!
//! `cilmodel` represents primitives, structural types (vectors, matrices, pointers, managed
//! pointers, modified types, function pointers) and generic types with their instantiations as an
//! immutable, interned graph owned by a [`TypeHost`]. On top of that graph it provides:
//!
//! - **Specialization** - order-sensitive substitution of generic arguments through arbitrarily
//!   deep chains of nested generic containers, preserving node identity when nothing changes
//! - **Member specialization** - lazily materialized fields, methods, properties, events and
//!   nested types of generic instances, with case-sensitive and case-insensitive name lookup
//! - **Type relations** - equivalence, derivation, interface implementation, assignment
//!   compatibility and the CLR verifier merge rules
//! - **Operand stack semantics** - stack type normalization and the ECMA-335 binary operation
//!   and implicit conversion tables
//! - **Layout** - size and alignment of value types, including bit-field packing
//!
//! ## Quick Start
//!
//! ```rust
//! use cilmodel::prelude::*;
//!
//! let host = TypeHost::new();
//!
//! // class Box<T> { T value; }
//! let boxed = TypeBuilder::class(&host, "Demo", "Box")
//!     .generic_params(&["T"])
//!     .declare()?;
//! let t = host.generic_parameters(boxed)[0];
//! host.add_field(boxed, FieldDecl::new("value", t))?;
//!
//! // Box<int>
//! let int32 = host.core().int32;
//! let box_of_int = host.instantiate(boxed, &[int32])?;
//! let field = host.find_field(box_of_int, "value").expect("field exists");
//! assert_eq!(host.field(field).ty(), int32);
//! # Ok::<(), cilmodel::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata::typesystem`] - the type graph, specialization engine and type algorithms
//! - [`metadata::diagnostics`] - collector for degraded results (unresolvable arguments,
//!   recursion limits, malformed layouts)
//! - [`Error`] and [`Result`] - construction-time contract violations
//!
//! ## Standards Compliance
//!
//! Type relations, operand stack tables and layout rules follow the **ECMA-335 specification**
//! (6th edition), Partition I §8 and Partition III §1.
//!
//! - [ECMA-335 Standard](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use cilmodel::prelude::*;
///
/// let host = TypeHost::new();
/// let object = host.core().object;
/// assert!(host.is_reference_type(object));
/// ```
pub mod prelude;

/// The CLR type graph and the algorithms operating on it.
///
/// # Key Components
///
/// - [`metadata::typesystem`] - Type host, structural nodes, specialization, relations, layout
/// - [`metadata::diagnostics`] - Thread-safe diagnostics collection
pub mod metadata;

/// `cilmodel` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `cilmodel` Error type
///
/// Returned for construction-time contract violations such as instantiating a non-generic
/// template. Lookups and specialization never fail with an error; they degrade to sentinels.
pub use error::Error;

/// The owner of the type graph.
///
/// See [`metadata::typesystem::TypeHost`] for construction, specialization and type relations.
pub use metadata::typesystem::TypeHost;
