//! CLR metadata object model.
//!
//! This module hosts the in-memory type graph of a CLR program and the diagnostics collected
//! while building and querying it. Reading metadata from files is left to the caller; the graph is
//! populated through [`typesystem::TypeBuilder`] and the construction methods of
//! [`typesystem::TypeHost`].
//!
//! # Key Components
//!
//! - [`typesystem`] - Type graph, specialization, relations, stack types and layout
//! - [`diagnostics`] - Collector for degraded results
//!
//! # Examples
//!
//! ```rust
//! use cilmodel::metadata::typesystem::TypeHost;
//!
//! let host = TypeHost::new();
//! let strings = host.vector(host.core().string);
//! assert_eq!(host.full_name(strings), "System.String[]");
//! assert!(!host.diagnostics().has_errors());
//! ```

/// Thread-safe collection of warnings and errors raised by degraded operations
pub mod diagnostics;
/// Type graph and type algorithms
pub mod typesystem;
