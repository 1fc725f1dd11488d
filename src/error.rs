use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which covers every error this library can return.
///
/// Errors are only produced when a caller violates a construction contract, e.g. instantiating a
/// template that has no generic parameters, or declaring the same type twice. Everything that
/// reasons about an already built graph (specialization, member lookup, type relations, layout)
/// degrades to a sentinel value instead and records a
/// [`crate::metadata::diagnostics::Diagnostic`].
///
/// # Error Categories
///
/// ## Construction Errors
/// - [`Error::TypeNotGeneric`] - Instantiation of a non-generic template
/// - [`Error::GenericArity`] - Argument count does not match the template's parameter count
/// - [`Error::NotADefinition`] - Definition-only operation applied to another node kind
/// - [`Error::DuplicateType`] - A type with the same identity was already declared
/// - [`Error::Malformed`] - Inconsistent input handed to the builder
///
/// # Examples
///
/// ```rust
/// use cilmodel::{Error, TypeHost};
///
/// let host = TypeHost::new();
/// let int32 = host.core().int32;
/// match host.instantiate(int32, &[int32]) {
///     Err(Error::TypeNotGeneric(name)) => assert_eq!(name, "System.Int32"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The template of an instantiation has no generic parameters.
    ///
    /// The associated value is the full name of the template.
    #[error("Type is not generic and can not be instantiated - {0}")]
    TypeNotGeneric(String),

    /// The number of generic arguments does not match the number of generic parameters.
    #[error("Generic arity mismatch - expected {expected} argument(s), found {found}")]
    GenericArity {
        /// Number of generic parameters declared by the template
        expected: usize,
        /// Number of arguments supplied
        found: usize,
    },

    /// A definition-only operation was applied to a node that is not a type (or method)
    /// definition, e.g. adding a field to a generic instance.
    #[error("The target is not a definition - {0}")]
    NotADefinition(String),

    /// A type with the same unit, namespace, name, arity and container was already declared.
    #[error("Type has already been declared - {0}")]
    DuplicateType(String),

    /// The input handed to the builder is inconsistent.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },
}
