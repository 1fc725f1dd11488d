//! Type host configuration
//!
//! Platform and budget settings that influence layout computation, primitive classification
//! and the recursion guards of the specialization engine.

use crate::metadata::typesystem::PointerSize;

/// Configuration of a [`crate::metadata::typesystem::TypeHost`]
///
/// The core library name decides which `System.*` definitions are classified as primitives.
/// The depth limits bound recursion over pathological (cyclic or hostile) type graphs; a result
/// computed beyond them degrades to a sentinel and is reported through the host's diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Platform pointer width used for native integers, pointers and references
    pub pointer_size: PointerSize,

    /// Name of the unit defining `System.Object` and the primitives (default: `mscorlib`)
    pub core_assembly: String,

    /// Maximum nesting depth of a single specialization (default: 128)
    pub max_specialization_depth: usize,

    /// Maximum nesting depth of value type fields during layout computation (default: 64)
    pub max_layout_depth: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::x64()
    }
}

impl HostConfig {
    /// Configuration for 64-bit platforms
    ///
    /// This is also the default configuration.
    #[must_use]
    pub fn x64() -> Self {
        Self {
            pointer_size: PointerSize::Bit64,
            core_assembly: "mscorlib".to_string(),
            max_specialization_depth: 128,
            max_layout_depth: 64,
        }
    }

    /// Configuration for 32-bit platforms
    #[must_use]
    pub fn x86() -> Self {
        Self {
            pointer_size: PointerSize::Bit32,
            ..Self::x64()
        }
    }

    /// Replaces the core library name, e.g. `System.Private.CoreLib` for .NET Core
    #[must_use]
    pub fn with_core_assembly(mut self, name: impl Into<String>) -> Self {
        self.core_assembly = name.into();
        self
    }

    /// Replaces the specialization depth limit
    #[must_use]
    pub fn with_max_specialization_depth(mut self, depth: usize) -> Self {
        self.max_specialization_depth = depth;
        self
    }

    /// Replaces the layout depth limit
    #[must_use]
    pub fn with_max_layout_depth(mut self, depth: usize) -> Self {
        self.max_layout_depth = depth;
        self
    }
}
