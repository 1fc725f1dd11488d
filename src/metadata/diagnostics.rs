//! Degradation reports of the type graph.
//!
//! Algorithms over the graph never fail halfway. When one meets input it cannot handle (an
//! argument position without an argument, a re-entered cache, a cyclic constraint or base class
//! chain, a recursion budget running out) it returns a sentinel and pushes a [`Diagnostic`] into
//! the [`Diagnostics`] of its [`crate::metadata::typesystem::TypeHost`].
//!
//! Entries are appended through `boxcar::Vec`, so parallel member population can report without
//! locking.
//!
//! ```rust
//! use cilmodel::metadata::diagnostics::{DiagnosticCategory, Diagnostics};
//!
//! let diagnostics = Diagnostics::new();
//! diagnostics.warning(DiagnosticCategory::Generic, "No argument at position 3");
//!
//! assert!(diagnostics.has_warnings());
//! assert_eq!(diagnostics.by_category(DiagnosticCategory::Generic).len(), 1);
//! ```

use std::fmt;

use strum::Display;

/// How wrong a degraded result is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DiagnosticSeverity {
    /// Malformed input was replaced by a sentinel; the rest of the graph is unaffected.
    #[strum(serialize = "WARN")]
    Warning,
    /// A recursion budget ran out and the result is most likely wrong.
    #[strum(serialize = "ERROR")]
    Error,
}

/// The algorithm that reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DiagnosticCategory {
    /// Type relations: cyclic base classes or constraints, re-entered hierarchy caches
    Type,
    /// The specialization engine
    Generic,
    /// Member population of generic instances
    Member,
    /// Layout computation
    Layout,
}

/// One report.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// How wrong the result is
    pub severity: DiagnosticSeverity,
    /// The reporting algorithm
    pub category: DiagnosticCategory,
    /// Human-readable description
    pub message: String,
    /// Arena index of the type being processed
    pub type_index: Option<u32>,
    /// Recursion depth at which the problem was detected
    pub depth: Option<usize>,
}

impl Diagnostic {
    /// Creates a report without type or depth context.
    pub fn new(
        severity: DiagnosticSeverity,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            type_index: None,
            depth: None,
        }
    }

    /// Attaches the arena index of the affected type.
    #[must_use]
    pub fn with_type_index(mut self, index: u32) -> Self {
        self.type_index = Some(index);
        self
    }

    /// Attaches the recursion depth at which the problem was detected.
    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.message)?;
        if let Some(index) = self.type_index {
            write!(f, " (type: #{index})")?;
        }
        if let Some(depth) = self.depth {
            write!(f, " (depth: {depth})")?;
        }
        Ok(())
    }
}

/// Append-only, thread-safe collector of [`Diagnostic`]s.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: boxcar::Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a report carrying extra context.
    pub fn push(&self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Appends a warning.
    pub fn warning(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(DiagnosticSeverity::Warning, category, message));
    }

    /// Appends an error.
    pub fn error(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(DiagnosticSeverity::Error, category, message));
    }

    /// Number of reports.
    pub fn count(&self) -> usize {
        self.entries.count()
    }

    /// True if any error was reported.
    pub fn has_errors(&self) -> bool {
        self.iter().any(|d| d.severity == DiagnosticSeverity::Error)
    }

    /// True if any warning was reported.
    pub fn has_warnings(&self) -> bool {
        self.iter().any(|d| d.severity == DiagnosticSeverity::Warning)
    }

    /// All reports in push order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().map(|(_, d)| d)
    }

    /// Reports of one category.
    pub fn by_category(&self, category: DiagnosticCategory) -> Vec<&Diagnostic> {
        self.iter().filter(|d| d.category == category).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn collects_by_severity_and_category() {
        let diagnostics = Diagnostics::new();
        assert!(!diagnostics.has_warnings() && !diagnostics.has_errors());

        diagnostics.warning(DiagnosticCategory::Generic, "no argument");
        diagnostics.error(DiagnosticCategory::Layout, "too deep");
        diagnostics.error(DiagnosticCategory::Generic, "too deep");

        assert_eq!(diagnostics.count(), 3);
        assert!(diagnostics.has_warnings() && diagnostics.has_errors());
        assert_eq!(diagnostics.by_category(DiagnosticCategory::Generic).len(), 2);
        assert!(diagnostics.by_category(DiagnosticCategory::Member).is_empty());
    }

    #[test]
    fn concurrent_pushes() {
        let diagnostics = Arc::new(Diagnostics::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let diagnostics = Arc::clone(&diagnostics);
                thread::spawn(move || {
                    diagnostics.warning(DiagnosticCategory::Member, format!("population {i}"))
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(diagnostics.count(), 8);
    }

    #[test]
    fn display_carries_context() {
        let diagnostic = Diagnostic::new(
            DiagnosticSeverity::Warning,
            DiagnosticCategory::Member,
            "Population re-entered",
        )
        .with_type_index(0x1234)
        .with_depth(3);

        let display = diagnostic.to_string();
        assert!(display.starts_with("[WARN] Member: Population re-entered"));
        assert!(display.contains("#4660"));
        assert!(display.contains("depth: 3"));
    }
}
