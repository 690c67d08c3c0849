//! Static analysis run before any execution.
//!
//! Three best-effort checks, always in this order:
//!
//! 1. **HTML**: tag balance with a stack of open elements.
//! 2. **CSS**: `{` / `}` counts.
//! 3. **JavaScript**: parsed as a function body through a [`SyntaxChecker`],
//!    never executed.
//!
//! The same [`StaticAnalyzer::analyze`] call serves manual runs, automatic
//! runs and submissions, so the first finding is identical on every path.

pub mod css;
pub mod html;
pub mod js;

use std::sync::Arc;

use learnhub_types::{Diagnostic, SourceBundle, SyntaxChecker};

pub use css::CSS_MISMATCH;
pub use html::HTML_MISMATCH;

/// Findings of one analysis, in check order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    pub findings: Vec<Diagnostic>,
}

impl AnalysisReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// The finding that blocks the run.
    pub fn first(&self) -> Option<&Diagnostic> {
        self.findings.first()
    }

    pub fn into_first(self) -> Option<Diagnostic> {
        self.findings.into_iter().next()
    }
}

#[derive(Clone)]
pub struct StaticAnalyzer {
    checker: Arc<dyn SyntaxChecker>,
}

#[cfg(feature = "builtin-sandbox-js")]
impl Default for StaticAnalyzer {
    fn default() -> Self {
        Self::new(Arc::new(learnhub_sandbox_js::BoaSyntaxChecker))
    }
}

impl StaticAnalyzer {
    pub fn new(checker: Arc<dyn SyntaxChecker>) -> Self {
        Self { checker }
    }

    pub fn analyze(&self, source: &SourceBundle) -> AnalysisReport {
        let mut findings = Vec::new();
        if !html::is_balanced(&source.html) {
            findings.push(Diagnostic::static_syntax(HTML_MISMATCH));
        }
        if !css::is_balanced(&source.css) {
            findings.push(Diagnostic::static_syntax(CSS_MISMATCH));
        }
        if let Some(diagnostic) = js::check(self.checker.as_ref(), &source.js) {
            findings.push(diagnostic);
        }
        AnalysisReport { findings }
    }
}
