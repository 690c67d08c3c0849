use learnhub_types::{Diagnostic, SyntaxChecker};

/// Parses the JavaScript pane, turning a parse failure into a diagnostic.
pub fn check(checker: &dyn SyntaxChecker, js: &str) -> Option<Diagnostic> {
    checker.check(js).err().map(|failure| {
        Diagnostic::static_syntax(failure.message).with_location(failure.line, failure.column)
    })
}
