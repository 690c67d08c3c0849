//! Assembles the self-contained playground document.
//!
//! The document carries the user's CSS in a `<style>` block, the user's HTML
//! verbatim in `<body>`, and an instrumented `<script>`:
//!
//! 1. a console-error interceptor, an `error` listener and an
//!    `unhandledrejection` listener, each forwarding
//!    `{ type: "playground_error", message, stack }` through
//!    `parent.postMessage`;
//! 2. the user's JavaScript as the body of a function called inside a `try`
//!    block whose `catch` forwards too. A body is what the syntax check
//!    validates, so a top-level `return` behaves the same in both places.

use learnhub_types::{LineMap, SourceBundle};

/// Name the realm gives the generated script in stack traces.
pub const SCRIPT_NAME: &str = "playground.js";

const INSTRUMENTATION: &str = r#"(function () {
  var forward = function (message, stack) {
    parent.postMessage({ type: 'playground_error', message: String(message), stack: stack ? String(stack) : '' }, '*');
  };
  var describe = function (value) {
    if (value && typeof value === 'object' && 'message' in value) {
      return String(value.message);
    }
    return String(value);
  };
  var originalError = console.error;
  console.error = function () {
    var parts = [];
    for (var i = 0; i < arguments.length; i++) {
      parts.push(describe(arguments[i]));
    }
    forward(parts.join(' '), '');
    return originalError.apply(console, arguments);
  };
  window.addEventListener('error', function (event) {
    var error = event && event.error;
    forward(event && event.message ? event.message : describe(error), error && error.stack);
  });
  window.addEventListener('unhandledrejection', function (event) {
    var reason = event ? event.reason : undefined;
    forward(describe(reason), reason && reason.stack);
  });
})();
"#;

const GUARD_OPEN: &str = "try {\n(function () {\n";

const GUARD_CLOSE: &str = r#"}).call(window);
} catch (error) {
  parent.postMessage({
    type: 'playground_error',
    message: error && typeof error === 'object' && 'message' in error ? String(error.message) : String(error),
    stack: error && error.stack ? String(error.stack) : ''
  }, '*');
}
"#;

/// Output of [`assemble`].
#[derive(Debug, Clone)]
pub struct PlaygroundDocument {
    /// Full HTML document suitable for display.
    pub html: String,
    /// The instrumented script exactly as the realm evaluates it.
    pub script: String,
    pub line_map: LineMap,
}

pub fn assemble(bundle: &SourceBundle) -> PlaygroundDocument {
    let mut script = String::with_capacity(
        INSTRUMENTATION.len() + GUARD_OPEN.len() + bundle.js.len() + GUARD_CLOSE.len() + 1,
    );
    script.push_str(INSTRUMENTATION);
    script.push_str(GUARD_OPEN);
    script.push_str(&bundle.js);
    script.push('\n');
    script.push_str(GUARD_CLOSE);

    let script_offset = line_count(INSTRUMENTATION) + line_count(GUARD_OPEN);

    let head = format!(
        "<!DOCTYPE html>\n<html>\n  <head>\n    <meta charset=\"UTF-8\">\n    \
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n    \
         <style>\n{css}\n    </style>\n  </head>\n  <body>\n{html}\n    <script>\n",
        css = bundle.css,
        html = bundle.html,
    );
    let document_offset = line_count(&head) + script_offset;

    let mut html = head;
    html.push_str(&escape_script_close(&script));
    html.push_str("    </script>\n  </body>\n</html>\n");

    PlaygroundDocument {
        html,
        script,
        line_map: LineMap {
            script_offset,
            document_offset,
            user_lines: line_count(&bundle.js).max(1),
        },
    }
}

fn line_count(text: &str) -> u32 {
    text.lines().count() as u32
}

/// Keeps a literal `</script` in user code from closing the script element.
fn escape_script_close(script: &str) -> String {
    let mut out = String::with_capacity(script.len());
    let mut rest = script;
    while let Some(pos) = find_ignore_ascii_case(rest, "</script") {
        out.push_str(&rest[..pos]);
        out.push_str("<\\/");
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}
