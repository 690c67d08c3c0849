use std::sync::OnceLock;

use boa_engine::{Context, JsString, Source};
use regex::Regex;

use learnhub_types::{SyntaxChecker, SyntaxFailure};

const SOURCE_GLOBAL: &str = "__playground_source__";

/// Parses user JavaScript as a function body without running it.
///
/// The source goes to the `Function` constructor as a string value, so it is
/// parsed on its own as a body and cannot close or escape any wrapper.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoaSyntaxChecker;

impl SyntaxChecker for BoaSyntaxChecker {
    fn check(&self, source: &str) -> Result<(), SyntaxFailure> {
        let mut context = Context::default();
        let staged = context.global_object().set(
            JsString::from(SOURCE_GLOBAL),
            JsString::from(source),
            false,
            &mut context,
        );
        if let Err(err) = staged {
            return Err(failure_from_message(&err.to_string()));
        }
        let parse = format!("new Function({})", SOURCE_GLOBAL);
        match context.eval(Source::from_bytes(&parse)) {
            Ok(_) => Ok(()),
            Err(err) => Err(failure_from_message(&err.to_string())),
        }
    }
}

fn location_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"line (\d+), col(?:umn)? (\d+)").unwrap())
}

/// Builds a failure from a parser message. The constructor parses the body
/// with a leading newline, so lines are shifted back by one.
fn failure_from_message(raw: &str) -> SyntaxFailure {
    let message = raw.strip_prefix("SyntaxError: ").unwrap_or(raw).to_string();
    let (line, column) = match location_regex().captures(&message) {
        Some(caps) => {
            let line = caps[1].parse::<u32>().ok().and_then(|l| l.checked_sub(1)).filter(|l| *l >= 1);
            let column = caps[2].parse::<u32>().ok();
            (line, line.and(column))
        }
        None => (None, None),
    };
    SyntaxFailure {
        message,
        line,
        column,
    }
}
