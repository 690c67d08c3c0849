//! Maps stack positions in the generated script back to the user's source.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use learnhub_types::LineMap;

fn frame_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:(about:srcdoc|playground\.js|<anonymous>):(\d+):(\d+))|(?:line (\d+), col(?:umn)? (\d+))",
        )
        .unwrap()
    })
}

/// First stack position that falls inside the user's code, as a 1-based
/// `(line, column)` in the user's JavaScript.
pub fn locate(stack: &str, map: &LineMap) -> Option<(u32, u32)> {
    for caps in frame_regex().captures_iter(stack) {
        let (line, column, in_document) = match (caps.get(1), caps.get(4)) {
            (Some(origin), _) => (
                caps.get(2)?.as_str(),
                caps.get(3)?.as_str(),
                origin.as_str() == "about:srcdoc",
            ),
            (None, Some(line)) => (line.as_str(), caps.get(5)?.as_str(), false),
            (None, None) => continue,
        };
        let (Ok(line), Ok(column)) = (line.parse::<u32>(), column.parse::<u32>()) else {
            continue;
        };
        let mapped = if in_document {
            map.document_line(line)
        } else {
            map.script_line(line)
        };
        if let Some(user_line) = mapped {
            return Some((user_line, column.max(1)));
        }
    }
    None
}

/// Byte range to select for a 1-based `(line, column)`: from the column to
/// the end of that line. The column is clamped to the line.
pub fn source_span(text: &str, line: u32, column: u32) -> Option<Range<usize>> {
    let index = usize::try_from(line).ok()?.checked_sub(1)?;
    let mut line_start = 0usize;
    for (i, current) in text.split('\n').enumerate() {
        if i == index {
            let offset = usize::try_from(column.saturating_sub(1))
                .unwrap_or(usize::MAX)
                .min(current.len());
            return Some(line_start + offset..line_start + current.len());
        }
        line_start += current.len() + 1;
    }
    None
}
