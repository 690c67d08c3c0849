//! Tag-balance heuristic for the HTML pane.

pub const HTML_MISMATCH: &str = "Possible HTML tag mismatch detected";

/// Elements that never take a closing tag.
pub const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text, not markup.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Open { name: String, self_closing: bool },
    Close { name: String },
}

/// Returns `true` when every opened element is closed in order.
pub fn is_balanced(html: &str) -> bool {
    let mut stack: Vec<String> = Vec::new();
    let mut scanner = TagScanner::new(html);
    while let Some(token) = scanner.next_token() {
        match token {
            Token::Open { name, self_closing } => {
                if self_closing || is_void(&name) {
                    continue;
                }
                if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                    scanner.skip_raw_text(&name);
                }
                stack.push(name);
            }
            Token::Close { name } => {
                if is_void(&name) {
                    continue;
                }
                match stack.pop() {
                    Some(open) if open == name => {}
                    _ => return false,
                }
            }
        }
    }
    stack.is_empty()
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

struct TagScanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> TagScanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn next_token(&mut self) -> Option<Token> {
        let src = self.src;
        let bytes = src.as_bytes();
        while self.pos < bytes.len() {
            let Some(offset) = src[self.pos..].find('<') else {
                self.pos = bytes.len();
                return None;
            };
            let start = self.pos + offset;
            let rest = &src[start..];

            if rest.starts_with("<!--") {
                self.pos = match rest[4..].find("-->") {
                    Some(end) => start + 4 + end + 3,
                    None => bytes.len(),
                };
                continue;
            }

            match bytes.get(start + 1) {
                Some(b'!') | Some(b'?') => {
                    self.pos = self.tag_end(start + 2);
                }
                Some(b'/') if bytes.get(start + 2).is_some_and(u8::is_ascii_alphabetic) => {
                    let (name, after) = self.read_name(start + 2);
                    self.pos = self.tag_end(after);
                    return Some(Token::Close { name });
                }
                Some(c) if c.is_ascii_alphabetic() => {
                    let (name, after) = self.read_name(start + 1);
                    let end = self.tag_end(after);
                    let body = src[after..end].trim_end_matches('>').trim_end();
                    self.pos = end;
                    return Some(Token::Open {
                        name,
                        self_closing: body.ends_with('/'),
                    });
                }
                _ => {
                    self.pos = start + 1;
                }
            }
        }
        None
    }

    fn read_name(&self, from: usize) -> (String, usize) {
        let bytes = self.src.as_bytes();
        let mut end = from;
        while end < bytes.len()
            && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'-' || bytes[end] == b':')
        {
            end += 1;
        }
        (self.src[from..end].to_ascii_lowercase(), end)
    }

    /// Position just past the `>` closing a tag, honouring quoted attribute
    /// values. An unterminated tag runs to the end of input.
    fn tag_end(&self, from: usize) -> usize {
        let bytes = self.src.as_bytes();
        let mut quote: Option<u8> = None;
        let mut i = from;
        while i < bytes.len() {
            let b = bytes[i];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if b == b'"' || b == b'\'' => quote = Some(b),
                None if b == b'>' => return i + 1,
                None => {}
            }
            i += 1;
        }
        bytes.len()
    }

    /// Moves to the matching `</name`, leaving it as the next token.
    fn skip_raw_text(&mut self, name: &str) {
        let needle = format!("</{}", name);
        let haystack = self.src[self.pos..].to_ascii_lowercase();
        self.pos = match haystack.find(&needle) {
            Some(offset) => self.pos + offset,
            None => self.src.len(),
        };
    }
}
