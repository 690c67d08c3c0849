pub const CSS_MISMATCH: &str = "Possible CSS brace mismatch detected";

/// Raw count of `{` against `}`; comments and strings are not special.
pub fn is_balanced(css: &str) -> bool {
    let open = css.bytes().filter(|b| *b == b'{').count();
    let close = css.bytes().filter(|b| *b == b'}').count();
    open == close
}
