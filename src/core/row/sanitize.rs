//! HTML stripping for sanitized common columns

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// A complete tag; a lone `<` or `>` is text
const TAG_PATTERN: &str = r"<[^<>]*>";

fn tag_regex() -> Option<&'static Regex> {
    static TAG: OnceLock<Option<Regex>> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(TAG_PATTERN).ok()).as_ref()
}

/// Removes markup from a value and decodes the basic entities
///
/// `<p>unsanitized external id</p>` becomes `unsanitized external id`.
pub fn strip_html(input: &str) -> String {
    let text = match tag_regex() {
        Some(re) => re.replace_all(input, ""),
        None => Cow::Borrowed(input),
    };

    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
