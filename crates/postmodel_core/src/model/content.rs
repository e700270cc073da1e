//! Default content filter backing the derived `the_content` attribute.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Filter applied to `content` when `the_content` is read.
pub type ContentFilterFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

static BLOCK_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid block separator regex"));
static LINE_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]*\n[ \t]*").expect("valid line break regex"));

/// Wraps blank-line separated blocks in `<p>` and turns single newlines
/// into `<br />`.
pub fn render_paragraphs(content: &str) -> String {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    BLOCK_SEPARATOR_RE
        .split(normalized.trim())
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| format!("<p>{}</p>\n", LINE_BREAK_RE.replace_all(block, "<br />\n")))
        .collect()
}
