//! HTML handling for server-provided rich text.
//!
//! Everything the server sends as markup goes through [`sanitize`] before it
//! is stored in view state. [`to_text`] flattens sanitized markup for the
//! terminal printer.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Comment, Post};

static LINE_BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</li\s*>|</tr\s*>").expect("valid line break regex")
});
static BLOCK_END_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</(p|div|h[1-6]|blockquote|pre|ul|ol|table|figure)\s*>")
        .expect("valid block regex")
});
static LIST_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<li(\s[^>]*)?>").expect("valid list item regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static BLANK_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank run regex"));

pub fn sanitize(raw: &str) -> String {
    ammonia::clean(raw)
}

pub fn sanitize_post(mut post: Post) -> Post {
    post.description = sanitize(&post.description);
    post
}

pub fn sanitize_comment(mut comment: Comment) -> Comment {
    comment.content = sanitize(&comment.content);
    comment
}

pub fn to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let text = LINE_BREAK_RE.replace_all(html, "\n");
    let text = BLOCK_END_RE.replace_all(&text, "\n\n");
    let text = LIST_ITEM_RE.replace_all(&text, "- ");
    let text = TAG_RE.replace_all(&text, "");
    let text = decode_entities(&text);

    let lines = text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_RUN_RE
        .replace_all(&lines, "\n\n")
        .trim()
        .to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_scripts_and_handlers() {
        let cleaned = sanitize(r#"<p onclick="steal()">hi<script>alert(1)</script></p>"#);
        assert_eq!(cleaned, "<p>hi</p>");
    }

    #[test]
    fn sanitize_drops_javascript_links() {
        let cleaned = sanitize(r#"<a href="javascript:alert(1)">click</a>"#);
        assert!(!cleaned.contains("javascript"));
        assert!(cleaned.contains("click"));
    }

    #[test]
    fn sanitize_keeps_ordinary_markup() {
        let cleaned = sanitize("<h2>Title</h2><p>Some <strong>bold</strong> text</p>");
        assert!(cleaned.contains("<h2>Title</h2>"));
        assert!(cleaned.contains("<strong>bold</strong>"));
    }

    #[test]
    fn to_text_breaks_blocks_and_decodes_entities() {
        let text = to_text("<p>Hello <b>world</b></p><p>a &amp; b &lt;c&gt;</p>");
        assert_eq!(text, "Hello world\n\na & b <c>");
    }

    #[test]
    fn to_text_renders_lists() {
        let text = to_text("<ul><li>one</li><li class=\"x\">two</li></ul>");
        assert_eq!(text, "- one\n- two");
    }

    #[test]
    fn to_text_handles_empty_input() {
        assert_eq!(to_text("   "), "");
    }
}
