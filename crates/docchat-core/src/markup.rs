//! Markdown-subset renderer for chat replies
//!
//! Converts a reply into a small tree of display nodes. Recognized syntax:
//! `**bold**`, `` `code` ``, `*italic*` (plain lines only) and unordered
//! list items starting with `*`, `-` or `+`. Everything else is kept as
//! literal text, so callers never have to interpret raw markup.

/// An inline run within a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(String),
    Code(String),
    Emphasis(String),
}

/// A block produced by one or more input lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A non-blank line that is not a list item.
    Paragraph(Vec<Inline>),
    /// A run of consecutive list item lines.
    List(Vec<Vec<Inline>>),
    /// A blank line.
    LineBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    Default,
    InsideList,
}

/// Render `text` into display blocks. Never fails.
pub fn render(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut state = LineState::Default;
    let mut items: Vec<Vec<Inline>> = Vec::new();

    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if let Some(content) = list_item(line) {
            state = LineState::InsideList;
            items.push(inline_spans(content, false));
            continue;
        }

        if state == LineState::InsideList {
            blocks.push(Block::List(std::mem::take(&mut items)));
            state = LineState::Default;
        }

        if line.trim().is_empty() {
            blocks.push(Block::LineBreak);
        } else {
            blocks.push(Block::Paragraph(inline_spans(line, true)));
        }
    }

    if state == LineState::InsideList {
        blocks.push(Block::List(items));
    }

    blocks
}

/// Render `text` to an HTML fragment. All text is escaped; only the
/// recognized constructs produce tags.
pub fn render_html(text: &str) -> String {
    to_html(&render(text))
}

/// Serialize blocks to HTML, one piece per line.
pub fn to_html(blocks: &[Block]) -> String {
    let mut pieces: Vec<String> = Vec::new();

    for block in blocks {
        match block {
            Block::Paragraph(spans) => pieces.push(inline_html(spans)),
            Block::List(items) => {
                pieces.push("<ul>".to_string());
                for item in items {
                    pieces.push(format!("<li>{}</li>", inline_html(item)));
                }
                pieces.push("</ul>".to_string());
            }
            Block::LineBreak => pieces.push("<br />".to_string()),
        }
    }

    pieces.join("\n")
}

/// Content of a list item line: optional leading spaces, a marker, one
/// space, then at least one character.
fn list_item(line: &str) -> Option<&str> {
    let rest = line.trim_start_matches(' ');
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some('*' | '-' | '+'), Some(' ')) => {
            let content = &rest[2..];
            (!content.is_empty()).then_some(content)
        }
        _ => None,
    }
}

fn inline_spans(line: &str, allow_emphasis: bool) -> Vec<Inline> {
    let mut spans = vec![Inline::Text(line.to_string())];
    spans = apply(spans, find_strong, 2, Inline::Strong);
    spans = apply(spans, find_code, 1, Inline::Code);
    if allow_emphasis {
        spans = apply(spans, find_emphasis, 1, Inline::Emphasis);
    }
    spans
}

/// Run one matcher over every remaining text run, splitting out each match.
fn apply(
    spans: Vec<Inline>,
    find: fn(&str) -> Option<(usize, usize)>,
    delim: usize,
    wrap: fn(String) -> Inline,
) -> Vec<Inline> {
    let mut out = Vec::with_capacity(spans.len());

    for span in spans {
        let Inline::Text(text) = span else {
            out.push(span);
            continue;
        };

        let mut rest = text.as_str();
        while let Some((start, end)) = find(rest) {
            if start > 0 {
                out.push(Inline::Text(rest[..start].to_string()));
            }
            out.push(wrap(rest[start + delim..end - delim].to_string()));
            rest = &rest[end..];
        }
        if !rest.is_empty() {
            out.push(Inline::Text(rest.to_string()));
        }
    }

    out
}

// Matchers return the byte range of the whole run, delimiters included.
// Delimiters are ASCII so every returned offset is a char boundary.

fn find_strong(s: &str) -> Option<(usize, usize)> {
    let bytes = s.as_bytes();
    for i in 0..bytes.len().saturating_sub(1) {
        if bytes[i] != b'*' || bytes[i + 1] != b'*' {
            continue;
        }
        let Some(offset) = s[i + 2..].find('*') else {
            return None;
        };
        let close = i + 2 + offset;
        if offset > 0 && bytes.get(close + 1) == Some(&b'*') {
            return Some((i, close + 2));
        }
    }
    None
}

fn find_code(s: &str) -> Option<(usize, usize)> {
    let bytes = s.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] != b'`' {
            continue;
        }
        let Some(offset) = s[i + 1..].find('`') else {
            return None;
        };
        if offset > 0 {
            return Some((i, i + 1 + offset + 1));
        }
    }
    None
}

fn find_emphasis(s: &str) -> Option<(usize, usize)> {
    let bytes = s.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] != b'*' || (i > 0 && bytes[i - 1] == b'*') {
            continue;
        }
        let Some(offset) = s[i + 1..].find('*') else {
            return None;
        };
        let close = i + 1 + offset;
        if offset > 0 && bytes.get(close + 1) != Some(&b'*') {
            return Some((i, close + 1));
        }
    }
    None
}

fn inline_html(spans: &[Inline]) -> String {
    let mut html = String::new();
    for span in spans {
        let (open, s, close) = match span {
            Inline::Text(s) => ("", s, ""),
            Inline::Strong(s) => ("<strong>", s, "</strong>"),
            Inline::Code(s) => ("<code>", s, "</code>"),
            Inline::Emphasis(s) => ("<em>", s, "</em>"),
        };
        html.push_str(open);
        html.push_str(&escape(s));
        html.push_str(close);
    }
    html
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn para(spans: Vec<Inline>) -> Block {
        Block::Paragraph(spans)
    }

    #[test]
    fn test_plain_text_passes_through() {
        let input = "hello world\n\nsecond line";
        assert_eq!(
            render(input),
            vec![para(vec![text("hello world")]), Block::LineBreak, para(vec![text("second line")])]
        );
        assert_eq!(render_html(input), "hello world\n<br />\nsecond line");
    }

    #[test]
    fn test_empty_input_is_one_line_break() {
        assert_eq!(render(""), vec![Block::LineBreak]);
    }

    #[test]
    fn test_list_grouping() {
        let blocks = render("- a\n- b\n- c");
        assert_eq!(
            blocks,
            vec![Block::List(vec![vec![text("a")], vec![text("b")], vec![text("c")]])]
        );
        assert_eq!(to_html(&blocks), "<ul>\n<li>a</li>\n<li>b</li>\n<li>c</li>\n</ul>");
    }

    #[test]
    fn test_mixed_content_closes_list() {
        assert_eq!(
            render_html("text\n- item\nmore text"),
            "text\n<ul>\n<li>item</li>\n</ul>\nmore text"
        );
    }

    #[test]
    fn test_all_markers_and_leading_spaces() {
        let blocks = render("* one\n  + two\n- three");
        assert_eq!(
            blocks,
            vec![Block::List(vec![vec![text("one")], vec![text("two")], vec![text("three")]])]
        );
    }

    #[test]
    fn test_marker_without_content_is_not_a_list_item() {
        assert_eq!(render("- "), vec![para(vec![text("- ")])]);
        assert_eq!(render("-item"), vec![para(vec![text("-item")])]);
    }

    #[test]
    fn test_blank_line_separates_lists() {
        assert_eq!(
            render_html("- a\n\n- b"),
            "<ul>\n<li>a</li>\n</ul>\n<br />\n<ul>\n<li>b</li>\n</ul>"
        );
    }

    #[test]
    fn test_bold_is_not_split_by_italic() {
        assert_eq!(render("**bold**"), vec![para(vec![Inline::Strong("bold".into())])]);
        assert_eq!(render_html("**bold**"), "<strong>bold</strong>");
    }

    #[test]
    fn test_inline_code() {
        assert_eq!(render("`x=1`"), vec![para(vec![Inline::Code("x=1".into())])]);
        assert_eq!(render_html("a ` b"), "a ` b");
        assert_eq!(render_html("``"), "``");
    }

    #[test]
    fn test_unclosed_emphasis_is_literal() {
        assert_eq!(render("*unclosed"), vec![para(vec![text("*unclosed")])]);
    }

    #[test]
    fn test_emphasis_on_plain_lines() {
        assert_eq!(
            render("a *b* c"),
            vec![para(vec![text("a "), Inline::Emphasis("b".into()), text(" c")])]
        );
    }

    #[test]
    fn test_emphasis_next_to_double_asterisk_does_not_match() {
        // the closing `*` is followed by another `*`
        assert_eq!(render_html("*a**"), "*a**");
        // the only opening `*` candidates are preceded by `*`
        assert_eq!(render_html("**a*"), "**a*");
    }

    #[test]
    fn test_emphasis_scan_resumes_after_rejected_opener() {
        // `*a**` is rejected, then `*b*` later on the line still matches
        assert_eq!(
            render("*a** *b*"),
            vec![para(vec![text("*a** "), Inline::Emphasis("b".into())])]
        );
        assert_eq!(render_html("*a** *b*"), "*a** <em>b</em>");
    }

    #[test]
    fn test_list_items_skip_emphasis() {
        assert_eq!(
            render("- *not em* and **bold**"),
            vec![Block::List(vec![vec![text("*not em* and "), Inline::Strong("bold".into())]])]
        );
    }

    #[test]
    fn test_spans_never_cross_lines() {
        assert_eq!(
            render("**a\nb**"),
            vec![para(vec![text("**a")]), para(vec![text("b**")])]
        );
    }

    #[test]
    fn test_bold_then_code_then_emphasis() {
        assert_eq!(
            render("**x** `y` *z*"),
            vec![para(vec![
                Inline::Strong("x".into()),
                text(" "),
                Inline::Code("y".into()),
                text(" "),
                Inline::Emphasis("z".into()),
            ])]
        );
    }

    #[test]
    fn test_code_content_is_not_reinterpreted() {
        assert_eq!(render("`*a*`"), vec![para(vec![Inline::Code("*a*".into())])]);
    }

    #[test]
    fn test_html_is_escaped() {
        assert_eq!(
            render_html("<script>alert('x')</script> & **<b>**"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; <strong>&lt;b&gt;</strong>"
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        assert_eq!(render_html("- a\r\n- b\r\n"), "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n<br />");
    }

    #[test]
    fn test_multibyte_text_around_markers() {
        assert_eq!(
            render("héllo **wörld** ✓"),
            vec![para(vec![text("héllo "), Inline::Strong("wörld".into()), text(" ✓")])]
        );
    }
}
