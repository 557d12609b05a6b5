//! Structured (rich) text rendering

use crate::cms::{RichTextBlock, Span};
use crate::helpers::html_escape;

/// Plain text of all blocks, joined by a single space
pub fn as_text(blocks: &[RichTextBlock]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// HTML markup for a list of blocks
///
/// Consecutive `list-item` / `o-list-item` blocks are grouped into one
/// `<ul>` / `<ol>`.
pub fn as_html(blocks: &[RichTextBlock]) -> String {
    let mut html = String::new();
    let mut open_list: Option<&'static str> = None;

    for block in blocks {
        let list = match block.kind.as_str() {
            "list-item" => Some("ul"),
            "o-list-item" => Some("ol"),
            _ => None,
        };

        if open_list != list {
            if let Some(tag) = open_list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list {
                html.push_str(&format!("<{}>", tag));
            }
            open_list = list;
        }

        html.push_str(&block_html(block));
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

fn block_html(block: &RichTextBlock) -> String {
    let inner = || apply_spans(&block.text, &block.spans);

    match block.kind.as_str() {
        "paragraph" => format!("<p>{}</p>", inner()),
        "preformatted" => format!("<pre>{}</pre>", inner()),
        "list-item" | "o-list-item" => format!("<li>{}</li>", inner()),
        kind if kind.starts_with("heading") => {
            let level = kind["heading".len()..]
                .parse::<u8>()
                .ok()
                .filter(|l| (1..=6).contains(l))
                .unwrap_or(2);
            format!("<h{0}>{1}</h{0}>", level, inner())
        }
        "image" => format!(
            r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
            html_escape(block.url.as_deref().unwrap_or_default()),
            html_escape(block.alt.as_deref().unwrap_or_default())
        ),
        "embed" => {
            let oembed = block.oembed.as_ref();
            let field = |name: &str| {
                oembed
                    .and_then(|o| o.get(name))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            format!(
                r#"<div data-oembed="{}" data-oembed-type="{}">{}</div>"#,
                html_escape(&field("embed_url")),
                html_escape(&field("type")),
                field("html")
            )
        }
        other => {
            tracing::debug!("Rendering unknown block type {:?} as paragraph", other);
            format!("<p>{}</p>", inner())
        }
    }
}

/// Escape `text` and wrap the character ranges covered by `spans`
///
/// Overlapping spans are closed and reopened so the output stays well nested.
fn apply_spans(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut spans: Vec<&Span> = spans
        .iter()
        .filter(|s| s.start < s.end && s.start < len)
        .collect();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let end_of = |s: &Span| s.end.min(len);
    let mut out = String::with_capacity(text.len());
    let mut open: Vec<&Span> = Vec::new();
    let mut next = 0;

    for i in 0..=len {
        if open.iter().any(|s| end_of(s) == i) {
            let mut reopen = Vec::new();
            while let Some(span) = open.pop() {
                out.push_str(close_tag(span));
                if end_of(span) != i {
                    reopen.push(span);
                }
                if !open.iter().any(|s| end_of(s) == i) {
                    break;
                }
            }
            for span in reopen.into_iter().rev() {
                out.push_str(&open_tag(span));
                open.push(span);
            }
        }

        while next < spans.len() && spans[next].start == i {
            out.push_str(&open_tag(spans[next]));
            open.push(spans[next]);
            next += 1;
        }

        if let Some(&c) = chars.get(i) {
            if c == '\n' {
                out.push_str("<br />");
            } else {
                out.push_str(&html_escape(c.encode_utf8(&mut [0; 4])));
            }
        }
    }

    out
}

fn open_tag(span: &Span) -> String {
    match span.kind.as_str() {
        "strong" => "<strong>".to_string(),
        "em" => "<em>".to_string(),
        "hyperlink" => {
            let data = span.data.as_ref();
            let href = data.and_then(|d| d.url.as_deref()).unwrap_or("#");
            match data.and_then(|d| d.target.as_deref()) {
                Some(target) => format!(
                    r#"<a href="{}" target="{}" rel="noopener">"#,
                    html_escape(href),
                    html_escape(target)
                ),
                None => format!(r#"<a href="{}">"#, html_escape(href)),
            }
        }
        _ => "<span>".to_string(),
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind.as_str() {
        "strong" => "</strong>",
        "em" => "</em>",
        "hyperlink" => "</a>",
        _ => "</span>",
    }
}
