//! Chat message to Signal rendering.
//!
//! Signal expresses formatting as "body ranges" over plain text, not inline
//! syntax. Outbound messages are rendered as a bold category header, the
//! body with its markdown markers converted to ranges, and an italic footer
//! carrying a deep link back into the application.

use signal_gateway::TextStyleParam;

use crate::chat::ChatMessage;

/// Maximum message size accepted by the gateway.
pub const MAX_SIGNAL_MESSAGE_LEN: usize = 2000;

/// A formatted message ready to send via Signal.
#[derive(Debug, Clone, Default)]
pub struct FormattedMessage {
    /// Plain text with markdown markers removed.
    pub text: String,
    /// Text style ranges for formatting.
    pub styles: Vec<TextStyleParam>,
}

/// Signal text style types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleType {
    Bold,
    Italic,
    Monospace,
    Strikethrough,
}

impl StyleType {
    /// Get the Signal style name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bold => "BOLD",
            Self::Italic => "ITALIC",
            Self::Monospace => "MONOSPACE",
            Self::Strikethrough => "STRIKETHROUGH",
        }
    }
}

/// Render an outbound chat message for Signal: emoji + bold header line,
/// markdown-converted body, italic footer with a deep link into the app.
/// The result is truncated to [`MAX_SIGNAL_MESSAGE_LEN`].
pub fn compose_outbound(message: &ChatMessage, app_base_url: &str) -> FormattedMessage {
    let header = format!("{} {}", message.category.emoji(), message.category.header());
    let footer = format!(
        "{} · {}/projects/{}",
        message.project_id,
        app_base_url.trim_end_matches('/'),
        message.project_id
    );

    let body = parse_markdown(&message.body);

    // Room left for the body once header, footer and separators are placed.
    let overhead = header.len() + footer.len() + "\n".len() + "\n\n".len();
    let body_text = truncate_chars(&body.text, MAX_SIGNAL_MESSAGE_LEN.saturating_sub(overhead));

    let mut text = String::with_capacity(overhead + body_text.len());
    let mut styles = Vec::with_capacity(body.styles.len() + 2);

    styles.push(style_range(0, header.len(), StyleType::Bold));
    text.push_str(&header);
    text.push('\n');

    let body_offset = text.len();
    for style in &body.styles {
        // Styles whose range survived truncation carry over, shifted.
        let end = style.start as usize + style.length as usize;
        if end <= body_text.len() {
            styles.push(TextStyleParam {
                start: (style.start as usize + body_offset) as u32,
                length: style.length,
                style: style.style.clone(),
            });
        }
    }
    text.push_str(&body_text);
    text.push_str("\n\n");

    styles.push(style_range(text.len(), footer.len(), StyleType::Italic));
    text.push_str(&footer);

    FormattedMessage { text, styles }
}

fn style_range(start: usize, length: usize, style: StyleType) -> TextStyleParam {
    TextStyleParam {
        start: start as u32,
        length: length as u32,
        style: style.as_str().to_string(),
    }
}

/// A detected formatting span in the source text (byte positions including
/// the markers).
#[derive(Debug, Clone)]
struct FormatSpan {
    start: usize,
    end: usize,
    marker_len: usize,
    style: StyleType,
}

/// Parse markdown-style formatting and convert to Signal text styles.
///
/// Supported syntax:
/// - `**bold**` or `__bold__` → BOLD
/// - `*italic*` or `_italic_` → ITALIC
/// - `` `code` `` → MONOSPACE
/// - `~~strikethrough~~` → STRIKETHROUGH
///
/// Nested formatting is not supported; longer markers are matched first and
/// overlapping spans are dropped.
pub fn parse_markdown(input: &str) -> FormattedMessage {
    let mut spans: Vec<FormatSpan> = Vec::new();

    find_spans(input, "**", StyleType::Bold, &mut spans);
    find_spans(input, "__", StyleType::Bold, &mut spans);
    find_spans(input, "~~", StyleType::Strikethrough, &mut spans);
    find_spans(input, "*", StyleType::Italic, &mut spans);
    find_spans(input, "_", StyleType::Italic, &mut spans);
    find_spans(input, "`", StyleType::Monospace, &mut spans);

    // Stable sort: at equal starts the longer-marker span found first wins.
    spans.sort_by_key(|s| s.start);
    let spans = remove_overlapping(spans);

    build_formatted(input, &spans)
}

/// Find all spans delimited by `marker`.
fn find_spans(input: &str, marker: &str, style: StyleType, spans: &mut Vec<FormatSpan>) {
    let marker_len = marker.len();
    let mut pos = 0;

    while pos < input.len() {
        let Some(rel_open) = input[pos..].find(marker) else {
            break;
        };
        let start = pos + rel_open;
        let content_start = start + marker_len;
        if content_start >= input.len() {
            break;
        }

        match input[content_start..].find(marker) {
            // Must have content between the markers.
            Some(rel_close) if rel_close > 0 => {
                let end = content_start + rel_close + marker_len;
                spans.push(FormatSpan {
                    start,
                    end,
                    marker_len,
                    style,
                });
                pos = end;
            }
            _ => {
                pos = content_start;
            }
        }
    }
}

/// Remove overlapping spans, keeping the earliest (first-found) one.
fn remove_overlapping(spans: Vec<FormatSpan>) -> Vec<FormatSpan> {
    let mut result: Vec<FormatSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        if result.iter().all(|kept| span.start >= kept.end || span.end <= kept.start) {
            result.push(span);
        }
    }
    result.sort_by_key(|s| s.start);
    result
}

/// Build the output text with markers removed and ranges re-based onto it.
fn build_formatted(input: &str, spans: &[FormatSpan]) -> FormattedMessage {
    let mut text = String::with_capacity(input.len());
    let mut styles = Vec::with_capacity(spans.len());
    let mut cursor = 0;

    for span in spans {
        text.push_str(&input[cursor..span.start]);
        let content = &input[span.start + span.marker_len..span.end - span.marker_len];
        styles.push(style_range(text.len(), content.len(), span.style));
        text.push_str(content);
        cursor = span.end;
    }
    text.push_str(&input[cursor..]);

    FormattedMessage { text, styles }
}

/// Truncate to at most `max` bytes on a char boundary, with an ellipsis when
/// anything was cut.
fn truncate_chars(input: &str, max: usize) -> String {
    if input.len() <= max {
        return input.to_string();
    }
    let mut end = max.saturating_sub('…'.len_utf8());
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = input[..end].to_string();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::MessageCategory;

    fn message(body: &str) -> ChatMessage {
        ChatMessage {
            id: "msg-1".to_string(),
            user_id: "user-a".to_string(),
            project_id: "project-alpha".to_string(),
            body: body.to_string(),
            category: MessageCategory::AssistantReply,
        }
    }

    #[test]
    fn parse_bold_and_italic() {
        let parsed = parse_markdown("a **bold** and *italic* word");
        assert_eq!(parsed.text, "a bold and italic word");
        assert_eq!(parsed.styles.len(), 2);
        assert_eq!(parsed.styles[0].style, "BOLD");
        assert_eq!(parsed.styles[0].start, 2);
        assert_eq!(parsed.styles[0].length, 4);
        assert_eq!(parsed.styles[1].style, "ITALIC");
        assert_eq!(&parsed.text[parsed.styles[1].start as usize..][..parsed.styles[1].length as usize], "italic");
    }

    #[test]
    fn parse_monospace() {
        let parsed = parse_markdown("run `cargo doc` now");
        assert_eq!(parsed.text, "run cargo doc now");
        assert_eq!(parsed.styles[0].style, "MONOSPACE");
    }

    #[test]
    fn unmatched_markers_pass_through() {
        let parsed = parse_markdown("2 * 3 is six");
        assert_eq!(parsed.text, "2 * 3 is six");
        assert!(parsed.styles.is_empty());
    }

    #[test]
    fn compose_has_bold_header_and_italic_footer() {
        let formatted = compose_outbound(&message("hello"), "https://app.example.com");

        assert!(formatted.text.starts_with("💬 Assistant\n"));
        assert!(formatted
            .text
            .ends_with("project-alpha · https://app.example.com/projects/project-alpha"));

        let header = &formatted.styles[0];
        assert_eq!(header.style, "BOLD");
        assert_eq!(header.start, 0);

        let footer = formatted.styles.last().unwrap();
        assert_eq!(footer.style, "ITALIC");
        assert_eq!(
            &formatted.text[footer.start as usize..][..footer.length as usize],
            "project-alpha · https://app.example.com/projects/project-alpha"
        );
    }

    #[test]
    fn compose_shifts_body_styles_past_header() {
        let formatted = compose_outbound(&message("**ready** to go"), "https://app.example.com");
        let body_style = &formatted.styles[1];
        assert_eq!(body_style.style, "BOLD");
        assert_eq!(
            &formatted.text[body_style.start as usize..][..body_style.length as usize],
            "ready"
        );
    }

    #[test]
    fn compose_truncates_to_gateway_limit() {
        let formatted = compose_outbound(&message(&"x".repeat(5000)), "https://app.example.com");
        assert!(formatted.text.len() <= MAX_SIGNAL_MESSAGE_LEN);
        assert!(formatted.text.contains('…'));
        // Footer survives truncation.
        assert!(formatted.text.ends_with("/projects/project-alpha"));
    }
}
