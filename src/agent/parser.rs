//! Agent response parsing
//!
//! Agents answer with tagged segments such as `<think>...</think>` followed by
//! one action like `<propose_plan>...</propose_plan>`. Every response resolves
//! to exactly one action; text without a recognised action tag becomes a
//! `respond`.

use crate::core::{ActionKind, Party, Turn};

/// The action extracted from a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    /// Trimmed inner text of the tag
    pub body: String,
}

/// A parsed agent response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Trimmed `think` segment, if present
    pub thinking: Option<String>,
    pub action: Action,
    /// The text as received
    pub raw: String,
}

impl ParsedResponse {
    pub fn is_agreement(&self) -> bool {
        self.action.kind == ActionKind::Agree
    }
}

/// Byte span of the first complete `<tag>...</tag>` pair
struct TagMatch {
    start: usize,
    end: usize,
    inner_start: usize,
    inner_end: usize,
}

/// Find the first `<tag>` that has a `</tag>` after it, matching the nearest
/// closing tag.
fn find_tag(text: &str, tag: &str) -> Option<TagMatch> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let start = text.find(&open)?;
    let inner_start = start + open.len();
    let inner_end = inner_start + text[inner_start..].find(&close)?;

    Some(TagMatch {
        start,
        end: inner_end + close.len(),
        inner_start,
        inner_end,
    })
}

fn tag_body(text: &str, tag: &str) -> Option<String> {
    find_tag(text, tag).map(|m| text[m.inner_start..m.inner_end].trim().to_string())
}

/// Parse an agent's response to extract thinking and its action
pub fn parse_response(content: &str) -> ParsedResponse {
    let thinking = tag_body(content, ActionKind::Think.tag());

    let action = ActionKind::PRIORITY
        .iter()
        .find_map(|kind| {
            tag_body(content, kind.tag()).map(|body| Action { kind: *kind, body })
        })
        .unwrap_or_else(|| {
            let without_thinking = strip_thinking(content);
            Action {
                kind: ActionKind::Respond,
                body: if without_thinking.is_empty() {
                    content.to_string()
                } else {
                    without_thinking
                },
            }
        });

    ParsedResponse {
        thinking,
        action,
        raw: content.to_string(),
    }
}

/// Remove the first `think` segment and trim the rest
fn strip_thinking(content: &str) -> String {
    match find_tag(content, ActionKind::Think.tag()) {
        Some(m) => format!("{}{}", &content[..m.start], &content[m.end..])
            .trim()
            .to_string(),
        None => content.trim().to_string(),
    }
}

/// The most recent proposed plan in a turn sequence.
///
/// Later critiques or questions do not hide an earlier proposal.
pub fn extract_current_plan(turns: &[Turn]) -> Option<String> {
    turns
        .iter()
        .rev()
        .filter(|turn| turn.party != Party::Human)
        .map(|turn| parse_response(&turn.content))
        .find(|parsed| parsed.action.kind == ActionKind::ProposePlan)
        .map(|parsed| parsed.action.body)
}

/// Format a parsed response for display
pub fn format_for_display(response: &ParsedResponse) -> String {
    let mut parts = Vec::new();

    if let Some(ref thinking) = response.thinking {
        parts.push(format!("**Thinking:**\n{}", thinking));
    }

    if response.action.kind != ActionKind::Think {
        parts.push(format!(
            "**{}:**\n{}",
            response.action.kind.label(),
            response.action.body
        ));
    }

    parts.join("\n\n")
}
