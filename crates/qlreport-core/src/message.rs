//! Placeholder substitution for alert-style messages.
//!
//! An alert tuple is `[location, message, (entity, label)*]`. Each `$@` in the
//! message is replaced, left to right, by a link built from the next pair.

use qlreport_types::Cell;

use crate::entity::{LinkContext, resolve_cell};

/// Token marking a link slot in an alert message.
pub const PLACEHOLDER: &str = "$@";

/// Fills the message at `tuple[1]` with links from the trailing pairs.
///
/// Replaces `min(placeholders, pairs)` tokens. Extra tokens stay literal, extra
/// pairs are ignored, and inserted link text is never rescanned. A tuple
/// shorter than two cells yields an empty message.
pub fn compose_message(tuple: &[Cell], ctx: &LinkContext) -> String {
    let Some(message) = tuple.get(1) else {
        return String::new();
    };
    let template = match message {
        Cell::String(s) => s.clone(),
        other => resolve_cell(other, ctx),
    };

    let mut pairs = tuple.get(2..).unwrap_or_default().chunks_exact(2);
    let mut out = String::with_capacity(template.len());
    let mut rest = template.as_str();

    while let Some(pos) = rest.find(PLACEHOLDER) {
        let Some(pair) = pairs.next() else {
            break;
        };
        out.push_str(&rest[..pos]);
        out.push_str(&placeholder_link(&pair[0], &pair[1], ctx));
        rest = &rest[pos + PLACEHOLDER.len()..];
    }
    out.push_str(rest);

    out
}

/// `[label](target)` for one (entity, label) pair; bare label when the first
/// element has no location to link to.
fn placeholder_link(target: &Cell, label: &Cell, ctx: &LinkContext) -> String {
    let text = match label {
        Cell::String(s) => s.clone(),
        other => resolve_cell(other, ctx),
    };

    match target.as_entity().and_then(|e| ctx.entity_target(e)) {
        Some(url) => format!("[{text}]({url})"),
        None => text,
    }
}
