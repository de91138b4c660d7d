use crate::messages::{Segment, TurnContent};

/// Collapse terminal assistant content into one display string.
///
/// Plain text passes through unchanged. Segment lists are concatenated in
/// order; segments without text are skipped.
pub fn normalize(content: &TurnContent) -> String {
    match content {
        TurnContent::Text(text) => text.clone(),
        TurnContent::Segments(segments) => segments
            .iter()
            .filter_map(|s| match s {
                Segment::Text { text } => Some(text.as_str()),
                Segment::Other => None,
            })
            .collect::<Vec<_>>()
            .join(""),
    }
}
