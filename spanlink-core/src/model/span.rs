use std::fmt;

use serde::{Deserialize, Serialize};

use super::TextRange;

/// Identifier of a span, unique within an editing session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SpanId(pub u32);

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A labeled character range within a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Span {
    pub id: SpanId,
    pub start: usize,
    pub end: usize,
    pub label: String,
}

impl Span {
    pub fn new(id: SpanId, range: TextRange, label: impl Into<String>) -> Self {
        Self {
            id,
            start: range.start,
            end: range.end,
            label: label.into(),
        }
    }

    pub fn range(&self) -> TextRange {
        TextRange {
            start: self.start,
            end: self.end,
        }
    }

    /// Covered text, by character offsets
    pub fn fragment<'a>(&self, text: &'a str) -> &'a str {
        let mut indices = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len()));
        let from = indices.nth(self.start).unwrap_or(text.len());
        let to = indices
            .nth(self.end.saturating_sub(self.start + 1))
            .unwrap_or(text.len());
        &text[from..to.max(from)]
    }
}
