use serde::{Deserialize, Serialize};

use super::{Relation, Span};

/// Completion status of a document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl DocStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocStatus::Pending => "pending",
            DocStatus::InProgress => "in_progress",
            DocStatus::Completed => "completed",
        }
    }

    /// Single-cell marker for list views
    pub fn glyph(&self) -> char {
        match self {
            DocStatus::Pending => '·',
            DocStatus::InProgress => '~',
            DocStatus::Completed => '✓',
        }
    }
}

/// Status implied by the annotation lists. `Completed` is sticky.
pub fn derive_status(spans: &[Span], relations: &[Relation], prior: DocStatus) -> DocStatus {
    if prior == DocStatus::Completed {
        DocStatus::Completed
    } else if !spans.is_empty() || !relations.is_empty() {
        DocStatus::InProgress
    } else {
        DocStatus::Pending
    }
}

/// One unit of text under annotation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Record id assigned by the storage collaborator; `None` until first saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default)]
    pub relations: Vec<Relation>,
    #[serde(default)]
    pub status: DocStatus,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            spans: Vec::new(),
            relations: Vec::new(),
            status: DocStatus::Pending,
        }
    }

    /// Length in characters; the upper bound for span offsets
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Get spans sorted by start offset
    pub fn spans_sorted(&self) -> Vec<&Span> {
        let mut sorted: Vec<_> = self.spans.iter().collect();
        sorted.sort_by_key(|s| (s.start, s.end));
        sorted
    }

    /// First line of the text, shortened for list display
    pub fn preview(&self, max_chars: usize) -> String {
        let line = self.text.lines().next().unwrap_or("");
        if line.chars().count() > max_chars {
            let cut: String = line.chars().take(max_chars.saturating_sub(1)).collect();
            format!("{cut}…")
        } else {
            line.to_string()
        }
    }

    pub fn refresh_status(&mut self) {
        self.status = derive_status(&self.spans, &self.relations, self.status);
    }
}
