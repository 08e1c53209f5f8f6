//! Working copy of the active document's annotations, with undo history.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::model::{OverlapPolicy, ProjectConfig, Relation, Span, SpanId, TextRange};

/// Oldest snapshots are dropped beyond this depth
const MAX_HISTORY: usize = 500;

/// Spans and relations as they were before a mutation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub spans: Vec<Span>,
    pub relations: Vec<Relation>,
}

/// Result of [`AnnotationStore::add_relation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationInsert {
    Added,
    /// An identical triple already exists; nothing changed
    Duplicate,
    /// Type outside the vocabulary or a self-loop; nothing changed
    Rejected,
}

/// Why a span could not be added or updated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpanRejection {
    #[error("label not in vocabulary")]
    UnknownLabel,
    #[error("range out of bounds")]
    OutOfBounds,
    #[error("overlaps an existing span")]
    Overlap,
    #[error("no span ids left")]
    IdsExhausted,
}

/// Owns the live span and relation lists of the active document.
///
/// Every rejected precondition is a silent no-op. Mutations that apply push a
/// snapshot of the previous state first.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    spans: Vec<Span>,
    relations: Vec<Relation>,
    history: Vec<Snapshot>,
    /// Wider than `SpanId` so a loaded `u32::MAX` cannot wrap it
    next_id: u64,
    text_len: usize,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self {
            spans: Vec::new(),
            relations: Vec::new(),
            history: Vec::new(),
            next_id: 1,
            text_len: 0,
        }
    }

    /// Replace the working copy with a document's annotations.
    ///
    /// The id counter only ever moves forward, past every loaded id.
    pub fn load(
        &mut self,
        text_len: usize,
        spans: Vec<Span>,
        relations: Vec<Relation>,
        history: Vec<Snapshot>,
    ) {
        if let Some(max) = spans.iter().map(|s| s.id.0).max() {
            self.next_id = self.next_id.max(u64::from(max) + 1);
        }
        self.text_len = text_len;
        self.spans = spans;
        self.relations = relations;
        self.history = history;
    }

    /// Hand the undo history back to its owner when the document is swapped out
    pub fn take_history(&mut self) -> Vec<Snapshot> {
        std::mem::take(&mut self.history)
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn span(&self, id: SpanId) -> Option<&Span> {
        self.spans.iter().find(|s| s.id == id)
    }

    pub fn contains_span(&self, id: SpanId) -> bool {
        self.span(id).is_some()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn text_len(&self) -> usize {
        self.text_len
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty() && self.relations.is_empty()
    }

    /// Ids of spans covering character `index`, in list order
    pub fn spans_covering(&self, index: usize) -> Vec<SpanId> {
        self.spans
            .iter()
            .filter(|s| s.range().contains(index))
            .map(|s| s.id)
            .collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            spans: self.spans.clone(),
            relations: self.relations.clone(),
        }
    }

    fn checkpoint(&mut self) {
        if self.history.len() == MAX_HISTORY {
            self.history.remove(0);
        }
        let snapshot = self.snapshot();
        self.history.push(snapshot);
    }

    /// Check a span over `range` against the vocabulary, the text bounds and
    /// the overlap policy. `exclude` is left out of the overlap test.
    pub fn check_span(
        &self,
        range: TextRange,
        label: &str,
        config: &ProjectConfig,
        exclude: Option<SpanId>,
    ) -> Result<(), SpanRejection> {
        if !config.has_label(label) {
            return Err(SpanRejection::UnknownLabel);
        }
        if !range.fits(self.text_len) {
            return Err(SpanRejection::OutOfBounds);
        }
        if config.overlap == OverlapPolicy::Reject
            && self
                .spans
                .iter()
                .any(|s| Some(s.id) != exclude && s.range().overlaps(&range))
        {
            return Err(SpanRejection::Overlap);
        }
        Ok(())
    }

    /// Commit a span over `range`. Returns the new id, or `None` if rejected.
    pub fn add_span(&mut self, range: TextRange, label: &str, config: &ProjectConfig) -> Option<SpanId> {
        if let Err(reason) = self.check_span(range, label, config, None) {
            trace!(label, start = range.start, end = range.end, %reason, "span rejected");
            return None;
        }
        let Ok(raw) = u32::try_from(self.next_id) else {
            trace!(reason = %SpanRejection::IdsExhausted, "span rejected");
            return None;
        };

        self.checkpoint();
        let id = SpanId(raw);
        self.next_id += 1;
        self.spans.push(Span::new(id, range, label));
        debug!(span_id = %id, label, start = range.start, end = range.end, "span added");
        Some(id)
    }

    /// Change the range and label of an existing span, keeping its id and
    /// relations. Returns false when rejected or when nothing would change.
    pub fn update_span(
        &mut self,
        id: SpanId,
        range: TextRange,
        label: &str,
        config: &ProjectConfig,
    ) -> bool {
        let Some(index) = self.spans.iter().position(|s| s.id == id) else {
            return false;
        };
        if let Err(reason) = self.check_span(range, label, config, Some(id)) {
            trace!(span_id = %id, %reason, "span update rejected");
            return false;
        }
        let current = &self.spans[index];
        if current.range() == range && current.label == label {
            return false;
        }

        self.checkpoint();
        let span = &mut self.spans[index];
        span.start = range.start;
        span.end = range.end;
        span.label = label.to_string();
        debug!(span_id = %id, label, start = range.start, end = range.end, "span updated");
        true
    }

    /// Remove a span and every relation touching it
    pub fn remove_span(&mut self, id: SpanId) -> bool {
        if !self.contains_span(id) {
            return false;
        }
        self.checkpoint();
        self.spans.retain(|s| s.id != id);
        let before = self.relations.len();
        self.relations.retain(|r| !r.touches(id));
        debug!(
            span_id = %id,
            cascaded = before - self.relations.len(),
            "span removed"
        );
        true
    }

    pub fn add_relation(
        &mut self,
        from_id: SpanId,
        to_id: SpanId,
        relation_type: &str,
        config: &ProjectConfig,
    ) -> RelationInsert {
        if !config.has_relation_type(relation_type) || from_id == to_id {
            trace!(relation_type, "relation rejected");
            return RelationInsert::Rejected;
        }
        if !self.contains_span(from_id) || !self.contains_span(to_id) {
            trace!(%from_id, %to_id, "relation rejected: dangling endpoint");
            return RelationInsert::Rejected;
        }
        let relation = Relation::new(from_id, to_id, relation_type);
        if self.relations.contains(&relation) {
            return RelationInsert::Duplicate;
        }

        self.checkpoint();
        self.relations.push(relation);
        debug!(%from_id, %to_id, relation_type, "relation added");
        RelationInsert::Added
    }

    pub fn update_relation_type(&mut self, index: usize, relation_type: &str) -> bool {
        if index >= self.relations.len() {
            return false;
        }
        self.checkpoint();
        self.relations[index].relation_type = relation_type.to_string();
        debug!(index, relation_type, "relation retyped");
        true
    }

    pub fn delete_relation(&mut self, index: usize) -> bool {
        if index >= self.relations.len() {
            return false;
        }
        self.checkpoint();
        let removed = self.relations.remove(index);
        debug!(
            index,
            from_id = %removed.from_id,
            to_id = %removed.to_id,
            "relation deleted"
        );
        true
    }

    /// Restore the most recent snapshot
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(snapshot) => {
                self.spans = snapshot.spans;
                self.relations = snapshot.relations;
                debug!(remaining = self.history.len(), "undo");
                true
            }
            None => false,
        }
    }

    /// Drop every span and relation of the active document
    pub fn clear(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.checkpoint();
        self.spans.clear();
        self.relations.clear();
        debug!("annotations cleared");
        true
    }
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(text: &str) -> AnnotationStore {
        let mut store = AnnotationStore::new();
        store.load(text.chars().count(), Vec::new(), Vec::new(), Vec::new());
        store
    }

    #[test]
    fn ids_start_at_one_and_are_never_reused() {
        let config = ProjectConfig::default();
        let mut s = store("Mike lives in America.");
        let a = s.add_span(TextRange::new(0, 4), "PER", &config).unwrap();
        assert_eq!(a, SpanId(1));
        assert!(s.remove_span(a));
        let b = s.add_span(TextRange::new(0, 4), "PER", &config).unwrap();
        assert_eq!(b, SpanId(2));
    }

    #[test]
    fn unknown_label_leaves_store_untouched() {
        let config = ProjectConfig::default();
        let mut s = store("Mike lives in America.");
        assert_eq!(s.add_span(TextRange::new(0, 4), "MISC", &config), None);
        assert!(s.spans().is_empty());
        assert_eq!(s.history_len(), 0);
    }

    #[test]
    fn out_of_bounds_range_is_rejected() {
        let config = ProjectConfig::default();
        let mut s = store("short");
        assert_eq!(s.add_span(TextRange::new(2, 9), "PER", &config), None);
        assert_eq!(s.add_span(TextRange::new(3, 3), "PER", &config), None);
    }

    #[test]
    fn overlap_policy_controls_nesting() {
        let text = "Mike lives in America.";
        let strict = ProjectConfig::default().with_overlap(OverlapPolicy::Reject);
        let mut s = store(text);
        s.add_span(TextRange::new(0, 10), "PER", &strict).unwrap();
        assert_eq!(s.add_span(TextRange::new(5, 10), "LOC", &strict), None);
        assert!(s.add_span(TextRange::new(10, 13), "LOC", &strict).is_some());

        let permissive = ProjectConfig::default();
        let mut s = store(text);
        s.add_span(TextRange::new(0, 10), "PER", &permissive).unwrap();
        assert!(s.add_span(TextRange::new(5, 10), "LOC", &permissive).is_some());
        assert_eq!(s.spans_covering(6), vec![SpanId(1), SpanId(2)]);
    }

    #[test]
    fn relation_rules() {
        let config = ProjectConfig::default();
        let mut s = store("Mike lives in America.");
        let a = s.add_span(TextRange::new(0, 4), "PER", &config).unwrap();
        let b = s.add_span(TextRange::new(14, 21), "LOC", &config).unwrap();

        assert_eq!(s.add_relation(a, a, "LOCATED_IN", &config), RelationInsert::Rejected);
        assert_eq!(s.add_relation(a, b, "LIKES", &config), RelationInsert::Rejected);
        assert_eq!(s.add_relation(a, SpanId(99), "LOCATED_IN", &config), RelationInsert::Rejected);
        assert_eq!(s.add_relation(a, b, "LOCATED_IN", &config), RelationInsert::Added);
        assert_eq!(s.add_relation(a, b, "LOCATED_IN", &config), RelationInsert::Duplicate);
        assert_eq!(s.add_relation(a, b, "WORKS_AT", &config), RelationInsert::Added);
        assert_eq!(s.relations().len(), 2);
    }

    #[test]
    fn relation_edits_are_bounds_checked() {
        let config = ProjectConfig::default();
        let mut s = store("Mike lives in America.");
        let a = s.add_span(TextRange::new(0, 4), "PER", &config).unwrap();
        let b = s.add_span(TextRange::new(14, 21), "LOC", &config).unwrap();
        s.add_relation(a, b, "LOCATED_IN", &config);

        assert!(!s.update_relation_type(3, "WORKS_AT"));
        assert!(s.update_relation_type(0, "WORKS_AT"));
        assert_eq!(s.relations()[0].relation_type, "WORKS_AT");
        assert!(!s.delete_relation(1));
        assert!(s.delete_relation(0));
        assert!(s.relations().is_empty());
    }

    #[test]
    fn undo_restores_previous_snapshot() {
        let config = ProjectConfig::default();
        let mut s = store("Mike lives in America.");
        assert!(!s.undo());

        let a = s.add_span(TextRange::new(0, 4), "PER", &config).unwrap();
        let b = s.add_span(TextRange::new(14, 21), "LOC", &config).unwrap();
        s.add_relation(a, b, "LOCATED_IN", &config);
        let before_remove = s.snapshot();

        s.remove_span(a);
        assert!(s.relations().is_empty());
        assert!(s.undo());
        assert_eq!(s.snapshot(), before_remove);

        assert!(s.clear());
        assert!(!s.clear());
        assert!(s.undo());
        assert_eq!(s.snapshot(), before_remove);
    }

    #[test]
    fn load_advances_counter_past_existing_ids() {
        let config = ProjectConfig::default();
        let mut s = AnnotationStore::new();
        let existing = vec![Span::new(SpanId(41), TextRange::new(0, 4), "PER")];
        s.load(22, existing, Vec::new(), Vec::new());
        assert_eq!(s.add_span(TextRange::new(5, 10), "LOC", &config), Some(SpanId(42)));

        // Loading a document with lower ids does not move the counter back
        s.load(22, Vec::new(), Vec::new(), Vec::new());
        assert_eq!(s.add_span(TextRange::new(5, 10), "LOC", &config), Some(SpanId(43)));
    }

    #[test]
    fn highest_loaded_id_exhausts_the_counter_without_reuse() {
        let config = ProjectConfig::default();
        let mut s = AnnotationStore::new();
        let near_top = vec![Span::new(SpanId(u32::MAX - 1), TextRange::new(0, 4), "PER")];
        s.load(22, near_top, Vec::new(), Vec::new());
        assert_eq!(s.add_span(TextRange::new(5, 10), "LOC", &config), Some(SpanId(u32::MAX)));
        assert_eq!(s.add_span(TextRange::new(11, 13), "LOC", &config), None);

        let mut s = AnnotationStore::new();
        let top = vec![Span::new(SpanId(u32::MAX), TextRange::new(0, 4), "PER")];
        s.load(22, top, Vec::new(), Vec::new());
        assert_eq!(s.add_span(TextRange::new(5, 10), "LOC", &config), None);
        assert_eq!(s.spans().len(), 1);
        assert_eq!(s.history_len(), 0);
    }

    #[test]
    fn update_span_keeps_id_and_relations() {
        let config = ProjectConfig::default();
        let mut s = store("Mike lives in America.");
        let a = s.add_span(TextRange::new(0, 4), "PER", &config).unwrap();
        let b = s.add_span(TextRange::new(14, 21), "LOC", &config).unwrap();
        s.add_relation(a, b, "LOCATED_IN", &config);
        let before = s.snapshot();

        assert!(s.update_span(a, TextRange::new(0, 4), "ORG", &config));
        assert_eq!(s.span(a).map(|sp| sp.label.as_str()), Some("ORG"));
        assert_eq!(s.relations().len(), 1);

        assert!(s.undo());
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn update_span_rejections_push_no_history() {
        let config = ProjectConfig::default();
        let mut s = store("Mike lives in America.");
        let a = s.add_span(TextRange::new(0, 4), "PER", &config).unwrap();
        let depth = s.history_len();

        assert!(!s.update_span(a, TextRange::new(0, 4), "PER", &config));
        assert!(!s.update_span(a, TextRange::new(0, 4), "MISC", &config));
        assert!(!s.update_span(a, TextRange::new(0, 40), "PER", &config));
        assert!(!s.update_span(SpanId(9), TextRange::new(0, 4), "LOC", &config));
        assert_eq!(s.history_len(), depth);
    }

    #[test]
    fn strict_update_ignores_the_span_itself() {
        let strict = ProjectConfig::default().with_overlap(OverlapPolicy::Reject);
        let mut s = store("Mike lives in America.");
        let a = s.add_span(TextRange::new(0, 4), "PER", &strict).unwrap();
        s.add_span(TextRange::new(14, 21), "LOC", &strict).unwrap();

        assert!(s.update_span(a, TextRange::new(0, 10), "PER", &strict));
        assert!(!s.update_span(a, TextRange::new(0, 16), "PER", &strict));
        assert_eq!(
            s.check_span(TextRange::new(0, 16), "PER", &strict, Some(a)),
            Err(SpanRejection::Overlap)
        );
    }
}
