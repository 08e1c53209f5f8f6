//! Document list and the active editing session.

use std::collections::BTreeSet;
use std::ops::Range;

use tracing::{debug, info};

use crate::model::{derive_status, DocStatus, Document};
use crate::store::{AnnotationStore, Snapshot};

/// Holds every document of the project plus one undo history per document.
///
/// Only the active document's annotations live in the [`AnnotationStore`];
/// the copy in `documents` is refreshed by [`Navigator::save_current`].
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    documents: Vec<Document>,
    histories: Vec<Vec<Snapshot>>,
    active: Option<usize>,
    export_selection: BTreeSet<usize>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn active_document(&self) -> Option<&Document> {
        self.active.and_then(|i| self.documents.get(i))
    }

    /// Write the store's live annotations back into the active document
    pub fn save_current(&mut self, store: &AnnotationStore) {
        let Some(doc) = self.active.and_then(|i| self.documents.get_mut(i)) else {
            return;
        };
        doc.spans = store.spans().to_vec();
        doc.relations = store.relations().to_vec();
        doc.refresh_status();
    }

    /// Load document `index` into the store and make it active.
    ///
    /// The outgoing document's undo history is parked; unsaved annotation
    /// edits are not written back (use [`Navigator::goto`] for that).
    pub fn load_index(&mut self, index: usize, store: &mut AnnotationStore) -> bool {
        if index >= self.documents.len() {
            return false;
        }
        if let Some(prev) = self.active {
            if let Some(slot) = self.histories.get_mut(prev) {
                *slot = store.take_history();
            }
        }
        let doc = &self.documents[index];
        let history = std::mem::take(&mut self.histories[index]);
        store.load(doc.char_len(), doc.spans.clone(), doc.relations.clone(), history);
        self.active = Some(index);
        debug!(index, spans = doc.spans.len(), "document loaded");
        true
    }

    /// Save the active document, then load `index`
    pub fn goto(&mut self, index: usize, store: &mut AnnotationStore) -> bool {
        if index >= self.documents.len() || self.active == Some(index) {
            return false;
        }
        self.save_current(store);
        self.load_index(index, store)
    }

    pub fn next(&mut self, store: &mut AnnotationStore) -> bool {
        match self.active {
            Some(i) if i + 1 < self.documents.len() => self.goto(i + 1, store),
            _ => false,
        }
    }

    pub fn prev(&mut self, store: &mut AnnotationStore) -> bool {
        match self.active {
            Some(i) if i > 0 => self.goto(i - 1, store),
            _ => false,
        }
    }

    /// Append one pending document per text unit and return their indices.
    ///
    /// Activates the first document when nothing was active before.
    pub fn import<I, S>(&mut self, units: I, store: &mut AnnotationStore) -> Range<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let base = self.documents.len();
        let incoming: Vec<Document> = units.into_iter().map(Document::new).collect();
        let added = incoming.len();
        self.documents.extend(incoming);
        self.histories.resize_with(self.documents.len(), Vec::new);
        info!(added, total = self.documents.len(), "documents imported");

        if self.active.is_none() && !self.documents.is_empty() {
            self.load_index(0, store);
        }
        base..base + added
    }

    /// Replace the whole document list, e.g. after loading a project
    pub fn replace_all(&mut self, documents: Vec<Document>, store: &mut AnnotationStore) {
        self.histories = vec![Vec::new(); documents.len()];
        self.documents = documents;
        self.active = None;
        self.export_selection.clear();
        store.take_history();
        if self.documents.is_empty() {
            store.load(0, Vec::new(), Vec::new(), Vec::new());
        } else {
            self.load_index(0, store);
        }
    }

    /// Remove document `index`. The active document stays active when it
    /// survives; otherwise its neighbour takes over.
    pub fn remove(&mut self, index: usize, store: &mut AnnotationStore) -> bool {
        if index >= self.documents.len() {
            return false;
        }
        self.save_current(store);
        self.documents.remove(index);
        self.histories.remove(index);
        self.export_selection = self
            .export_selection
            .iter()
            .filter(|&&i| i != index)
            .map(|&i| if i > index { i - 1 } else { i })
            .collect();

        match self.active {
            Some(active) if active == index => {
                self.active = None;
                store.take_history();
                if self.documents.is_empty() {
                    store.load(0, Vec::new(), Vec::new(), Vec::new());
                } else {
                    self.load_index(index.min(self.documents.len() - 1), store);
                }
            }
            Some(active) if active > index => self.active = Some(active - 1),
            _ => {}
        }
        info!(index, remaining = self.documents.len(), "document removed");
        true
    }

    /// Drop every document
    pub fn clear_all(&mut self, store: &mut AnnotationStore) {
        self.replace_all(Vec::new(), store);
    }

    /// Indices of documents whose text contains `query`, ignoring case
    pub fn search(&self, query: &str) -> Vec<usize> {
        let needle = query.to_lowercase();
        self.documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| doc.text.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect()
    }

    /// Re-derive the active document's status from the live annotations
    pub fn refresh_active_status(&mut self, store: &AnnotationStore) {
        if let Some(doc) = self.active.and_then(|i| self.documents.get_mut(i)) {
            doc.status = derive_status(store.spans(), store.relations(), doc.status);
        }
    }

    pub fn mark_completed(&mut self) -> bool {
        match self.active.and_then(|i| self.documents.get_mut(i)) {
            Some(doc) => {
                doc.status = DocStatus::Completed;
                true
            }
            None => false,
        }
    }

    /// Return a completed document to the status its annotations imply
    pub fn reopen(&mut self, store: &AnnotationStore) -> bool {
        match self.active.and_then(|i| self.documents.get_mut(i)) {
            Some(doc) if doc.status == DocStatus::Completed => {
                doc.status = derive_status(store.spans(), store.relations(), DocStatus::Pending);
                true
            }
            _ => false,
        }
    }

    /// Assign storage ids in document order
    pub fn assign_ids(&mut self, ids: &[i64]) {
        for (doc, id) in self.documents.iter_mut().zip(ids) {
            doc.id = Some(*id);
        }
    }

    pub fn toggle_export_selection(&mut self, index: usize) -> bool {
        if index >= self.documents.len() {
            return false;
        }
        if !self.export_selection.remove(&index) {
            self.export_selection.insert(index);
        }
        true
    }

    pub fn is_selected_for_export(&self, index: usize) -> bool {
        self.export_selection.contains(&index)
    }

    pub fn export_selection(&self) -> Vec<usize> {
        self.export_selection.iter().copied().collect()
    }

    /// Documents to export: the marked ones, or all when none are marked
    pub fn export_documents(&self) -> Vec<&Document> {
        if self.export_selection.is_empty() {
            self.documents.iter().collect()
        } else {
            self.export_selection
                .iter()
                .filter_map(|&i| self.documents.get(i))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProjectConfig, TextRange};

    fn three_docs() -> (Navigator, AnnotationStore) {
        let mut nav = Navigator::new();
        let mut store = AnnotationStore::new();
        let added = nav.import(["first doc", "second doc", "third doc"], &mut store);
        assert_eq!(added, 0..3);
        (nav, store)
    }

    #[test]
    fn import_activates_first_document() {
        let (nav, store) = three_docs();
        assert_eq!(nav.active(), Some(0));
        assert_eq!(store.text_len(), 9);
        assert!(nav.documents().iter().all(|d| d.status == DocStatus::Pending));
    }

    #[test]
    fn import_keeps_existing_active_document() {
        let (mut nav, mut store) = three_docs();
        nav.next(&mut store);
        let added = nav.import(["fourth"], &mut store);
        assert_eq!(added, 3..4);
        assert_eq!(nav.active(), Some(1));
    }

    #[test]
    fn next_and_prev_stop_at_the_ends() {
        let (mut nav, mut store) = three_docs();
        assert!(!nav.prev(&mut store));
        assert!(nav.next(&mut store));
        assert!(nav.next(&mut store));
        assert!(!nav.next(&mut store));
        assert_eq!(nav.active(), Some(2));
    }

    #[test]
    fn switching_keeps_per_document_history() {
        let config = ProjectConfig::default();
        let (mut nav, mut store) = three_docs();
        store.add_span(TextRange::new(0, 5), "PER", &config);
        assert_eq!(store.history_len(), 1);

        nav.next(&mut store);
        assert_eq!(store.history_len(), 0);
        assert!(!store.undo());

        nav.prev(&mut store);
        assert_eq!(store.history_len(), 1);
        assert!(store.undo());
        assert!(store.spans().is_empty());
    }

    #[test]
    fn save_current_derives_status() {
        let config = ProjectConfig::default();
        let (mut nav, mut store) = three_docs();
        store.add_span(TextRange::new(0, 5), "PER", &config);
        nav.save_current(&store);
        assert_eq!(nav.documents()[0].status, DocStatus::InProgress);

        nav.mark_completed();
        store.clear();
        nav.save_current(&store);
        assert_eq!(nav.documents()[0].status, DocStatus::Completed);

        assert!(nav.reopen(&store));
        assert_eq!(nav.documents()[0].status, DocStatus::Pending);
    }

    #[test]
    fn remove_fixes_active_index_and_selection() {
        let (mut nav, mut store) = three_docs();
        nav.goto(2, &mut store);
        nav.toggle_export_selection(0);
        nav.toggle_export_selection(2);

        assert!(nav.remove(0, &mut store));
        assert_eq!(nav.active(), Some(1));
        assert_eq!(nav.export_selection(), vec![1]);

        assert!(nav.remove(1, &mut store));
        assert_eq!(nav.active(), Some(0));
        assert_eq!(nav.active_document().map(|d| d.text.as_str()), Some("second doc"));
    }

    #[test]
    fn search_ignores_case() {
        let (nav, _) = three_docs();
        assert_eq!(nav.search("SECOND"), vec![1]);
        assert_eq!(nav.search("doc"), vec![0, 1, 2]);
        assert!(nav.search("missing").is_empty());
    }

    #[test]
    fn export_scope_falls_back_to_all() {
        let (mut nav, _) = three_docs();
        assert_eq!(nav.export_documents().len(), 3);
        nav.toggle_export_selection(1);
        let docs = nav.export_documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "second doc");
        nav.toggle_export_selection(1);
        assert_eq!(nav.export_documents().len(), 3);
    }

    #[test]
    fn clear_all_leaves_nothing_active() {
        let (mut nav, mut store) = three_docs();
        nav.clear_all(&mut store);
        assert!(nav.is_empty());
        assert_eq!(nav.active(), None);
        assert_eq!(store.text_len(), 0);
    }
}
