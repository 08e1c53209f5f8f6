//! Storage collaborator contract.
//!
//! Front ends plug a concrete backend (files, browser storage, a remote
//! service) behind [`ProjectStore`]. The core only sees project shapes.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Document, ProjectConfig, SpanId};

/// What a backend hands back for one project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadedProject {
    pub config: ProjectConfig,
    pub documents: Vec<Document>,
}

pub trait ProjectStore {
    fn load_documents(&mut self, project_id: &str) -> Result<LoadedProject>;

    /// Persist the whole project. Returns the record id of every document,
    /// in order, assigning fresh ids to documents that had none.
    fn save_documents(
        &mut self,
        project_id: &str,
        config: &ProjectConfig,
        documents: &[Document],
    ) -> Result<Vec<i64>>;

    /// Append a single document record
    fn save_one_record(&mut self, project_id: &str, document: &Document) -> Result<()>;
}

/// Drop relations whose endpoints are not spans of the same document.
/// Returns how many were dropped.
pub fn drop_dangling_relations(document: &mut Document) -> usize {
    let ids: HashSet<SpanId> = document.spans.iter().map(|s| s.id).collect();
    let before = document.relations.len();
    document
        .relations
        .retain(|r| ids.contains(&r.from_id) && ids.contains(&r.to_id));
    let dropped = before - document.relations.len();
    if dropped > 0 {
        warn!(doc_id = ?document.id, dropped, "dangling relations dropped on load");
    }
    dropped
}

/// Drop spans outside the text or repeating an earlier id, self-loop
/// relations, then dangling relations. Returns how many items were dropped.
pub fn sanitize_document(document: &mut Document) -> usize {
    let text_len = document.char_len();
    let mut seen = HashSet::new();
    let spans_before = document.spans.len();
    document
        .spans
        .retain(|s| s.range().fits(text_len) && seen.insert(s.id));
    let bad_spans = spans_before - document.spans.len();
    if bad_spans > 0 {
        warn!(doc_id = ?document.id, dropped = bad_spans, "invalid spans dropped on load");
    }

    let relations_before = document.relations.len();
    document.relations.retain(|r| r.from_id != r.to_id);
    let self_loops = relations_before - document.relations.len();
    if self_loops > 0 {
        warn!(doc_id = ?document.id, dropped = self_loops, "self-loop relations dropped on load");
    }

    bad_spans + self_loops + drop_dangling_relations(document)
}

/// Give every id-less document the next free id. Returns all ids in order.
pub fn assign_record_ids(documents: &mut [Document]) -> Vec<i64> {
    let mut next = documents.iter().filter_map(|d| d.id).max().unwrap_or(0) + 1;
    documents
        .iter_mut()
        .map(|doc| match doc.id {
            Some(id) => id,
            None => {
                doc.id = Some(next);
                next += 1;
                next - 1
            }
        })
        .collect()
}

/// In-memory backend for tests and demos
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    projects: HashMap<String, LoadedProject>,
    records: Vec<(String, Document)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project_id: &str, project: LoadedProject) -> Self {
        self.projects.insert(project_id.to_string(), project);
        self
    }

    pub fn project(&self, project_id: &str) -> Option<&LoadedProject> {
        self.projects.get(project_id)
    }

    /// Records appended through [`ProjectStore::save_one_record`]
    pub fn records(&self) -> &[(String, Document)] {
        &self.records
    }
}

impl ProjectStore for MemoryStore {
    fn load_documents(&mut self, project_id: &str) -> Result<LoadedProject> {
        let mut project = self
            .projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))?;
        for doc in &mut project.documents {
            sanitize_document(doc);
        }
        Ok(project)
    }

    fn save_documents(
        &mut self,
        project_id: &str,
        config: &ProjectConfig,
        documents: &[Document],
    ) -> Result<Vec<i64>> {
        let mut documents = documents.to_vec();
        let ids = assign_record_ids(&mut documents);
        debug!(project_id, count = documents.len(), "project saved in memory");
        self.projects.insert(
            project_id.to_string(),
            LoadedProject {
                config: config.clone(),
                documents,
            },
        );
        Ok(ids)
    }

    fn save_one_record(&mut self, project_id: &str, document: &Document) -> Result<()> {
        self.records.push((project_id.to_string(), document.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Relation, Span, TextRange};

    fn annotated() -> Document {
        let mut doc = Document::new("Mike lives in America.");
        doc.spans.push(Span::new(SpanId(1), TextRange::new(0, 4), "PER"));
        doc.spans.push(Span::new(SpanId(2), TextRange::new(14, 21), "LOC"));
        doc.relations.push(Relation::new(SpanId(1), SpanId(2), "LOCATED_IN"));
        doc.relations.push(Relation::new(SpanId(1), SpanId(9), "WORKS_AT"));
        doc
    }

    #[test]
    fn test_drop_dangling_relations() {
        let mut doc = annotated();
        assert_eq!(drop_dangling_relations(&mut doc), 1);
        assert_eq!(doc.relations, vec![Relation::new(SpanId(1), SpanId(2), "LOCATED_IN")]);
    }

    #[test]
    fn test_sanitize_document() {
        let mut doc = annotated();
        doc.spans.push(Span::new(SpanId(3), TextRange::new(15, 40), "LOC"));
        doc.spans.push(Span::new(SpanId(4), TextRange::new(5, 5), "LOC"));
        doc.spans.push(Span::new(SpanId(1), TextRange::new(5, 10), "ORG"));
        doc.relations.push(Relation::new(SpanId(2), SpanId(2), "LOCATED_IN"));
        doc.relations.push(Relation::new(SpanId(3), SpanId(1), "WORKS_AT"));

        // three spans, one self-loop and two dangling relations
        assert_eq!(sanitize_document(&mut doc), 6);
        assert_eq!(
            doc.spans.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![SpanId(1), SpanId(2)]
        );
        assert_eq!(doc.spans[0].label, "PER");
        assert_eq!(doc.relations, vec![Relation::new(SpanId(1), SpanId(2), "LOCATED_IN")]);
        assert_eq!(sanitize_document(&mut doc), 0);
    }

    #[test]
    fn test_assign_record_ids() {
        let mut docs = vec![Document::new("a"), Document::new("b"), Document::new("c")];
        docs[1].id = Some(7);
        assert_eq!(assign_record_ids(&mut docs), vec![8, 7, 9]);
        assert_eq!(docs[0].id, Some(8));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        let config = ProjectConfig::default();
        let ids = store
            .save_documents("demo", &config, &[annotated(), Document::new("second")])
            .unwrap();
        assert_eq!(ids, vec![1, 2]);

        let loaded = store.load_documents("demo").unwrap();
        assert_eq!(loaded.config, config);
        assert_eq!(loaded.documents.len(), 2);
        assert_eq!(loaded.documents[0].relations.len(), 1);
        assert_eq!(loaded.documents[1].id, Some(2));
    }

    #[test]
    fn test_missing_project() {
        let mut store = MemoryStore::new();
        let err = store.load_documents("nope").unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(id) if id == "nope"));
    }

    #[test]
    fn test_save_one_record_appends() {
        let mut store = MemoryStore::new();
        store.save_one_record("demo", &annotated()).unwrap();
        store.save_one_record("demo", &Document::new("x")).unwrap();
        assert_eq!(store.records().len(), 2);
        assert_eq!(store.records()[1].1.text, "x");
    }
}
