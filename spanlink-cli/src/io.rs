//! File I/O for native CLI

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use spanlink_core::persistence::{assign_record_ids, sanitize_document};
use spanlink_core::{split_text, Document, Error, LoadedProject, ProjectConfig, ProjectStore, SplitStrategy};

/// Read a text file and split it into document units.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn load_units(path: &Path, strategy: SplitStrategy) -> Result<Vec<String>> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    let units = split_text(&text, strategy);
    info!(path = %path.display(), units = units.len(), %strategy, "file split for import");
    Ok(units)
}

/// Create `dir` if needed and return it
pub fn ensure_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    Ok(dir.to_path_buf())
}

/// Write an export under `<data_dir>/exports`
pub fn write_export(data_dir: &Path, file_name: &str, content: &str) -> Result<PathBuf> {
    let dir = ensure_dir(&data_dir.join("exports"))?;
    let path = dir.join(file_name);
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Project storage as JSON files under a data directory.
///
/// `projects/<id>.json` holds the whole project; single records are appended
/// to `project_<id>_annotations.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn has_project(&self, project_id: &str) -> bool {
        self.project_path(project_id).exists()
    }

    fn project_path(&self, project_id: &str) -> PathBuf {
        self.root.join("projects").join(format!("{}.json", file_stem(project_id)))
    }

    fn records_path(&self, project_id: &str) -> PathBuf {
        self.root
            .join(format!("project_{}_annotations.jsonl", file_stem(project_id)))
    }
}

fn file_stem(project_id: &str) -> String {
    project_id
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

impl ProjectStore for JsonFileStore {
    fn load_documents(&mut self, project_id: &str) -> spanlink_core::Result<LoadedProject> {
        let path = self.project_path(project_id);
        if !path.exists() {
            return Err(Error::ProjectNotFound(project_id.to_string()));
        }
        let raw = fs::read_to_string(&path)?;
        let mut project: LoadedProject = serde_json::from_str(&raw)?;
        for doc in &mut project.documents {
            sanitize_document(doc);
        }
        debug!(path = %path.display(), documents = project.documents.len(), "project file read");
        Ok(project)
    }

    fn save_documents(
        &mut self,
        project_id: &str,
        config: &ProjectConfig,
        documents: &[Document],
    ) -> spanlink_core::Result<Vec<i64>> {
        let mut documents = documents.to_vec();
        let ids = assign_record_ids(&mut documents);
        let project = LoadedProject {
            config: config.clone(),
            documents,
        };

        let path = self.project_path(project_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Atomic replace
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&project)?)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), documents = ids.len(), "project file written");
        Ok(ids)
    }

    fn save_one_record(&mut self, project_id: &str, document: &Document) -> spanlink_core::Result<()> {
        fs::create_dir_all(&self.root)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.records_path(project_id))?;
        writeln!(file, "{}", serde_json::to_string(document)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanlink_core::{Relation, Span, SpanId, TextRange};

    fn annotated() -> Document {
        let mut doc = Document::new("Mike lives in America.");
        doc.spans.push(Span::new(SpanId(1), TextRange::new(0, 4), "PER"));
        doc.spans.push(Span::new(SpanId(2), TextRange::new(14, 21), "LOC"));
        doc.relations.push(Relation::new(SpanId(1), SpanId(2), "LOCATED_IN"));
        doc
    }

    #[test]
    fn test_project_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path());
        let config = ProjectConfig::default();

        let ids = store
            .save_documents("news 1", &config, &[annotated(), Document::new("Second.")])
            .unwrap();
        assert_eq!(ids, vec![1, 2]);
        assert!(dir.path().join("projects").join("news_1.json").exists());

        let loaded = store.load_documents("news 1").unwrap();
        assert_eq!(loaded.config, config);
        assert_eq!(loaded.documents[0].spans.len(), 2);
        assert_eq!(loaded.documents[0].relations.len(), 1);
        assert_eq!(loaded.documents[1].id, Some(2));
    }

    #[test]
    fn test_missing_project_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path());
        assert!(matches!(
            store.load_documents("nope"),
            Err(Error::ProjectNotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_project_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("projects")).unwrap();
        fs::write(dir.path().join("projects").join("bad.json"), "[1,2").unwrap();
        let mut store = JsonFileStore::new(dir.path());
        assert!(matches!(store.load_documents("bad"), Err(Error::Json(_))));
    }

    #[test]
    fn test_records_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path());
        store.save_one_record("demo", &annotated()).unwrap();
        store.save_one_record("demo", &Document::new("x")).unwrap();

        let raw = fs::read_to_string(dir.path().join("project_demo_annotations.jsonl")).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Document = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.spans.len(), 2);
    }

    #[test]
    fn test_load_units_splits_and_tolerates_bad_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");
        fs::write(&path, b"One. Two\xff three.\r\n").unwrap();
        let units = load_units(&path, SplitStrategy::Sentence).unwrap();
        assert_eq!(units, vec!["One.", "Two\u{fffd} three."]);
    }

    #[test]
    fn test_write_export_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(dir.path(), "project_demo.jsonl", "{}\n").unwrap();
        assert_eq!(path, dir.path().join("exports").join("project_demo.jsonl"));
        assert_eq!(fs::read_to_string(path).unwrap(), "{}\n");
    }
}
