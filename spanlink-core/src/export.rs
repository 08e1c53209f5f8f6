use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::model::{Document, ProjectConfig};

/// One JSONL line per document, in the common span/relation training layout
#[derive(Debug, Serialize)]
pub struct ExportDocument<'a> {
    pub text: &'a str,
    /// `[start, end, label]`, sorted by start
    pub labels: Vec<(usize, usize, &'a str)>,
    /// `[fromId, toId, type]`
    pub relations: Vec<(u32, u32, &'a str)>,
}

impl<'a> From<&'a Document> for ExportDocument<'a> {
    fn from(doc: &'a Document) -> Self {
        Self {
            text: &doc.text,
            labels: doc
                .spans_sorted()
                .into_iter()
                .map(|s| (s.start, s.end, s.label.as_str()))
                .collect(),
            relations: doc
                .relations
                .iter()
                .map(|r| (r.from_id.0, r.to_id.0, r.relation_type.as_str()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Jsonl,
    Tsv,
    Csv,
    /// Whole project including config
    Json,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Jsonl,
        ExportFormat::Tsv,
        ExportFormat::Csv,
        ExportFormat::Json,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn next(self) -> Self {
        match self {
            ExportFormat::Jsonl => ExportFormat::Tsv,
            ExportFormat::Tsv => ExportFormat::Csv,
            ExportFormat::Csv => ExportFormat::Json,
            ExportFormat::Json => ExportFormat::Jsonl,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportProject<'a> {
    pub config: &'a ProjectConfig,
    pub documents: &'a [Document],
}

pub fn to_jsonl<'a, I>(documents: I) -> Result<String>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut out = String::new();
    for doc in documents {
        out.push_str(&serde_json::to_string(&ExportDocument::from(doc))?);
        out.push('\n');
    }
    Ok(out)
}

/// One row per span: `doc_id,start,end,label,fragment`.
///
/// Documents without a record id use their position in the export.
pub fn to_delimited<'a, I>(documents: I, separator: char) -> String
where
    I: IntoIterator<Item = &'a Document>,
{
    let sep = separator.to_string();
    let mut out = ["doc_id", "start", "end", "label", "fragment"].join(&sep);
    out.push('\n');

    for (position, doc) in documents.into_iter().enumerate() {
        let doc_id = doc.id.unwrap_or(position as i64 + 1);
        for span in doc.spans_sorted() {
            let fragment: String = span
                .fragment(&doc.text)
                .chars()
                .map(|c| if c == separator || c == '\t' || c == '\n' || c == '\r' { ' ' } else { c })
                .collect();
            let row = [
                doc_id.to_string(),
                span.start.to_string(),
                span.end.to_string(),
                span.label.clone(),
                fragment,
            ];
            out.push_str(&row.join(&sep));
            out.push('\n');
        }
    }
    out
}

/// Full project as pretty JSON
pub fn to_json(config: &ProjectConfig, documents: &[Document]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ExportProject { config, documents })?)
}

/// Render `documents` in `format`. `Json` exports the whole project.
pub fn render(
    format: ExportFormat,
    config: &ProjectConfig,
    documents: &[&Document],
) -> Result<String> {
    match format {
        ExportFormat::Jsonl => to_jsonl(documents.iter().copied()),
        ExportFormat::Tsv => Ok(to_delimited(documents.iter().copied(), '\t')),
        ExportFormat::Csv => Ok(to_delimited(documents.iter().copied(), ',')),
        ExportFormat::Json => {
            let owned: Vec<Document> = documents.iter().map(|d| (*d).clone()).collect();
            to_json(config, &owned)
        }
    }
}

/// `project_<name>_<YYYYmmdd_HHMMSS>.<ext>`
pub fn export_file_name(project: &str, extension: &str, at: DateTime<Utc>) -> String {
    let project: String = project
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("project_{}_{}.{}", project, at.format("%Y%m%d_%H%M%S"), extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Relation, Span, SpanId, TextRange};
    use chrono::TimeZone;

    fn mike() -> Document {
        let mut doc = Document::new("Mike lives in America.");
        doc.spans.push(Span::new(SpanId(2), TextRange::new(14, 21), "LOC"));
        doc.spans.push(Span::new(SpanId(1), TextRange::new(0, 4), "PER"));
        doc.relations.push(Relation::new(SpanId(1), SpanId(2), "LOCATED_IN"));
        doc
    }

    #[test]
    fn test_jsonl_line() {
        let docs = [mike()];
        let out = to_jsonl(&docs).unwrap();
        assert_eq!(
            out,
            "{\"text\":\"Mike lives in America.\",\"labels\":[[0,4,\"PER\"],[14,21,\"LOC\"]],\"relations\":[[1,2,\"LOCATED_IN\"]]}\n"
        );
    }

    #[test]
    fn test_delimited_rows() {
        let mut doc = mike();
        doc.id = Some(7);
        let out = to_delimited([&doc], '\t');
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "doc_id\tstart\tend\tlabel\tfragment");
        assert_eq!(lines[1], "7\t0\t4\tPER\tMike");
        assert_eq!(lines[2], "7\t14\t21\tLOC\tAmerica");
    }

    #[test]
    fn test_delimited_sanitizes_fragments() {
        let mut doc = Document::new("a,b\nc");
        doc.spans.push(Span::new(SpanId(1), TextRange::new(0, 5), "ORG"));
        let out = to_delimited([&doc], ',');
        assert_eq!(out.lines().nth(1), Some("1,0,5,ORG,a b c"));
    }

    #[test]
    fn test_project_json() {
        let json = to_json(&ProjectConfig::default(), &[mike()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["config"]["labels"][0], "PER");
        assert_eq!(value["documents"][0]["relations"][0]["fromId"], 1);
    }

    #[test]
    fn test_render_formats() {
        let doc = mike();
        let config = ProjectConfig::default();
        let csv = render(ExportFormat::Csv, &config, &[&doc]).unwrap();
        assert!(csv.starts_with("doc_id,start,end,label,fragment\n"));
        let jsonl = render(ExportFormat::Jsonl, &config, &[&doc]).unwrap();
        assert_eq!(jsonl.lines().count(), 1);
        assert_eq!(ExportFormat::Json.next(), ExportFormat::Jsonl);
    }

    #[test]
    fn test_export_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(export_file_name("2", "jsonl", at), "project_2_20240101_120000.jsonl");
        assert_eq!(export_file_name("my news", "tsv", at), "project_my_news_20240101_120000.tsv");
    }
}
