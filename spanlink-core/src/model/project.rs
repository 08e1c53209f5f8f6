use serde::{Deserialize, Serialize};

/// Whether new spans may intersect existing ones
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    #[default]
    Allow,
    Reject,
}

/// Label and relation-type vocabularies of a project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    pub name: String,
    pub labels: Vec<String>,
    pub relation_types: Vec<String>,
    #[serde(default)]
    pub overlap: OverlapPolicy,
}

const SEPARATORS: &[char] = &[',', ';', '，', '；'];

impl ProjectConfig {
    pub fn new(
        name: impl Into<String>,
        labels: impl IntoIterator<Item = impl AsRef<str>>,
        relation_types: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        Self {
            name: name.into(),
            labels: normalize_vocabulary(labels),
            relation_types: normalize_vocabulary(relation_types),
            overlap: OverlapPolicy::default(),
        }
    }

    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    /// Split a user-typed list on ASCII and full-width commas/semicolons
    pub fn parse_vocabulary(input: &str) -> Vec<String> {
        normalize_vocabulary(input.split(SEPARATORS))
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn has_relation_type(&self, relation_type: &str) -> bool {
        self.relation_types.iter().any(|t| t == relation_type)
    }

    /// Nth label, zero-based
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn relation_type(&self, index: usize) -> Option<&str> {
        self.relation_types.get(index).map(String::as_str)
    }

    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn relation_type_index(&self, relation_type: &str) -> Option<usize> {
        self.relation_types.iter().position(|t| t == relation_type)
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self::new(
            "Demo",
            ["PER", "LOC", "ORG"],
            ["LOCATED_IN", "WORKS_AT", "FOUNDED_IN"],
        )
    }
}

/// Trim, drop empties and deduplicate, keeping first occurrences in order
fn normalize_vocabulary(items: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.as_ref().trim();
        if !item.is_empty() && !out.iter().any(|existing| existing == item) {
            out.push(item.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_separators() {
        let labels = ProjectConfig::parse_vocabulary(" PER, LOC；ORG ;，PER");
        assert_eq!(labels, vec!["PER", "LOC", "ORG"]);
    }

    #[test]
    fn constructor_normalizes() {
        let config = ProjectConfig::new("p", ["A", " A ", "", "B"], Vec::<String>::new());
        assert_eq!(config.labels, vec!["A", "B"]);
        assert!(config.relation_types.is_empty());
        assert!(config.has_label("B"));
        assert!(!config.has_label(" A "));
    }

    #[test]
    fn overlap_defaults_to_allow_when_absent() {
        let config: ProjectConfig =
            serde_json::from_str(r#"{"name":"x","labels":["A"],"relation_types":[]}"#).unwrap();
        assert_eq!(config.overlap, OverlapPolicy::Allow);
    }
}
