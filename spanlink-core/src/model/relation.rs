use serde::{Deserialize, Serialize};

use super::SpanId;

/// A directed, typed edge between two spans
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Relation {
    #[serde(rename = "fromId")]
    pub from_id: SpanId,
    #[serde(rename = "toId")]
    pub to_id: SpanId,
    #[serde(rename = "type")]
    pub relation_type: String,
}

impl Relation {
    pub fn new(from_id: SpanId, to_id: SpanId, relation_type: impl Into<String>) -> Self {
        Self {
            from_id,
            to_id,
            relation_type: relation_type.into(),
        }
    }

    pub fn touches(&self, id: SpanId) -> bool {
        self.from_id == id || self.to_id == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_camel_case_wire_names() {
        let rel = Relation::new(SpanId(1), SpanId(2), "LOCATED_IN");
        let json = serde_json::to_string(&rel).unwrap();
        assert_eq!(json, r#"{"fromId":1,"toId":2,"type":"LOCATED_IN"}"#);

        let back: Relation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rel);
    }
}
