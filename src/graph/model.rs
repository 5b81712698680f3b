//! Plain node and edge records exchanged with persistence and the HTTP layer

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Attribute map of a node or edge
pub type Attributes = serde_json::Map<String, Value>;

/// Attribute key holding an edge's relation label
pub const RELATION: &str = "relation";

/// A node: identifier plus attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(deserialize_with = "identifier")]
    pub id: String,

    #[serde(flatten)]
    pub attributes: Attributes,
}

/// An edge: both endpoints plus attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    #[serde(deserialize_with = "identifier")]
    pub source: String,

    #[serde(deserialize_with = "identifier")]
    pub target: String,

    #[serde(flatten)]
    pub attributes: Attributes,
}

impl EdgeRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            attributes,
        }
    }

    /// The edge's relation label, if it has one
    pub fn relation(&self) -> Option<&str> {
        self.attributes.get(RELATION).and_then(Value::as_str)
    }
}

/// Build an attribute map holding just a relation label
pub fn relation_attributes(relation: &str) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(RELATION.to_string(), Value::String(relation.to_string()));
    attributes
}

/// Node-link documents written by other tools may use numeric identifiers.
fn identifier<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "identifier must be a string or number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_record_flattens_attributes() {
        let node: NodeRecord = serde_json::from_value(json!({
            "id": "Descartes",
            "school": "Rationalism",
            "label": "René Descartes (1596-1650)"
        }))
        .unwrap();

        assert_eq!(node.id, "Descartes");
        assert_eq!(node.attributes["school"], "Rationalism");
        assert_eq!(node.attributes.len(), 2);
    }

    #[test]
    fn test_numeric_identifiers_are_accepted() {
        let edge: EdgeRecord =
            serde_json::from_value(json!({"source": 1, "target": "two", "relation": "debated"}))
                .unwrap();
        assert_eq!(edge.source, "1");
        assert_eq!(edge.relation(), Some("debated"));
    }

    #[test]
    fn test_object_identifier_is_rejected() {
        let result = serde_json::from_value::<NodeRecord>(json!({"id": {"nested": true}}));
        assert!(result.is_err());
    }
}
