use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Header-ordered sequence of a record's values, ready for tabular output.
pub type Row = Vec<String>;

/// One logical input item as a field-name-to-value mapping.
///
/// Values are plain strings; non-string JSON scalars are rendered to their
/// JSON text when the record is built from the input document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    pub fields: HashMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    pub fn from_json_object(obj: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut fields = HashMap::new();
        for (key, value) in obj {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            fields.insert(key.clone(), rendered);
        }
        Self { fields }
    }
}

/// A row that completed the broker round trip, paired with the correlation
/// identifier read back by the consumer. The identifier is the only record
/// of the message's identity that survives into the output file.
#[derive(Debug, Clone)]
pub struct RelayedRow {
    pub values: Row,
    pub message_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub relayed: Vec<RelayedRow>,
}
