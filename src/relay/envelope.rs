//! Wire format for relayed rows.
//!
//! A message body is a UTF-8 JSON object with exactly one key: the
//! correlation identifier in hyphenated form, whose value is the row as a
//! string array.

use crate::domain::model::Row;
use crate::utils::error::{EtlError, Result};
use uuid::Uuid;

pub fn encode(message_id: &Uuid, row: &[String]) -> Result<Vec<u8>> {
    let mut body = serde_json::Map::new();
    body.insert(message_id.to_string(), serde_json::to_value(row)?);
    Ok(serde_json::to_vec(&serde_json::Value::Object(body))?)
}

pub fn decode(payload: &[u8]) -> Result<(Uuid, Row)> {
    let body: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(payload)?;
    let (key, value) = body.into_iter().next().ok_or_else(|| EtlError::ProcessingError {
        message: "relay message body is empty".to_string(),
    })?;
    let message_id = Uuid::parse_str(&key).map_err(|e| EtlError::ProcessingError {
        message: format!("relay message key is not a UUID: {}", e),
    })?;
    let row: Row = serde_json::from_value(value)?;
    Ok((message_id, row))
}
