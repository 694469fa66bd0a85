//! Pure per-record reshaping: rename, split, stamp, retain, project.
//!
//! Everything here mutates a single `Record` in place or reads it out into
//! a row; no I/O, no shared state.

use crate::domain::model::{Record, Row};
use crate::utils::error::{EtlError, Result};

/// Rename fields in sequence order, left to right. A later rename may
/// depend on the result of an earlier one.
pub fn rename(record: &mut Record, rename_from: &[String], rename_to: &[String]) -> Result<()> {
    for (from, to) in rename_from.iter().zip(rename_to) {
        let value = record
            .fields
            .remove(from)
            .ok_or_else(|| EtlError::MissingFieldError {
                field: from.clone(),
            })?;
        record.fields.insert(to.clone(), value);
    }
    Ok(())
}

/// Split source fields into destination fields.
///
/// For each index i, the value of `split_from[i]` is stripped of newlines
/// and split by `splitter[i]`; an empty delimiter splits on whitespace,
/// collapsing runs. `split_to[i]` is a comma-joined destination list that
/// is consumed from the end: the last destination name takes the last
/// split part, and so on, with leftmost destinations padded with `""`
/// once parts run out. Parts beyond the destination count are dropped.
pub fn split(
    record: &mut Record,
    split_from: &[String],
    split_to: &[String],
    splitters: &[String],
) -> Result<()> {
    for ((from, to), delimiter) in split_from.iter().zip(split_to).zip(splitters) {
        let value = record
            .fields
            .remove(from)
            .ok_or_else(|| EtlError::MissingFieldError {
                field: from.clone(),
            })?;
        let value = value.replace('\n', "");

        let mut parts: Vec<String> = if delimiter.is_empty() {
            value.split_whitespace().map(str::to_string).collect()
        } else {
            value.split(delimiter.as_str()).map(str::to_string).collect()
        };

        let mut destinations: Vec<&str> = to.split(',').collect();
        while let Some(destination) = destinations.pop() {
            let part = parts.pop().unwrap_or_default();
            record.fields.insert(destination.to_string(), part);
        }
    }
    Ok(())
}

/// Unconditionally set a field, overwriting any existing value.
pub fn stamp(record: &mut Record, name: &str, value: &str) {
    record.fields.insert(name.to_string(), value.to_string());
}

/// Drop every field whose name is not in the header. Absent header fields
/// are not an error here; projection reports them.
pub fn retain_header(record: &mut Record, header: &[String]) {
    record.fields.retain(|key, _| header.contains(key));
}

/// Read the record out into a row, one value per header column in header
/// order.
pub fn project(record: &Record, header: &[String]) -> Result<Row> {
    header
        .iter()
        .map(|column| {
            record
                .fields
                .get(column)
                .cloned()
                .ok_or_else(|| EtlError::MissingColumnError {
                    column: column.clone(),
                })
        })
        .collect()
}
