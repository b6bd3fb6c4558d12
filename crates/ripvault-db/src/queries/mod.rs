//! Database query modules.
//!
//! - workflows: workflow lifecycle records
//! - disc_info: disc table of contents cache

pub mod disc_info;
pub mod workflows;

use rusqlite::Row;
use serde::de::DeserializeOwned;

/// Decode a nullable JSON text column.
fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|s| {
        serde_json::from_str(&s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}
