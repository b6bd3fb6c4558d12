//! Workflow query operations.
//!
//! One row per (disc, title). Saves are single-statement upserts, so each
//! key is updated atomically.

use std::collections::BTreeMap;

use rusqlite::{params, Connection, Row};
use ripvault_common::{Error, IngestOutcome, MkvFile, Result, Workflow, WorkflowStatus};

use super::json_column;

const SELECT_COLUMNS: &str = "SELECT disc_id, title_id, label, original_name, status, imdb_id, \
                              name, year, file_json, ingest_json FROM workflows";

fn row_to_workflow(row: &Row<'_>) -> rusqlite::Result<Workflow> {
    let status: String = row.get(4)?;
    let status = status.parse::<WorkflowStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(Error::parse(e)),
        )
    })?;
    let file: Option<MkvFile> = json_column(row, 8)?;
    let ingest: Option<BTreeMap<String, IngestOutcome>> = json_column(row, 9)?;

    Ok(Workflow {
        disc_id: row.get(0)?,
        title_id: row.get(1)?,
        label: row.get(2)?,
        original_name: row.get(3)?,
        status,
        imdb_id: row.get(5)?,
        name: row.get(6)?,
        year: row.get(7)?,
        file,
        ingest: ingest.unwrap_or_default(),
    })
}

/// Insert or update a workflow.
pub fn upsert_workflow(conn: &Connection, wf: &Workflow) -> Result<()> {
    let file_json = wf.file.as_ref().map(serde_json::to_string).transpose()?;
    let ingest_json = if wf.ingest.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&wf.ingest)?)
    };

    conn.execute(
        "INSERT INTO workflows (disc_id, title_id, label, original_name, status, imdb_id, name, year, file_json, ingest_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(disc_id, title_id) DO UPDATE SET
             label = excluded.label,
             original_name = excluded.original_name,
             status = excluded.status,
             imdb_id = excluded.imdb_id,
             name = excluded.name,
             year = excluded.year,
             file_json = excluded.file_json,
             ingest_json = excluded.ingest_json",
        params![
            wf.disc_id,
            wf.title_id,
            wf.label,
            wf.original_name,
            wf.status.to_string(),
            wf.imdb_id,
            wf.name,
            wf.year,
            file_json,
            ingest_json,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// List every workflow ordered by key.
pub fn list_workflows(conn: &Connection) -> Result<Vec<Workflow>> {
    let mut stmt = conn
        .prepare(&format!("{} ORDER BY disc_id, title_id", SELECT_COLUMNS))
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map([], row_to_workflow)
        .map_err(|e| Error::database(e.to_string()))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}
