//! Disc info cache query operations.

use rusqlite::{params, Connection};
use ripvault_common::{DiscInfo, Error, Result};

/// Insert or replace the cached table of contents for a disc.
pub fn upsert_disc_info(conn: &Connection, uuid: &str, info: &DiscInfo) -> Result<()> {
    let json = serde_json::to_string(info)?;
    conn.execute(
        "INSERT INTO disc_info (uuid, info_json) VALUES (?1, ?2)
         ON CONFLICT(uuid) DO UPDATE SET info_json = excluded.info_json",
        params![uuid, json],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Get the cached table of contents for a disc.
pub fn get_disc_info(conn: &Connection, uuid: &str) -> Result<Option<DiscInfo>> {
    let json: String = match conn.query_row(
        "SELECT info_json FROM disc_info WHERE uuid = ?",
        [uuid],
        |row| row.get(0),
    ) {
        Ok(json) => json,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(Error::database(e.to_string())),
    };
    Ok(Some(serde_json::from_str(&json)?))
}

/// List every cached disc.
pub fn list_disc_info(conn: &Connection) -> Result<Vec<(String, DiscInfo)>> {
    let mut stmt = conn
        .prepare("SELECT uuid, info_json FROM disc_info ORDER BY uuid")
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(|e| Error::database(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        let (uuid, json) = row.map_err(|e| Error::database(e.to_string()))?;
        out.push((uuid, serde_json::from_str(&json)?));
    }
    Ok(out)
}
