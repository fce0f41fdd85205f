#![allow(dead_code)]

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::PathBuf;
use tempfile::TempDir;

pub fn db_path(home: &TempDir) -> PathBuf {
    home.path().join(".papertrade").join("data.db")
}

pub fn open_conn(home: &TempDir) -> Result<Connection> {
    let path = db_path(home);
    Connection::open(path).context("failed to open test database")
}

/// Active lot rows of a pair as (quantity, total_investment) text
pub fn active_lots(
    conn: &Connection,
    portfolio_id: &str,
    asset_id: &str,
) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT quantity, total_investment FROM positions
         WHERE portfolio_id = ?1 AND asset_id = ?2 AND deleted_at IS NULL
         ORDER BY seq",
    )?;
    let rows = stmt.query_map([portfolio_id, asset_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

pub fn count_rows(conn: &Connection, table: &str, include_deleted: bool) -> Result<i64> {
    let sql = if include_deleted {
        format!("SELECT COUNT(*) FROM {}", table)
    } else {
        format!("SELECT COUNT(*) FROM {} WHERE deleted_at IS NULL", table)
    };
    let count = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count)
}
