// Database module - SQLite connection, schema and column helpers

pub mod models;
pub mod repository;

use anyhow::{Context, Result};
use rusqlite::types::{Type, ValueRef};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

pub use models::{
    Asset, NewTransaction, OrderType, Portfolio, PortfolioUpdate, Position, PositionRow,
    Transaction, TransactionRow, TransactionStatus, TransactionType, TransactionUpdate,
};
pub use repository::{LedgerRepository, SqliteLedger};

/// Get the application directory (~/.papertrade), creating it if needed
pub fn get_app_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let app_dir = PathBuf::from(home).join(".papertrade");

    std::fs::create_dir_all(&app_dir).context("Failed to create .papertrade directory")?;

    Ok(app_dir)
}

/// Get the default database path (~/.papertrade/data.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    Ok(get_app_dir()?.join("data.db"))
}

/// Open database connection
pub fn open_db(path: &Path) -> Result<Connection> {
    let conn =
        Connection::open(path).with_context(|| format!("Failed to open database at {:?}", path))?;

    conn.execute_batch("PRAGMA foreign_keys = ON")
        .context("Failed to enable foreign keys")?;

    Ok(conn)
}

/// Initialize the database with schema and return an open connection.
///
/// The schema uses `IF NOT EXISTS` throughout, so this is safe to call on
/// every start.
pub fn init_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {:?}", parent))?;
        }
    }

    info!("Initializing database at: {:?}", path);

    let conn = open_db(path)?;
    apply_schema(&conn)?;

    Ok(conn)
}

/// Run the schema SQL against an already-open connection
pub fn apply_schema(conn: &Connection) -> Result<()> {
    let schema_sql = include_str!("schema.sql");
    conn.execute_batch(schema_sql)
        .context("Failed to execute schema")?;
    Ok(())
}

fn conversion_error(
    idx: usize,
    ty: Type,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

/// Helper to read Decimal from SQLite (handles both INTEGER and TEXT)
pub fn get_decimal_value(row: &rusqlite::Row, idx: usize) -> Result<Decimal, rusqlite::Error> {
    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes).map_err(|e| conversion_error(idx, Type::Text, e))?;
            Decimal::from_str(s).map_err(|e| conversion_error(idx, Type::Text, e))
        }
        ValueRef::Integer(i) => Ok(Decimal::from(i)),
        ValueRef::Real(f) => Decimal::try_from(f).map_err(|e| conversion_error(idx, Type::Real, e)),
        ValueRef::Null => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "decimal".to_string(),
            Type::Null,
        )),
        ValueRef::Blob(_) => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "decimal".to_string(),
            Type::Blob,
        )),
    }
}

/// Helper to read optional Decimal from SQLite
pub fn get_optional_decimal_value(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<Option<Decimal>, rusqlite::Error> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        _ => get_decimal_value(row, idx).map(Some),
    }
}

/// Helper to read a UUID stored as TEXT
pub fn get_uuid_value(row: &rusqlite::Row, idx: usize) -> Result<Uuid, rusqlite::Error> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| conversion_error(idx, Type::Text, e))
}

/// Helper to read an enum column stored as its `as_str()` text
pub fn get_enum_value<T: FromStr>(row: &rusqlite::Row, idx: usize) -> Result<T, rusqlite::Error> {
    let text: String = row.get(idx)?;
    text.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(idx, format!("unknown value '{}'", text), Type::Text)
    })
}
