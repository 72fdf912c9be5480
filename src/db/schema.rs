use rusqlite::Connection;

use crate::error::{IndexerError, Result};

const SCHEMA_VERSION: i64 = 1;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
        INSERT OR IGNORE INTO schema_version VALUES (1);

        CREATE TABLE IF NOT EXISTS events (
            network TEXT NOT NULL,
            contract_name TEXT NOT NULL,
            address TEXT NOT NULL,
            block_hash TEXT NOT NULL,
            block_number INTEGER NOT NULL,
            transaction_hash TEXT NOT NULL,
            transaction_index INTEGER NOT NULL,
            log_index INTEGER NOT NULL,
            event_name TEXT NOT NULL,
            arg0 TEXT,
            arg1 TEXT,
            arg2 TEXT,
            arg3 TEXT,
            arg4 TEXT,
            arg5 TEXT,
            arg6 TEXT,
            arg7 TEXT,
            arg8 TEXT,
            arg9 TEXT
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_events_identity
            ON events(network, transaction_hash, log_index);
        CREATE INDEX IF NOT EXISTS idx_events_contract_block
            ON events(network, address, block_number);

        CREATE TABLE IF NOT EXISTS notifications (
            network TEXT NOT NULL,
            transaction_hash TEXT NOT NULL,
            log_index INTEGER NOT NULL,
            platform TEXT NOT NULL,
            UNIQUE(network, transaction_hash, log_index, platform)
        );
        "#,
    )?;

    let version: i64 = conn.query_row(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    )?;

    tracing::info!(schema_version = version, "Database initialized");
    if version != SCHEMA_VERSION {
        return Err(IndexerError::Schema(format!(
            "database is at schema version {version}, expected {SCHEMA_VERSION}"
        )));
    }

    Ok(())
}
