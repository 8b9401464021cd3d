//! Database module for SQLite persistence
//!
//! Saves and loads highlight records. The in-memory store stays the source
//! of truth while annotating; hosts load a scope into it and write changes
//! back through [`HighlightRepository`].

mod highlights;

pub use highlights::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::Result;

/// Create a connection pool and make sure the schema exists
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    HighlightRepository::new(&pool).init().await?;

    Ok(pool)
}
