//! Highlights database operations

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::anchor::Anchor;
use crate::error::{HighlightError, Result};
use crate::highlights::{Highlight, ScopeKey, Section};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS highlights (
    id TEXT PRIMARY KEY,
    submission_id TEXT NOT NULL,
    question_index INTEGER NOT NULL,
    section TEXT NOT NULL,
    color TEXT NOT NULL,
    text TEXT NOT NULL,
    comment TEXT,
    start_container_path TEXT NOT NULL,
    start_offset INTEGER NOT NULL,
    end_container_path TEXT NOT NULL,
    end_offset INTEGER NOT NULL,
    container_selector TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_highlights_scope
    ON highlights(submission_id, question_index, section);
"#;

/// Row as stored; paths are JSON arrays
#[derive(Debug, Clone, sqlx::FromRow)]
struct HighlightRow {
    id: String,
    submission_id: String,
    question_index: i64,
    section: String,
    color: String,
    text: String,
    comment: Option<String>,
    start_container_path: String,
    start_offset: i64,
    end_container_path: String,
    end_offset: i64,
    container_selector: String,
    created_at: String,
    updated_at: String,
}

impl HighlightRow {
    fn into_highlight(self) -> Result<Highlight> {
        let section: Section = self.section.parse().map_err(HighlightError::InvalidRecord)?;
        Ok(Highlight {
            scope: ScopeKey::new(&self.submission_id, to_index(self.question_index)?, section),
            color: self.color,
            text: self.text,
            comment: self.comment,
            anchor: Anchor {
                start_container_path: serde_json::from_str(&self.start_container_path)?,
                start_offset: to_index(self.start_offset)?,
                end_container_path: serde_json::from_str(&self.end_container_path)?,
                end_offset: to_index(self.end_offset)?,
            },
            container_selector: self.container_selector,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            id: self.id,
        })
    }
}

fn to_index<T: TryFrom<i64>>(value: i64) -> Result<T> {
    T::try_from(value).map_err(|_| HighlightError::InvalidRecord(format!("negative or oversized index {}", value)))
}

fn to_column(value: usize) -> Result<i64> {
    i64::try_from(value).map_err(|_| HighlightError::InvalidRecord(format!("offset {} too large", value)))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| HighlightError::InvalidRecord(format!("invalid timestamp {}: {}", value, e)))
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, submission_id, question_index, section, color, text, comment,
           start_container_path, start_offset, end_container_path, end_offset,
           container_selector, created_at, updated_at
    FROM highlights
"#;

/// Highlight repository
pub struct HighlightRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> HighlightRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the table and scope index if missing
    pub async fn init(&self) -> Result<()> {
        for statement in SCHEMA_SQL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(self.pool).await?;
        }
        Ok(())
    }

    /// Insert or update a highlight record
    pub async fn save(&self, highlight: &Highlight) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO highlights (id, submission_id, question_index, section, color, text, comment,
                                    start_container_path, start_offset, end_container_path, end_offset,
                                    container_selector, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                comment = excluded.comment,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&highlight.id)
        .bind(&highlight.scope.submission_id)
        .bind(i64::from(highlight.scope.question_index))
        .bind(highlight.scope.section.as_str())
        .bind(&highlight.color)
        .bind(&highlight.text)
        .bind(&highlight.comment)
        .bind(serde_json::to_string(&highlight.anchor.start_container_path)?)
        .bind(to_column(highlight.anchor.start_offset)?)
        .bind(serde_json::to_string(&highlight.anchor.end_container_path)?)
        .bind(to_column(highlight.anchor.end_offset)?)
        .bind(&highlight.container_selector)
        .bind(highlight.created_at.to_rfc3339())
        .bind(highlight.updated_at.to_rfc3339())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Get a specific highlight
    pub async fn get(&self, id: &str) -> Result<Option<Highlight>> {
        let row = sqlx::query_as::<_, HighlightRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(HighlightRow::into_highlight).transpose()
    }

    /// List highlights for a scope in creation order
    pub async fn list_for_scope(&self, scope: &ScopeKey) -> Result<Vec<Highlight>> {
        let rows = sqlx::query_as::<_, HighlightRow>(&format!(
            "{} WHERE submission_id = ? AND question_index = ? AND section = ? ORDER BY created_at ASC, rowid ASC",
            SELECT_COLUMNS
        ))
        .bind(&scope.submission_id)
        .bind(i64::from(scope.question_index))
        .bind(scope.section.as_str())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(HighlightRow::into_highlight).collect()
    }

    /// Delete the listed highlights; absent ids are ignored
    pub async fn delete_many(&self, ids: &[String]) -> Result<u64> {
        let mut deleted = 0;
        for id in ids {
            let result = sqlx::query("DELETE FROM highlights WHERE id = ?")
                .bind(id)
                .execute(self.pool)
                .await?;
            deleted += result.rows_affected();
        }
        Ok(deleted)
    }

    /// Delete every highlight of a submission
    pub async fn delete_for_submission(&self, submission_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM highlights WHERE submission_id = ?")
            .bind(submission_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
