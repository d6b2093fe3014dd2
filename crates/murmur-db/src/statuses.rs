use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};
use murmur_models::visibility::Visibility;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StatusRow {
    pub id: i64,
    pub account_id: i64,
    pub uri: Option<String>,
    pub visibility: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl StatusRow {
    /// Unrecognised stored values are treated as `direct`, the most restrictive level.
    pub fn visibility(&self) -> Visibility {
        self.visibility.parse().unwrap_or(Visibility::Direct)
    }
}

pub async fn create_status(
    pool: &DbPool,
    id: i64,
    account_id: i64,
    visibility: Visibility,
    uri: Option<&str>,
    content: &str,
) -> Result<StatusRow, DbError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "INSERT INTO statuses (id, account_id, uri, visibility, content)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING id, account_id, uri, visibility, content, created_at",
    )
    .bind(id)
    .bind(account_id)
    .bind(uri)
    .bind(visibility.as_str())
    .bind(content)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_status(pool: &DbPool, id: i64) -> Result<Option<StatusRow>, DbError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT id, account_id, uri, visibility, content, created_at
         FROM statuses WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn add_mention(pool: &DbPool, status_id: i64, account_id: i64) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO mentions (status_id, account_id)
         VALUES (?1, ?2)
         ON CONFLICT (status_id, account_id) DO NOTHING",
    )
    .bind(status_id)
    .bind(account_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn is_mentioned(pool: &DbPool, status_id: i64, account_id: i64) -> Result<bool, DbError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM mentions WHERE status_id = ?1 AND account_id = ?2 LIMIT 1",
    )
    .bind(status_id)
    .bind(account_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}
