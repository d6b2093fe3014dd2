use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub account_id: i64,
    pub email: String,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
}

pub async fn create_user(
    pool: &DbPool,
    id: i64,
    account_id: i64,
    email: &str,
) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (id, account_id, email)
         VALUES (?1, ?2, ?3)
         RETURNING id, account_id, email, disabled, created_at",
    )
    .bind(id)
    .bind(account_id)
    .bind(normalize_email(email))
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_user_by_id(pool: &DbPool, id: i64) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, account_id, email, disabled, created_at
         FROM users WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn set_disabled(pool: &DbPool, id: i64, disabled: bool) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE users SET disabled = ?2 WHERE id = ?1")
        .bind(id)
        .bind(disabled)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_and_disable_user() {
        let pool = crate::test_pool().await;
        crate::accounts::create_account(&pool, 10, "alice", None, "")
            .await
            .unwrap();
        let user = create_user(&pool, 1, 10, " Alice@Example.com ").await.unwrap();
        assert_eq!(user.account_id, 10);
        assert_eq!(user.email, "alice@example.com");
        assert!(!user.disabled);

        set_disabled(&pool, 1, true).await.unwrap();
        let user = get_user_by_id(&pool, 1).await.unwrap().unwrap();
        assert!(user.disabled);
    }

    #[tokio::test]
    async fn one_user_per_account() {
        let pool = crate::test_pool().await;
        crate::accounts::create_account(&pool, 10, "alice", None, "")
            .await
            .unwrap();
        create_user(&pool, 1, 10, "a@example.com").await.unwrap();
        assert!(create_user(&pool, 2, 10, "b@example.com").await.is_err());
    }
}
