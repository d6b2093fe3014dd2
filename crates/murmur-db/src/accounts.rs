use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub username: String,
    pub domain: Option<String>,
    pub uri: String,
    pub suspended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccountRow {
    /// Accounts without a domain live on this instance.
    pub fn is_local(&self) -> bool {
        self.domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .is_none()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }
}

pub async fn create_account(
    pool: &DbPool,
    id: i64,
    username: &str,
    domain: Option<&str>,
    uri: &str,
) -> Result<AccountRow, DbError> {
    let domain = domain.map(str::trim).filter(|d| !d.is_empty());
    let row = sqlx::query_as::<_, AccountRow>(
        "INSERT INTO accounts (id, username, domain, uri)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING id, username, domain, uri, suspended_at, created_at",
    )
    .bind(id)
    .bind(username)
    .bind(domain)
    .bind(uri)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_account(pool: &DbPool, id: i64) -> Result<Option<AccountRow>, DbError> {
    let row = sqlx::query_as::<_, AccountRow>(
        "SELECT id, username, domain, uri, suspended_at, created_at
         FROM accounts WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn set_suspended(
    pool: &DbPool,
    id: i64,
    suspended_at: Option<DateTime<Utc>>,
) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE accounts SET suspended_at = ?2 WHERE id = ?1")
        .bind(id)
        .bind(suspended_at)
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
    async fn local_and_remote_accounts() {
        let pool = crate::test_pool().await;
        let local = create_account(&pool, 1, "alice", None, "https://murmur.test/users/alice")
            .await
            .unwrap();
        let remote = create_account(
            &pool,
            2,
            "bob",
            Some("host.example"),
            "https://host.example/users/bob",
        )
        .await
        .unwrap();

        assert!(local.is_local());
        assert!(!remote.is_local());
        assert_eq!(remote.domain.as_deref(), Some("host.example"));
    }

    #[tokio::test]
    async fn blank_domain_is_stored_as_local() {
        let pool = crate::test_pool().await;
        let account = create_account(&pool, 3, "carol", Some("  "), "").await.unwrap();
        assert!(account.domain.is_none());
        assert!(account.is_local());
    }

    #[tokio::test]
    async fn duplicate_username_on_same_domain_fails() {
        let pool = crate::test_pool().await;
        create_account(&pool, 1, "dave", Some("host.example"), "")
            .await
            .unwrap();
        let dup = create_account(&pool, 2, "Dave", Some("HOST.example"), "").await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn suspend_and_lookup() {
        let pool = crate::test_pool().await;
        create_account(&pool, 5, "erin", None, "").await.unwrap();
        set_suspended(&pool, 5, Some(Utc::now())).await.unwrap();
        let account = get_account(&pool, 5).await.unwrap().unwrap();
        assert!(account.is_suspended());

        assert!(get_account(&pool, 999).await.unwrap().is_none());
        assert!(matches!(
            set_suspended(&pool, 999, None).await,
            Err(DbError::NotFound)
        ));
    }
}
