use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccessTokenRow {
    pub id: i64,
    pub token_hash: String,
    pub resource_owner_id: Option<i64>,
    pub scopes: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Tokens are only ever stored as their SHA-256 hex digest.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.trim().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

pub async fn create_access_token(
    pool: &DbPool,
    id: i64,
    token: &str,
    resource_owner_id: Option<i64>,
    scopes: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<AccessTokenRow, DbError> {
    let row = sqlx::query_as::<_, AccessTokenRow>(
        "INSERT INTO oauth_access_tokens (id, token_hash, resource_owner_id, scopes, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING id, token_hash, resource_owner_id, scopes, created_at, expires_at, revoked_at",
    )
    .bind(id)
    .bind(hash_token(token))
    .bind(resource_owner_id)
    .bind(scopes.trim())
    .bind(expires_at)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Look up a presented bearer token. Revoked and expired tokens are not returned.
pub async fn get_active_token(
    pool: &DbPool,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<AccessTokenRow>, DbError> {
    let row = sqlx::query_as::<_, AccessTokenRow>(
        "SELECT id, token_hash, resource_owner_id, scopes, created_at, expires_at, revoked_at
         FROM oauth_access_tokens
         WHERE token_hash = ?1",
    )
    .bind(hash_token(token))
    .fetch_optional(pool)
    .await?;

    Ok(row.filter(|t| t.revoked_at.is_none() && t.expires_at.is_none_or(|exp| exp > now)))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_user(pool: &DbPool) -> i64 {
        crate::accounts::create_account(pool, 100, "tester", None, "")
            .await
            .expect("create account");
        crate::users::create_user(pool, 7001, 100, "tester@example.com")
            .await
            .expect("create user")
            .id
    }

    #[test]
    fn hash_is_stable_hex() {
        let hashed = hash_token("secret-token");
        assert_eq!(hashed.len(), 64);
        assert_eq!(hashed, hash_token(" secret-token "));
        assert_ne!(hashed, hash_token("other-token"));
    }

    #[tokio::test]
    async fn token_activity_respects_revocation() {
        let db = crate::test_pool().await;
        let user_id = setup_user(&db).await;
        let now = Utc::now();

        let row = create_access_token(&db, 1, "tok-1", Some(user_id), "read:statuses", None)
            .await
            .expect("create token");
        assert_ne!(row.token_hash, "tok-1");

        let active = get_active_token(&db, "tok-1", now).await.expect("lookup");
        assert_eq!(active.map(|t| t.scopes), Some("read:statuses".to_string()));
        assert!(get_active_token(&db, "wrong", now).await.unwrap().is_none());

        sqlx::query("UPDATE oauth_access_tokens SET revoked_at = ?2 WHERE id = ?1")
            .bind(1_i64)
            .bind(now)
            .execute(&db)
            .await
            .expect("revoke");
        assert!(get_active_token(&db, "tok-1", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_tokens_are_inactive() {
        let db = crate::test_pool().await;
        let user_id = setup_user(&db).await;
        let now = Utc::now();

        create_access_token(
            &db,
            2,
            "tok-2",
            Some(user_id),
            "read",
            Some(now - chrono::Duration::minutes(1)),
        )
        .await
        .expect("create token");
        assert!(get_active_token(&db, "tok-2", now).await.unwrap().is_none());
    }
}
