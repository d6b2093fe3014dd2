use crate::{DbError, DbPool};

pub async fn create_follow(
    pool: &DbPool,
    account_id: i64,
    target_account_id: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO follows (account_id, target_account_id)
         VALUES (?1, ?2)
         ON CONFLICT (account_id, target_account_id) DO NOTHING",
    )
    .bind(account_id)
    .bind(target_account_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn is_following(
    pool: &DbPool,
    account_id: i64,
    target_account_id: i64,
) -> Result<bool, DbError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM follows WHERE account_id = ?1 AND target_account_id = ?2 LIMIT 1",
    )
    .bind(account_id)
    .bind(target_account_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

pub async fn create_block(
    pool: &DbPool,
    account_id: i64,
    target_account_id: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO blocks (account_id, target_account_id)
         VALUES (?1, ?2)
         ON CONFLICT (account_id, target_account_id) DO NOTHING",
    )
    .bind(account_id)
    .bind(target_account_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn is_blocking(
    pool: &DbPool,
    account_id: i64,
    target_account_id: i64,
) -> Result<bool, DbError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM blocks WHERE account_id = ?1 AND target_account_id = ?2 LIMIT 1",
    )
    .bind(account_id)
    .bind(target_account_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup(pool: &DbPool) {
        crate::accounts::create_account(pool, 1, "a", None, "")
            .await
            .unwrap();
        crate::accounts::create_account(pool, 2, "b", None, "")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn follows_are_directional() {
        let pool = crate::test_pool().await;
        setup(&pool).await;
        create_follow(&pool, 1, 2).await.unwrap();
        create_follow(&pool, 1, 2).await.unwrap();
        assert!(is_following(&pool, 1, 2).await.unwrap());
        assert!(!is_following(&pool, 2, 1).await.unwrap());
    }

    #[tokio::test]
    async fn blocks_are_directional() {
        let pool = crate::test_pool().await;
        setup(&pool).await;
        create_block(&pool, 2, 1).await.unwrap();
        assert!(is_blocking(&pool, 2, 1).await.unwrap());
        assert!(!is_blocking(&pool, 1, 2).await.unwrap());
    }
}
