use crate::error::CoreError;
use murmur_db::accounts::AccountRow;
use murmur_db::statuses::StatusRow;
use murmur_db::DbPool;

/// Decide whether `viewer` (`None` = anonymous) may read `status`, whose
/// author is `author`.
pub async fn can_show(
    pool: &DbPool,
    status: &StatusRow,
    author: &AccountRow,
    viewer: Option<&AccountRow>,
) -> Result<bool, CoreError> {
    if author.is_suspended() {
        return Ok(false);
    }

    let owned = viewer.is_some_and(|v| v.id == status.account_id);
    if owned {
        return Ok(true);
    }

    let visibility = status.visibility();
    if visibility.is_world_readable() {
        return match viewer {
            None => Ok(true),
            Some(viewer) => {
                let blocked =
                    murmur_db::relationships::is_blocking(pool, author.id, viewer.id).await?;
                Ok(!blocked)
            }
        };
    }

    let Some(viewer) = viewer else {
        return Ok(false);
    };

    if murmur_db::statuses::is_mentioned(pool, status.id, viewer.id).await? {
        return Ok(true);
    }

    if visibility.requires_mention() {
        return Ok(false);
    }

    let follows = murmur_db::relationships::is_following(pool, viewer.id, status.account_id).await?;
    Ok(follows)
}
