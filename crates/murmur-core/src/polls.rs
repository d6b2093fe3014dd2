use crate::error::CoreError;
use crate::{status_policy, AppState};
use chrono::{DateTime, Duration, Utc};
use murmur_db::accounts::AccountRow;
use murmur_db::polls::PollRow;
use murmur_db::statuses::StatusRow;
use murmur_db::DbPool;
use murmur_models::poll::{Poll, PollOption};

/// A poll the requester is allowed to see, with the records it was resolved through.
#[derive(Debug, Clone)]
pub struct VisiblePoll {
    pub poll: PollRow,
    pub status: StatusRow,
    /// Owner of the poll (normally also the status author).
    pub owner: AccountRow,
}

/// Resolve an attached poll through its parent status. Missing polls,
/// unattached polls and polls on statuses the viewer cannot read all
/// surface as `NotFound`.
pub async fn find_visible_poll(
    pool: &DbPool,
    poll_id: i64,
    viewer: Option<&AccountRow>,
) -> Result<VisiblePoll, CoreError> {
    let poll = murmur_db::polls::get_attached_poll(pool, poll_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    let status_id = poll.status_id.ok_or(CoreError::NotFound)?;
    let status = murmur_db::statuses::get_status(pool, status_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    let author = murmur_db::accounts::get_account(pool, status.account_id)
        .await?
        .ok_or(CoreError::NotFound)?;

    if !status_policy::can_show(pool, &status, &author, viewer).await? {
        tracing::debug!(
            poll_id,
            status_id,
            viewer_id = viewer.map(|v| v.id),
            "poll hidden by status visibility"
        );
        return Err(CoreError::NotFound);
    }

    let owner = if poll.account_id == author.id {
        author
    } else {
        murmur_db::accounts::get_account(pool, poll.account_id)
            .await?
            .ok_or(CoreError::NotFound)?
    };

    Ok(VisiblePoll {
        poll,
        status,
        owner,
    })
}

/// A remote poll is stale when it was never fetched, or when its last fetch
/// happened before it expired and longer ago than `stale_after`.
pub fn needs_refresh(
    poll: &PollRow,
    owner: &AccountRow,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> bool {
    if owner.is_local() {
        return false;
    }
    let Some(last_fetched_at) = poll.last_fetched_at else {
        return true;
    };
    let fetched_before_expiry = poll.expires_at.is_none_or(|exp| last_fetched_at < exp);
    fetched_before_expiry && now - last_fetched_at > stale_after
}

/// Refresh a stale remote poll through the configured fetcher, then reload it.
///
/// Fetch failures are logged and the stored poll is returned unchanged.
pub async fn refresh_if_stale(
    state: &AppState,
    visible: &VisiblePoll,
    requester: &AccountRow,
    now: DateTime<Utc>,
) -> Result<PollRow, CoreError> {
    if !needs_refresh(&visible.poll, &visible.owner, now, state.config.poll_stale_after) {
        return Ok(visible.poll.clone());
    }
    let Some(fetcher) = state.poll_fetcher.as_ref() else {
        tracing::debug!(poll_id = visible.poll.id, "federation disabled, serving cached poll");
        return Ok(visible.poll.clone());
    };

    if let Err(err) = fetcher.call(&visible.poll, requester).await {
        tracing::warn!(
            poll_id = visible.poll.id,
            requester_id = requester.id,
            "remote poll refresh failed: {err}"
        );
        return Ok(visible.poll.clone());
    }

    let refreshed = murmur_db::polls::get_poll(&state.db, visible.poll.id)
        .await?
        .ok_or(CoreError::NotFound)?;
    Ok(refreshed)
}

/// Build the REST representation of `poll` for `viewer`.
pub async fn render_poll(
    pool: &DbPool,
    poll: &PollRow,
    viewer: Option<&AccountRow>,
    now: DateTime<Utc>,
) -> Result<Poll, CoreError> {
    let expired = poll.is_expired(now);
    let show_totals = expired || !poll.hide_totals;

    let options = poll
        .options
        .0
        .iter()
        .enumerate()
        .map(|(index, title)| PollOption {
            title: title.clone(),
            votes_count: show_totals.then(|| poll.tally(index)),
        })
        .collect();

    let (voted, own_votes) = match viewer {
        Some(viewer) => {
            let own_votes = murmur_db::polls::get_own_choices(pool, poll.id, viewer.id).await?;
            let voted = viewer.id == poll.account_id || !own_votes.is_empty();
            (Some(voted), Some(own_votes))
        }
        None => (None, None),
    };

    Ok(Poll {
        id: poll.id.to_string(),
        expires_at: poll.expires_at,
        expired,
        multiple: poll.multiple,
        votes_count: poll.votes_count,
        voters_count: poll.voters_count,
        voted,
        own_votes,
        options,
    })
}
