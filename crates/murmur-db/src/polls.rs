use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};
pub use sqlx::types::Json;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PollRow {
    pub id: i64,
    pub account_id: i64,
    pub status_id: Option<i64>,
    pub options: Json<Vec<String>>,
    pub cached_tallies: Json<Vec<i64>>,
    pub multiple: bool,
    pub hide_totals: bool,
    pub votes_count: i64,
    pub voters_count: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PollRow {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Tally for option `index`; missing entries count as zero.
    pub fn tally(&self, index: usize) -> i64 {
        self.cached_tallies.0.get(index).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewPoll {
    pub id: i64,
    pub account_id: i64,
    pub status_id: Option<i64>,
    pub options: Vec<String>,
    pub cached_tallies: Vec<i64>,
    pub multiple: bool,
    pub hide_totals: bool,
    pub voters_count: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// Poll state as last published by the origin server.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePollUpdate {
    pub options: Vec<String>,
    pub tallies: Vec<i64>,
    pub multiple: bool,
    pub voters_count: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

const POLL_COLUMNS: &str = "id, account_id, status_id, options, cached_tallies, multiple, hide_totals, \
     votes_count, voters_count, expires_at, last_fetched_at, created_at";

fn normalized_tallies(options_len: usize, tallies: &[i64]) -> Vec<i64> {
    let mut out: Vec<i64> = tallies.iter().take(options_len).map(|t| (*t).max(0)).collect();
    out.resize(options_len, 0);
    out
}

pub async fn create_poll(pool: &DbPool, poll: &NewPoll) -> Result<PollRow, DbError> {
    let tallies = normalized_tallies(poll.options.len(), &poll.cached_tallies);
    let votes_count: i64 = tallies.iter().sum();
    let sql = format!(
        "INSERT INTO polls (
            id, account_id, status_id, options, cached_tallies, multiple, hide_totals,
            votes_count, voters_count, expires_at, last_fetched_at
         )
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         RETURNING {POLL_COLUMNS}"
    );
    let row = sqlx::query_as::<_, PollRow>(&sql)
        .bind(poll.id)
        .bind(poll.account_id)
        .bind(poll.status_id)
        .bind(Json(&poll.options))
        .bind(Json(&tallies))
        .bind(poll.multiple)
        .bind(poll.hide_totals)
        .bind(votes_count)
        .bind(poll.voters_count)
        .bind(poll.expires_at)
        .bind(poll.last_fetched_at)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn get_poll(pool: &DbPool, id: i64) -> Result<Option<PollRow>, DbError> {
    let sql = format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = ?1");
    let row = sqlx::query_as::<_, PollRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Like [`get_poll`], but ignores polls that are not attached to a status.
pub async fn get_attached_poll(pool: &DbPool, id: i64) -> Result<Option<PollRow>, DbError> {
    let sql = format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = ?1 AND status_id IS NOT NULL");
    let row = sqlx::query_as::<_, PollRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Option indices the account voted for, in ascending order.
pub async fn get_own_choices(
    pool: &DbPool,
    poll_id: i64,
    account_id: i64,
) -> Result<Vec<i64>, DbError> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT choice FROM poll_votes
         WHERE poll_id = ?1 AND account_id = ?2
         ORDER BY choice",
    )
    .bind(poll_id)
    .bind(account_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(choice,)| choice).collect())
}

/// Store a vote and bump the cached counters in one transaction.
/// An out-of-range choice or unknown poll yields `NotFound`; a second choice
/// on a single-choice poll yields `AlreadyVoted`.
pub async fn record_vote(
    pool: &DbPool,
    poll_id: i64,
    account_id: i64,
    choice: i64,
) -> Result<PollRow, DbError> {
    let mut tx = pool.begin().await?;

    let sql = format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = ?1");
    let poll = sqlx::query_as::<_, PollRow>(&sql)
        .bind(poll_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;
    let index = usize::try_from(choice)
        .ok()
        .filter(|i| *i < poll.options.0.len())
        .ok_or(DbError::NotFound)?;

    let already_voted: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM poll_votes WHERE poll_id = ?1 AND account_id = ?2 LIMIT 1")
            .bind(poll_id)
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await?;
    if already_voted.is_some() && !poll.multiple {
        return Err(DbError::AlreadyVoted);
    }

    sqlx::query("INSERT INTO poll_votes (poll_id, account_id, choice) VALUES (?1, ?2, ?3)")
        .bind(poll_id)
        .bind(account_id)
        .bind(choice)
        .execute(&mut *tx)
        .await?;

    let mut tallies = normalized_tallies(poll.options.0.len(), &poll.cached_tallies.0);
    tallies[index] += 1;
    let new_voter = i64::from(already_voted.is_none());

    let sql = format!(
        "UPDATE polls
         SET cached_tallies = ?2,
             votes_count = votes_count + 1,
             voters_count = COALESCE(voters_count, 0) + ?3
         WHERE id = ?1
         RETURNING {POLL_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, PollRow>(&sql)
        .bind(poll_id)
        .bind(Json(&tallies))
        .bind(new_voter)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(updated)
}

/// Overwrite a poll with the state fetched from its origin server.
/// Stored votes are discarded when the option list changed. Returns the
/// updated row and whether votes were discarded.
pub async fn apply_remote_update(
    pool: &DbPool,
    poll_id: i64,
    update: &RemotePollUpdate,
    fetched_at: DateTime<Utc>,
) -> Result<(PollRow, bool), DbError> {
    let mut tx = pool.begin().await?;

    let current: Option<(Json<Vec<String>>,)> =
        sqlx::query_as("SELECT options FROM polls WHERE id = ?1")
            .bind(poll_id)
            .fetch_optional(&mut *tx)
            .await?;
    let (Json(current_options),) = current.ok_or(DbError::NotFound)?;

    let options_changed = current_options != update.options;
    if options_changed {
        sqlx::query("DELETE FROM poll_votes WHERE poll_id = ?1")
            .bind(poll_id)
            .execute(&mut *tx)
            .await?;
    }

    let tallies = normalized_tallies(update.options.len(), &update.tallies);
    let votes_count: i64 = tallies.iter().sum();
    let sql = format!(
        "UPDATE polls
         SET options = ?2,
             cached_tallies = ?3,
             multiple = ?4,
             votes_count = ?5,
             voters_count = ?6,
             expires_at = ?7,
             last_fetched_at = ?8
         WHERE id = ?1
         RETURNING {POLL_COLUMNS}"
    );
    let row = sqlx::query_as::<_, PollRow>(&sql)
        .bind(poll_id)
        .bind(Json(&update.options))
        .bind(Json(&tallies))
        .bind(update.multiple)
        .bind(votes_count)
        .bind(update.voters_count)
        .bind(update.expires_at)
        .bind(fetched_at)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok((row, options_changed))
}
