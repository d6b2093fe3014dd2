use async_trait::async_trait;
use chrono::{DateTime, Utc};
use murmur_db::accounts::AccountRow;
use murmur_db::polls::PollRow;
use murmur_db::{DbError, DbPool};
use serde_json::Value;

use crate::{activitypub, FederationClient, FederationError, RemotePollFetcher};

/// Refetches the `Question` behind a remote poll and stores its current state.
#[derive(Debug, Clone)]
pub struct FetchRemotePollService {
    db: DbPool,
    client: FederationClient,
}

impl FetchRemotePollService {
    pub fn new(db: DbPool, client: FederationClient) -> Self {
        Self { db, client }
    }

    async fn status_uri(&self, poll: &PollRow) -> Result<String, FederationError> {
        let status_id = poll.status_id.ok_or(FederationError::MissingUri(poll.id))?;
        let status = murmur_db::statuses::get_status(&self.db, status_id)
            .await?
            .ok_or(DbError::NotFound)?;
        status
            .uri
            .map(|uri| uri.trim().to_string())
            .filter(|uri| !uri.is_empty())
            .ok_or(FederationError::MissingUri(poll.id))
    }
}

#[async_trait]
impl RemotePollFetcher for FetchRemotePollService {
    async fn call(&self, poll: &PollRow, on_behalf_of: &AccountRow) -> Result<(), FederationError> {
        let uri = self.status_uri(poll).await?;
        let actor = Some(on_behalf_of.uri.as_str()).filter(|u| !u.is_empty());

        tracing::debug!(poll_id = poll.id, %uri, "fetching remote poll");
        let object = self.client.fetch_object(&uri, actor).await?;
        apply_question(&self.db, poll.id, &uri, &object, Utc::now()).await?;
        Ok(())
    }
}

/// Validate a fetched `Question` and persist it over the stored poll.
pub async fn apply_question(
    pool: &DbPool,
    poll_id: i64,
    uri: &str,
    object: &Value,
    now: DateTime<Utc>,
) -> Result<PollRow, FederationError> {
    let update = activitypub::parse_question(object, uri, now)?;
    let (row, votes_reset) =
        murmur_db::polls::apply_remote_update(pool, poll_id, &update, now).await?;
    if votes_reset {
        tracing::info!(poll_id, "remote poll options changed, local votes discarded");
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_db::polls::NewPoll;
    use murmur_models::visibility::Visibility;
    use serde_json::json;

    const URI: &str = "https://host.example/users/bob/statuses/1";

    async fn setup(status_uri: Option<&str>) -> (DbPool, PollRow, AccountRow) {
        let pool = murmur_db::create_pool("sqlite::memory:", 1).await.unwrap();
        murmur_db::run_migrations(&pool).await.unwrap();

        let remote = murmur_db::accounts::create_account(
            &pool,
            1,
            "bob",
            Some("host.example"),
            "https://host.example/users/bob",
        )
        .await
        .unwrap();
        let local = murmur_db::accounts::create_account(
            &pool,
            2,
            "alice",
            None,
            "https://murmur.test/users/alice",
        )
        .await
        .unwrap();
        murmur_db::statuses::create_status(&pool, 10, remote.id, Visibility::Public, status_uri, "")
            .await
            .unwrap();
        let poll = murmur_db::polls::create_poll(
            &pool,
            &NewPoll {
                id: 100,
                account_id: remote.id,
                status_id: Some(10),
                options: vec!["yes".into(), "no".into()],
                cached_tallies: vec![0, 0],
                voters_count: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (pool, poll, local)
    }

    #[tokio::test]
    async fn apply_question_stores_tallies_and_fetch_time() {
        let (pool, poll, _) = setup(Some(URI)).await;
        let object = json!({
            "@context": activitypub::ACTIVITYSTREAMS_CONTEXT,
            "id": URI,
            "type": "Question",
            "oneOf": [
                {"name": "yes", "replies": {"totalItems": 6}},
                {"name": "no", "replies": {"totalItems": 2}}
            ],
            "votersCount": 8
        });

        let now = Utc::now();
        let row = apply_question(&pool, poll.id, URI, &object, now).await.unwrap();
        assert_eq!(row.votes_count, 8);
        assert_eq!(row.voters_count, Some(8));
        assert_eq!(row.cached_tallies.0, vec![6, 2]);
        assert!(row.last_fetched_at.is_some());
    }

    #[tokio::test]
    async fn apply_question_leaves_poll_untouched_on_bad_object() {
        let (pool, poll, _) = setup(Some(URI)).await;
        let object = json!({"@context": activitypub::ACTIVITYSTREAMS_CONTEXT, "type": "Note"});

        assert!(apply_question(&pool, poll.id, URI, &object, Utc::now())
            .await
            .is_err());
        let stored = murmur_db::polls::get_poll(&pool, poll.id).await.unwrap().unwrap();
        assert!(stored.last_fetched_at.is_none());
    }

    #[tokio::test]
    async fn call_without_status_uri_fails_before_any_request() {
        let (pool, poll, viewer) = setup(None).await;
        let service = FetchRemotePollService::new(pool, FederationClient::new().unwrap());

        let err = service.call(&poll, &viewer).await.unwrap_err();
        assert!(matches!(err, FederationError::MissingUri(100)));
    }

    #[tokio::test]
    async fn call_refuses_private_network_uris() {
        let (pool, poll, viewer) = setup(Some("https://127.0.0.1/statuses/1")).await;
        let service = FetchRemotePollService::new(pool, FederationClient::new().unwrap());

        let err = service.call(&poll, &viewer).await.unwrap_err();
        assert!(matches!(err, FederationError::BlockedUrl(_)));
    }
}
