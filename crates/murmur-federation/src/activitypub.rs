use chrono::{DateTime, Utc};
use murmur_db::polls::RemotePollUpdate;
use serde::Deserialize;
use serde_json::Value;

use crate::FederationError;

pub const ACTIVITYSTREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";

/// The subset of an ActivityPub `Question` needed to refresh a poll.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Option<String>,
    pub one_of: Option<Vec<QuestionOption>>,
    pub any_of: Option<Vec<QuestionOption>>,
    pub voters_count: Option<i64>,
    pub end_time: Option<DateTime<Utc>>,
    /// Either a timestamp or a boolean.
    pub closed: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionOption {
    pub name: Option<String>,
    pub content: Option<String>,
    pub replies: Option<Collection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub total_items: Option<i64>,
}

impl QuestionOption {
    fn title(&self) -> Option<String> {
        [self.name.as_deref(), self.content.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn tally(&self) -> i64 {
        self.replies
            .as_ref()
            .and_then(|r| r.total_items)
            .unwrap_or(0)
            .max(0)
    }
}

pub fn supported_context(object: &Value) -> bool {
    match object.get("@context") {
        Some(Value::String(ctx)) => ctx == ACTIVITYSTREAMS_CONTEXT,
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| item.as_str() == Some(ACTIVITYSTREAMS_CONTEXT)),
        _ => false,
    }
}

/// Turn a fetched `Question` into the poll state to persist.
///
/// `expected_id` is the URI the object was fetched from; a mismatching `id`
/// is rejected so one origin cannot overwrite another's poll.
pub fn parse_question(
    object: &Value,
    expected_id: &str,
    now: DateTime<Utc>,
) -> Result<RemotePollUpdate, FederationError> {
    if !supported_context(object) {
        return Err(FederationError::UnsupportedObject(
            "missing activitystreams context".into(),
        ));
    }

    let question: Question = serde_json::from_value(object.clone())
        .map_err(|e| FederationError::UnsupportedObject(format!("malformed question: {e}")))?;

    if question.kind != "Question" {
        return Err(FederationError::UnsupportedObject(format!(
            "expected Question, got {}",
            question.kind
        )));
    }
    if let Some(id) = question.id.as_deref() {
        if id != expected_id {
            return Err(FederationError::UnsupportedObject(format!(
                "object id {id} does not match {expected_id}"
            )));
        }
    }

    let (items, multiple) = match (&question.any_of, &question.one_of) {
        (Some(items), _) if !items.is_empty() => (items, true),
        (_, Some(items)) if !items.is_empty() => (items, false),
        _ => {
            return Err(FederationError::UnsupportedObject(
                "question has no options".into(),
            ))
        }
    };

    let mut options = Vec::with_capacity(items.len());
    let mut tallies = Vec::with_capacity(items.len());
    for item in items {
        let title = item.title().ok_or_else(|| {
            FederationError::UnsupportedObject("question option without a title".into())
        })?;
        options.push(title);
        tallies.push(item.tally());
    }

    let expires_at = match &question.closed {
        Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or(question.end_time),
        Some(Value::Bool(true)) => Some(now),
        _ => question.end_time,
    };

    Ok(RemotePollUpdate {
        options,
        tallies,
        multiple,
        voters_count: question.voters_count.map(|v| v.max(0)),
        expires_at,
    })
}
