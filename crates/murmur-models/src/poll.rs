use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Poll as rendered by the REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
    pub multiple: bool,
    pub votes_count: i64,
    pub voters_count: Option<i64>,
    /// Omitted for anonymous viewers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub own_votes: Option<Vec<i64>>,
    pub options: Vec<PollOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    pub title: String,
    /// `None` while totals are hidden from the viewer.
    pub votes_count: Option<i64>,
}
