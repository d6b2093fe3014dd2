pub mod activitypub;
pub mod client;
pub mod poll_fetch;
pub mod signing;
pub mod transport;

use async_trait::async_trait;
use murmur_db::accounts::AccountRow;
use murmur_db::polls::PollRow;
use thiserror::Error;

pub use client::FederationClient;
pub use poll_fetch::FetchRemotePollService;

#[derive(Debug, Error)]
pub enum FederationError {
    #[error("http error: {0}")]
    Http(String),
    #[error("remote error: {0}")]
    RemoteError(String),
    #[error("signing key must be 64 hex characters")]
    InvalidSigningKey,
    #[error("refusing to fetch {0}")]
    BlockedUrl(String),
    #[error("unsupported object: {0}")]
    UnsupportedObject(String),
    #[error("poll {0} has no fetchable status uri")]
    MissingUri(i64),
    #[error("database error: {0}")]
    Database(#[from] murmur_db::DbError),
}

/// Refreshes a remote poll's options and tallies from its origin server.
#[async_trait]
pub trait RemotePollFetcher: Send + Sync {
    async fn call(&self, poll: &PollRow, on_behalf_of: &AccountRow) -> Result<(), FederationError>;
}

pub fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}
