use crate::signing;
use crate::transport;
use crate::FederationError;
use ed25519_dalek::SigningKey;
use reqwest::Client;
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const MAX_REDIRECTS: usize = 3;
const ACTIVITY_JSON: &str =
    "application/activity+json, application/ld+json; profile=\"https://www.w3.org/ns/activitystreams\"";

#[derive(Debug, Clone)]
struct TransportSigner {
    origin: String,
    key_id: String,
    signing_key: SigningKey,
}

/// HTTP client for fetching ActivityPub objects from other instances.
#[derive(Debug, Clone)]
pub struct FederationClient {
    http: Client,
    transport_signer: Option<TransportSigner>,
}

impl FederationClient {
    pub fn new() -> Result<Self, FederationError> {
        Self::new_with_signer(None, DEFAULT_TIMEOUT)
    }

    pub fn new_signed(
        origin: String,
        key_id: String,
        signing_key: SigningKey,
        timeout: Duration,
    ) -> Result<Self, FederationError> {
        Self::new_with_signer(
            Some(TransportSigner {
                origin,
                key_id,
                signing_key,
            }),
            timeout,
        )
    }

    fn new_with_signer(
        transport_signer: Option<TransportSigner>,
        timeout: Duration,
    ) -> Result<Self, FederationError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Murmur/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| FederationError::Http(e.to_string()))?;

        Ok(Self {
            http,
            transport_signer,
        })
    }

    /// Fetch an ActivityPub object by id. `on_behalf_of` is the actor URI of
    /// the local account the fetch is made for, if any.
    pub async fn fetch_object(
        &self,
        url: &str,
        on_behalf_of: Option<&str>,
    ) -> Result<Value, FederationError> {
        ensure_public_https_url(url)?;

        let resp = self.get_with_retry(url, on_behalf_of).await?;
        resp.json()
            .await
            .map_err(|e| FederationError::RemoteError(format!("invalid object from {url}: {e}")))
    }

    /// GET request with exponential backoff retry.
    async fn get_with_retry(
        &self,
        url: &str,
        on_behalf_of: Option<&str>,
    ) -> Result<reqwest::Response, FederationError> {
        let mut last_err = FederationError::Http("no attempts made".to_string());
        for attempt in 0..MAX_RETRIES {
            let path = transport::request_path_from_url(url);
            let mut request = self.http.get(url).header("accept", ACTIVITY_JSON);
            request = self.with_transport_signature_headers(request, "GET", &path, on_behalf_of);

            match request.send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) if resp.status().is_server_error() => {
                    last_err = FederationError::RemoteError(format!(
                        "server error {} from {}",
                        resp.status(),
                        url
                    ));
                }
                Ok(resp) => {
                    return Err(FederationError::RemoteError(format!(
                        "request to {} returned {}",
                        url,
                        resp.status()
                    )));
                }
                Err(e) => {
                    last_err = FederationError::Http(e.to_string());
                }
            }
            if attempt + 1 < MAX_RETRIES {
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                tracing::debug!(url, attempt, "federation fetch failed, retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }
        Err(last_err)
    }

    fn with_transport_signature_headers(
        &self,
        request: reqwest::RequestBuilder,
        method: &str,
        path: &str,
        on_behalf_of: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let Some(signer) = &self.transport_signer else {
            return request;
        };
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        let canonical =
            transport::canonical_transport_bytes(method, path, timestamp_ms, on_behalf_of, &[]);
        let signature = signing::sign(&signer.signing_key, &canonical);
        let request = request
            .header("X-Murmur-Origin", signer.origin.as_str())
            .header("X-Murmur-Key-Id", signer.key_id.as_str())
            .header("X-Murmur-Timestamp", timestamp_ms.to_string())
            .header("X-Murmur-Signature", signature);
        match on_behalf_of {
            Some(actor) => request.header("X-Murmur-Actor", actor),
            None => request,
        }
    }
}

/// Object ids are supplied by remote servers. Only https URLs on the default
/// port that resolve by name or to a public address are fetched.
pub fn ensure_public_https_url(raw: &str) -> Result<(), FederationError> {
    let blocked = |reason: String| FederationError::BlockedUrl(format!("{raw}: {reason}"));

    let url = url::Url::parse(raw).map_err(|e| blocked(e.to_string()))?;
    if url.scheme() != "https" {
        return Err(blocked(format!("scheme {} is not https", url.scheme())));
    }
    if url.port().is_some_and(|port| port != 443) {
        return Err(blocked("non-default port".into()));
    }

    let host = url.host().ok_or_else(|| blocked("no host".into()))?;
    let internal = match host {
        url::Host::Ipv4(v4) => is_internal_address(IpAddr::V4(v4)),
        url::Host::Ipv6(v6) => is_internal_address(IpAddr::V6(v6)),
        url::Host::Domain(name) => {
            let name = name.trim_end_matches('.').to_ascii_lowercase();
            INTERNAL_HOST_NAMES
                .iter()
                .any(|internal| name == *internal || name.ends_with(&format!(".{internal}")))
        }
    };
    if internal {
        return Err(blocked("internal host".into()));
    }
    Ok(())
}

const INTERNAL_HOST_NAMES: [&str; 2] = ["localhost", "internal"];

fn is_internal_address(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || a == 0
                || a >= 240
                || (a == 100 && (64..128).contains(&b))
        }
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_internal_address(IpAddr::V4(v4)),
            None => {
                v6.is_loopback()
                    || v6.is_unspecified()
                    || v6.is_unique_local()
                    || v6.is_unicast_link_local()
            }
        },
    }
}

#[cfg(test)]
mod url_tests {
    use super::ensure_public_https_url;

    fn blocked(url: &str) -> bool {
        ensure_public_https_url(url).is_err()
    }

    #[test]
    fn loopback_and_metadata_hosts_are_refused() {
        assert!(blocked("https://localhost/users/a/statuses/1"));
        assert!(blocked("https://LOCALHOST./users/a"));
        assert!(blocked("https://127.0.0.1/users/a/statuses/1"));
        assert!(blocked("https://169.254.169.254/latest/meta-data/"));
        assert!(blocked("https://metadata.google.internal/v1/"));
        assert!(blocked("https://[::1]/objects/1"));
        assert!(blocked("https://[::ffff:10.0.0.1]/objects/1"));
    }

    #[test]
    fn private_ranges_are_refused() {
        for url in [
            "https://10.0.0.1/objects/1",
            "https://192.168.1.1/objects/1",
            "https://172.16.0.1/objects/1",
            "https://100.64.0.1/objects/1",
            "https://[fd00::1]/objects/1",
            "https://[fe80::1]/objects/1",
        ] {
            assert!(blocked(url), "{url}");
        }
    }

    #[test]
    fn only_https_on_the_default_port() {
        assert!(blocked("http://host.example/objects/1"));
        assert!(blocked("file:///etc/passwd"));
        assert!(blocked("https://host.example:6379/objects/1"));
        assert!(blocked("not-a-url"));
    }

    #[test]
    fn public_objects_are_allowed() {
        assert!(!blocked("https://host.example/users/bob/statuses/1"));
        assert!(!blocked("https://host.example:443/objects/1"));
        assert!(!blocked("https://8.8.8.8/objects/1"));
        assert!(!blocked("https://172.32.0.1/objects/1"));
    }
}
