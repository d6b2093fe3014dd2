use sha2::{Digest, Sha256};

pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    crate::hex_encode(&digest)
}

pub fn request_path_from_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => {
            let mut out = parsed.path().to_string();
            if let Some(query) = parsed.query() {
                out.push('?');
                out.push_str(query);
            }
            out
        }
        Err(_) => "/".to_string(),
    }
}

/// Bytes covered by the transport signature. The actor line is empty for
/// instance-level requests.
pub fn canonical_transport_bytes(
    method: &str,
    path: &str,
    timestamp_ms: i64,
    actor: Option<&str>,
    body: &[u8],
) -> Vec<u8> {
    format!(
        "{}\n{}\n{}\n{}\n{}",
        method.to_ascii_uppercase(),
        path,
        timestamp_ms,
        actor.unwrap_or_default(),
        sha256_hex(body)
    )
    .into_bytes()
}
