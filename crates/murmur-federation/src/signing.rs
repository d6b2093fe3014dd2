use ed25519_dalek::{Signer, SigningKey, SECRET_KEY_LENGTH};
use rand::RngCore;

use crate::{hex_decode, hex_encode, FederationError};

/// Fresh instance key, returned with its public half as hex for operators to publish.
pub fn generate_keypair() -> (SigningKey, String) {
    let mut seed = [0u8; SECRET_KEY_LENGTH];
    rand::thread_rng().fill_bytes(&mut seed);
    let key = SigningKey::from_bytes(&seed);
    let public_hex = hex_encode(key.verifying_key().as_bytes());
    (key, public_hex)
}

/// Parse a configured key: 32 seed bytes as 64 hex characters.
pub fn signing_key_from_hex(hex: &str) -> Result<SigningKey, FederationError> {
    let seed: [u8; SECRET_KEY_LENGTH] = hex_decode(hex.trim())
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(FederationError::InvalidSigningKey)?;
    Ok(SigningKey::from_bytes(&seed))
}

pub fn sign(key: &SigningKey, payload: &[u8]) -> String {
    hex_encode(&key.sign(payload).to_bytes())
}
