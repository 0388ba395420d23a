//! Request signing for private Kraken Futures endpoints

use super::types::SignatureError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

type HmacSha512 = Hmac<Sha512>;

/// Path prefix the exchange strips before verifying signatures
pub const API_PREFIX: &str = "/derivatives";

/// Compute the `Authent` header value for a private request
///
/// `base64(HMAC-SHA512(base64_decode(private_key), SHA256(post_data + nonce + path)))`
/// where `path` is the endpoint without the `/derivatives` prefix.
pub fn sign(
    private_key: &str,
    endpoint: &str,
    post_data: &str,
    nonce: &str,
) -> Result<String, SignatureError> {
    let path = endpoint.strip_prefix(API_PREFIX).unwrap_or(endpoint);

    let mut hasher = Sha256::new();
    hasher.update(post_data.as_bytes());
    hasher.update(nonce.as_bytes());
    hasher.update(path.as_bytes());
    let digest = hasher.finalize();

    let key = STANDARD.decode(private_key)?;
    let mut mac = HmacSha512::new_from_slice(&key).map_err(|_| SignatureError::KeyLength)?;
    mac.update(&digest);

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
