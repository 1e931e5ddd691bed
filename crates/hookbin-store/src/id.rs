//! Opaque token generation for endpoint and event ids

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};

/// Number of random bytes per token. 96 bits keeps the collision probability
/// negligible across the service lifetime while encoding to a 16-character
/// URL path segment.
const TOKEN_BYTES: usize = 12;

/// Generate a short, unguessable, URL-safe token.
///
/// Callers rely on practical uniqueness only; the store tolerates (without
/// detecting) the theoretical collision.
pub fn generate_id() -> String {
    let mut buf = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}
