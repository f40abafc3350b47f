//! Single-use secrets for confirmation and reset links.

use argon2::password_hash::rand_core::{OsRng, RngCore};

const SECRET_BYTES: usize = 32;

/// 256 bits from the OS RNG, hex-encoded.
pub fn generate_secret() -> String {
    let mut buf = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}
