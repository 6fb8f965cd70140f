use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[cfg(not(test))]
const ITERATIONS: u32 = 260000;
// keeps the auth workflow tests fast, the format is unchanged
#[cfg(test)]
const ITERATIONS: u32 = 1000;
const KEY_LENGTH: usize = 32;
const SALT_LENGTH: usize = 16;
const SCHEME: &str = "pbkdf2:sha256";

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("invalid hash format: {0}")]
    Format(&'static str),

    #[error("key derivation failed")]
    Derivation,
}

/// Hashes a password as `pbkdf2:sha256:<iterations>$<salt>$<hash>`
/// with a random 16-byte salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill(&mut salt);

    let mut key = [0u8; KEY_LENGTH];
    pbkdf2::<HmacSha256>(password.as_bytes(), &salt, ITERATIONS, &mut key)
        .map_err(|_| PasswordError::Derivation)?;

    let salt_b64 = URL_SAFE_NO_PAD.encode(salt);
    let hash_b64 = URL_SAFE_NO_PAD.encode(key);

    Ok(format!("{}:{}${}${}", SCHEME, ITERATIONS, salt_b64, hash_b64))
}

/// Checks `password` against a stored hash.
///
/// Accepts the salted PBKDF2 format produced by [`hash_password`] and the
/// legacy format: a bare, unsalted SHA-256 hex digest.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    if is_legacy_digest(stored_hash) {
        let computed = hex::encode(Sha256::digest(password.as_bytes()));
        return Ok(computed.as_bytes().ct_eq(stored_hash.to_ascii_lowercase().as_bytes()).into());
    }

    // pbkdf2:sha256:iterations$salt$hash
    let parts: Vec<&str> = stored_hash.split('$').collect();
    let [header, salt_str, hash_str] = parts.as_slice() else {
        return Err(PasswordError::Format("expected three '$'-separated fields"));
    };

    let iterations = header
        .strip_prefix(SCHEME)
        .and_then(|rest| rest.strip_prefix(':'))
        .ok_or(PasswordError::Format("unsupported scheme"))?
        .parse::<u32>()
        .map_err(|_| PasswordError::Format("invalid iterations"))?;

    let salt = decode_field(salt_str)?;
    let expected_hash = decode_field(hash_str)?;
    if expected_hash.is_empty() {
        return Err(PasswordError::Format("empty hash"));
    }

    let mut computed = vec![0u8; expected_hash.len()];
    pbkdf2::<HmacSha256>(password.as_bytes(), &salt, iterations, &mut computed)
        .map_err(|_| PasswordError::Derivation)?;

    Ok(computed.ct_eq(&expected_hash).into())
}

fn is_legacy_digest(stored_hash: &str) -> bool {
    stored_hash.len() == 64 && stored_hash.chars().all(|c| c.is_ascii_hexdigit())
}

fn decode_field(input: &str) -> Result<Vec<u8>, PasswordError> {
    URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|_| PasswordError::Format("salt and hash must be unpadded url-safe base64"))
}
