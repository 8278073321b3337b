//! Salted one-way hashing of API keys.
//!
//! Keys are derived with PBKDF2-HMAC-SHA512 over a fresh random salt. The
//! salt is stored hex-encoded next to the hash, and the hex string itself
//! (not its decoded bytes) is the PBKDF2 salt input, which keeps hashes
//! verifiable against records written by earlier deployments.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;

/// Salt length in random bytes (32 hex characters).
pub const SALT_LEN: usize = 16;

/// Derived key length in bytes (128 hex characters).
pub const HASH_LEN: usize = 64;

/// Key derivation parameters.
///
/// Changing either value makes previously stored hashes unverifiable with the
/// new parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingParams {
    pub iterations: u32,
    pub output_len: usize,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            iterations: crate::config::MIN_PBKDF2_ITERATIONS,
            output_len: HASH_LEN,
        }
    }
}

/// Generate a cryptographically secure random salt.
///
/// # Output
///
/// 32 hex characters (16 random bytes from the thread-local CSPRNG)
pub fn generate_salt() -> String {
    let bytes: [u8; SALT_LEN] = rand::random();
    hex::encode(bytes)
}

/// Derive the hex-encoded hash of `secret` under `salt`.
///
/// Pure function of its inputs: the same secret, salt and parameters always
/// produce the same output.
pub fn derive_hash(secret: &str, salt: &str, params: &HashingParams) -> String {
    let mut output = vec![0u8; params.output_len];
    pbkdf2_hmac::<Sha512>(
        secret.as_bytes(),
        salt.as_bytes(),
        params.iterations,
        &mut output,
    );
    hex::encode(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn salt_is_32_hex_chars() {
        let salt = generate_salt();
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn salts_do_not_repeat() {
        let salts: HashSet<String> = (0..256).map(|_| generate_salt()).collect();
        assert_eq!(salts.len(), 256);
    }

    #[test]
    fn hash_is_128_hex_chars() {
        let hash = derive_hash("sk_live_abc", &generate_salt(), &HashingParams::default());
        assert_eq!(hash.len(), HASH_LEN * 2);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_is_deterministic_for_secret_and_salt() {
        let params = HashingParams::default();
        let salt = generate_salt();
        assert_eq!(
            derive_hash("sk_live_abc", &salt, &params),
            derive_hash("sk_live_abc", &salt, &params)
        );
    }

    #[test]
    fn distinct_inputs_produce_distinct_hashes() {
        let params = HashingParams::default();
        let salt = generate_salt();
        let base = derive_hash("sk_live_abc", &salt, &params);

        assert_ne!(base, derive_hash("sk_live_abd", &salt, &params));
        assert_ne!(base, derive_hash("sk_live_abc", &generate_salt(), &params));
    }

    #[test]
    fn hash_never_contains_plaintext() {
        let secret = "sk_live_abc";
        let hash = derive_hash(secret, &generate_salt(), &HashingParams::default());
        assert!(!hash.contains(secret));
        assert!(!hash.contains(&hex::encode(secret)));
    }

    #[test]
    fn iteration_count_changes_output() {
        let salt = generate_salt();
        let stronger = HashingParams {
            iterations: 2000,
            ..HashingParams::default()
        };
        assert_ne!(
            derive_hash("sk_live_abc", &salt, &HashingParams::default()),
            derive_hash("sk_live_abc", &salt, &stronger)
        );
    }

    // PBKDF2-HMAC-SHA512, P = "password", S = "salt", c = 1, dkLen = 64
    #[test]
    fn matches_published_test_vector() {
        let params = HashingParams {
            iterations: 1,
            output_len: 64,
        };
        assert_eq!(
            derive_hash("password", "salt", &params),
            "867f70cf1ade02cff3752599a3a53dc4af34c7a669815ae5d513554e1c8cf252\
             c02d470a285a0501bad999bfe943c08f050235d7d68b1da55e63f73b60a57fce"
        );
    }
}
