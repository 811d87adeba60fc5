use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes behind each reset token; hex encoding doubles the length.
const RESET_TOKEN_BYTES: usize = 32;

/// Stored half of a password reset: only the digest of the token and its expiry.
///
/// Lifecycle: absent -> issued -> consumed, expired, or replaced by a newer issue.
/// Consuming clears both fields together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetCredential {
    pub token_hash: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ResetCredential {
    /// Mints a fresh token. The plaintext is returned once and never stored.
    pub fn issue(now: DateTime<Utc>, ttl: Duration) -> (String, Self) {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let plain = hex::encode(bytes);

        let credential = Self {
            token_hash: Some(hash_reset_token(&plain)),
            expires_at: Some(now + ttl),
        };
        (plain, credential)
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match (&self.token_hash, self.expires_at) {
            (Some(_), Some(expires_at)) => expires_at > now,
            _ => false,
        }
    }
}

/// sha-256 hex digest; the form reset tokens are stored and looked up by.
pub fn hash_reset_token(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_reset_token;

    #[test]
    fn issued_token_is_valid_until_expiry() {
        let now = Utc::now();
        let (plain, credential) = ResetCredential::issue(now, Duration::minutes(10));

        assert!(validate_reset_token(Some(&plain)).is_ok());
        assert_eq!(credential.token_hash.as_deref(), Some(hash_reset_token(&plain).as_str()));
        assert_ne!(credential.token_hash.as_deref(), Some(plain.as_str()));

        assert!(credential.is_valid(now));
        assert!(credential.is_valid(now + Duration::minutes(9)));
        assert!(!credential.is_valid(now + Duration::minutes(10)));
        assert!(!credential.is_valid(now + Duration::hours(1)));
    }

    #[test]
    fn consumed_credential_never_validates() {
        let now = Utc::now();
        let (_, issued) = ResetCredential::issue(now, Duration::minutes(10));
        assert!(issued.is_valid(now));

        let consumed = ResetCredential::default();
        assert!(!consumed.is_valid(now));

        let half_cleared = ResetCredential {
            token_hash: None,
            expires_at: issued.expires_at,
        };
        assert!(!half_cleared.is_valid(now));
    }

    #[test]
    fn tokens_are_unique() {
        let now = Utc::now();
        let (first, _) = ResetCredential::issue(now, Duration::minutes(10));
        let (second, _) = ResetCredential::issue(now, Duration::minutes(10));
        assert_ne!(first, second);
    }

    #[test]
    fn digest_is_sha256_hex() {
        assert_eq!(
            hash_reset_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
