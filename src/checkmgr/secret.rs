use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::constants::{INSECURE_FALLBACK_SECRET, SECRET_LENGTH, SECRET_SOURCE_BYTES};
use crate::error::Result;

/// Secret used to authenticate submissions to a newly created check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Secret {
    Configured(String),
    Generated(String),
    /// The random source failed; the well-known fallback literal is in use.
    InsecureFallback,
}

impl Secret {
    pub fn as_str(&self) -> &str {
        match self {
            Secret::Configured(s) | Secret::Generated(s) => s,
            Secret::InsecureFallback => INSECURE_FALLBACK_SECRET,
        }
    }

    pub fn is_insecure(&self) -> bool {
        matches!(self, Secret::InsecureFallback)
    }
}

/// Hash a buffer of random bytes into a short hex token.
pub fn make_secret<R: RngCore + ?Sized>(rng: &mut R) -> Result<String> {
    let mut buf = vec![0u8; SECRET_SOURCE_BYTES];
    rng.try_fill_bytes(&mut buf)?;

    let mut hasher = Sha256::new();
    hasher.update(&buf);
    let mut secret = hex::encode(hasher.finalize());
    secret.truncate(SECRET_LENGTH);
    Ok(secret)
}

/// Prefer the configured secret, then a generated one, then the insecure fallback.
pub fn check_secret<R: RngCore + ?Sized>(configured: Option<&str>, rng: &mut R) -> Secret {
    if let Some(s) = configured.filter(|s| !s.is_empty()) {
        return Secret::Configured(s.to_string());
    }

    match make_secret(rng) {
        Ok(s) => Secret::Generated(s),
        Err(e) => {
            warn!(error = %e, "unable to generate check secret, using insecure fallback");
            Secret::InsecureFallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {}

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "entropy source unavailable",
            )))
        }
    }

    #[test]
    fn test_make_secret_is_fixed_length_hex() {
        for _ in 0..5 {
            let secret = make_secret(&mut OsRng).unwrap();
            assert_eq!(secret.len(), SECRET_LENGTH);
            assert!(secret.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_make_secret_varies() {
        let a = make_secret(&mut OsRng).unwrap();
        let b = make_secret(&mut OsRng).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_make_secret_surfaces_rng_failure() {
        assert!(make_secret(&mut BrokenRng).is_err());
    }

    #[test]
    fn test_check_secret_order() {
        let configured = check_secret(Some("mine"), &mut BrokenRng);
        assert_eq!(configured, Secret::Configured("mine".to_string()));

        let generated = check_secret(None, &mut OsRng);
        assert!(matches!(generated, Secret::Generated(_)));
        assert!(!generated.is_insecure());

        let fallback = check_secret(Some(""), &mut BrokenRng);
        assert!(fallback.is_insecure());
        assert_eq!(fallback.as_str(), "myS3cr3t");
    }
}
