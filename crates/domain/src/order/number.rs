//! Human-facing order numbers.

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

const SUFFIX_LEN: usize = 8;

/// Order number shown to customers and sent to the gateway as the
/// customer reference, e.g. `ACME-7GQ2KX9B`.
///
/// Collisions are not re-checked: eight random alphanumerics per vendor
/// prefix make them negligible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates `{prefix}-{8 random chars}`, uppercased.
    pub fn generate(prefix: &str) -> Self {
        Self::generate_with(prefix, &mut rand::thread_rng())
    }

    /// Same as [`OrderNumber::generate`] with a caller-supplied RNG.
    pub fn generate_with<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> Self {
        let suffix: String = rng
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect();
        Self(format!("{prefix}-{suffix}").to_uppercase())
    }

    /// Wraps an existing order number, e.g. one read from storage.
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_format() {
        let number = OrderNumber::generate("acme");
        let (prefix, suffix) = number.as_str().split_once('-').unwrap();
        assert_eq!(prefix, "ACME");
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(number.as_str(), number.as_str().to_uppercase());
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let a = OrderNumber::generate_with("V", &mut StdRng::seed_from_u64(7));
        let b = OrderNumber::generate_with("V", &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_numbers_differ() {
        assert_ne!(OrderNumber::generate("V"), OrderNumber::generate("V"));
    }
}
