//! Confirmation code generation.
//!
//! A code is a fixed prefix, the tail of the epoch-millis timestamp, and four
//! random uppercase alphanumerics, e.g. `PS831407K2QX`. The scheme is not
//! collision-proof: the ledger enforces code uniqueness as a backstop and a
//! collision surfaces as a retryable error, at which point the caller simply
//! generates a fresh code.

use chrono::Utc;
use rand::Rng;

use super::domain::ConfirmationCode;

const CODE_PREFIX: &str = "PS";
const RANDOM_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const RANDOM_LEN: usize = 4;

/// Source of guest-facing confirmation codes.
pub trait ConfirmationCodeGenerator: Send + Sync {
    fn next(&self) -> ConfirmationCode;
}

/// Default time-plus-random generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampCodeGenerator;

impl ConfirmationCodeGenerator for TimestampCodeGenerator {
    fn next(&self) -> ConfirmationCode {
        let tail = Utc::now().timestamp_millis().unsigned_abs() % 1_000_000;
        let mut rng = rand::rng();
        let suffix: String = (0..RANDOM_LEN)
            .map(|_| RANDOM_CHARSET[rng.random_range(0..RANDOM_CHARSET.len())] as char)
            .collect();
        ConfirmationCode(format!("{CODE_PREFIX}{tail:06}{suffix}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_the_published_shape() {
        let code = TimestampCodeGenerator.next().0;
        assert_eq!(code.len(), CODE_PREFIX.len() + 6 + RANDOM_LEN);
        assert!(code.starts_with(CODE_PREFIX));

        let (digits, suffix) = code[CODE_PREFIX.len()..].split_at(6);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
        assert!(suffix
            .bytes()
            .all(|b| RANDOM_CHARSET.contains(&b)));
    }

    #[test]
    fn consecutive_codes_rarely_repeat() {
        let generator = TimestampCodeGenerator;
        let first = generator.next();
        let second = generator.next();
        // Same millisecond tails are possible; identical random suffixes on
        // top of that would be a 1-in-1.6M coincidence per pair.
        assert!(first != second || generator.next() != first);
    }
}
