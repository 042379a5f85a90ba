//! # Primitives
//!
//! Fixed limits and formats compiled into Roster.

/// Prefix of every generated student number.
pub const STUDENT_NUMBER_PREFIX: &str = "S";

/// Hex digits following the prefix in a student number.
pub const STUDENT_NUMBER_DIGITS: usize = 8;

/// Salted derivations tried before student-number assignment gives up.
pub const MAX_STUDENT_NUMBER_ATTEMPTS: u32 = 64;

/// First identifier handed out for every entity kind.
pub const FIRST_ID: u64 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length in bytes for names, codes and descriptions.
pub const MAX_TEXT_LENGTH: usize = 256;

/// Maximum length in bytes for an email address.
pub const MAX_EMAIL_LENGTH: usize = 256;

/// Youngest accepted age.
pub const MIN_AGE: u32 = 1;

/// Oldest accepted age.
pub const MAX_AGE: u32 = 150;

/// Maximum number of records in a single seed batch.
pub const MAX_SEED_RECORDS: usize = 10_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_number_is_prefix_plus_digits() {
        assert_eq!(STUDENT_NUMBER_PREFIX.len() + STUDENT_NUMBER_DIGITS, 9);
    }

    #[test]
    fn age_range_is_ordered() {
        assert!(MIN_AGE < MAX_AGE);
    }
}
