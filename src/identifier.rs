//! CNPJ normalization and check-digit validation.
//!
//! A normalized identifier is either empty (nothing usable in the input) or
//! exactly 14 ASCII digits. Validation never allocates beyond the digit vector.

use crate::constants::{CNPJ_LENGTH, FIRST_CHECK_WEIGHTS, SECOND_CHECK_WEIGHTS};
use tracing::debug;

/// Strip every non-digit, then left-pad to 14 digits or truncate to the
/// first 14. Input without digits yields an empty string.
pub fn normalize(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return digits;
    }

    if digits.len() <= CNPJ_LENGTH {
        format!("{:0>width$}", digits, width = CNPJ_LENGTH)
    } else {
        debug!(input = raw, digits_len = digits.len(), "Truncating oversized CNPJ");
        digits[..CNPJ_LENGTH].to_string()
    }
}

/// Validate a normalized CNPJ with the weighted modulo-11 check digits.
pub fn validate(identifier: &str) -> bool {
    if identifier.len() != CNPJ_LENGTH {
        return false;
    }

    let digits: Vec<u32> = identifier.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != CNPJ_LENGTH {
        return false;
    }

    // Repeated sequences pass the arithmetic but are not real registrations
    if digits.iter().all(|d| *d == digits[0]) {
        debug!(cnpj = identifier, "CNPJ with all same digits");
        return false;
    }

    let first = check_digit(&digits[..12], &FIRST_CHECK_WEIGHTS);
    let second = check_digit(&digits[..13], &SECOND_CHECK_WEIGHTS);

    digits[12] == first && digits[13] == second
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        11 - remainder
    }
}

/// Format a valid-length CNPJ as XX.XXX.XXX/XXXX-XX
pub fn format(identifier: &str) -> Option<String> {
    if identifier.len() != CNPJ_LENGTH || !identifier.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!(
        "{}.{}.{}/{}-{}",
        &identifier[0..2],
        &identifier[2..5],
        &identifier[5..8],
        &identifier[8..12],
        &identifier[12..14]
    ))
}
