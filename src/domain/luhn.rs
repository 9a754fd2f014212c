//! Mod-10 (Luhn) checksum over decimal identifiers.
//!
//! Non-digit characters are ignored, so formatted numbers such as
//! `4111 1111 1111 1111` validate the same as their digit-only form.

use crate::error::{CardError, Result};

fn digits(input: &str) -> Vec<u32> {
    input.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// Weighted sum of `digits` where the rightmost digit is doubled when
/// `double_rightmost` is set, and the weighting alternates leftwards.
fn weighted_sum(digits: &[u32], double_rightmost: bool) -> u32 {
    digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            let doubled = (i % 2 == 0) == double_rightmost;
            if doubled {
                let d = d * 2;
                if d > 9 { d - 9 } else { d }
            } else {
                d
            }
        })
        .sum()
}

/// Returns true when `number` carries a valid Luhn check digit.
pub fn is_valid(number: &str) -> bool {
    let digits = digits(number);
    if digits.is_empty() {
        return false;
    }
    let valid = weighted_sum(&digits, false) % 10 == 0;
    if !valid {
        tracing::trace!("Luhn check failed");
    }
    valid
}

/// Computes the check digit to append to `prefix`.
pub fn check_digit(prefix: &str) -> Result<u32> {
    let digits = digits(prefix);
    if digits.is_empty() {
        return Err(CardError::InvalidRequest(
            "Input number cannot be empty".to_string(),
        ));
    }
    Ok((10 - weighted_sum(&digits, true) % 10) % 10)
}

/// Appends the check digit to a digit-only `prefix`.
pub fn complete(prefix: &str) -> Result<String> {
    let check = check_digit(prefix)?;
    Ok(format!("{prefix}{check}"))
}
