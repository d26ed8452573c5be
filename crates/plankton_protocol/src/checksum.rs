//! # Datagram Checksum
//!
//! Additive integrity value appended to login and logout traffic.
//!
//! ```text
//! checksum = Σ (64548 + byte * 6597)      (wrapping u32)
//! ```
//!
//! It filters out corrupted or random datagrams. It is NOT authentication:
//! anyone who knows the formula can produce a valid value.

use crate::error::{WireError, WireResult};

/// Constant added for every byte.
pub const CHECKSUM_BASE: u32 = 64548;

/// Multiplier applied to every byte value.
pub const CHECKSUM_FACTOR: u32 = 6597;

/// Size of the trailing checksum field.
pub const CHECKSUM_SIZE: usize = 4;

/// Computes the checksum of `bytes`.
#[must_use]
pub fn compute(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &byte| {
        acc.wrapping_add(CHECKSUM_BASE.wrapping_add(u32::from(byte).wrapping_mul(CHECKSUM_FACTOR)))
    })
}

/// Verifies a record whose last four bytes carry its checksum.
///
/// # Errors
///
/// [`WireError::Truncated`] if the record is shorter than the checksum field,
/// [`WireError::ChecksumMismatch`] if the values differ.
pub fn verify(record: &[u8]) -> WireResult<()> {
    if record.len() < CHECKSUM_SIZE {
        return Err(WireError::Truncated {
            needed: CHECKSUM_SIZE,
            remaining: record.len(),
        });
    }
    let (body, trailer) = record.split_at(record.len() - CHECKSUM_SIZE);
    let received = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let computed = compute(body);
    if computed == received {
        Ok(())
    } else {
        Err(WireError::ChecksumMismatch { computed, received })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(compute(&[]), 0);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(compute(&[0]), 64548);
        assert_eq!(compute(&[1]), 64548 + 6597);
        assert_eq!(compute(&[1, 2]), 2 * 64548 + 3 * 6597);
    }

    #[test]
    fn test_wraps_instead_of_overflowing() {
        let bytes = [0xFFu8; 10_000];
        let expected = (0..10_000u32).fold(0u32, |acc, _| {
            acc.wrapping_add(64548u32.wrapping_add(255 * 6597))
        });
        assert_eq!(compute(&bytes), expected);
    }

    #[test]
    fn test_verify_trailer() {
        let mut record = vec![2u8, 7, 7, 7];
        let sum = compute(&record);
        record.extend_from_slice(&sum.to_le_bytes());
        assert!(verify(&record).is_ok());

        record[1] = 8;
        assert!(matches!(verify(&record), Err(WireError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_verify_short_record() {
        assert!(matches!(verify(&[1, 2]), Err(WireError::Truncated { .. })));
    }
}
