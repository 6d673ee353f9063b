//! Checksum verification of downloaded release binaries.

use crate::errors::RunnerError;

/// Compares a published SHA-256 with the one computed during download.
///
/// Both sides are hex; case and surrounding whitespace are ignored.
///
/// # Errors
///
/// Returns `ChecksumMismatch` when the digests differ.
pub fn verify_sha256(expected: &str, actual: &str) -> Result<(), RunnerError> {
    let expected = expected.trim().to_lowercase();
    let actual = actual.trim().to_lowercase();

    if expected == actual {
        log::debug!("checksum ok: {actual}");
        Ok(())
    } else {
        Err(RunnerError::checksum_mismatch(expected, actual))
    }
}
