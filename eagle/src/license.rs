//! AccessKey validation.
//!
//! The AccessKey is an opaque entitlement token checked once at construction;
//! per-call operations never re-validate it. This implementation performs a
//! structural offline check only. A deployment wiring a real entitlement
//! service behind the engine reports its outcomes through the reserved
//! activation error kinds (limit reached, throttled, refused).

use crate::error::EagleError;

const MIN_KEY_LEN: usize = 8;

/// Validates the structure of an AccessKey.
///
/// An empty key is an argument error; a key that is present but malformed
/// (wrong alphabet, too short) is an activation error.
pub(crate) fn validate_access_key(access_key: &str) -> Result<(), EagleError> {
    if access_key.is_empty() {
        return Err(EagleError::InvalidArgument(
            "access key must be a non-empty string".into(),
        ));
    }
    if access_key.len() < MIN_KEY_LEN {
        return Err(EagleError::Activation(format!(
            "access key is too short ({} chars, minimum {MIN_KEY_LEN})",
            access_key.len()
        )));
    }
    if !access_key.bytes().all(is_key_byte) {
        return Err(EagleError::Activation(
            "access key contains characters outside the Base64 alphabet".into(),
        ));
    }
    Ok(())
}

fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='
}
