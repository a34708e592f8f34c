//! Key and value validation
//!
//! Runs before any engine call. All checks are stateless.

use crate::error::{KvError, Result};

/// Reject empty keys
pub fn key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(KvError::InvalidKey);
    }
    Ok(())
}

/// Reject a missing value. Zero-length values are allowed.
pub fn value(value: Option<&[u8]>) -> Result<&[u8]> {
    value.ok_or(KvError::InvalidValue)
}

/// Validate a key/value pair for a write
pub fn entry(k: &[u8], v: &[u8]) -> Result<()> {
    key(k)?;
    value(Some(v))?;
    Ok(())
}

/// Validate iterator bounds
///
/// `None` means unbounded; `Some` with an empty slice is a caller mistake.
pub fn bounds(start: Option<&[u8]>, end: Option<&[u8]>) -> Result<()> {
    let empty = |b: Option<&[u8]>| matches!(b, Some(b) if b.is_empty());
    if empty(start) || empty(end) {
        return Err(KvError::InvalidKey);
    }
    Ok(())
}
