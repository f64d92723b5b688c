// Path: crates/types/src/codec.rs
//! Canonical SCALE encoding for every value persisted in, or proven against,
//! the IBC store.

use parity_scale_codec::{Decode, DecodeAll, Encode};

/// Encodes a value into its canonical byte representation.
pub fn to_bytes_canonical<T: Encode>(value: &T) -> Vec<u8> {
    value.encode()
}

/// Decodes a value from its canonical byte representation.
///
/// Trailing bytes are rejected so that two different byte strings can never
/// decode to the same value.
pub fn from_bytes_canonical<T: Decode>(bytes: &[u8]) -> Result<T, String> {
    T::decode_all(&mut &*bytes).map_err(|e| format!("canonical decode failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = to_bytes_canonical(&42u64);
        assert_eq!(from_bytes_canonical::<u64>(&bytes), Ok(42));
        bytes.push(0);
        assert!(from_bytes_canonical::<u64>(&bytes).is_err());
    }
}
