//! Bounded Answer-To-Reset buffer

use std::fmt;

use thiserror::Error;

/// Maximum length of an ATR, in bytes.
pub const MAX_ATR_SIZE: usize = 40;

/// Error returned when an ATR buffer exceeds [`MAX_ATR_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("ATR of {len} bytes exceeds the {MAX_ATR_SIZE}-byte maximum")]
pub struct AtrError {
    /// Length of the rejected buffer.
    pub len: usize,
}

/// Answer-To-Reset bytes returned by a card on power-on.
///
/// The buffer is bounded at construction, so an over-long ATR can never
/// travel through the event queue or reach the device's cache. A
/// zero-length value represents "no card present".
#[derive(Clone, Copy)]
pub struct Atr {
    data: [u8; MAX_ATR_SIZE],
    len: u8,
}

impl Atr {
    /// The zero-length ATR, reported while no card is inserted.
    pub const fn empty() -> Self {
        Self {
            data: [0; MAX_ATR_SIZE],
            len: 0,
        }
    }

    /// Copy `bytes` into a bounded ATR.
    ///
    /// Fails if `bytes` is longer than [`MAX_ATR_SIZE`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AtrError> {
        if bytes.len() > MAX_ATR_SIZE {
            return Err(AtrError { len: bytes.len() });
        }
        let mut data = [0; MAX_ATR_SIZE];
        data[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            data,
            len: bytes.len() as u8,
        })
    }

    /// The ATR bytes, without padding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// Length of the ATR in bytes.
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether the ATR is zero-length (no card present).
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for Atr {
    fn default() -> Self {
        Self::empty()
    }
}

impl AsRef<[u8]> for Atr {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl TryFrom<&[u8]> for Atr {
    type Error = AtrError;

    fn try_from(bytes: &[u8]) -> Result<Self, AtrError> {
        Self::from_bytes(bytes)
    }
}

impl PartialEq for Atr {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Atr {}

impl fmt::Debug for Atr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Atr")
            .field(&hex::encode_upper(self.as_bytes()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_atr_has_zero_length() {
        let atr = Atr::empty();
        assert!(atr.is_empty());
        assert_eq!(atr.len(), 0);
        assert_eq!(atr.as_bytes(), &[] as &[u8]);
    }

    #[test]
    fn round_trips_without_padding_or_truncation() {
        let bytes = [0x3B, 0x00];
        let atr = Atr::from_bytes(&bytes).unwrap();
        assert_eq!(atr.as_bytes(), &bytes);
        assert_eq!(atr.len(), 2);
    }

    #[test]
    fn accepts_maximum_length() {
        let bytes = [0xA5; MAX_ATR_SIZE];
        let atr = Atr::from_bytes(&bytes).unwrap();
        assert_eq!(atr.len(), MAX_ATR_SIZE);
        assert_eq!(atr.as_bytes(), &bytes);
    }

    #[test]
    fn rejects_over_long_buffer() {
        let bytes = [0xA5; MAX_ATR_SIZE + 1];
        let err = Atr::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.len, MAX_ATR_SIZE + 1);
    }

    #[test]
    fn equality_ignores_padding() {
        let a = Atr::from_bytes(&[0x3B, 0x95]).unwrap();
        let b = Atr::from_bytes(&[0x3B, 0x95]).unwrap();
        let c = Atr::from_bytes(&[0x3B]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
