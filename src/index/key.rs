//! Fixed-width index keys.

use crate::error::{IndexError, Result};

/// Key width discriminator stored in the trailer (value = bytes per key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyWidth {
    W16 = 2,
    W32 = 4,
    W64 = 8,
    W128 = 16,
}

impl KeyWidth {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            2 => Some(KeyWidth::W16),
            4 => Some(KeyWidth::W32),
            8 => Some(KeyWidth::W64),
            16 => Some(KeyWidth::W128),
            _ => None,
        }
    }

    pub fn from_tag(v: u8) -> Result<Self> {
        Self::from_u8(v)
            .ok_or_else(|| IndexError::InvalidFormat(format!("Unknown key width: {}", v)))
    }

    pub fn bytes(self) -> usize {
        self as usize
    }

    pub fn bits(self) -> u32 {
        self as u32 * 8
    }
}

impl std::fmt::Display for KeyWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "u{}", self.bits())
    }
}

/// Unsigned integer usable as an index key.
pub trait IndexKey: Copy + Ord + std::fmt::Debug + Send + Sync + 'static {
    const WIDTH: KeyWidth;

    /// Append the little-endian encoding (`WIDTH` bytes).
    fn write_le(self, out: &mut Vec<u8>);

    /// Read from exactly `WIDTH` little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;

    fn to_u128(self) -> u128;

    /// Narrow from u128, `None` if the value does not fit.
    fn from_u128(v: u128) -> Option<Self>;
}

macro_rules! impl_index_key {
    ($t:ty, $width:expr) => {
        impl IndexKey for $t {
            const WIDTH: KeyWidth = $width;

            #[inline]
            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(bytes);
                <$t>::from_le_bytes(buf)
            }

            #[inline]
            fn to_u128(self) -> u128 {
                self as u128
            }

            #[inline]
            fn from_u128(v: u128) -> Option<Self> {
                <$t>::try_from(v).ok()
            }
        }
    };
}

impl_index_key!(u16, KeyWidth::W16);
impl_index_key!(u32, KeyWidth::W32);
impl_index_key!(u64, KeyWidth::W64);
impl_index_key!(u128, KeyWidth::W128);
