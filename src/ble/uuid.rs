//! 128-bit characteristic UUIDs
//!
//! All vendor characteristics share the BlueST base
//! `XXXXXXXX-GGGG-11e1-ac36-0002a5d5c51b`, where the first four bytes carry
//! the feature mask and `GGGG` selects the characteristic group.

use core::fmt;

/// Standard sensor features (environmental, LED, sensor fusion)
pub const GROUP_STANDARD: u16 = 0x0001;
/// Extended features (classification and other algorithm outputs)
pub const GROUP_EXTENDED: u16 = 0x0002;
/// Debug console (Term / StdErr)
pub const GROUP_CONSOLE: u16 = 0x000E;
/// Configuration characteristic
pub const GROUP_CONFIG: u16 = 0x000F;

const BLUE_ST_SUFFIX: [u8; 10] = [0x11, 0xe1, 0xac, 0x36, 0x00, 0x02, 0xa5, 0xd5, 0xc5, 0x1b];

/// 128-bit UUID in canonical (as written, most significant byte first) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uuid128([u8; 16]);

impl Uuid128 {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Build a BlueST characteristic UUID from a feature mask and group.
    pub const fn blue_st(feature_mask: u32, group: u16) -> Self {
        let m = feature_mask.to_be_bytes();
        let g = group.to_be_bytes();
        let s = BLUE_ST_SUFFIX;
        Self([
            m[0], m[1], m[2], m[3], g[0], g[1], s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7],
            s[8], s[9],
        ])
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Bytes in the little-endian order the stack expects on the wire
    pub fn to_le_bytes(&self) -> [u8; 16] {
        let mut out = self.0;
        out.reverse();
        out
    }

    /// Leading 32 bits (the feature mask for BlueST UUIDs)
    pub const fn feature_mask(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl fmt::Display for Uuid128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
