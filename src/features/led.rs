//! LED status characteristic
//!
//! Wire format: `[timestamp: u16 LE][status: u8]`

use crate::ble::characteristic::{CharProperties, CharacteristicDescriptor};
use crate::ble::codec::{ByteReader, ByteWriter, CodecError};
use crate::ble::uuid::{Uuid128, GROUP_STANDARD};
use crate::features::Feature;

pub const UUID: Uuid128 = Uuid128::blue_st(0x2000_0000, GROUP_STANDARD);

const VALUE_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedStatus {
    pub timestamp: u16,
    /// 0 = off, anything else is board specific (usually 1 = on)
    pub status: u8,
}

/// LED characteristic (notify, read)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Led;

impl Feature for Led {
    type Value = LedStatus;

    const NAME: &'static str = "LED";

    fn descriptor(&self) -> CharacteristicDescriptor {
        CharacteristicDescriptor::new(
            UUID,
            VALUE_LEN,
            CharProperties::NOTIFY.union(CharProperties::READ),
        )
    }

    fn encode(&self, value: &Self::Value, out: &mut ByteWriter<'_>) -> Result<(), CodecError> {
        out.put_u16_le(value.timestamp)?;
        out.put_u8(value.status)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value, CodecError> {
        let mut r = ByteReader::exact(bytes, VALUE_LEN)?;
        Ok(LedStatus {
            timestamp: r.u16_le()?,
            status: r.u8()?,
        })
    }
}
