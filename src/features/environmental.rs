//! Environmental sensor characteristic
//!
//! # Wire format
//!
//! ```text
//! [timestamp: u16 LE][pressure: i32 LE]?[humidity: u16 LE]?[temperature: i16 LE]{0,2}
//! ```
//!
//! Optional fields are present only when enabled at registration. The
//! enabled set is also advertised in the UUID feature mask, so the peer
//! knows the layout before the first notification. Reads are answered by
//! the application on demand.

use crate::ble::characteristic::{CharProperties, CharacteristicDescriptor, GattEventMask};
use crate::ble::codec::{ByteReader, ByteWriter, CodecError};
use crate::ble::error::ConstructionError;
use crate::ble::uuid::{Uuid128, GROUP_STANDARD};
use crate::features::{Feature, ReadSource};

const MASK_PRESSURE: u32 = 0x0010_0000;
const MASK_HUMIDITY: u32 = 0x0008_0000;
const MASK_TEMPERATURE1: u32 = 0x0004_0000;
const MASK_TEMPERATURE2: u32 = 0x0001_0000;

const MAX_TEMPERATURES: u8 = 2;

/// One environmental sample in transport units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvironmentalReading {
    pub timestamp: u16,
    /// Pressure in hPa * 100
    pub pressure: i32,
    /// Relative humidity in % * 10
    pub humidity: u16,
    /// Temperatures in degrees C * 10
    pub temperatures: [i16; 2],
}

/// Environmental characteristic (notify, read)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environmental {
    pressure: bool,
    humidity: bool,
    temperatures: u8,
}

impl Environmental {
    pub fn new(pressure: bool, humidity: bool, temperatures: u8) -> Result<Self, ConstructionError> {
        if temperatures > MAX_TEMPERATURES || (!pressure && !humidity && temperatures == 0) {
            return Err(ConstructionError::InvalidLayout);
        }
        Ok(Self {
            pressure,
            humidity,
            temperatures,
        })
    }

    pub fn feature_mask(&self) -> u32 {
        let mut mask = 0;
        if self.pressure {
            mask |= MASK_PRESSURE;
        }
        if self.humidity {
            mask |= MASK_HUMIDITY;
        }
        if self.temperatures >= 1 {
            mask |= MASK_TEMPERATURE1;
        }
        if self.temperatures == 2 {
            mask |= MASK_TEMPERATURE2;
        }
        mask
    }

    pub fn value_length(&self) -> usize {
        let mut len = 2 + 2 * usize::from(self.temperatures);
        if self.pressure {
            len += 4;
        }
        if self.humidity {
            len += 2;
        }
        len
    }
}

impl Feature for Environmental {
    type Value = EnvironmentalReading;

    const NAME: &'static str = "Environmental";

    fn descriptor(&self) -> CharacteristicDescriptor {
        CharacteristicDescriptor::new(
            Uuid128::blue_st(self.feature_mask(), GROUP_STANDARD),
            self.value_length(),
            CharProperties::NOTIFY.union(CharProperties::READ),
        )
        .with_event_mask(GattEventMask::READ_REQ_AND_WAIT_FOR_APPL_RESP)
    }

    fn read_source(&self) -> Option<ReadSource> {
        Some(ReadSource::Environmental(*self))
    }

    fn encode(&self, value: &Self::Value, out: &mut ByteWriter<'_>) -> Result<(), CodecError> {
        out.put_u16_le(value.timestamp)?;
        if self.pressure {
            out.put_i32_le(value.pressure)?;
        }
        if self.humidity {
            out.put_u16_le(value.humidity)?;
        }
        for temperature in &value.temperatures[..usize::from(self.temperatures)] {
            out.put_i16_le(*temperature)?;
        }
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value, CodecError> {
        let mut r = ByteReader::exact(bytes, self.value_length())?;
        let mut reading = EnvironmentalReading {
            timestamp: r.u16_le()?,
            ..Default::default()
        };
        if self.pressure {
            reading.pressure = r.i32_le()?;
        }
        if self.humidity {
            reading.humidity = r.u16_le()?;
        }
        for slot in reading.temperatures.iter_mut().take(usize::from(self.temperatures)) {
            *slot = r.i16_le()?;
        }
        Ok(reading)
    }
}
