//! Sensor fusion quaternion characteristic
//!
//! # Wire format
//!
//! ```text
//! [timestamp: u16 LE] { [x: i16 LE][y: i16 LE][z: i16 LE] } * Q
//! ```
//!
//! Quaternion vector components are unit values scaled by 10000; the scalar
//! part is implied. Up to three quaternions are batched per notification.

use crate::ble::characteristic::{CharProperties, CharacteristicDescriptor};
use crate::ble::codec::{ByteReader, ByteWriter, CodecError};
use crate::ble::uuid::{Uuid128, GROUP_STANDARD};
use crate::features::Feature;

pub const UUID: Uuid128 = Uuid128::blue_st(0x0000_0100, GROUP_STANDARD);

/// Fixed-point scale of each component
pub const SCALE: f32 = 10_000.0;

/// Quaternion vector part in fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Quaternion {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Quaternion {
    /// Convert unit components in -1.0 ..= 1.0, saturating outside that range
    pub fn from_unit(x: f32, y: f32, z: f32) -> Self {
        Self {
            x: (x * SCALE) as i16,
            y: (y * SCALE) as i16,
            z: (z * SCALE) as i16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorFusionSample<const Q: usize> {
    pub timestamp: u16,
    pub quaternions: [Quaternion; Q],
}

/// Sensor fusion characteristic carrying `Q` quaternions (notify)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorFusion<const Q: usize>;

impl<const Q: usize> SensorFusion<Q> {
    pub const VALUE_LEN: usize = 2 + 6 * Q;

    const LAYOUT_OK: () = assert!(Q >= 1 && Q <= 3, "1 to 3 quaternions per notification");

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::LAYOUT_OK;
        Self
    }
}

impl<const Q: usize> Default for SensorFusion<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const Q: usize> Feature for SensorFusion<Q> {
    type Value = SensorFusionSample<Q>;

    const NAME: &'static str = "Sensor Fusion";

    fn descriptor(&self) -> CharacteristicDescriptor {
        CharacteristicDescriptor::new(UUID, Self::VALUE_LEN, CharProperties::NOTIFY)
    }

    fn encode(&self, value: &Self::Value, out: &mut ByteWriter<'_>) -> Result<(), CodecError> {
        out.put_u16_le(value.timestamp)?;
        for q in &value.quaternions {
            out.put_i16_le(q.x)?;
            out.put_i16_le(q.y)?;
            out.put_i16_le(q.z)?;
        }
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value, CodecError> {
        let mut r = ByteReader::exact(bytes, Self::VALUE_LEN)?;
        let timestamp = r.u16_le()?;
        let mut quaternions = [Quaternion::default(); Q];
        for q in quaternions.iter_mut() {
            *q = Quaternion {
                x: r.i16_le()?,
                y: r.i16_le()?,
                z: r.i16_le()?,
            };
        }
        Ok(SensorFusionSample {
            timestamp,
            quaternions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::encode_value;

    #[test]
    fn test_single_quaternion_layout() {
        let sample = SensorFusionSample {
            timestamp: 1,
            quaternions: [Quaternion::from_unit(0.5, -0.25, 1.0)],
        };
        let mut buf = [0u8; 32];
        let bytes = encode_value(&SensorFusion::<1>::new(), &sample, &mut buf).unwrap();
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[2..4], &5000i16.to_le_bytes());
        assert_eq!(&bytes[4..6], &(-2500i16).to_le_bytes());
        assert_eq!(&bytes[6..8], &10000i16.to_le_bytes());
    }

    #[test]
    fn test_three_quaternions_decode() {
        let fusion = SensorFusion::<3>::new();
        let sample = SensorFusionSample {
            timestamp: 0xBEEF,
            quaternions: [
                Quaternion { x: 1, y: 2, z: 3 },
                Quaternion { x: -1, y: -2, z: -3 },
                Quaternion {
                    x: i16::MAX,
                    y: i16::MIN,
                    z: 0,
                },
            ],
        };
        let mut buf = [0u8; 32];
        let bytes = encode_value(&fusion, &sample, &mut buf).unwrap();
        assert_eq!(bytes.len(), SensorFusion::<3>::VALUE_LEN);
        assert_eq!(fusion.decode(bytes), Ok(sample));
    }

    #[test]
    fn test_from_unit_saturates() {
        let q = Quaternion::from_unit(4.0, -4.0, 0.0);
        assert_eq!(q.x, i16::MAX);
        assert_eq!(q.y, i16::MIN);
    }
}
