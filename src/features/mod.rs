//! Characteristic templates
//!
//! Each feature pairs a [`CharacteristicDescriptor`] with the fixed byte
//! layout of its value. Layouts are part of the public wire contract: a
//! peer's parser depends on the exact field order and widths.

pub mod classification;
pub mod environmental;
pub mod led;
pub mod sensor_fusion;

pub use classification::{ClassificationOutput, NClassClassification, Phase};
pub use environmental::{Environmental, EnvironmentalReading};
pub use led::{Led, LedStatus};
pub use sensor_fusion::{Quaternion, SensorFusion, SensorFusionSample};

use crate::ble::characteristic::CharacteristicDescriptor;
use crate::ble::codec::{ByteWriter, CodecError};

/// A characteristic with a typed value and a fixed byte layout.
pub trait Feature {
    /// Application-level value carried by the characteristic
    type Value;

    /// Short name used in logs and diagnostics
    const NAME: &'static str;

    fn descriptor(&self) -> CharacteristicDescriptor;

    /// Pack `value`; must fill exactly `descriptor().value_length` bytes
    fn encode(&self, value: &Self::Value, out: &mut ByteWriter<'_>) -> Result<(), CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value, CodecError>;

    /// How read requests are answered. `None` lets the stack serve the
    /// last value written.
    fn read_source(&self) -> Option<ReadSource> {
        None
    }
}

/// Features whose value is fetched from the application on each read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    /// Sample from [`AppHooks::environmental_read_request`]
    ///
    /// [`AppHooks::environmental_read_request`]: crate::ble::hooks::AppHooks::environmental_read_request
    Environmental(Environmental),
}

/// Serialise `value` into the front of `buf`, returning the encoded bytes.
///
/// Fails unless the encoding fills the declared value length exactly.
pub fn encode_value<'b, F: Feature>(
    feature: &F,
    value: &F::Value,
    buf: &'b mut [u8],
) -> Result<&'b [u8], CodecError> {
    let len = feature.descriptor().value_length;
    let out = buf.get_mut(..len).ok_or(CodecError::BufferOverflow)?;
    let mut writer = ByteWriter::new(out);
    feature.encode(value, &mut writer)?;
    let written = writer.finish()?;
    Ok(&buf[..written])
}
