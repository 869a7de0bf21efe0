//! N-class classification output
//!
//! # Wire format
//!
//! ```text
//! [0..4)      reserved, always ESCAPE
//! [4]         phase
//! [5]         status code (ESCAPE = not provided)
//! [6]         class count N
//! [7]         predicted class index (ESCAPE = not provided)
//! [8..8+N)    per-class probability bytes
//! ```
//!
//! Only the phase is mandatory. An optional byte set to [`ESCAPE`] cannot be
//! told apart from an unset one, so encoding rejects it. Probability bytes
//! are sent as given; an application that has none to report fills them
//! with [`ESCAPE`].
//!
//! [`ESCAPE`]: crate::ble::codec::ESCAPE

use crate::ble::characteristic::{CharProperties, CharacteristicDescriptor};
use crate::ble::codec::{ByteReader, ByteWriter, CodecError, ESCAPE};
use crate::ble::uuid::{Uuid128, GROUP_EXTENDED};
use crate::config::att::MAX_ATTRIBUTE_SIZE;
use crate::features::Feature;

pub const UUID: Uuid128 = Uuid128::blue_st(0x0000_001A, GROUP_EXTENDED);

/// Bytes before the probability array
const HEADER_LEN: usize = 8;
const RESERVED_LEN: usize = 4;

/// Classifier phase
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle = 0x00,
    Classification = 0x01,
}

impl Phase {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Idle),
            0x01 => Some(Self::Classification),
            _ => None,
        }
    }
}

/// One classification result for `N` classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationOutput<const N: usize> {
    pub phase: Phase,
    pub status: Option<u8>,
    /// Index of the most likely class, below `N`
    pub major_class: Option<u8>,
    pub probabilities: [u8; N],
}

impl<const N: usize> ClassificationOutput<N> {
    /// Phase only, every optional field left unset
    pub fn phase_only(phase: Phase) -> Self {
        Self {
            phase,
            status: None,
            major_class: None,
            probabilities: [ESCAPE; N],
        }
    }
}

/// N-class classification characteristic (notify, write)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NClassClassification<const N: usize>;

impl<const N: usize> NClassClassification<N> {
    pub const VALUE_LEN: usize = HEADER_LEN + N;

    /// Rejects class counts that cannot be carried in the layout
    const LAYOUT_OK: () = assert!(
        N >= 1 && N < ESCAPE as usize && HEADER_LEN + N <= MAX_ATTRIBUTE_SIZE,
        "class count does not fit the classification layout"
    );

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::LAYOUT_OK;
        Self
    }

    fn check_class(class: Option<u8>) -> Result<(), CodecError> {
        match class {
            Some(index) if usize::from(index) >= N => Err(CodecError::InvalidField),
            _ => Ok(()),
        }
    }
}

impl<const N: usize> Default for NClassClassification<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Feature for NClassClassification<N> {
    type Value = ClassificationOutput<N>;

    const NAME: &'static str = "NEAI N-Class Classification";

    fn descriptor(&self) -> CharacteristicDescriptor {
        CharacteristicDescriptor::new(
            UUID,
            Self::VALUE_LEN,
            CharProperties::NOTIFY.union(CharProperties::WRITE),
        )
    }

    fn encode(&self, value: &Self::Value, out: &mut ByteWriter<'_>) -> Result<(), CodecError> {
        Self::check_class(value.major_class)?;

        out.put_escape(RESERVED_LEN)?;
        out.put_u8(value.phase as u8)?;
        out.put_opt_u8(value.status)?;
        out.put_u8(N as u8)?;
        out.put_opt_u8(value.major_class)?;
        out.put_slice(&value.probabilities)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value, CodecError> {
        let mut r = ByteReader::exact(bytes, Self::VALUE_LEN)?;
        r.skip(RESERVED_LEN)?;
        let phase = Phase::from_byte(r.u8()?).ok_or(CodecError::InvalidField)?;
        let status = r.opt_u8()?;
        if usize::from(r.u8()?) != N {
            return Err(CodecError::InvalidField);
        }
        let major_class = r.opt_u8()?;
        Self::check_class(major_class)?;
        let probabilities = r.array::<N>()?;

        Ok(ClassificationOutput {
            phase,
            status,
            major_class,
            probabilities,
        })
    }
}
