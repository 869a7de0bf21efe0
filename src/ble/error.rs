//! Error types for characteristic registration and updates

use crate::ble::codec::CodecError;
use crate::ble::stack::StackStatus;

/// Failure while building the attribute table. Fatal to initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionError {
    /// Declared value length is zero or above the transport maximum
    InvalidValueLength { length: usize, max: usize },
    /// No room left for another characteristic
    AttributeTableFull,
    /// The stack refused the characteristic
    StackRefused(StackStatus),
    /// The stack failed to initialise
    StackInit(StackStatus),
    /// Feature configuration cannot be expressed as a characteristic
    InvalidLayout,
    /// A built-in service was enabled twice
    AlreadyEnabled,
}

/// Failure of an outbound characteristic update. Recoverable, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    /// The stack's update primitive did not report success
    StackRejected(StackStatus),
    /// The handle does not belong to a registered characteristic
    UnknownHandle,
    /// The value could not be packed into the characteristic layout
    Encode(CodecError),
}

impl From<CodecError> for UpdateError {
    fn from(err: CodecError) -> Self {
        UpdateError::Encode(err)
    }
}
