//! Characteristic descriptors
//!
//! A [`CharacteristicDescriptor`] is built once per feature during
//! initialisation, handed to the stack's attribute table and never changed
//! afterwards.

use bitflags::bitflags;

use crate::ble::error::ConstructionError;
use crate::ble::uuid::Uuid128;
use crate::config::att::{DEFAULT_ENC_KEY_SIZE, MAX_ATTRIBUTE_SIZE};

bitflags! {
    /// Characteristic properties (Bluetooth Core Vol 3, Part G, 3.3.1.1)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CharProperties: u8 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_WITHOUT_RESP = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
        const SIGNED_WRITE = 0x40;
        const EXTENDED = 0x80;
    }
}

bitflags! {
    /// Access permissions passed opaquely to the stack
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SecurityPermissions: u8 {
        const AUTHEN_READ = 0x01;
        const AUTHOR_READ = 0x02;
        const ENCRY_READ = 0x04;
        const AUTHEN_WRITE = 0x08;
        const AUTHOR_WRITE = 0x10;
        const ENCRY_WRITE = 0x20;
    }
}

bitflags! {
    /// Which GATT events the stack reports for the characteristic
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GattEventMask: u8 {
        const ATTRIBUTE_WRITE = 0x01;
        const WRITE_REQ_AND_WAIT_FOR_APPL_RESP = 0x02;
        const READ_REQ_AND_WAIT_FOR_APPL_RESP = 0x04;
    }
}

/// Everything the stack needs to add one characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicDescriptor {
    pub uuid: Uuid128,
    /// Value length in bytes. Exact for fixed characteristics, an upper
    /// bound for variable ones.
    pub value_length: usize,
    pub properties: CharProperties,
    pub security_permissions: SecurityPermissions,
    pub gatt_event_mask: GattEventMask,
    pub encryption_key_size: u8,
    pub is_variable: bool,
}

impl CharacteristicDescriptor {
    /// Fixed-length descriptor with no security requirements
    pub const fn new(uuid: Uuid128, value_length: usize, properties: CharProperties) -> Self {
        Self {
            uuid,
            value_length,
            properties,
            security_permissions: SecurityPermissions::empty(),
            gatt_event_mask: GattEventMask::ATTRIBUTE_WRITE,
            encryption_key_size: DEFAULT_ENC_KEY_SIZE,
            is_variable: false,
        }
    }

    pub const fn with_permissions(mut self, permissions: SecurityPermissions) -> Self {
        self.security_permissions = permissions;
        self
    }

    pub const fn with_event_mask(mut self, mask: GattEventMask) -> Self {
        self.gatt_event_mask = mask;
        self
    }

    /// Allow updates shorter than `value_length`
    pub const fn variable(mut self) -> Self {
        self.is_variable = true;
        self
    }

    /// Peers can subscribe to notifications or indications
    pub fn has_subscription(&self) -> bool {
        self.properties
            .intersects(CharProperties::NOTIFY | CharProperties::INDICATE)
    }

    pub fn is_writable(&self) -> bool {
        self.properties
            .intersects(CharProperties::WRITE | CharProperties::WRITE_WITHOUT_RESP)
    }

    /// Check the declared length against the transport limit.
    pub fn validate(&self) -> Result<(), ConstructionError> {
        if self.value_length == 0 || self.value_length > MAX_ATTRIBUTE_SIZE {
            return Err(ConstructionError::InvalidValueLength {
                length: self.value_length,
                max: MAX_ATTRIBUTE_SIZE,
            });
        }
        Ok(())
    }

    /// Whether an update of `len` bytes fits this characteristic
    pub fn accepts_length(&self, len: usize) -> bool {
        if self.is_variable {
            len <= self.value_length
        } else {
            len == self.value_length
        }
    }
}

/// Attribute handles the stack assigned to one characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeHandles {
    /// Characteristic declaration
    pub declaration: u16,
    /// Characteristic value
    pub value: u16,
    /// Client characteristic configuration descriptor, if the
    /// characteristic notifies or indicates
    pub cccd: Option<u16>,
}

impl AttributeHandles {
    pub fn contains(&self, attribute_handle: u16) -> bool {
        attribute_handle == self.declaration
            || attribute_handle == self.value
            || self.cccd == Some(attribute_handle)
    }
}
