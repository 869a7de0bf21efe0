//! External BLE stack interface
//!
//! The link layer, GATT server and security manager live in a vendor stack
//! that this crate never reimplements. [`BleStack`] is the narrow surface
//! the manager needs from it, so the stack can be swapped for a mock in
//! tests.

use core::fmt::Write;

use heapless::String;

use crate::ble::characteristic::{AttributeHandles, CharacteristicDescriptor};
use crate::config::{firmware, stack_defaults};

/// Raw status code returned by the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackStatus(pub u8);

impl StackStatus {
    pub const SUCCESS: Self = Self(0x00);
    pub const FAILED: Self = Self(0x41);
    pub const INVALID_PARAMS: Self = Self(0x42);
    pub const BUSY: Self = Self(0x43);
    pub const NOT_ALLOWED: Self = Self(0x46);
    pub const OUT_OF_MEMORY: Self = Self(0x48);
    pub const INSUFFICIENT_RESOURCES: Self = Self(0x64);
    pub const TIMEOUT: Self = Self(0xFF);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    pub fn code(self) -> u8 {
        self.0
    }
}

/// Length of the advertised board name
pub const BOARD_NAME_LEN: usize = 8;

/// Stack and service settings applied once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    /// Advertised name, `BLEM` followed by the firmware version digits
    pub board_name: String<BOARD_NAME_LEN>,
    pub enable_high_power_mode: bool,
    /// 0x00 ..= 0x31, device dependent
    pub power_amplifier_output_level: u8,
    pub enable_secure_connection: bool,
    pub secure_pin: u32,
    pub enable_random_secure_pin: bool,
    /// Host-driven rescan; only used without secure connections
    pub force_rescan: bool,
    /// Register the config characteristic
    pub enable_config: bool,
    /// Register the Term / StdErr console characteristics
    pub enable_console: bool,
    pub enable_ext_config: bool,
}

impl StackConfig {
    /// Switch secure connections on or off, keeping the rescan rule in step.
    pub fn with_secure_connection(mut self, enable: bool) -> Self {
        self.enable_secure_connection = enable;
        self.force_rescan = !enable;
        self
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        let mut board_name = String::new();
        let _ = write!(
            board_name,
            "{}{}{}{}",
            firmware::BOARD_NAME_PREFIX,
            firmware::VERSION_MAJOR,
            firmware::VERSION_MINOR,
            firmware::VERSION_PATCH
        );

        Self {
            board_name,
            enable_high_power_mode: stack_defaults::ENABLE_HIGH_POWER_MODE,
            power_amplifier_output_level: stack_defaults::POWER_AMPLIFIER_OUTPUT_LEVEL,
            enable_secure_connection: stack_defaults::ENABLE_SECURE_CONNECTION,
            secure_pin: stack_defaults::SECURE_PIN,
            enable_random_secure_pin: stack_defaults::ENABLE_RANDOM_SECURE_PIN,
            force_rescan: !stack_defaults::ENABLE_SECURE_CONNECTION,
            enable_config: stack_defaults::ENABLE_CONFIG,
            enable_console: stack_defaults::ENABLE_CONSOLE,
            enable_ext_config: stack_defaults::ENABLE_EXT_CONFIG,
        }
    }
}

/// Capabilities consumed from the vendor BLE stack.
///
/// All calls are synchronous and bounded; the stack delivers inbound
/// events by calling into [`crate::ble::manager::BleManager`].
pub trait BleStack {
    /// Initialise the controller and GAP/GATT layers
    fn init(&mut self, config: &StackConfig) -> StackStatus;

    /// Add one characteristic to the attribute table
    fn add_characteristic(
        &mut self,
        descriptor: &CharacteristicDescriptor,
    ) -> Result<AttributeHandles, StackStatus>;

    /// Set the characteristic value and notify subscribed peers
    fn update_characteristic_value(
        &mut self,
        handles: &AttributeHandles,
        offset: u16,
        value: &[u8],
    ) -> StackStatus;
}
