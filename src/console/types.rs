//! Console command and device identity types
//!
//! # Commands
//!
//! | Input  | Reply                                       |
//! |--------|---------------------------------------------|
//! | `help` | list of supported commands                  |
//! | `info` | package name, firmware version, MCU family  |
//! | `uid`  | 96-bit unique device ID and MCU ID          |
//!
//! Any other input is echoed back unchanged.

use crate::config::{console::MAX_TEXT_LEN, firmware};
use heapless::String;

/// Formatted reply for the Term characteristic
pub type ConsoleText = String<MAX_TEXT_LEN>;

/// Recognised console commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Print the command legend
    Help,
    /// Print firmware and platform information
    Info,
    /// Print the device unique ID
    Uid,
}

/// What the Term handler should send back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleAction {
    /// Echo the received bytes
    Echo,
    /// Send the reply text (may be empty)
    Handled,
}

/// Firmware version triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

/// Identity reported by the `info` and `uid` commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub package_name: &'static str,
    pub mcu_family: &'static str,
    pub version: FirmwareVersion,
    /// HAL version word: major, minor, patch, release candidate (MSB first)
    pub hal_version: u32,
    /// Raw 96-bit unique ID as read from the UID registers
    pub uid: [u8; 12],
    /// Debug MCU ID register; only the low 12 bits (device ID) are shown
    pub mcu_id: u32,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            package_name: firmware::PACKAGE_NAME,
            mcu_family: firmware::MCU_FAMILY,
            version: FirmwareVersion {
                major: firmware::VERSION_MAJOR,
                minor: firmware::VERSION_MINOR,
                patch: firmware::VERSION_PATCH,
            },
            hal_version: 0,
            uid: [0; 12],
            mcu_id: 0,
        }
    }
}
