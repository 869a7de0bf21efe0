//! Application hooks
//!
//! Connection events, config writes and console input are handed to an
//! [`AppHooks`] implementation supplied when the manager is built. Every
//! method has a default body, so an application only overrides what it
//! needs. Hooks run in the stack's event context and must not block.

use crate::console::ext_config;
use crate::console::{handle_console_input, ConsoleAction, ConsoleText, DeviceInfo};
use crate::features::EnvironmentalReading;

/// Peer address type reported with a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    Public,
    Random,
}

impl AddressType {
    pub fn from_byte(byte: u8) -> Self {
        if byte == 0 {
            Self::Public
        } else {
            Self::Random
        }
    }
}

/// Link established with a central
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub handle: u16,
    pub address_type: AddressType,
    pub address: [u8; 6],
}

/// Application callbacks with no-op defaults.
pub trait AppHooks {
    fn connection_completed(&mut self, connection: &ConnectionInfo) {
        log::info!("Call to ConnectionCompletedFunction (handle 0x{:04X})", connection.handle);
    }

    fn disconnection_completed(&mut self) {
        log::info!("Call to DisconnectionCompletedFunction");
    }

    /// Peer wrote to the config characteristic
    fn config_write(&mut self, _data: &[u8]) {}

    /// Peer wrote to the Term characteristic.
    ///
    /// Fill `reply` and return [`ConsoleAction::Handled`], or return
    /// [`ConsoleAction::Echo`] to send the input back.
    fn debug_console(
        &mut self,
        data: &[u8],
        device: &DeviceInfo,
        reply: &mut ConsoleText,
    ) -> ConsoleAction {
        handle_console_input(data, device, reply)
    }

    /// Peer read the environmental characteristic. Return the fresh sample,
    /// or `None` to leave the stored value in place.
    fn environmental_read_request(&mut self) -> Option<EnvironmentalReading> {
        None
    }

    /// Unique ID reported by the board report `UID` command
    fn ext_config_uid(&mut self, device: &DeviceInfo) -> [u8; 12] {
        device.uid
    }

    fn ext_config_version_fw(&mut self, device: &DeviceInfo, answer: &mut ConsoleText) {
        let _ = ext_config::write_version_fw(device, answer);
    }

    fn ext_config_info(&mut self, device: &DeviceInfo, answer: &mut ConsoleText) {
        let _ = ext_config::write_info(device, answer);
    }

    fn ext_config_help(&mut self, answer: &mut ConsoleText) {
        let _ = ext_config::write_help(answer);
    }
}

/// Hooks that keep every default
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHooks;

impl AppHooks for DefaultHooks {}
