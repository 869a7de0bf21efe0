//! Console reply formatting
//!
//! Replies are written into a bounded [`ConsoleText`]; output that does not
//! fit is truncated.

use core::fmt::Write;

use crate::console::parser::ConsoleParser;
use crate::console::types::{ConsoleAction, ConsoleCommand, ConsoleText, DeviceInfo};

/// Formats replies for console commands
pub struct ConsoleResponder;

impl ConsoleResponder {
    pub fn new() -> Self {
        Self
    }

    /// Write the reply for `command` into `out`
    pub fn respond(&self, command: ConsoleCommand, device: &DeviceInfo, out: &mut ConsoleText) {
        out.clear();
        let _ = match command {
            ConsoleCommand::Help => self.write_help(out),
            ConsoleCommand::Info => self.write_info(device, out),
            ConsoleCommand::Uid => self.write_uid(device, out),
        };
    }

    fn write_help(&self, out: &mut ConsoleText) -> core::fmt::Result {
        out.write_str("Command:\r\ninfo-> System Info\r\nuid-> STM32 UID value\r\n")
    }

    fn write_info(&self, device: &DeviceInfo, out: &mut ConsoleText) -> core::fmt::Result {
        let v = device.version;
        let hal = device.hal_version;
        write!(
            out,
            "\r\nSTMicroelectronics {}:\r\n\tVersion {}.{}.{}\r\n\t{} MCU Family Name\r\n",
            device.package_name, v.major, v.minor, v.patch, device.mcu_family
        )?;
        write!(
            out,
            "\t(HAL {}.{}.{}_{})\r\n",
            hal >> 24,
            (hal >> 16) & 0xFF,
            (hal >> 8) & 0xFF,
            hal & 0xFF
        )
    }

    /// UID words are printed most significant byte first, word by word
    fn write_uid(&self, device: &DeviceInfo, out: &mut ConsoleText) -> core::fmt::Result {
        write_uid_words(&device.uid, out)?;
        write!(out, "_{:03X}\r\n", device.mcu_id & 0xFFF)
    }
}

impl Default for ConsoleResponder {
    fn default() -> Self {
        Self::new()
    }
}

/// Append the 96-bit unique ID as hex, each 32-bit word most significant
/// byte first.
pub fn write_uid_words(uid: &[u8; 12], out: &mut ConsoleText) -> core::fmt::Result {
    for word in uid.chunks_exact(4) {
        for byte in word.iter().rev() {
            write!(out, "{:02X}", byte)?;
        }
    }
    Ok(())
}

/// Default Term write handling: answer known commands, echo anything else.
pub fn handle_console_input(data: &[u8], device: &DeviceInfo, reply: &mut ConsoleText) -> ConsoleAction {
    match ConsoleParser::new().parse(data) {
        Some(command) => {
            ConsoleResponder::new().respond(command, device, reply);
            ConsoleAction::Handled
        }
        None => ConsoleAction::Echo,
    }
}
