//! Board report commands of the extended configuration service
//!
//! Produces the default answers for the board report commands. Decoding
//! the command envelope is left to the application transport.

use core::fmt::Write;

use crate::console::types::{ConsoleText, DeviceInfo};

/// Board report commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtConfigCommand {
    /// STM32 unique ID
    Uid,
    /// `<mcu>_<package>_<major>.<minor>.<patch>`
    VersionFw,
    /// Package, firmware and HAL versions
    Info,
    /// List of available commands
    Help,
}

impl ExtConfigCommand {
    /// Look up a command by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "UID" => Some(Self::Uid),
            "VersionFw" => Some(Self::VersionFw),
            "Info" => Some(Self::Info),
            "Help" => Some(Self::Help),
            _ => None,
        }
    }
}

pub fn write_version_fw(device: &DeviceInfo, out: &mut ConsoleText) -> core::fmt::Result {
    let v = device.version;
    write!(
        out,
        "{}_{}_{}.{}.{}",
        device.mcu_family, device.package_name, v.major, v.minor, v.patch
    )
}

pub fn write_info(device: &DeviceInfo, out: &mut ConsoleText) -> core::fmt::Result {
    let v = device.version;
    let hal = device.hal_version;
    write!(
        out,
        "STMicroelectronics {}:\nVersion {}.{}.{}\n(HAL {}.{}.{}_{})\n",
        device.package_name,
        v.major,
        v.minor,
        v.patch,
        hal >> 24,
        (hal >> 16) & 0xFF,
        (hal >> 8) & 0xFF,
        hal & 0xFF
    )
}

pub fn write_help(out: &mut ConsoleText) -> core::fmt::Result {
    out.write_str(
        "List of available command:\n1) Board Report\n- STM32 UID\n- Version Firmware\n- Info\n- Help\n\n",
    )
}
