//! Build-time configuration constants for the BLE feature manager

/// Attribute table limits
pub mod att {
    /// Largest characteristic value the transport accepts, in bytes
    pub const MAX_ATTRIBUTE_SIZE: usize = 512;

    /// Number of characteristics the manager can track
    pub const MAX_CHARACTERISTICS: usize = 16;

    /// Encryption key size handed to the stack for every characteristic
    pub const DEFAULT_ENC_KEY_SIZE: u8 = 16;
}

/// Debug console (Term / StdErr) characteristics
pub mod console {
    /// Width of one Term or StdErr notification
    pub const MAX_CHAR_LEN: usize = 20;

    /// Longest formatted console reply
    pub const MAX_TEXT_LEN: usize = 256;
}

/// Config characteristic
pub mod config_char {
    pub const VALUE_LEN: usize = 20;
}

/// Firmware identity reported by the console `info` and `uid` commands
pub mod firmware {
    pub const PACKAGE_NAME: &str = "X-CUBE-BLEMGR";
    pub const MCU_FAMILY: &str = "STM32L4xx";

    pub const VERSION_MAJOR: u8 = 1;
    pub const VERSION_MINOR: u8 = 3;
    pub const VERSION_PATCH: u8 = 0;

    /// Prefix of the advertised board name, followed by the version digits
    pub const BOARD_NAME_PREFIX: &str = "BLEM";
}

/// Defaults used to populate [`crate::ble::stack::StackConfig`]
pub mod stack_defaults {
    pub const SECURE_PIN: u32 = 123_456;
    pub const ENABLE_SECURE_CONNECTION: bool = false;
    pub const ENABLE_RANDOM_SECURE_PIN: bool = false;
    pub const ENABLE_HIGH_POWER_MODE: bool = false;
    /// 0x00 ..= 0x31, device dependent
    pub const POWER_AMPLIFIER_OUTPUT_LEVEL: u8 = 0x04;

    pub const ENABLE_CONFIG: bool = true;
    pub const ENABLE_CONSOLE: bool = true;
    pub const ENABLE_EXT_CONFIG: bool = true;
}

/// Diagnostics sink
pub mod diagnostics {
    /// Maximum length of a single diagnostics message
    pub const MAX_MESSAGE_LEN: usize = 128;
}
