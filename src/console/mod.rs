//! Debug console commands
//!
//! Text written by a peer to the Term characteristic is parsed here; the
//! replies are formatted for the same characteristic.

pub mod ext_config;
pub mod parser;
pub mod responder;
pub mod types;

pub use ext_config::ExtConfigCommand;
pub use parser::ConsoleParser;
pub use responder::{handle_console_input, write_uid_words, ConsoleResponder};
pub use types::{ConsoleAction, ConsoleCommand, ConsoleText, DeviceInfo, FirmwareVersion};
