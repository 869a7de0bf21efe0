//! Console command parser
//!
//! Matches the leading bytes of a Term write against the known commands.
//! Trailing bytes (line endings, arguments) are ignored.

use crate::console::types::ConsoleCommand;

/// Parser for debug console input
pub struct ConsoleParser;

impl ConsoleParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a Term write into a command, or `None` for free text
    pub fn parse(&self, data: &[u8]) -> Option<ConsoleCommand> {
        if data.starts_with(b"help") {
            Some(ConsoleCommand::Help)
        } else if data.starts_with(b"info") {
            Some(ConsoleCommand::Info)
        } else if data.starts_with(b"uid") {
            Some(ConsoleCommand::Uid)
        } else {
            None
        }
    }
}

impl Default for ConsoleParser {
    fn default() -> Self {
        Self::new()
    }
}
