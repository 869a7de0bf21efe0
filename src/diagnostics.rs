//! Diagnostics sink for human-readable failure reports.
//!
//! Failed characteristic updates are reported through a [`DiagnosticsSink`].
//! Reporting is best effort: a sink that drops or truncates messages never
//! changes the result of the operation that produced them.

use core::cell::RefCell;
use core::fmt::Write;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use heapless::String;

use crate::config::diagnostics::MAX_MESSAGE_LEN;

/// A single formatted diagnostics message
pub type DiagnosticMessage = String<MAX_MESSAGE_LEN>;

/// Destination for failure strings.
pub trait DiagnosticsSink {
    /// Deliver one message. Must not block.
    fn report(&mut self, msg: &str);

    /// Deliver a low-severity message, such as an event dropped for lack of
    /// a callback. Defaults to [`report`](Self::report).
    fn notice(&mut self, msg: &str) {
        self.report(msg);
    }

    /// Format into a bounded buffer and deliver it as one message.
    ///
    /// Output longer than [`MAX_MESSAGE_LEN`] is truncated.
    fn report_fmt(&mut self, args: core::fmt::Arguments) {
        let mut s: DiagnosticMessage = String::new();
        let _ = s.write_fmt(args);
        self.report(&s);
    }

    /// Formatting counterpart of [`notice`](Self::notice)
    fn notice_fmt(&mut self, args: core::fmt::Arguments) {
        let mut s: DiagnosticMessage = String::new();
        let _ = s.write_fmt(args);
        self.notice(&s);
    }
}

impl<T: DiagnosticsSink + ?Sized> DiagnosticsSink for &mut T {
    fn report(&mut self, msg: &str) {
        (**self).report(msg);
    }

    fn notice(&mut self, msg: &str) {
        (**self).notice(msg);
    }
}

/// Sink that forwards to the `log` facade: failures at error level,
/// notices at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn report(&mut self, msg: &str) {
        log::error!("{}", msg);
    }

    fn notice(&mut self, msg: &str) {
        log::warn!("{}", msg);
    }
}

/// Holds the most recent diagnostics message for an async drain task.
///
/// Writers never wait: a new message replaces the previous one if it was
/// not collected yet. Typically placed in a `static` and shared as
/// `&'static DiagnosticsBuffer`.
pub struct DiagnosticsBuffer {
    message: Mutex<CriticalSectionRawMutex, RefCell<DiagnosticMessage>>,
    ready: Signal<CriticalSectionRawMutex, ()>,
}

impl DiagnosticsBuffer {
    pub const fn new() -> Self {
        Self {
            message: Mutex::new(RefCell::new(String::new())),
            ready: Signal::new(),
        }
    }

    /// Store a message, truncating it to the buffer capacity.
    pub fn write(&self, msg: &str) {
        self.message.lock(|cell| {
            let mut buffer = cell.borrow_mut();
            buffer.clear();
            for c in msg.chars() {
                if buffer.push(c).is_err() {
                    break;
                }
            }
        });
        self.ready.signal(());
    }

    /// Take the pending message, leaving the buffer empty.
    pub fn take(&self) -> Option<DiagnosticMessage> {
        self.message.lock(|cell| {
            let mut buffer = cell.borrow_mut();
            if buffer.is_empty() {
                None
            } else {
                let msg = buffer.clone();
                buffer.clear();
                Some(msg)
            }
        })
    }

    /// Wait until a message is available and take it.
    pub async fn next_message(&self) -> DiagnosticMessage {
        loop {
            self.ready.wait().await;
            if let Some(msg) = self.take() {
                return msg;
            }
        }
    }
}

impl Default for DiagnosticsBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticsSink for DiagnosticsBuffer {
    fn report(&mut self, msg: &str) {
        self.write(msg);
    }
}

impl DiagnosticsSink for &DiagnosticsBuffer {
    fn report(&mut self, msg: &str) {
        self.write(msg);
    }
}

#[cfg(test)]
pub mod mock {
    //! Recording sink for unit tests

    use super::*;
    use heapless::Vec;

    /// Keeps every reported message
    #[derive(Default)]
    pub struct RecordingSink {
        pub messages: Vec<DiagnosticMessage, 16>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DiagnosticsSink for RecordingSink {
        fn report(&mut self, msg: &str) {
            let mut s = String::new();
            let _ = s.push_str(msg);
            let _ = self.messages.push(s);
        }
    }
}
