//! Inbound attribute event demultiplexing
//!
//! The stack reports subscription changes and peer writes as raw byte
//! payloads. The functions here turn them into typed callback invocations.
//!
//! Callbacks run in the stack's event context. They must return promptly:
//! no I/O, no unbounded allocation, no waiting.

/// Subscription change decoded from a CCCD write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Subscribed,
    Unsubscribed,
}

impl SubscriptionEvent {
    /// Decode the first payload byte: 1 subscribes, 0 unsubscribes,
    /// anything else (or an empty payload) is not recognised.
    pub fn from_payload(raw: &[u8]) -> Option<Self> {
        match raw.first() {
            Some(1) => Some(Self::Subscribed),
            Some(0) => Some(Self::Unsubscribed),
            _ => None,
        }
    }
}

/// Offset field of an attribute event, passed through unmodified.
///
/// In SoC mode it is always zero. In network-coprocessor mode bits 0-14
/// hold the offset of this fragment inside the attribute value and bit 15
/// is set when more fragments follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttributeOffset(u16);

impl AttributeOffset {
    const MORE_FRAGMENTS: u16 = 0x8000;

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn fragment_offset(self) -> u16 {
        self.0 & !Self::MORE_FRAGMENTS
    }

    pub const fn more_fragments(self) -> bool {
        self.0 & Self::MORE_FRAGMENTS != 0
    }
}

/// A peer write, forwarded verbatim to the feature layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRequest<'a> {
    pub attribute_handle: u16,
    pub offset: AttributeOffset,
    pub data: &'a [u8],
}

impl WriteRequest<'_> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub type SubscriptionCallback = fn(SubscriptionEvent);
pub type WriteCallback = fn(&WriteRequest<'_>);

/// Application bindings for one characteristic, set once at registration
#[derive(Clone, Copy, Default)]
pub struct Callbacks {
    pub on_subscription: Option<SubscriptionCallback>,
    pub on_write: Option<WriteCallback>,
}

impl Callbacks {
    pub const fn none() -> Self {
        Self {
            on_subscription: None,
            on_write: None,
        }
    }

    pub const fn with_subscription(mut self, callback: SubscriptionCallback) -> Self {
        self.on_subscription = Some(callback);
        self
    }

    pub const fn with_write(mut self, callback: WriteCallback) -> Self {
        self.on_write = Some(callback);
        self
    }
}

/// What happened to an inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Forwarded to a bound callback
    Delivered,
    /// No callback bound, event dropped
    Unbound,
    /// Payload not recognised, event dropped
    Malformed,
    /// Attribute handle not owned by any registered characteristic
    UnknownAttribute,
}

/// Route a subscription change to the bound callback.
pub fn dispatch_subscription(name: &str, callbacks: &Callbacks, raw: &[u8]) -> DispatchOutcome {
    let Some(event) = SubscriptionEvent::from_payload(raw) else {
        log::debug!("{}: ignoring CCCD payload {:02X?}", name, raw);
        return DispatchOutcome::Malformed;
    };

    match callbacks.on_subscription {
        Some(callback) => {
            callback(event);
            log::debug!(
                "--->{}={}",
                name,
                if event == SubscriptionEvent::Subscribed { "ON" } else { "OFF" }
            );
            DispatchOutcome::Delivered
        }
        None => {
            log::debug!("{}: subscription callback not defined", name);
            DispatchOutcome::Unbound
        }
    }
}

/// Route a peer write to the bound callback.
///
/// The payload is never interpreted here; zero-length writes are delivered
/// like any other.
pub fn dispatch_write(name: &str, callbacks: &Callbacks, request: &WriteRequest<'_>) -> DispatchOutcome {
    match callbacks.on_write {
        Some(callback) => {
            callback(request);
            DispatchOutcome::Delivered
        }
        None => {
            log::debug!("{}: write request callback not defined", name);
            DispatchOutcome::Unbound
        }
    }
}
