//! Bluetooth Low Energy characteristic management
//!
//! Describes vendor characteristics, packs their values for the stack and
//! routes inbound attribute events back to the application.

pub mod characteristic;
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod hooks;
pub mod manager;
pub mod stack;
pub mod uuid;

pub use characteristic::{AttributeHandles, CharProperties, CharacteristicDescriptor};
pub use dispatch::{AttributeOffset, Callbacks, DispatchOutcome, SubscriptionEvent, WriteRequest};
pub use error::{ConstructionError, UpdateError};
pub use hooks::{AppHooks, ConnectionInfo, DefaultHooks};
pub use manager::{BleManager, FeatureHandle};
pub use stack::{BleStack, StackConfig, StackStatus};
pub use uuid::Uuid128;
