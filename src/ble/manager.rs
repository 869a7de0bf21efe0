//! BLE manager
//!
//! Owns the attribute table built at start-up and routes everything that
//! crosses the stack boundary: outbound value updates, inbound subscription
//! changes and writes, connection events and the built-in debug console and
//! config characteristics.
//!
//! The table is written during initialisation only. After that the manager
//! is driven from the stack's event context and never blocks.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::ble::characteristic::{AttributeHandles, CharProperties, CharacteristicDescriptor};
use crate::ble::codec::CodecError;
use crate::ble::dispatch::{
    dispatch_subscription, dispatch_write, AttributeOffset, Callbacks, DispatchOutcome,
    SubscriptionEvent, WriteRequest,
};
use crate::ble::error::{ConstructionError, UpdateError};
use crate::ble::hooks::{AppHooks, ConnectionInfo, DefaultHooks};
use crate::ble::stack::{BleStack, StackConfig, StackStatus};
use crate::ble::uuid::{Uuid128, GROUP_CONFIG, GROUP_CONSOLE};
use crate::config::att::{MAX_ATTRIBUTE_SIZE, MAX_CHARACTERISTICS};
use crate::config::console::MAX_CHAR_LEN;
use crate::config::config_char;
use crate::console::{write_uid_words, ConsoleAction, ConsoleText, DeviceInfo, ExtConfigCommand};
use crate::diagnostics::{DiagnosticMessage, DiagnosticsSink, LogSink};
use crate::features::{encode_value, Feature, ReadSource};

pub const TERM_UUID: Uuid128 = Uuid128::blue_st(0x0000_0001, GROUP_CONSOLE);
pub const STDERR_UUID: Uuid128 = Uuid128::blue_st(0x0000_0002, GROUP_CONSOLE);
pub const CONFIG_UUID: Uuid128 = Uuid128::blue_st(0x0000_0002, GROUP_CONFIG);

const TERM_NAME: &str = "Term";
const STDERR_NAME: &str = "StdErr";
const CONFIG_NAME: &str = "Config";

fn term_descriptor() -> CharacteristicDescriptor {
    CharacteristicDescriptor::new(
        TERM_UUID,
        MAX_CHAR_LEN,
        CharProperties::NOTIFY
            | CharProperties::WRITE_WITHOUT_RESP
            | CharProperties::WRITE
            | CharProperties::READ,
    )
    .variable()
}

fn stderr_descriptor() -> CharacteristicDescriptor {
    CharacteristicDescriptor::new(
        STDERR_UUID,
        MAX_CHAR_LEN,
        CharProperties::NOTIFY | CharProperties::READ,
    )
    .variable()
}

fn config_descriptor() -> CharacteristicDescriptor {
    CharacteristicDescriptor::new(
        CONFIG_UUID,
        config_char::VALUE_LEN,
        CharProperties::NOTIFY | CharProperties::WRITE_WITHOUT_RESP,
    )
    .variable()
}

/// Who handles inbound traffic for an attribute table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Feature,
    Term,
    StdErr,
    Config,
}

#[derive(Clone, Copy)]
struct Entry {
    name: &'static str,
    descriptor: CharacteristicDescriptor,
    handles: AttributeHandles,
    callbacks: Callbacks,
    role: Role,
    read: Option<ReadSource>,
}

/// A registered feature: its attribute handles plus the layout used to
/// encode updates.
#[derive(Debug, Clone, Copy)]
pub struct FeatureHandle<F: Feature> {
    handles: AttributeHandles,
    feature: F,
}

impl<F: Feature> FeatureHandle<F> {
    pub fn handles(&self) -> &AttributeHandles {
        &self.handles
    }

    pub fn feature(&self) -> &F {
        &self.feature
    }
}

/// Attribute table, dispatch table and application hooks for one device.
pub struct BleManager<S: BleStack, H: AppHooks = DefaultHooks, D: DiagnosticsSink = LogSink> {
    stack: S,
    hooks: H,
    diagnostics: D,
    device: DeviceInfo,
    entries: Vec<Entry, MAX_CHARACTERISTICS>,
    term: Option<AttributeHandles>,
    stderr: Option<AttributeHandles>,
    config: Option<AttributeHandles>,
    connection: Option<ConnectionInfo>,
}

impl<S: BleStack, H: AppHooks, D: DiagnosticsSink> BleManager<S, H, D> {
    pub fn new(stack: S, hooks: H, diagnostics: D, device: DeviceInfo) -> Self {
        Self {
            stack,
            hooks,
            diagnostics,
            device,
            entries: Vec::new(),
            term: None,
            stderr: None,
            config: None,
            connection: None,
        }
    }

    /// Initialise the stack and add the built-in characteristics the
    /// config asks for.
    pub fn init(&mut self, config: &StackConfig) -> Result<(), ConstructionError> {
        let status = self.stack.init(config);
        if !status.is_success() {
            return Err(ConstructionError::StackInit(status));
        }
        log::info!("BLE stack initialised, advertising as {}", config.board_name);

        if config.enable_console {
            self.enable_console()?;
        }
        if config.enable_config {
            self.enable_config()?;
        }
        Ok(())
    }

    /// Add a characteristic to the attribute table.
    ///
    /// Failures are fatal to initialisation and always returned.
    pub fn register(
        &mut self,
        name: &'static str,
        descriptor: CharacteristicDescriptor,
        callbacks: Callbacks,
    ) -> Result<AttributeHandles, ConstructionError> {
        self.register_feature(name, descriptor, callbacks, None)
    }

    /// Register a feature template and keep its layout for typed updates.
    pub fn add_feature<F: Feature>(
        &mut self,
        feature: F,
        callbacks: Callbacks,
    ) -> Result<FeatureHandle<F>, ConstructionError> {
        let handles =
            self.register_feature(F::NAME, feature.descriptor(), callbacks, feature.read_source())?;
        Ok(FeatureHandle { handles, feature })
    }

    fn register_feature(
        &mut self,
        name: &'static str,
        descriptor: CharacteristicDescriptor,
        callbacks: Callbacks,
        read: Option<ReadSource>,
    ) -> Result<AttributeHandles, ConstructionError> {
        let handles = self.add_entry(name, descriptor, callbacks, Role::Feature, read)?;
        if descriptor.is_writable() && callbacks.on_write.is_none() {
            self.diagnostics
                .notice_fmt(format_args!("{}: write request callback not defined", name));
        }
        Ok(handles)
    }

    /// Add the Term and StdErr console characteristics.
    pub fn enable_console(&mut self) -> Result<(), ConstructionError> {
        if self.term.is_some() {
            return Err(ConstructionError::AlreadyEnabled);
        }
        let term =
            self.add_entry(TERM_NAME, term_descriptor(), Callbacks::none(), Role::Term, None)?;
        let stderr = match self.add_entry(
            STDERR_NAME,
            stderr_descriptor(),
            Callbacks::none(),
            Role::StdErr,
            None,
        ) {
            Ok(handles) => handles,
            Err(err) => {
                // Half a console is never routed to
                self.entries.pop();
                return Err(err);
            }
        };
        self.term = Some(term);
        self.stderr = Some(stderr);
        Ok(())
    }

    /// Add the config characteristic. Writes go to [`AppHooks::config_write`].
    pub fn enable_config(&mut self) -> Result<(), ConstructionError> {
        if self.config.is_some() {
            return Err(ConstructionError::AlreadyEnabled);
        }
        let config = self.add_entry(
            CONFIG_NAME,
            config_descriptor(),
            Callbacks::none(),
            Role::Config,
            None,
        )?;
        self.config = Some(config);
        Ok(())
    }

    fn add_entry(
        &mut self,
        name: &'static str,
        descriptor: CharacteristicDescriptor,
        callbacks: Callbacks,
        role: Role,
        read: Option<ReadSource>,
    ) -> Result<AttributeHandles, ConstructionError> {
        descriptor.validate()?;
        if self.entries.is_full() {
            return Err(ConstructionError::AttributeTableFull);
        }

        let handles = self
            .stack
            .add_characteristic(&descriptor)
            .map_err(|status| match status {
                StackStatus::INSUFFICIENT_RESOURCES | StackStatus::OUT_OF_MEMORY => {
                    ConstructionError::AttributeTableFull
                }
                other => ConstructionError::StackRefused(other),
            })?;

        self.entries
            .push(Entry {
                name,
                descriptor,
                handles,
                callbacks,
                role,
                read,
            })
            .map_err(|_| ConstructionError::AttributeTableFull)?;

        log::info!(
            "{} Char added (UUID {}, handle 0x{:04X})",
            name,
            descriptor.uuid,
            handles.value
        );
        Ok(handles)
    }

    /// Encode `value` with the feature layout and push it to the stack.
    pub fn update<F: Feature>(
        &mut self,
        handle: &FeatureHandle<F>,
        value: &F::Value,
    ) -> Result<(), UpdateError> {
        let mut buf = [0u8; MAX_ATTRIBUTE_SIZE];
        let bytes = encode_value(&handle.feature, value, &mut buf)?;
        self.update_raw(&handle.handles, bytes)
    }

    /// Replace the whole characteristic value, at offset 0.
    ///
    /// A stack failure is reported to the diagnostics sink once and
    /// returned. It is never retried.
    pub fn update_raw(&mut self, handles: &AttributeHandles, value: &[u8]) -> Result<(), UpdateError> {
        let entry = self.entry_by_value(handles.value).ok_or(UpdateError::UnknownHandle)?;
        if !entry.descriptor.accepts_length(value.len()) {
            return Err(UpdateError::Encode(CodecError::LengthMismatch {
                expected: entry.descriptor.value_length,
                actual: value.len(),
            }));
        }

        let status = self.stack.update_characteristic_value(&entry.handles, 0, value);
        if status.is_success() {
            Ok(())
        } else {
            self.report_update_failure(&entry, status);
            Err(UpdateError::StackRejected(status))
        }
    }

    /// Send text on the Term characteristic, split to the characteristic width.
    pub fn term_write(&mut self, text: &[u8]) -> Result<(), UpdateError> {
        let term = self.term.ok_or(UpdateError::UnknownHandle)?;
        self.write_console(term, text)
    }

    /// Send text on the StdErr characteristic, split to the characteristic width.
    pub fn stderr_write(&mut self, text: &[u8]) -> Result<(), UpdateError> {
        let stderr = self.stderr.ok_or(UpdateError::UnknownHandle)?;
        self.write_console(stderr, text)
    }

    /// Notify a value on the config characteristic
    pub fn config_update(&mut self, value: &[u8]) -> Result<(), UpdateError> {
        let config = self.config.ok_or(UpdateError::UnknownHandle)?;
        self.update_raw(&config, value)
    }

    fn write_console(&mut self, handles: AttributeHandles, text: &[u8]) -> Result<(), UpdateError> {
        match self.send_chunks(&handles, text) {
            Ok(()) => Ok(()),
            Err(status) => {
                if let Some(entry) = self.entry_by_value(handles.value) {
                    self.report_update_failure(&entry, status);
                }
                Err(UpdateError::StackRejected(status))
            }
        }
    }

    fn send_chunks(&mut self, handles: &AttributeHandles, text: &[u8]) -> Result<(), StackStatus> {
        for chunk in text.chunks(MAX_CHAR_LEN) {
            let status = self.stack.update_characteristic_value(handles, 0, chunk);
            if !status.is_success() {
                return Err(status);
            }
        }
        Ok(())
    }

    fn report_update_failure(&mut self, entry: &Entry, status: StackStatus) {
        let mut msg: DiagnosticMessage = String::new();
        let _ = write!(msg, "Error Updating {} Char (0x{:02X})", entry.name, status.code());
        self.diagnostics.report(&msg);

        // Mirror to StdErr unless StdErr is the one failing
        if let Some(stderr) = self.stderr {
            if entry.role != Role::StdErr {
                let _ = self.send_chunks(&stderr, msg.as_bytes());
            }
        }
    }

    /// Attribute-modified event from the stack.
    ///
    /// A write to a CCCD toggles notifications; a write to a value handle
    /// (write without response) is handled like a write request.
    pub fn handle_attribute_modified(
        &mut self,
        attribute_handle: u16,
        offset: AttributeOffset,
        data: &[u8],
    ) -> DispatchOutcome {
        let Some(entry) = self.entry_by_attribute(attribute_handle) else {
            log::debug!("Attribute 0x{:04X} not owned by any characteristic", attribute_handle);
            return DispatchOutcome::UnknownAttribute;
        };

        if entry.handles.cccd == Some(attribute_handle) {
            self.route_subscription(&entry, data)
        } else if entry.handles.value == attribute_handle {
            self.route_write(
                &entry,
                &WriteRequest {
                    attribute_handle,
                    offset,
                    data,
                },
            )
        } else {
            DispatchOutcome::UnknownAttribute
        }
    }

    /// Write-request event from the stack
    pub fn handle_write_request(
        &mut self,
        attribute_handle: u16,
        offset: AttributeOffset,
        data: &[u8],
    ) -> DispatchOutcome {
        let Some(entry) = self.entry_by_value(attribute_handle) else {
            log::debug!("Write to unknown attribute 0x{:04X}", attribute_handle);
            return DispatchOutcome::UnknownAttribute;
        };
        self.route_write(
            &entry,
            &WriteRequest {
                attribute_handle,
                offset,
                data,
            },
        )
    }

    fn route_subscription(&mut self, entry: &Entry, data: &[u8]) -> DispatchOutcome {
        let outcome = dispatch_subscription(entry.name, &entry.callbacks, data);
        if entry.role != Role::Feature {
            return outcome;
        }

        if outcome == DispatchOutcome::Unbound {
            self.diagnostics
                .notice_fmt(format_args!("{}: subscription callback not defined", entry.name));
        }
        if let Some(event) = SubscriptionEvent::from_payload(data) {
            if self.term.is_some() {
                let mut echo: ConsoleText = String::new();
                let state = match event {
                    SubscriptionEvent::Subscribed => " ON",
                    SubscriptionEvent::Unsubscribed => " OFF",
                };
                let _ = writeln!(echo, "--->{}={}", entry.name, state);
                let _ = self.term_write(echo.as_bytes());
            }
        }
        outcome
    }

    fn route_write(&mut self, entry: &Entry, request: &WriteRequest<'_>) -> DispatchOutcome {
        match entry.role {
            Role::Feature => {
                let outcome = dispatch_write(entry.name, &entry.callbacks, request);
                if outcome == DispatchOutcome::Unbound {
                    self.diagnostics.notice_fmt(format_args!(
                        "{}: write request callback not defined",
                        entry.name
                    ));
                }
                outcome
            }
            Role::Term => {
                self.console_input(request.data);
                DispatchOutcome::Delivered
            }
            Role::Config => {
                self.hooks.config_write(request.data);
                DispatchOutcome::Delivered
            }
            Role::StdErr => {
                log::debug!("{}: not writable, dropping write", entry.name);
                DispatchOutcome::Unbound
            }
        }
    }

    fn console_input(&mut self, data: &[u8]) {
        let mut reply = ConsoleText::new();
        let action = self.hooks.debug_console(data, &self.device, &mut reply);
        // Failures were already reported by write_console
        let _ = match action {
            ConsoleAction::Echo => self.term_write(data),
            ConsoleAction::Handled => self.term_write(reply.as_bytes()),
        };
    }

    /// Read-request event from the stack.
    ///
    /// Features with a [`ReadSource`] are refreshed from the application
    /// before the stack answers; the others are served from the stored value.
    pub fn handle_read_request(&mut self, attribute_handle: u16) -> DispatchOutcome {
        let Some(entry) = self.entry_by_value(attribute_handle) else {
            log::debug!("Read of unknown attribute 0x{:04X}", attribute_handle);
            return DispatchOutcome::UnknownAttribute;
        };

        match entry.read {
            Some(ReadSource::Environmental(env)) => {
                let Some(reading) = self.hooks.environmental_read_request() else {
                    self.diagnostics.notice_fmt(format_args!(
                        "{}: read request callback not defined",
                        entry.name
                    ));
                    return DispatchOutcome::Unbound;
                };
                let mut buf = [0u8; MAX_ATTRIBUTE_SIZE];
                match encode_value(&env, &reading, &mut buf) {
                    Ok(bytes) => {
                        // Stack failures are reported by update_raw
                        let _ = self.update_raw(&entry.handles, bytes);
                        DispatchOutcome::Delivered
                    }
                    Err(err) => {
                        log::debug!("{}: cannot encode read value: {:?}", entry.name, err);
                        DispatchOutcome::Malformed
                    }
                }
            }
            None => {
                log::debug!("{}: read served from stored value", entry.name);
                DispatchOutcome::Unbound
            }
        }
    }

    /// Answer a board report command through the application hooks.
    pub fn ext_config_command(&mut self, command: ExtConfigCommand, answer: &mut ConsoleText) {
        answer.clear();
        match command {
            ExtConfigCommand::Uid => {
                let uid = self.hooks.ext_config_uid(&self.device);
                let _ = write_uid_words(&uid, answer);
            }
            ExtConfigCommand::VersionFw => self.hooks.ext_config_version_fw(&self.device, answer),
            ExtConfigCommand::Info => self.hooks.ext_config_info(&self.device, answer),
            ExtConfigCommand::Help => self.hooks.ext_config_help(answer),
        }
    }

    pub fn handle_connection_complete(&mut self, connection: ConnectionInfo) {
        self.connection = Some(connection);
        self.hooks.connection_completed(&connection);
    }

    pub fn handle_disconnection_complete(&mut self) {
        self.connection = None;
        self.hooks.disconnection_completed();
    }

    fn entry_by_value(&self, value_handle: u16) -> Option<Entry> {
        self.entries
            .iter()
            .find(|e| e.handles.value == value_handle)
            .copied()
    }

    fn entry_by_attribute(&self, attribute_handle: u16) -> Option<Entry> {
        self.entries
            .iter()
            .find(|e| e.handles.contains(attribute_handle))
            .copied()
    }

    /// Descriptor registered for `handles`
    pub fn descriptor(&self, handles: &AttributeHandles) -> Option<&CharacteristicDescriptor> {
        self.entries
            .iter()
            .find(|e| e.handles.value == handles.value)
            .map(|e| &e.descriptor)
    }

    pub fn term_handles(&self) -> Option<&AttributeHandles> {
        self.term.as_ref()
    }

    pub fn stderr_handles(&self) -> Option<&AttributeHandles> {
        self.stderr.as_ref()
    }

    pub fn config_handles(&self) -> Option<&AttributeHandles> {
        self.config.as_ref()
    }

    pub fn connection(&self) -> Option<&ConnectionInfo> {
        self.connection.as_ref()
    }

    /// Number of characteristics in the attribute table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::dispatch::SubscriptionEvent;
    use crate::ble::hooks::AddressType;
    use crate::ble::stack::mock::MockBleStack;
    use crate::ble::uuid::GROUP_STANDARD;
    use crate::diagnostics::mock::RecordingSink;
    use crate::features::{
        ClassificationOutput, Environmental, EnvironmentalReading, Led, LedStatus,
        NClassClassification, Phase,
    };
    use crate::ble::codec::ESCAPE;
    use std::cell::RefCell;
    use std::vec::Vec as StdVec;

    thread_local! {
        static EVENTS: RefCell<StdVec<SubscriptionEvent>> = const { RefCell::new(StdVec::new()) };
        static WRITES: RefCell<StdVec<(u16, StdVec<u8>)>> = const { RefCell::new(StdVec::new()) };
    }

    fn record_event(event: SubscriptionEvent) {
        EVENTS.with(|e| e.borrow_mut().push(event));
    }

    fn record_write(request: &WriteRequest<'_>) {
        WRITES.with(|w| {
            w.borrow_mut()
                .push((request.attribute_handle, request.data.to_vec()))
        });
    }

    fn writes() -> StdVec<(u16, StdVec<u8>)> {
        WRITES.with(|w| w.borrow().clone())
    }

    type Ncc5 = NClassClassification<5>;
    type TestManager<H = DefaultHooks> = BleManager<MockBleStack, H, RecordingSink>;

    fn manager() -> TestManager {
        BleManager::new(
            MockBleStack::new(),
            DefaultHooks,
            RecordingSink::new(),
            DeviceInfo::default(),
        )
    }

    fn bare_config() -> StackConfig {
        StackConfig {
            enable_console: false,
            enable_config: false,
            ..Default::default()
        }
    }

    fn ncc_callbacks() -> Callbacks {
        Callbacks::none()
            .with_subscription(record_event)
            .with_write(record_write)
    }

    /// Concatenated payloads sent to one value handle
    fn sent_to(manager: &TestManager<impl AppHooks>, value_handle: u16) -> StdVec<u8> {
        manager
            .stack()
            .updates()
            .iter()
            .filter(|u| u.value_handle == value_handle)
            .flat_map(|u| u.value.iter().copied())
            .collect()
    }

    #[derive(Default)]
    struct TestHooks {
        config_writes: StdVec<StdVec<u8>>,
        connected: Option<ConnectionInfo>,
        disconnects: usize,
        reading: Option<EnvironmentalReading>,
    }

    impl AppHooks for TestHooks {
        fn connection_completed(&mut self, connection: &ConnectionInfo) {
            self.connected = Some(*connection);
        }

        fn disconnection_completed(&mut self) {
            self.disconnects += 1;
        }

        fn config_write(&mut self, data: &[u8]) {
            self.config_writes.push(data.to_vec());
        }

        fn debug_console(
            &mut self,
            data: &[u8],
            _device: &DeviceInfo,
            reply: &mut ConsoleText,
        ) -> ConsoleAction {
            if data == b"ping" {
                let _ = reply.push_str("pong");
                ConsoleAction::Handled
            } else {
                ConsoleAction::Echo
            }
        }

        fn environmental_read_request(&mut self) -> Option<EnvironmentalReading> {
            self.reading
        }

        fn ext_config_help(&mut self, answer: &mut ConsoleText) {
            let _ = answer.push_str("custom help");
        }
    }

    #[test]
    fn test_init_registers_console_and_config() {
        let mut m = manager();
        m.init(&StackConfig::default()).unwrap();

        assert_eq!(m.len(), 3);
        let registered = m.stack().registered();
        assert_eq!(registered[0].uuid, TERM_UUID);
        assert_eq!(registered[1].uuid, STDERR_UUID);
        assert_eq!(registered[2].uuid, CONFIG_UUID);
        assert!(registered[0].is_variable);
        assert!(m.term_handles().is_some());
        assert!(m.stack().config().is_some());
    }

    #[test]
    fn test_init_without_builtins() {
        let mut m = manager();
        m.init(&bare_config()).unwrap();
        assert!(m.is_empty());
        assert!(m.term_handles().is_none());
        assert_eq!(m.term_write(b"hi"), Err(UpdateError::UnknownHandle));
    }

    #[test]
    fn test_init_failure() {
        let mut m = manager();
        m.stack_mut().set_next_init_status(StackStatus::FAILED);
        assert_eq!(
            m.init(&StackConfig::default()),
            Err(ConstructionError::StackInit(StackStatus::FAILED))
        );
        assert!(m.is_empty());
    }

    #[test]
    fn test_builtins_enabled_once() {
        let mut m = manager();
        m.enable_console().unwrap();
        m.enable_config().unwrap();
        assert_eq!(m.enable_console(), Err(ConstructionError::AlreadyEnabled));
        assert_eq!(m.enable_config(), Err(ConstructionError::AlreadyEnabled));
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn test_register_rejects_oversized_value() {
        let mut m = manager();
        let descriptor = CharacteristicDescriptor::new(
            Uuid128::blue_st(0x0100_0000, GROUP_STANDARD),
            MAX_ATTRIBUTE_SIZE + 1,
            CharProperties::NOTIFY,
        );
        assert_eq!(
            m.register("Oversized", descriptor, Callbacks::none()),
            Err(ConstructionError::InvalidValueLength {
                length: MAX_ATTRIBUTE_SIZE + 1,
                max: MAX_ATTRIBUTE_SIZE
            })
        );
        assert!(m.stack().registered().is_empty());
    }

    #[test]
    fn test_register_surfaces_stack_errors() {
        let mut m: TestManager = BleManager::new(
            MockBleStack::with_capacity(1),
            DefaultHooks,
            RecordingSink::new(),
            DeviceInfo::default(),
        );
        m.add_feature(Led, Callbacks::none()).unwrap();
        assert!(matches!(
            m.add_feature(Led, Callbacks::none()),
            Err(ConstructionError::AttributeTableFull)
        ));

        let mut m = manager();
        m.stack_mut().set_next_add_error(StackStatus::INVALID_PARAMS);
        assert!(matches!(
            m.add_feature(Led, Callbacks::none()),
            Err(ConstructionError::StackRefused(StackStatus::INVALID_PARAMS))
        ));
        assert!(m.is_empty());
    }

    #[test]
    fn test_dispatch_table_capacity() {
        let mut m = manager();
        for _ in 0..MAX_CHARACTERISTICS {
            m.add_feature(Led, Callbacks::none()).unwrap();
        }
        assert!(matches!(
            m.add_feature(Led, Callbacks::none()),
            Err(ConstructionError::AttributeTableFull)
        ));
        assert_eq!(m.stack().registered().len(), MAX_CHARACTERISTICS);
    }

    #[test]
    fn test_classification_update_bytes() {
        let mut m = manager();
        let ncc = m.add_feature(Ncc5::new(), Callbacks::none()).unwrap();

        let value = ClassificationOutput {
            phase: Phase::Classification,
            status: Some(0),
            major_class: Some(3),
            probabilities: [10, 20, 30, 40, 200],
        };
        m.update(&ncc, &value).unwrap();

        let updates = m.stack().updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].value_handle, ncc.handles().value);
        assert_eq!(updates[0].offset, 0);
        assert_eq!(
            updates[0].value.as_slice(),
            &[ESCAPE, ESCAPE, ESCAPE, ESCAPE, 1, 0, 5, 3, 10, 20, 30, 40, 200]
        );
    }

    #[test]
    fn test_rejected_update_reported_once() {
        let mut m = manager();
        let ncc = m.add_feature(Ncc5::new(), ncc_callbacks()).unwrap();
        let before = *m.descriptor(ncc.handles()).unwrap();

        m.stack_mut().set_next_update_status(StackStatus::BUSY);
        let value = ClassificationOutput::<5>::phase_only(Phase::Idle);
        assert_eq!(
            m.update(&ncc, &value),
            Err(UpdateError::StackRejected(StackStatus::BUSY))
        );

        let messages = &m.diagnostics().messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].as_str(),
            "Error Updating NEAI N-Class Classification Char (0x43)"
        );
        assert!(m.stack().updates().is_empty());
        assert_eq!(m.descriptor(ncc.handles()), Some(&before));

        // Bindings still work
        assert_eq!(
            m.handle_attribute_modified(ncc.handles().cccd.unwrap(), AttributeOffset::default(), &[1]),
            DispatchOutcome::Delivered
        );
        assert_eq!(EVENTS.with(|e| e.borrow().clone()), [SubscriptionEvent::Subscribed]);

        // Next update goes through untouched
        m.update(&ncc, &value).unwrap();
        assert_eq!(m.diagnostics().messages.len(), 1);
    }

    #[test]
    fn test_rejected_update_mirrored_to_stderr() {
        let mut m = manager();
        m.enable_console().unwrap();
        let led = m.add_feature(Led, Callbacks::none()).unwrap();

        m.stack_mut().set_next_update_status(StackStatus::FAILED);
        let status = LedStatus {
            timestamp: 1,
            status: 1,
        };
        assert_eq!(
            m.update(&led, &status),
            Err(UpdateError::StackRejected(StackStatus::FAILED))
        );

        assert_eq!(m.diagnostics().messages.len(), 1);
        let stderr = m.stderr_handles().unwrap().value;
        assert_eq!(sent_to(&m, stderr), b"Error Updating LED Char (0x41)");
        assert!(m.stack().updates().iter().all(|u| u.value.len() <= MAX_CHAR_LEN));
    }

    #[test]
    fn test_update_raw_checks() {
        let mut m = manager();
        let led = m.add_feature(Led, Callbacks::none()).unwrap();

        assert_eq!(
            m.update_raw(led.handles(), &[1, 2]),
            Err(UpdateError::Encode(CodecError::LengthMismatch {
                expected: 3,
                actual: 2
            }))
        );

        let stranger = AttributeHandles {
            declaration: 0x0100,
            value: 0x0101,
            cccd: None,
        };
        assert_eq!(m.update_raw(&stranger, &[0; 3]), Err(UpdateError::UnknownHandle));

        assert!(m.stack().updates().is_empty());
        assert!(m.diagnostics().messages.is_empty());
    }

    #[test]
    fn test_zero_length_write_reaches_callback() {
        let mut m = manager();
        let ncc = m.add_feature(Ncc5::new(), ncc_callbacks()).unwrap();
        let value_handle = ncc.handles().value;

        assert_eq!(
            m.handle_write_request(value_handle, AttributeOffset::default(), &[]),
            DispatchOutcome::Delivered
        );
        assert_eq!(writes(), [(value_handle, StdVec::new())]);
    }

    #[test]
    fn test_attribute_modified_routing() {
        let mut m = manager();
        let ncc = m.add_feature(Ncc5::new(), ncc_callbacks()).unwrap();
        let handles = *ncc.handles();
        let offset = AttributeOffset::default();

        assert_eq!(
            m.handle_attribute_modified(handles.cccd.unwrap(), offset, &[0]),
            DispatchOutcome::Delivered
        );
        assert_eq!(
            m.handle_attribute_modified(handles.cccd.unwrap(), offset, &[2]),
            DispatchOutcome::Malformed
        );
        assert_eq!(
            m.handle_attribute_modified(handles.value, AttributeOffset::new(0x8004), &[9, 9]),
            DispatchOutcome::Delivered
        );
        assert_eq!(
            m.handle_attribute_modified(handles.declaration, offset, &[1]),
            DispatchOutcome::UnknownAttribute
        );
        assert_eq!(
            m.handle_attribute_modified(0x7FFF, offset, &[1]),
            DispatchOutcome::UnknownAttribute
        );

        assert_eq!(EVENTS.with(|e| e.borrow().clone()), [SubscriptionEvent::Unsubscribed]);
        assert_eq!(writes(), [(handles.value, vec![9, 9])]);
    }

    #[test]
    fn test_unbound_feature_events_dropped() {
        let mut m = manager();
        let ncc = m.add_feature(Ncc5::new(), Callbacks::none()).unwrap();
        let handles = *ncc.handles();

        assert_eq!(
            m.handle_attribute_modified(handles.cccd.unwrap(), AttributeOffset::default(), &[1]),
            DispatchOutcome::Unbound
        );
        assert_eq!(
            m.handle_write_request(handles.value, AttributeOffset::default(), &[1, 2, 3]),
            DispatchOutcome::Unbound
        );
        assert!(m.stack().updates().is_empty());

        let messages: StdVec<&str> = m
            .diagnostics()
            .messages
            .iter()
            .map(|msg| msg.as_str())
            .collect();
        assert_eq!(
            messages,
            [
                "NEAI N-Class Classification: write request callback not defined",
                "NEAI N-Class Classification: subscription callback not defined",
                "NEAI N-Class Classification: write request callback not defined",
            ]
        );
    }

    #[test]
    fn test_read_only_feature_registers_quietly() {
        let mut m = manager();
        m.add_feature(Led, Callbacks::none()).unwrap();
        m.enable_console().unwrap();
        assert!(m.diagnostics().messages.is_empty());
    }

    #[test]
    fn test_subscription_echoed_on_term() {
        let mut m = manager();
        m.enable_console().unwrap();
        let ncc = m.add_feature(Ncc5::new(), ncc_callbacks()).unwrap();
        let cccd = ncc.handles().cccd.unwrap();
        let term = m.term_handles().unwrap().value;

        m.handle_attribute_modified(cccd, AttributeOffset::default(), &[1]);
        m.handle_attribute_modified(cccd, AttributeOffset::default(), &[0]);
        m.handle_attribute_modified(cccd, AttributeOffset::default(), &[7]);

        assert_eq!(
            sent_to(&m, term),
            b"--->NEAI N-Class Classification= ON\n--->NEAI N-Class Classification= OFF\n"
        );
        assert!(m.diagnostics().messages.is_empty());
    }

    #[test]
    fn test_console_not_half_enabled() {
        let mut m: TestManager = BleManager::new(
            MockBleStack::with_capacity(1),
            DefaultHooks,
            RecordingSink::new(),
            DeviceInfo::default(),
        );
        assert_eq!(m.enable_console(), Err(ConstructionError::AttributeTableFull));
        assert!(m.term_handles().is_none());
        assert!(m.stderr_handles().is_none());
        assert!(m.is_empty());

        // Still reports the real cause, not AlreadyEnabled
        assert_eq!(m.enable_console(), Err(ConstructionError::AttributeTableFull));
    }

    #[test]
    fn test_environmental_read_request() {
        let env = Environmental::new(true, false, 1).unwrap();
        let reading = EnvironmentalReading {
            timestamp: 0x0201,
            pressure: 100_000,
            humidity: 0,
            temperatures: [-15, 0],
        };

        let mut m = BleManager::new(
            MockBleStack::new(),
            TestHooks {
                reading: Some(reading),
                ..Default::default()
            },
            RecordingSink::new(),
            DeviceInfo::default(),
        );
        let handle = m.add_feature(env, Callbacks::none()).unwrap();
        let led = m.add_feature(Led, Callbacks::none()).unwrap();

        assert_eq!(
            m.handle_read_request(handle.handles().value),
            DispatchOutcome::Delivered
        );
        let mut expected = StdVec::new();
        expected.extend_from_slice(&0x0201u16.to_le_bytes());
        expected.extend_from_slice(&100_000i32.to_le_bytes());
        expected.extend_from_slice(&(-15i16).to_le_bytes());
        assert_eq!(sent_to(&m, handle.handles().value), expected);

        assert_eq!(
            m.handle_read_request(led.handles().value),
            DispatchOutcome::Unbound
        );
        assert_eq!(m.handle_read_request(0x7FFF), DispatchOutcome::UnknownAttribute);
        assert!(m.diagnostics().messages.is_empty());
    }

    #[test]
    fn test_environmental_read_without_hook() {
        let mut m = manager();
        let env = m
            .add_feature(Environmental::new(true, true, 2).unwrap(), Callbacks::none())
            .unwrap();

        assert_eq!(
            m.handle_read_request(env.handles().value),
            DispatchOutcome::Unbound
        );
        assert!(m.stack().updates().is_empty());
        assert_eq!(
            m.diagnostics().messages[0].as_str(),
            "Environmental: read request callback not defined"
        );
    }

    #[test]
    fn test_ext_config_commands() {
        let device = DeviceInfo {
            uid: [0x00, 0x01, 0x02, 0x03, 0x10, 0x11, 0x12, 0x13, 0x20, 0x21, 0x22, 0x23],
            ..Default::default()
        };
        let mut m = BleManager::new(MockBleStack::new(), DefaultHooks, RecordingSink::new(), device);
        let mut answer = ConsoleText::new();

        m.ext_config_command(ExtConfigCommand::Uid, &mut answer);
        assert_eq!(answer.as_str(), "030201001312111023222120");

        m.ext_config_command(ExtConfigCommand::VersionFw, &mut answer);
        assert_eq!(answer.as_str(), "STM32L4xx_X-CUBE-BLEMGR_1.3.0");

        m.ext_config_command(ExtConfigCommand::Info, &mut answer);
        assert!(answer.starts_with("STMicroelectronics X-CUBE-BLEMGR:\nVersion 1.3.0\n"));

        let mut custom = BleManager::new(
            MockBleStack::new(),
            TestHooks::default(),
            RecordingSink::new(),
            DeviceInfo::default(),
        );
        custom.ext_config_command(ExtConfigCommand::Help, &mut answer);
        assert_eq!(answer.as_str(), "custom help");
    }

    #[test]
    fn test_console_help_reply_chunked() {
        let mut m = manager();
        m.init(&StackConfig::default()).unwrap();
        let term = m.term_handles().unwrap().value;

        assert_eq!(
            m.handle_write_request(term, AttributeOffset::default(), b"help"),
            DispatchOutcome::Delivered
        );

        let expected = "Command:\r\ninfo-> System Info\r\nuid-> STM32 UID value\r\n";
        assert_eq!(sent_to(&m, term), expected.as_bytes());
        let updates = m.stack().updates();
        assert_eq!(updates.len(), expected.len().div_ceil(MAX_CHAR_LEN));
        assert!(updates.iter().all(|u| u.value.len() <= MAX_CHAR_LEN));
    }

    #[test]
    fn test_console_echo_unknown_input() {
        let mut m = manager();
        m.enable_console().unwrap();
        let term = m.term_handles().unwrap().value;

        m.handle_attribute_modified(term, AttributeOffset::default(), b"hello");
        assert_eq!(sent_to(&m, term), b"hello");
    }

    #[test]
    fn test_console_and_config_hooks() {
        let mut m = BleManager::new(
            MockBleStack::new(),
            TestHooks::default(),
            RecordingSink::new(),
            DeviceInfo::default(),
        );
        m.init(&StackConfig::default()).unwrap();
        let term = m.term_handles().unwrap().value;
        let config = m.config_handles().unwrap().value;

        m.handle_write_request(term, AttributeOffset::default(), b"ping");
        assert_eq!(sent_to(&m, term), b"pong");

        assert_eq!(
            m.handle_attribute_modified(config, AttributeOffset::default(), &[0xAA, 0x01]),
            DispatchOutcome::Delivered
        );
        assert_eq!(m.hooks().config_writes, [vec![0xAA, 0x01]]);

        m.config_update(&[1, 2, 3]).unwrap();
        assert_eq!(sent_to(&m, config), [1, 2, 3]);
    }

    #[test]
    fn test_stderr_not_writable() {
        let mut m = manager();
        m.enable_console().unwrap();
        let stderr = m.stderr_handles().unwrap().value;
        assert_eq!(
            m.handle_write_request(stderr, AttributeOffset::default(), b"x"),
            DispatchOutcome::Unbound
        );
    }

    #[test]
    fn test_console_writes() {
        let mut m = manager();
        m.enable_console().unwrap();
        let stderr = m.stderr_handles().unwrap().value;

        m.term_write(&[]).unwrap();
        assert!(m.stack().updates().is_empty());

        let text = [b'e'; 45];
        m.stderr_write(&text).unwrap();
        let lengths: StdVec<usize> = m.stack().updates().iter().map(|u| u.value.len()).collect();
        assert_eq!(lengths, [20, 20, 5]);
        assert_eq!(sent_to(&m, stderr), text);
    }

    #[test]
    fn test_term_failure_reported() {
        let mut m = manager();
        m.enable_console().unwrap();
        let stderr = m.stderr_handles().unwrap().value;

        m.stack_mut().set_next_update_status(StackStatus::BUSY);
        assert_eq!(
            m.term_write(b"abc"),
            Err(UpdateError::StackRejected(StackStatus::BUSY))
        );
        assert_eq!(m.diagnostics().messages.len(), 1);
        assert_eq!(m.diagnostics().messages[0].as_str(), "Error Updating Term Char (0x43)");
        assert_eq!(sent_to(&m, stderr), b"Error Updating Term Char (0x43)");
    }

    #[test]
    fn test_connection_tracking() {
        let mut m = BleManager::new(
            MockBleStack::new(),
            TestHooks::default(),
            RecordingSink::new(),
            DeviceInfo::default(),
        );
        let link = ConnectionInfo {
            handle: 0x0801,
            address_type: AddressType::from_byte(1),
            address: [1, 2, 3, 4, 5, 6],
        };

        m.handle_connection_complete(link);
        assert_eq!(m.connection(), Some(&link));
        assert_eq!(m.hooks().connected, Some(link));

        m.handle_disconnection_complete();
        assert!(m.connection().is_none());
        assert_eq!(m.hooks().disconnects, 1);
    }
}
