// This file is part of ofono2mm, a daemon that exposes oFono managed modems through the ModemManager D-Bus API.
//
// Copyright 2025 The ofono2mm Authors.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// ofono2mm is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// ofono2mm is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! The per-modem reconciliation engine.
//!
//! A [`Modem`] owns the interface cache of one oFono modem, its bearers, calls and messages, and
//! the published ModemManager snapshots derived from them. Every radio notification for the modem
//! is funneled into one channel and handled by [`Modem::handle_event`] under the engine lock; the
//! snapshots are re-projected after each event and only the differing fields are published.
//!
//! Property getters on the bus read the published snapshots and never take the engine lock.
//! Bearer connects and disconnects also run outside it, so a long connect retry loop does not
//! stall event handling.

pub mod bearer;
pub mod bearers;
pub mod calls;
pub mod enums;
pub mod ids;
pub mod messages;
pub mod notify;
pub mod projector;
pub mod retry;
pub mod snapshot;
pub mod tracker;

use crate::config::Settings;
use crate::error::BridgeError;
use crate::modem::bearer::{Bearer, BearerProperties};
use crate::modem::bearers::{BearerManager, INTERNET_CONTEXT};
use crate::modem::calls::{Call, CallRegistrar};
use crate::modem::enums::{IP_FAMILY_IPV4, MODE_NONE, ModemState, RegistrationState};
use crate::modem::ids::IdAllocator;
use crate::modem::messages::{MessageRegistrar, Sms, SmsRequest};
use crate::modem::notify::Publisher;
use crate::modem::projector::{
    Projection, ProjectionInputs, RadioState, SignalSetup, access_technology,
    technology_for_mode,
};
use crate::modem::retry::RetryPolicy;
use crate::modem::tracker::{InterfaceDelta, InterfaceTracker};
use crate::radio::value::{PropertyMap, PropertyMapExt, PropertyValue};
use crate::radio::{EventSender, RadioEvent, RadioInterface, RadioObject, RadioService, Subscription};
use chrono::SecondsFormat;
use log::{debug, info, trace, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

/// `Modem.Simple.GetStatus`, read from the published snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleStatus {
    pub state: ModemState,
    pub signal_quality: (u32, bool),
    pub access_technologies: u32,
    pub registration_state: RegistrationState,
    pub operator_code: String,
    pub operator_name: String,
}

/// One entry of `Modem3gpp.Scan`.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkScanResult {
    pub status: u32,
    pub operator_long: String,
    pub operator_short: String,
    pub operator_code: String,
    pub access_technology: u32,
}

impl NetworkScanResult {
    pub fn from_operator(operator: &RadioObject) -> Self {
        let properties = &operator.properties;
        let status = match properties.str_of("Status") {
            Some("available") => 1,
            Some("current") => 2,
            Some("forbidden") => 3,
            _ => 0,
        };
        let name = properties.str_of("Name").unwrap_or_default().to_string();
        NetworkScanResult {
            status,
            operator_short: name.clone(),
            operator_long: name,
            operator_code: format!(
                "{}{}",
                properties.str_of("MobileCountryCode").unwrap_or_default(),
                properties.str_of("MobileNetworkCode").unwrap_or_default()
            ),
            access_technology: properties
                .strings_of("Technologies")
                .unwrap_or_default()
                .iter()
                .fold(0, |mask, technology| mask | access_technology(technology)),
        }
    }
}

/// One entry of `ProfileManager.List`, backed by an internet context.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: u32,
    pub apn: String,
    pub name: String,
    pub ip_type: u32,
    pub user: String,
    pub password: String,
}

impl Profile {
    pub fn from_context(id: u32, context: &RadioObject) -> Self {
        let settings = BearerProperties::from_context(&context.properties);
        Profile {
            id,
            apn: settings.apn,
            name: context
                .properties
                .str_of("Name")
                .unwrap_or_default()
                .to_string(),
            ip_type: settings.ip_type.unwrap_or(IP_FAMILY_IPV4),
            user: settings.user.unwrap_or_default(),
            password: settings.password.unwrap_or_default(),
        }
    }
}

struct Engine {
    base: PropertyMap,
    tracker: InterfaceTracker,
    bearers: BearerManager,
    calls: CallRegistrar,
    messages: MessageRegistrar,
    events: EventSender,
    subscription: Option<Subscription>,
    signal_setup: SignalSetup,
}

#[derive(Default)]
struct ModemTasks {
    events: Option<UnboundedReceiver<RadioEvent>>,
    event_loop: Option<JoinHandle<()>>,
    reactivation: Option<JoinHandle<()>>,
    signal_refresh: Option<JoinHandle<()>>,
}

/// One oFono modem exported as `/org/freedesktop/ModemManager1/Modem/{index}`.
pub struct Modem {
    index: u32,
    path: String,
    sim_path: String,
    radio_path: String,
    radio: Arc<dyn RadioService>,
    publisher: Arc<dyn Publisher>,
    projection: Projection,
    call_end_reconnect_delay: Duration,
    engine: tokio::sync::Mutex<Engine>,
    tasks: Mutex<ModemTasks>,
}

impl std::fmt::Debug for Modem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Modem")
            .field("path", &self.path)
            .field("radio_path", &self.radio_path)
            .finish()
    }
}

/// Read the `Signal.SetupThresholds` dictionary. Missing keys reset to 0 and false.
pub fn signal_thresholds(settings: &PropertyMap) -> Result<(u32, bool), BridgeError> {
    let mut thresholds = (0, false);
    for (key, value) in settings {
        match key.as_str() {
            "rssi-threshold" => {
                thresholds.0 = value
                    .as_u32()
                    .ok_or_else(|| BridgeError::Argument(format!("rssi-threshold {value:?}")))?;
            }
            "error-rate-threshold" => {
                thresholds.1 = value.as_bool().ok_or_else(|| {
                    BridgeError::Argument(format!("error-rate-threshold {value:?}"))
                })?;
            }
            other => {
                return Err(BridgeError::Argument(format!(
                    "unknown signal threshold {other}"
                )));
            }
        }
    }
    Ok(thresholds)
}

fn advertised_interfaces(base: &PropertyMap) -> Vec<String> {
    base.strings_of("Interfaces")
        .map(<[String]>::to_vec)
        .unwrap_or_default()
}

impl Modem {
    /// Build the engine for the oFono modem `object`. Nothing is read from the radio service
    /// until [`Modem::start`].
    pub fn new(
        index: u32,
        object: RadioObject,
        radio: Arc<dyn RadioService>,
        publisher: Arc<dyn Publisher>,
        ids: Arc<IdAllocator>,
        settings: &Settings,
    ) -> Arc<Self> {
        let path = ids::modem_path(index);
        let (events, receiver) = mpsc::unbounded_channel();
        let engine = Engine {
            tracker: InterfaceTracker::new(&object.path, radio.clone(), events.clone()),
            bearers: BearerManager::new(
                &object.path,
                radio.clone(),
                publisher.clone(),
                ids.clone(),
                RetryPolicy::from_settings(settings),
                events.clone(),
            ),
            calls: CallRegistrar::new(
                &object.path,
                radio.clone(),
                publisher.clone(),
                ids.clone(),
                events.clone(),
            ),
            messages: MessageRegistrar::new(&object.path, radio.clone(), publisher.clone(), ids),
            base: object.properties,
            events,
            subscription: None,
            signal_setup: SignalSetup::default(),
        };
        Arc::new(Modem {
            index,
            path,
            sim_path: ids::sim_path(index),
            radio_path: object.path,
            radio,
            publisher,
            projection: Projection::new(),
            call_end_reconnect_delay: settings.call_end_reconnect_delay,
            engine: tokio::sync::Mutex::new(engine),
            tasks: Mutex::new(ModemTasks {
                events: Some(receiver),
                ..ModemTasks::default()
            }),
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn sim_path(&self) -> &str {
        &self.sim_path
    }

    /// The oFono object path of this modem.
    pub fn radio_path(&self) -> &str {
        &self.radio_path
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    fn lock_tasks(&self) -> MutexGuard<'_, ModemTasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to the modem, fill the interface cache, bind existing contexts and calls, publish
    /// the first projection, and start handling events.
    pub async fn start(self: &Arc<Self>) {
        {
            let mut engine = self.engine.lock().await;
            engine.subscription = match self
                .radio
                .subscribe(&self.radio_path, &RadioInterface::Modem, engine.events.clone())
                .await
            {
                Ok(subscription) => Some(subscription),
                Err(e) => {
                    warn!("{}: cannot watch modem properties: {e}", self.radio_path);
                    None
                }
            };
            match self
                .radio
                .properties(&self.radio_path, &RadioInterface::Modem)
                .await
            {
                Ok(base) => engine.base = base,
                Err(e) => warn!("{}: using announced properties: {e}", self.radio_path),
            }
            let advertised = advertised_interfaces(&engine.base);
            let delta = engine.tracker.sync(&advertised).await;
            self.apply_interface_delta(&mut engine, &delta).await;
            self.project(&engine).await;
        }
        let receiver = self.lock_tasks().events.take();
        if let Some(receiver) = receiver {
            self.spawn_event_loop(receiver);
        }
        info!("{} serves oFono modem {}", self.path, self.radio_path);
    }

    fn spawn_event_loop(self: &Arc<Self>, mut receiver: UnboundedReceiver<RadioEvent>) {
        let modem = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let Some(modem) = modem.upgrade() else {
                    break;
                };
                modem.handle_event(event).await;
            }
        });
        self.lock_tasks().event_loop = Some(handle);
    }

    /// Stop event handling and background work. Exported objects are left to the caller.
    pub async fn shutdown(&self) {
        {
            let mut tasks = self.lock_tasks();
            for task in [
                tasks.event_loop.take(),
                tasks.reactivation.take(),
                tasks.signal_refresh.take(),
            ]
            .into_iter()
                .flatten()
            {
                task.abort();
            }
        }
        let mut engine = self.engine.lock().await;
        engine.subscription = None;
        engine.tracker.clear();
        engine.bearers.shutdown().await;
        debug!("{} shut down", self.path);
    }

    async fn project(&self, engine: &Engine) {
        let radio = RadioState::from_cache(&engine.base, &engine.tracker);
        let inputs = ProjectionInputs {
            sim_path: self.sim_path.clone(),
            bearers: engine.bearers.paths(),
            ports: engine.bearers.ports(),
            calls: engine.calls.paths(),
            messages: engine.messages.paths(),
            signal: engine.signal_setup,
        };
        let notifications = self.projection.update(&radio, &inputs);
        if !notifications.is_empty() {
            self.publisher.publish_all(notifications).await;
        }
    }

    async fn apply_interface_delta(&self, engine: &mut Engine, delta: &InterfaceDelta) {
        for interface in &delta.added {
            match interface {
                RadioInterface::ConnectionManager => {
                    engine.bearers.discover().await;
                }
                RadioInterface::VoiceCallManager => {
                    engine.calls.discover().await;
                }
                _ => {}
            }
        }
        if delta.removed.contains(&RadioInterface::VoiceCallManager) {
            engine.calls.clear().await;
        }
    }

    /// Apply one radio notification to the engine and publish what it changed.
    pub async fn handle_event(&self, event: RadioEvent) {
        trace!("{}: {event:?}", self.radio_path);
        let mut engine = self.engine.lock().await;
        match event {
            RadioEvent::PropertyChanged {
                interface: RadioInterface::Modem,
                name,
                value,
            } => {
                let interfaces_changed = name == "Interfaces";
                engine.base.insert(name, value);
                if interfaces_changed {
                    let advertised = advertised_interfaces(&engine.base);
                    let delta = engine.tracker.sync(&advertised).await;
                    self.apply_interface_delta(&mut engine, &delta).await;
                }
            }
            RadioEvent::PropertyChanged {
                interface,
                name,
                value,
            } => {
                if !engine.tracker.on_property_changed(&interface, &name, value) {
                    return;
                }
            }
            RadioEvent::ObjectPropertyChanged { path, name, value } => {
                if engine.bearers.owns_context(&path) {
                    engine.bearers.on_context_property(&path, &name, &value).await;
                } else {
                    engine.calls.on_call_property(&path, &name, &value).await;
                }
            }
            RadioEvent::ContextAdded(context) => {
                engine.bearers.on_context_added(context).await;
            }
            RadioEvent::ContextRemoved(path) => {
                engine.bearers.on_context_removed(&path).await;
            }
            RadioEvent::CallAdded(call) => {
                engine.calls.on_call_added(call).await;
            }
            RadioEvent::CallRemoved(path) => {
                if engine.calls.on_call_removed(&path).await {
                    self.schedule_reactivation(&engine);
                }
            }
            RadioEvent::IncomingMessage { text, properties } => {
                engine.messages.on_incoming(text, &properties).await;
            }
            RadioEvent::PropertiesReplaced {
                interface,
                properties,
            } => {
                if !engine.tracker.replace_properties(&interface, properties) {
                    return;
                }
            }
        }
        self.project(&engine).await;
    }

    /// Some networks drop the data context during a voice call. Once a call is gone, bring the
    /// preferred internet context back up after a grace delay.
    fn schedule_reactivation(&self, engine: &Engine) {
        if !engine.tracker.contains(&RadioInterface::ConnectionManager) {
            return;
        }
        let target = engine.bearers.reconnect_target();
        let radio = self.radio.clone();
        let radio_path = self.radio_path.clone();
        let delay = self.call_end_reconnect_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let target = match target {
                Some(target) => Some(target),
                None => radio.contexts(&radio_path).await.ok().and_then(|contexts| {
                    contexts
                        .into_iter()
                        .find(|context| context.properties.str_of("Type") == Some(INTERNET_CONTEXT))
                        .map(|context| context.path)
                }),
            };
            let Some(target) = target else {
                debug!("{radio_path}: no internet context to reactivate");
                return;
            };
            info!("Reactivating {target} after call end");
            if let Err(e) = radio
                .set_property(
                    &target,
                    &RadioInterface::ConnectionContext,
                    "Active",
                    PropertyValue::Bool(true),
                )
                .await
            {
                warn!("Reactivating {target}: {e}");
            }
        });
        if let Some(previous) = self.lock_tasks().reactivation.replace(handle) {
            previous.abort();
        }
    }

    fn require(engine: &Engine, interface: RadioInterface) -> Result<(), BridgeError> {
        if engine.tracker.contains(&interface) {
            Ok(())
        } else {
            Err(BridgeError::CapabilityAbsent(interface.to_string()))
        }
    }

    async fn set_modem_property(&self, name: &str, value: bool) -> Result<(), BridgeError> {
        self.radio
            .set_property(
                &self.radio_path,
                &RadioInterface::Modem,
                name,
                PropertyValue::Bool(value),
            )
            .await
    }

    pub async fn enable(&self, enable: bool) -> Result<(), BridgeError> {
        self.set_modem_property("Online", enable).await
    }

    /// Power cycle the modem.
    pub async fn reset(&self) -> Result<(), BridgeError> {
        self.set_modem_property("Powered", false).await?;
        self.set_modem_property("Powered", true).await
    }

    pub async fn set_power_state(&self, state: u32) -> Result<(), BridgeError> {
        self.set_modem_property("Powered", state > 1).await
    }

    /// Apply `(allowed, preferred)` as oFono's technology preference. Without a preferred mode
    /// the most capable allowed mode is used.
    pub async fn set_current_modes(&self, modes: (u32, u32)) -> Result<(), BridgeError> {
        let (allowed, preferred) = modes;
        let mode = if preferred != MODE_NONE {
            preferred
        } else if allowed != MODE_NONE {
            1 << (u32::BITS - 1 - allowed.leading_zeros())
        } else {
            MODE_NONE
        };
        let technology = technology_for_mode(mode)
            .ok_or_else(|| BridgeError::Argument(format!("unsupported modes {modes:?}")))?;
        {
            let engine = self.engine.lock().await;
            Self::require(&engine, RadioInterface::RadioSettings)?;
        }
        self.radio
            .set_property(
                &self.radio_path,
                &RadioInterface::RadioSettings,
                "TechnologyPreference",
                PropertyValue::from(technology),
            )
            .await
    }

    pub async fn create_bearer(&self, request: &PropertyMap) -> Result<Arc<Bearer>, BridgeError> {
        let mut engine = self.engine.lock().await;
        Self::require(&engine, RadioInterface::ConnectionManager)?;
        let bearer = engine
            .bearers
            .create(BearerProperties::from_request(request))
            .await?;
        self.project(&engine).await;
        Ok(bearer)
    }

    /// Remove a bearer and its context. An unknown path is ignored.
    pub async fn delete_bearer(&self, path: &str) {
        let mut engine = self.engine.lock().await;
        if engine.bearers.delete(path).await {
            self.project(&engine).await;
        }
    }

    pub async fn bearer(&self, path: &str) -> Option<Arc<Bearer>> {
        self.engine.lock().await.bearers.get(path)
    }

    /// Connect a bearer for the requested APN, reusing one that already has it.
    pub async fn simple_connect(&self, request: &PropertyMap) -> Result<String, BridgeError> {
        let properties = BearerProperties::from_request(request);
        let bearer = {
            let mut engine = self.engine.lock().await;
            Self::require(&engine, RadioInterface::ConnectionManager)?;
            let bearer = match engine.bearers.find_by_apn(&properties.apn) {
                Some(bearer) => {
                    if bearer.properties() != properties {
                        bearer.update_properties(properties).await?;
                    }
                    bearer
                }
                None => engine.bearers.create(properties).await?,
            };
            self.project(&engine).await;
            bearer
        };
        bearer.connect().await?;
        Ok(bearer.path().to_string())
    }

    /// Disconnect one bearer, or every bearer when `path` is "/".
    pub async fn simple_disconnect(&self, path: &str) -> Result<(), BridgeError> {
        let targets = {
            let engine = self.engine.lock().await;
            if path == "/" || path.is_empty() {
                engine.bearers.all()
            } else {
                engine.bearers.get(path).into_iter().collect()
            }
        };
        if targets.is_empty() {
            debug!("{}: nothing to disconnect for {path}", self.path);
        }
        for bearer in targets {
            bearer.disconnect().await?;
        }
        Ok(())
    }

    pub fn simple_status(&self) -> SimpleStatus {
        let (state, signal_quality, access_technologies) = self
            .projection
            .modem
            .read(|m| (m.state, m.signal_quality, m.access_technologies));
        let (registration_state, operator_code, operator_name) =
            self.projection.registration.read(|r| {
                (
                    r.registration_state,
                    r.operator_code.clone(),
                    r.operator_name.clone(),
                )
            });
        SimpleStatus {
            state,
            signal_quality,
            access_technologies,
            registration_state,
            operator_code,
            operator_name,
        }
    }

    /// Register on `operator_id` (MCC+MNC), or automatically when it is empty.
    pub async fn register(&self, operator_id: &str) -> Result<(), BridgeError> {
        {
            let engine = self.engine.lock().await;
            Self::require(&engine, RadioInterface::NetworkRegistration)?;
        }
        if operator_id.is_empty() {
            self.radio.register(&self.radio_path).await
        } else {
            self.radio
                .register_operator(&format!("{}/operator/{operator_id}", self.radio_path))
                .await
        }
    }

    pub async fn scan(&self) -> Result<Vec<NetworkScanResult>, BridgeError> {
        {
            let engine = self.engine.lock().await;
            Self::require(&engine, RadioInterface::NetworkRegistration)?;
        }
        let operators = self.radio.scan(&self.radio_path).await?;
        Ok(operators.iter().map(NetworkScanResult::from_operator).collect())
    }

    async fn has_sim_manager(&self) -> bool {
        let present = self
            .engine
            .lock()
            .await
            .tracker
            .contains(&RadioInterface::SimManager);
        if !present {
            warn!("{}: no SIM manager, ignoring SIM operation", self.radio_path);
        }
        present
    }

    pub async fn send_pin(&self, pin: &str) -> Result<(), BridgeError> {
        if !self.has_sim_manager().await {
            return Ok(());
        }
        self.radio.enter_pin(&self.radio_path, "pin", pin).await
    }

    pub async fn send_puk(&self, puk: &str, pin: &str) -> Result<(), BridgeError> {
        if !self.has_sim_manager().await {
            return Ok(());
        }
        self.radio.reset_pin(&self.radio_path, "puk", puk, pin).await
    }

    pub async fn enable_pin(&self, pin: &str, enabled: bool) -> Result<(), BridgeError> {
        if !self.has_sim_manager().await {
            return Ok(());
        }
        if enabled {
            self.radio.lock_pin(&self.radio_path, "pin", pin).await
        } else {
            self.radio.unlock_pin(&self.radio_path, "pin", pin).await
        }
    }

    pub async fn change_pin(&self, old_pin: &str, new_pin: &str) -> Result<(), BridgeError> {
        if !self.has_sim_manager().await {
            return Ok(());
        }
        self.radio
            .change_pin(&self.radio_path, "pin", old_pin, new_pin)
            .await
    }

    async fn voice(&self) -> Result<(), BridgeError> {
        let engine = self.engine.lock().await;
        Self::require(&engine, RadioInterface::VoiceCallManager)
    }

    pub async fn create_call(&self, number: &str) -> Result<Arc<Call>, BridgeError> {
        if number.is_empty() {
            return Err(BridgeError::Argument("call needs a number".into()));
        }
        let mut engine = self.engine.lock().await;
        Self::require(&engine, RadioInterface::VoiceCallManager)?;
        let call = engine.calls.dial(number).await?;
        self.project(&engine).await;
        Ok(call)
    }

    /// Remove a call, hanging it up first. An unknown path is ignored.
    pub async fn delete_call(&self, path: &str) {
        let mut engine = self.engine.lock().await;
        if engine.calls.delete(path).await {
            self.project(&engine).await;
        }
    }

    pub async fn call(&self, path: &str) -> Option<Arc<Call>> {
        self.engine.lock().await.calls.get(path)
    }

    pub async fn hangup_all(&self) -> Result<(), BridgeError> {
        self.voice().await?;
        self.radio.hangup_all(&self.radio_path).await
    }

    pub async fn hold_and_accept(&self) -> Result<(), BridgeError> {
        self.voice().await?;
        self.radio.hold_and_answer(&self.radio_path).await
    }

    pub async fn hangup_and_accept(&self) -> Result<(), BridgeError> {
        self.voice().await?;
        self.radio.release_and_answer(&self.radio_path).await
    }

    pub async fn transfer(&self) -> Result<(), BridgeError> {
        self.voice().await?;
        self.radio.transfer(&self.radio_path).await
    }

    /// Export an outgoing SMS, sending it right away when the modem has a message manager.
    pub async fn create_sms(&self, request: &PropertyMap) -> Result<Arc<Sms>, BridgeError> {
        let request = SmsRequest::from_properties(request)?;
        let mut engine = self.engine.lock().await;
        let can_send = engine.tracker.contains(&RadioInterface::MessageManager);
        let sms = engine.messages.create(request, can_send).await;
        self.project(&engine).await;
        Ok(sms)
    }

    pub async fn delete_sms(&self, path: &str) {
        let mut engine = self.engine.lock().await;
        if engine.messages.delete(path).await {
            self.project(&engine).await;
        }
    }

    pub async fn sms(&self, path: &str) -> Option<Arc<Sms>> {
        self.engine.lock().await.messages.get(path)
    }

    /// Read the serving cell measurements now, then every `rate` seconds. A rate of 0 stops the
    /// periodic refresh.
    pub async fn setup_signal(self: &Arc<Self>, rate: u32) -> Result<(), BridgeError> {
        {
            let mut engine = self.engine.lock().await;
            engine.tracker.reload(&RadioInterface::NetworkMonitor).await;
            engine.signal_setup.rate = rate;
            self.project(&engine).await;
        }
        self.schedule_signal_refresh(rate);
        Ok(())
    }

    pub async fn setup_signal_thresholds(&self, settings: &PropertyMap) -> Result<(), BridgeError> {
        let (rssi_threshold, error_rate_threshold) = signal_thresholds(settings)?;
        let mut engine = self.engine.lock().await;
        engine.signal_setup.rssi_threshold = rssi_threshold;
        engine.signal_setup.error_rate_threshold = error_rate_threshold;
        self.project(&engine).await;
        Ok(())
    }

    fn schedule_signal_refresh(self: &Arc<Self>, rate: u32) {
        let handle = (rate > 0).then(|| {
            let modem = Arc::downgrade(self);
            let period = Duration::from_secs(u64::from(rate));
            tokio::spawn(async move {
                let mut ticks = tokio::time::interval(period);
                ticks.tick().await;
                loop {
                    ticks.tick().await;
                    let Some(modem) = modem.upgrade() else {
                        break;
                    };
                    modem.refresh_signal().await;
                }
            })
        });
        let previous = std::mem::replace(&mut self.lock_tasks().signal_refresh, handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    async fn refresh_signal(&self) {
        let mut engine = self.engine.lock().await;
        if engine.tracker.reload(&RadioInterface::NetworkMonitor).await {
            self.project(&engine).await;
        }
    }

    /// `Time.GetNetworkTime`: the last time reported by the network, or the local clock when
    /// there is none.
    pub async fn network_time(&self) -> String {
        {
            let mut engine = self.engine.lock().await;
            if engine.tracker.reload(&RadioInterface::NetworkTime).await {
                self.project(&engine).await;
            }
        }
        self.projection
            .time
            .read(|time| time.network_time.clone())
            .unwrap_or_else(|| chrono::Local::now().to_rfc3339_opts(SecondsFormat::Secs, false))
    }

    /// The internet contexts as connection profiles, numbered from 1.
    pub async fn profiles(&self) -> Result<Vec<Profile>, BridgeError> {
        {
            let engine = self.engine.lock().await;
            if !engine.tracker.contains(&RadioInterface::ConnectionManager) {
                return Ok(Vec::new());
            }
        }
        let contexts = self.radio.contexts(&self.radio_path).await?;
        Ok(contexts
            .iter()
            .filter(|context| context.properties.str_of("Type") == Some(INTERNET_CONTEXT))
            .zip(1..)
            .map(|(context, id)| Profile::from_context(id, context))
            .collect())
    }
}
