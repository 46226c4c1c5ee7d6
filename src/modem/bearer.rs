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

//! A data connection bound to one oFono connection context.
//!
//! # State machine
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnecting -> Disconnected
//!                               Connected -> Reconnecting  -> Connected | Disconnected
//! ```
//!
//! [`BearerPhase::transition`] is the whole table. `Disconnecting` is what tells a deactivation
//! that was asked for apart from a dropped link: only a `Deactivated` seen in `Connected` while
//! the client still wants the connection schedules a reconnect.
//!
//! # Concurrency
//!
//! Connect attempts are serialized by an async attempt lock, so a second `Connect` waits for the
//! first and returns without activating again. Phase, desire and the reconnect handle live behind
//! a short synchronous lock that is never held across an await. At most one reconnect task exists
//! per bearer: it is only spawned while no handle is stored, and it clears its own handle when it
//! finishes.

use crate::error::BridgeError;
use crate::modem::enums::{
    ALLOWED_AUTH_CHAP, ALLOWED_AUTH_NONE, ALLOWED_AUTH_PAP, IP_FAMILY_ANY, IP_FAMILY_IPV4,
    IP_FAMILY_IPV4V6, IP_FAMILY_IPV6, IpMethod,
};
use crate::modem::notify::{Notification, Publisher};
use crate::modem::retry::RetryPolicy;
use crate::modem::snapshot::{BearerSnapshot, IpConfig, Published};
use crate::radio::value::{PropertyMap, PropertyMapExt, PropertyValue};
use crate::radio::{RadioInterface, RadioService};
use log::{debug, info, trace, warn};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearerPhase {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Disconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearerEvent {
    ConnectRequested,
    Activated,
    /// The connect operation gave up for good.
    ActivationFailed,
    DisconnectRequested,
    Deactivated,
    ReconnectExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAction {
    Schedule,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: BearerPhase,
    pub action: Option<ReconnectAction>,
}

impl Transition {
    fn to(next: BearerPhase) -> Self {
        Transition { next, action: None }
    }

    fn with(next: BearerPhase, action: ReconnectAction) -> Self {
        Transition {
            next,
            action: Some(action),
        }
    }
}

impl BearerPhase {
    /// `desired` is whether the client currently wants the bearer connected.
    pub fn transition(self, event: BearerEvent, desired: bool) -> Transition {
        use BearerEvent::*;
        use BearerPhase::*;
        match (self, event) {
            (Disconnected, ConnectRequested) => Transition::to(Connecting),
            (Disconnected, Activated) => Transition::to(Connected),
            (Disconnected, DisconnectRequested) => Transition::to(Disconnecting),
            (Disconnected, ActivationFailed | Deactivated | ReconnectExhausted) => {
                Transition::to(Disconnected)
            }

            (Connecting, ConnectRequested | Deactivated) => Transition::to(Connecting),
            (Connecting, Activated) => Transition::to(Connected),
            (Connecting, ActivationFailed | ReconnectExhausted) => Transition::to(Disconnected),
            (Connecting, DisconnectRequested) => Transition::to(Disconnecting),

            (Connected, ConnectRequested | Activated | ActivationFailed | ReconnectExhausted) => {
                Transition::to(Connected)
            }
            (Connected, DisconnectRequested) => Transition::to(Disconnecting),
            (Connected, Deactivated) if desired => {
                Transition::with(Reconnecting, ReconnectAction::Schedule)
            }
            (Connected, Deactivated) => Transition::to(Disconnected),

            (Reconnecting, ConnectRequested | Deactivated) => Transition::to(Reconnecting),
            (Reconnecting, Activated) => Transition::with(Connected, ReconnectAction::Cancel),
            (Reconnecting, ActivationFailed | ReconnectExhausted) => Transition::to(Disconnected),
            (Reconnecting, DisconnectRequested) => {
                Transition::with(Disconnecting, ReconnectAction::Cancel)
            }

            (Disconnecting, ConnectRequested) => Transition::to(Connecting),
            (Disconnecting, Deactivated) => Transition::to(Disconnected),
            (
                Disconnecting,
                Activated | ActivationFailed | DisconnectRequested | ReconnectExhausted,
            ) => Transition::to(Disconnecting),
        }
    }
}

/// The client-requested configuration of a bearer (`Properties` on the bus).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BearerProperties {
    pub apn: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub ip_type: Option<u32>,
    pub allowed_auth: Option<u32>,
}

impl BearerProperties {
    /// Parse a `CreateBearer`/`Simple.Connect` request. Unknown keys are ignored.
    pub fn from_request(request: &PropertyMap) -> Self {
        BearerProperties {
            apn: request.str_of("apn").unwrap_or_default().to_string(),
            user: request.str_of("user").map(str::to_string),
            password: request.str_of("password").map(str::to_string),
            ip_type: request.u32_of("ip-type"),
            allowed_auth: request.u32_of("allowed-auth"),
        }
    }

    /// Read back the configuration an existing context carries.
    pub fn from_context(context: &PropertyMap) -> Self {
        BearerProperties {
            apn: context
                .str_of("AccessPointName")
                .unwrap_or_default()
                .to_string(),
            user: context
                .str_of("Username")
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            password: context
                .str_of("Password")
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            ip_type: context.str_of("Protocol").and_then(|p| match p {
                "ip" => Some(IP_FAMILY_IPV4),
                "ipv6" => Some(IP_FAMILY_IPV6),
                "dual" => Some(IP_FAMILY_IPV4V6),
                _ => None,
            }),
            allowed_auth: context.str_of("AuthenticationMethod").and_then(|a| match a {
                "none" => Some(ALLOWED_AUTH_NONE),
                "pap" => Some(ALLOWED_AUTH_PAP),
                "chap" => Some(ALLOWED_AUTH_CHAP),
                _ => None,
            }),
        }
    }

    /// The `ConnectionContext` properties that apply this configuration.
    pub fn context_settings(&self) -> Vec<(&'static str, PropertyValue)> {
        let mut settings = vec![("AccessPointName", PropertyValue::from(self.apn.as_str()))];
        if let Some(user) = &self.user {
            settings.push(("Username", PropertyValue::from(user.as_str())));
        }
        if let Some(password) = &self.password {
            settings.push(("Password", PropertyValue::from(password.as_str())));
        }
        let protocol = match self.ip_type {
            Some(IP_FAMILY_IPV4) => Some("ip"),
            Some(IP_FAMILY_IPV6) => Some("ipv6"),
            Some(IP_FAMILY_IPV4V6 | IP_FAMILY_ANY) => Some("dual"),
            _ => None,
        };
        if let Some(protocol) = protocol {
            settings.push(("Protocol", PropertyValue::from(protocol)));
        }
        let auth = match self.allowed_auth {
            Some(ALLOWED_AUTH_NONE) => Some("none"),
            Some(ALLOWED_AUTH_PAP) => Some("pap"),
            Some(ALLOWED_AUTH_CHAP) => Some("chap"),
            _ => None,
        };
        if let Some(auth) = auth {
            settings.push(("AuthenticationMethod", PropertyValue::from(auth)));
        }
        settings
    }
}

fn netmask_prefix(netmask: &str) -> Option<u32> {
    netmask
        .parse::<Ipv4Addr>()
        .ok()
        .map(|mask| u32::from(mask).count_ones())
}

/// Build an IP configuration from a context's `Settings` (`ipv6 == false`) or `IPv6.Settings`.
pub fn ip_config(settings: &PropertyMap, ipv6: bool) -> IpConfig {
    IpConfig {
        method: settings
            .str_of("Method")
            .map(IpMethod::from_ofono)
            .unwrap_or_else(|| {
                // oFono omits Method for IPv6, where addressing is always static
                if ipv6 && settings.str_of("Address").is_some() {
                    IpMethod::Static
                } else {
                    IpMethod::Unknown
                }
            }),
        address: settings.str_of("Address").map(str::to_string),
        prefix: if ipv6 {
            settings.u32_of("PrefixLength")
        } else {
            settings.str_of("Netmask").and_then(netmask_prefix)
        },
        dns: settings
            .strings_of("DomainNameServers")
            .map(|servers| servers.iter().take(3).cloned().collect())
            .unwrap_or_default(),
        gateway: settings.str_of("Gateway").map(str::to_string),
        mtu: settings.u32_of("Mtu"),
    }
}

struct ReconnectTask {
    generation: u64,
    handle: JoinHandle<()>,
}

struct BearerControl {
    phase: BearerPhase,
    desired: bool,
    generation: u64,
    reconnect: Option<ReconnectTask>,
}

pub struct Bearer {
    path: String,
    context_path: String,
    radio: Arc<dyn RadioService>,
    publisher: Arc<dyn Publisher>,
    policy: RetryPolicy,
    snapshot: Published<BearerSnapshot>,
    control: Mutex<BearerControl>,
    attempt: tokio::sync::Mutex<()>,
    this: Weak<Bearer>,
}

impl fmt::Debug for Bearer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bearer")
            .field("path", &self.path)
            .field("context_path", &self.context_path)
            .field("phase", &self.phase())
            .finish()
    }
}

impl Bearer {
    pub fn new(
        path: String,
        context_path: String,
        properties: BearerProperties,
        radio: Arc<dyn RadioService>,
        publisher: Arc<dyn Publisher>,
        policy: RetryPolicy,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Bearer {
            path,
            context_path,
            radio,
            publisher,
            policy,
            snapshot: Published::new(BearerSnapshot {
                properties,
                ..BearerSnapshot::default()
            }),
            control: Mutex::new(BearerControl {
                phase: BearerPhase::Disconnected,
                desired: false,
                generation: 0,
                reconnect: None,
            }),
            attempt: tokio::sync::Mutex::new(()),
            this: this.clone(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    pub fn snapshot(&self) -> &Published<BearerSnapshot> {
        &self.snapshot
    }

    pub fn properties(&self) -> BearerProperties {
        self.snapshot.read(|s| s.properties.clone())
    }

    pub fn phase(&self) -> BearerPhase {
        self.lock_control().phase
    }

    pub fn is_connected(&self) -> bool {
        self.phase() == BearerPhase::Connected
    }

    /// Whether the client last asked for the bearer to be connected.
    pub fn wants_connection(&self) -> bool {
        self.lock_control().desired
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.lock_control().reconnect.is_some()
    }

    fn lock_control(&self) -> MutexGuard<'_, BearerControl> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Feed `event` through the state machine. A `Schedule` action spawns the reconnect task
    /// under the same lock; a `Cancel` action is returned for the caller to honor, since the
    /// caller may be the reconnect task itself.
    fn apply(&self, event: BearerEvent) -> Transition {
        let mut control = self.lock_control();
        self.apply_locked(&mut control, event)
    }

    fn apply_locked(&self, control: &mut BearerControl, event: BearerEvent) -> Transition {
        match event {
            BearerEvent::ConnectRequested => control.desired = true,
            BearerEvent::DisconnectRequested => control.desired = false,
            _ => {}
        }
        let transition = control.phase.transition(event, control.desired);
        trace!(
            "{}: {:?} on {event:?} -> {:?}",
            self.path, control.phase, transition.next
        );
        control.phase = transition.next;
        if transition.action == Some(ReconnectAction::Schedule) && control.reconnect.is_none() {
            if let Some(bearer) = self.this.upgrade() {
                control.generation += 1;
                let generation = control.generation;
                let handle = tokio::spawn(bearer.reconnect(generation));
                control.reconnect = Some(ReconnectTask { generation, handle });
            }
        }
        transition
    }

    fn take_reconnect(&self) -> Option<JoinHandle<()>> {
        self.lock_control().reconnect.take().map(|task| task.handle)
    }

    async fn publish_snapshot(&self, update: impl FnOnce(&mut BearerSnapshot)) {
        let changed = self.snapshot.modify(update);
        if !changed.is_empty() {
            self.publisher
                .publish(Notification::BearerChanged {
                    path: self.path.clone(),
                    changed,
                })
                .await;
        }
    }

    async fn sync_connected(&self) {
        let connected = self.is_connected();
        self.publish_snapshot(|snapshot| snapshot.connected = connected)
            .await;
    }

    async fn activate_once(&self, attempt: u32) -> Result<(), BridgeError> {
        let phase = self.phase();
        if !matches!(phase, BearerPhase::Connecting | BearerPhase::Reconnecting) {
            return Err(BridgeError::Cancelled(format!(
                "{} is {phase:?}, connect no longer wanted",
                self.path
            )));
        }
        debug!(
            "{}: activating {} (attempt {attempt})",
            self.path, self.context_path
        );
        self.radio
            .set_property(
                &self.context_path,
                &RadioInterface::ConnectionContext,
                "Active",
                PropertyValue::Bool(true),
            )
            .await
    }

    async fn activate_with_retry(&self) -> Result<(), BridgeError> {
        self.policy
            .run(&format!("Connect {}", self.path), |attempt| {
                self.activate_once(attempt)
            })
            .await?;
        self.finish_activation()
    }

    /// Record a successful activation, unless a disconnect completed while the activation
    /// reply was in flight.
    fn finish_activation(&self) -> Result<(), BridgeError> {
        let mut control = self.lock_control();
        let phase = control.phase;
        match phase {
            BearerPhase::Disconnected | BearerPhase::Disconnecting => {
                Err(BridgeError::Cancelled(format!(
                    "{} was disconnected while activating",
                    self.path
                )))
            }
            BearerPhase::Connecting | BearerPhase::Connected | BearerPhase::Reconnecting => {
                self.apply_locked(&mut control, BearerEvent::Activated);
                Ok(())
            }
        }
    }

    /// Connect the bearer, retrying per the policy. Returns `Ok` without activating again when
    /// the bearer is already connected, and `Ok` when a disconnect aborts the attempt.
    pub async fn connect(&self) -> Result<(), BridgeError> {
        let _attempt = self.attempt.lock().await;
        if self.is_connected() {
            debug!("{} is already connected", self.path);
            return Ok(());
        }
        self.apply(BearerEvent::ConnectRequested);
        let result = self.activate_with_retry().await;
        let result = match result {
            Ok(()) => {
                if let Some(reconnect) = self.take_reconnect() {
                    reconnect.abort();
                }
                info!("{} connected", self.path);
                Ok(())
            }
            Err(BridgeError::Cancelled(reason)) => {
                debug!("Connect aborted: {reason}");
                Ok(())
            }
            Err(e) => {
                self.apply(BearerEvent::ActivationFailed);
                Err(e)
            }
        };
        self.sync_connected().await;
        result
    }

    async fn reconnect(self: Arc<Self>, generation: u64) {
        info!("{}: link dropped, reconnecting", self.path);
        let result = {
            let _attempt = self.attempt.lock().await;
            if self.is_connected() {
                Ok(())
            } else {
                self.activate_with_retry().await
            }
        };
        {
            let mut control = self.lock_control();
            if control
                .reconnect
                .as_ref()
                .is_some_and(|task| task.generation == generation)
            {
                control.reconnect = None;
            }
        }
        match result {
            Ok(()) => info!("{} reconnected", self.path),
            Err(BridgeError::Cancelled(reason)) => debug!("Reconnect aborted: {reason}"),
            Err(e) => {
                warn!("{}: giving up reconnecting: {e}", self.path);
                self.apply(BearerEvent::ReconnectExhausted);
            }
        }
        self.sync_connected().await;
    }

    /// Cancel any pending reconnect and wait for it to finish.
    async fn cancel_reconnect(&self) {
        let Some(reconnect) = self.take_reconnect() else {
            return;
        };
        reconnect.abort();
        match reconnect.await {
            Err(e) if e.is_cancelled() => debug!("{}: pending reconnect cancelled", self.path),
            Err(e) => warn!("{}: reconnect task failed: {e}", self.path),
            Ok(()) => {}
        }
    }

    /// Deactivate the context. When oFono refuses, the bearer stays `Disconnecting` until the
    /// context reports its `Active` state, and the error is returned.
    pub async fn disconnect(&self) -> Result<(), BridgeError> {
        self.apply(BearerEvent::DisconnectRequested);
        self.cancel_reconnect().await;
        if let Err(e) = self
            .radio
            .set_property(
                &self.context_path,
                &RadioInterface::ConnectionContext,
                "Active",
                PropertyValue::Bool(false),
            )
            .await
        {
            warn!("{}: deactivating {}: {e}", self.path, self.context_path);
            return Err(e);
        }
        self.apply(BearerEvent::Deactivated);
        self.sync_connected().await;
        info!("{} disconnected", self.path);
        Ok(())
    }

    /// Cancel background work ahead of removal. The context is left as it is.
    pub async fn shutdown(&self) {
        self.apply(BearerEvent::DisconnectRequested);
        self.cancel_reconnect().await;
    }

    /// Write a new configuration to the context and publish it.
    pub async fn update_properties(
        &self,
        properties: BearerProperties,
    ) -> Result<(), BridgeError> {
        for (name, value) in properties.context_settings() {
            self.radio
                .set_property(
                    &self.context_path,
                    &RadioInterface::ConnectionContext,
                    name,
                    value,
                )
                .await?;
        }
        self.publish_snapshot(|snapshot| snapshot.properties = properties)
            .await;
        Ok(())
    }

    async fn on_active_changed(&self, active: bool) {
        if active {
            let transition = self.apply(BearerEvent::Activated);
            if transition.action == Some(ReconnectAction::Cancel) {
                if let Some(reconnect) = self.take_reconnect() {
                    reconnect.abort();
                }
            }
        } else {
            self.apply(BearerEvent::Deactivated);
        }
        self.sync_connected().await;
    }

    /// Apply a `PropertyChanged` of the bound context. Returns the network interface name when
    /// the settings report one, for the modem's port list.
    pub async fn on_context_property(&self, name: &str, value: &PropertyValue) -> Option<String> {
        match name {
            "Active" => {
                if let Some(active) = value.as_bool() {
                    self.on_active_changed(active).await;
                }
                None
            }
            "Settings" | "IPv6.Settings" => {
                let settings = value.as_map()?;
                let ipv6 = name == "IPv6.Settings";
                self.apply_settings(settings, ipv6).await
            }
            "AccessPointName" => {
                let apn = value.as_str()?.to_string();
                self.publish_snapshot(|snapshot| snapshot.properties.apn = apn)
                    .await;
                None
            }
            _ => None,
        }
    }

    /// Seed the bearer from the context's full property set, as found at discovery.
    pub async fn load_context(&self, properties: &PropertyMap) -> Option<String> {
        let mut interface = None;
        for key in ["Settings", "IPv6.Settings"] {
            if let Some(settings) = properties.map_of(key) {
                interface = self
                    .apply_settings(settings, key == "IPv6.Settings")
                    .await
                    .or(interface);
            }
        }
        if properties.bool_of("Active") == Some(true) {
            self.on_active_changed(true).await;
        }
        interface
    }

    async fn apply_settings(&self, settings: &PropertyMap, ipv6: bool) -> Option<String> {
        let config = ip_config(settings, ipv6);
        let interface = settings
            .str_of("Interface")
            .filter(|i| !i.is_empty())
            .map(str::to_string);
        let new_interface = interface.clone();
        self.publish_snapshot(|snapshot| {
            if ipv6 {
                snapshot.ip6_config = config;
            } else {
                snapshot.ip4_config = config;
            }
            if let Some(interface) = new_interface {
                snapshot.interface = interface;
            }
        })
        .await;
        interface
    }
}
