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

//! The radio service seam.
//!
//! Everything the engine needs from oFono goes through the [`RadioService`] trait. The production
//! implementation is [`ofono::OfonoService`], which talks to `org.ofono` over the system bus;
//! tests substitute an in-memory implementation.
//!
//! Change notifications are delivered as [`RadioEvent`]s on a per-modem channel. A
//! [`Subscription`] owns the task forwarding one object's signals into that channel, and dropping
//! it stops the forwarding.

pub mod ofono;
pub mod proxies;
pub mod value;

use crate::error::BridgeError;
use crate::radio::value::{PropertyMap, PropertyValue};
use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// oFono D-Bus interfaces the engine knows about. Anything else advertised by a modem is kept
/// as [`RadioInterface::Other`] so that the interface cache still mirrors the full set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RadioInterface {
    Modem,
    SimManager,
    NetworkRegistration,
    NetworkOperator,
    RadioSettings,
    ConnectionManager,
    ConnectionContext,
    VoiceCallManager,
    VoiceCall,
    MessageManager,
    NetworkMonitor,
    NetworkTime,
    Other(String),
}

impl RadioInterface {
    pub fn as_str(&self) -> &str {
        match self {
            RadioInterface::Modem => "org.ofono.Modem",
            RadioInterface::SimManager => "org.ofono.SimManager",
            RadioInterface::NetworkRegistration => "org.ofono.NetworkRegistration",
            RadioInterface::NetworkOperator => "org.ofono.NetworkOperator",
            RadioInterface::RadioSettings => "org.ofono.RadioSettings",
            RadioInterface::ConnectionManager => "org.ofono.ConnectionManager",
            RadioInterface::ConnectionContext => "org.ofono.ConnectionContext",
            RadioInterface::VoiceCallManager => "org.ofono.VoiceCallManager",
            RadioInterface::VoiceCall => "org.ofono.VoiceCall",
            RadioInterface::MessageManager => "org.ofono.MessageManager",
            RadioInterface::NetworkMonitor => "org.ofono.NetworkMonitor",
            RadioInterface::NetworkTime => "org.ofono.NetworkTime",
            RadioInterface::Other(name) => name,
        }
    }

    /// Interfaces implemented by child objects (contexts, calls) rather than the modem itself.
    /// Their property changes are reported per object path.
    pub fn is_per_object(&self) -> bool {
        matches!(
            self,
            RadioInterface::ConnectionContext | RadioInterface::VoiceCall
        )
    }

    /// The method that reads the interface's property bag. The network monitor and network time
    /// interfaces have no `GetProperties` and report a dictionary from their own getter instead.
    pub fn properties_method(&self) -> &'static str {
        match self {
            RadioInterface::NetworkMonitor => "GetServingCellInformation",
            RadioInterface::NetworkTime => "GetNetworkTime",
            _ => "GetProperties",
        }
    }
}

impl From<&str> for RadioInterface {
    fn from(name: &str) -> Self {
        match name {
            "org.ofono.Modem" => RadioInterface::Modem,
            "org.ofono.SimManager" => RadioInterface::SimManager,
            "org.ofono.NetworkRegistration" => RadioInterface::NetworkRegistration,
            "org.ofono.NetworkOperator" => RadioInterface::NetworkOperator,
            "org.ofono.RadioSettings" => RadioInterface::RadioSettings,
            "org.ofono.ConnectionManager" => RadioInterface::ConnectionManager,
            "org.ofono.ConnectionContext" => RadioInterface::ConnectionContext,
            "org.ofono.VoiceCallManager" => RadioInterface::VoiceCallManager,
            "org.ofono.VoiceCall" => RadioInterface::VoiceCall,
            "org.ofono.MessageManager" => RadioInterface::MessageManager,
            "org.ofono.NetworkMonitor" => RadioInterface::NetworkMonitor,
            "org.ofono.NetworkTime" => RadioInterface::NetworkTime,
            other => RadioInterface::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RadioInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An oFono object together with its properties, as returned by `GetModems`, `GetContexts`,
/// `GetCalls` and `Scan`, or carried by the matching `*Added` signals.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioObject {
    pub path: String,
    pub properties: PropertyMap,
}

impl RadioObject {
    pub fn new(path: impl Into<String>, properties: PropertyMap) -> Self {
        RadioObject {
            path: path.into(),
            properties,
        }
    }
}

/// A notification from one modem's objects, tagged with what it concerns so that a single
/// handler can dispatch it.
#[derive(Debug, Clone, PartialEq)]
pub enum RadioEvent {
    /// `PropertyChanged` on the modem itself ([`RadioInterface::Modem`]) or on one of its
    /// capability interfaces.
    PropertyChanged {
        interface: RadioInterface,
        name: String,
        value: PropertyValue,
    },
    /// `PropertyChanged` on a connection context or a voice call.
    ObjectPropertyChanged {
        path: String,
        name: String,
        value: PropertyValue,
    },
    ContextAdded(RadioObject),
    ContextRemoved(String),
    CallAdded(RadioObject),
    CallRemoved(String),
    IncomingMessage {
        text: String,
        properties: PropertyMap,
    },
    /// A whole property bag pushed at once, as `NetworkTimeChanged` does.
    PropertiesReplaced {
        interface: RadioInterface,
        properties: PropertyMap,
    },
}

pub type EventSender = UnboundedSender<RadioEvent>;

/// Modem-set changes reported by the oFono manager and the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagerEvent {
    ModemAdded(RadioObject),
    ModemRemoved(String),
    ServiceAppeared,
    ServiceVanished,
}

pub type ManagerEventSender = UnboundedSender<ManagerEvent>;

/// Owns the task forwarding one object's signals. Dropping it aborts the task, after which no
/// further events for that object are produced.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(task: JoinHandle<()>) -> Self {
        Subscription { task: Some(task) }
    }

    /// A subscription with nothing behind it, for objects that emit no signals.
    pub fn inert() -> Self {
        Subscription { task: None }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Operations the engine performs against the radio service. Paths are oFono object paths.
#[async_trait]
pub trait RadioService: Send + Sync {
    // Discovery
    async fn modems(&self) -> Result<Vec<RadioObject>, BridgeError>;
    async fn service_present(&self) -> Result<bool, BridgeError>;
    async fn subscribe_manager(&self, events: ManagerEventSender)
    -> Result<Subscription, BridgeError>;

    // Generic property access, valid for any interface
    async fn properties(
        &self,
        path: &str,
        interface: &RadioInterface,
    ) -> Result<PropertyMap, BridgeError>;
    async fn set_property(
        &self,
        path: &str,
        interface: &RadioInterface,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), BridgeError>;
    async fn subscribe(
        &self,
        path: &str,
        interface: &RadioInterface,
        events: EventSender,
    ) -> Result<Subscription, BridgeError>;

    // org.ofono.SimManager
    async fn enter_pin(&self, modem: &str, pin_type: &str, pin: &str) -> Result<(), BridgeError>;
    async fn reset_pin(
        &self,
        modem: &str,
        puk_type: &str,
        puk: &str,
        new_pin: &str,
    ) -> Result<(), BridgeError>;
    async fn lock_pin(&self, modem: &str, pin_type: &str, pin: &str) -> Result<(), BridgeError>;
    async fn unlock_pin(&self, modem: &str, pin_type: &str, pin: &str) -> Result<(), BridgeError>;
    async fn change_pin(
        &self,
        modem: &str,
        pin_type: &str,
        old_pin: &str,
        new_pin: &str,
    ) -> Result<(), BridgeError>;

    // org.ofono.NetworkRegistration and org.ofono.NetworkOperator
    async fn register(&self, modem: &str) -> Result<(), BridgeError>;
    async fn register_operator(&self, operator: &str) -> Result<(), BridgeError>;
    async fn scan(&self, modem: &str) -> Result<Vec<RadioObject>, BridgeError>;

    // org.ofono.ConnectionManager
    async fn contexts(&self, modem: &str) -> Result<Vec<RadioObject>, BridgeError>;
    async fn add_context(&self, modem: &str, context_type: &str) -> Result<String, BridgeError>;
    async fn remove_context(&self, modem: &str, context: &str) -> Result<(), BridgeError>;

    // org.ofono.VoiceCallManager and org.ofono.VoiceCall
    async fn calls(&self, modem: &str) -> Result<Vec<RadioObject>, BridgeError>;
    async fn dial(&self, modem: &str, number: &str) -> Result<String, BridgeError>;
    async fn hangup_all(&self, modem: &str) -> Result<(), BridgeError>;
    async fn hold_and_answer(&self, modem: &str) -> Result<(), BridgeError>;
    async fn release_and_answer(&self, modem: &str) -> Result<(), BridgeError>;
    async fn transfer(&self, modem: &str) -> Result<(), BridgeError>;
    async fn send_tones(&self, modem: &str, tones: &str) -> Result<(), BridgeError>;
    async fn create_multiparty(&self, modem: &str) -> Result<Vec<String>, BridgeError>;
    async fn private_chat(&self, modem: &str, call: &str) -> Result<Vec<String>, BridgeError>;
    async fn answer(&self, call: &str) -> Result<(), BridgeError>;
    async fn hangup(&self, call: &str) -> Result<(), BridgeError>;
    async fn deflect(&self, call: &str, number: &str) -> Result<(), BridgeError>;

    // org.ofono.MessageManager
    async fn send_message(&self, modem: &str, to: &str, text: &str) -> Result<String, BridgeError>;
}
