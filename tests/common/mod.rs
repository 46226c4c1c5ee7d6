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

#![allow(dead_code)]

pub mod radio;

use async_trait::async_trait;
use ofono2mm::config::Settings;
use ofono2mm::modem::Modem;
use ofono2mm::modem::ids::IdAllocator;
use ofono2mm::modem::notify::{Notification, Publisher};
use ofono2mm::radio::RadioObject;
use ofono2mm::radio::value::{PropertyMap, PropertyValue};
use radio::MockRadio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub static MODEM: &str = "/ril_0";

/// Records every notification instead of putting it on a bus.
#[derive(Default)]
pub struct RecordingPublisher {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingPublisher::default())
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.notifications.lock().unwrap())
    }

    pub fn all(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    /// Field lists of every `ModemChanged` recorded so far, flattened.
    pub fn modem_fields(&self) -> Vec<&'static str> {
        self.all()
            .into_iter()
            .filter_map(|n| match n {
                Notification::ModemChanged(fields) => Some(fields),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Notification) -> bool) -> usize {
        self.all().iter().filter(|n| predicate(n)).count()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

pub fn props<const N: usize>(entries: [(&str, PropertyValue); N]) -> PropertyMap {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

pub fn test_settings() -> Settings {
    Settings {
        connect_retry_delay: Duration::from_secs(1),
        connect_max_attempts: None,
        call_end_reconnect_delay: Duration::from_secs(2),
        modem_path_prefix: String::new(),
    }
}

/// A powered, online modem with an unlocked SIM, registered on an LTE network, with data,
/// voice and messaging.
pub fn registered_modem(radio: &MockRadio) {
    radio.add_modem(
        MODEM,
        props([
            ("Powered", true.into()),
            ("Online", true.into()),
            ("Manufacturer", "Example".into()),
            ("Model", "Phone".into()),
            ("Revision", "1.0".into()),
            ("Serial", "356938035643809".into()),
            (
                "Interfaces",
                vec![
                    "org.ofono.SimManager",
                    "org.ofono.NetworkRegistration",
                    "org.ofono.RadioSettings",
                    "org.ofono.ConnectionManager",
                    "org.ofono.VoiceCallManager",
                    "org.ofono.MessageManager",
                ]
                .into(),
            ),
        ]),
    );
    radio.set_interface_properties(
        MODEM,
        "org.ofono.SimManager",
        props([
            ("Present", true.into()),
            ("PinRequired", "none".into()),
            ("CardIdentifier", "8949000000000000001".into()),
            ("SubscriberIdentity", "262010000000001".into()),
            ("SubscriberNumbers", vec!["+491701234567"].into()),
        ]),
    );
    radio.set_interface_properties(
        MODEM,
        "org.ofono.NetworkRegistration",
        props([
            ("Status", "registered".into()),
            ("Name", "Example Net".into()),
            ("MobileCountryCode", "262".into()),
            ("MobileNetworkCode", "01".into()),
            ("Strength", 70u32.into()),
            ("Technology", "lte".into()),
        ]),
    );
    radio.set_interface_properties(
        MODEM,
        "org.ofono.RadioSettings",
        props([
            ("AvailableTechnologies", vec!["gsm", "umts", "lte"].into()),
            ("TechnologyPreference", "lte".into()),
        ]),
    );
    radio.set_interface_properties(
        MODEM,
        "org.ofono.VoiceCallManager",
        props([("EmergencyNumbers", vec!["112", "911"].into())]),
    );
}

pub fn modem_object(radio: &MockRadio, path: &str) -> RadioObject {
    RadioObject::new(path, radio.modem_properties(path))
}

/// Build and start the engine for `MODEM` against `radio`.
pub async fn start_modem(
    radio: &Arc<MockRadio>,
    publisher: &Arc<RecordingPublisher>,
    settings: &Settings,
) -> Arc<Modem> {
    let modem = Modem::new(
        0,
        modem_object(radio, MODEM),
        radio.clone(),
        publisher.clone(),
        Arc::new(IdAllocator::new()),
        settings,
    );
    modem.start().await;
    modem
}

/// Let spawned tasks run until `condition` holds. Panics if it never does.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

/// Let spawned tasks drain their queues.
pub async fn settle() {
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
}
