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

use async_trait::async_trait;
use ofono2mm::error::BridgeError;
use ofono2mm::radio::value::{PropertyMap, PropertyValue};
use ofono2mm::radio::{
    EventSender, ManagerEvent, ManagerEventSender, RadioEvent, RadioInterface, RadioObject,
    RadioService, Subscription,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};

type Key = (String, String);

fn key(path: &str, interface: &str) -> Key {
    (path.to_string(), interface.to_string())
}

#[derive(Default)]
struct MockState {
    service_present: bool,
    modems: Vec<String>,
    properties: HashMap<Key, PropertyMap>,
    contexts: Vec<(String, String)>,
    calls: Vec<(String, String)>,
    operators: Vec<RadioObject>,
    subscribers: HashMap<Key, Vec<UnboundedSender<RadioEvent>>>,
    manager_subscribers: Vec<UnboundedSender<ManagerEvent>>,
    failures: HashMap<String, u32>,
    delays: HashMap<String, Duration>,
    log: Vec<String>,
    next_id: u32,
}

/// An in-memory oFono. Property writes are stored and echoed as `PropertyChanged`, the way the
/// real daemon does, and every call is logged for assertions.
pub struct MockRadio {
    state: Mutex<MockState>,
}

/// Forward from a channel the mock owns into `sink`, so that dropping the subscription closes
/// the mock's end.
fn forward<T: Send + 'static>(sink: UnboundedSender<T>) -> (UnboundedSender<T>, Subscription) {
    let (tx, mut rx) = mpsc::unbounded_channel::<T>();
    let task = tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            if sink.send(item).is_err() {
                break;
            }
        }
    });
    (tx, Subscription::new(task))
}

fn injected(operation: &str) -> BridgeError {
    BridgeError::radio(operation, zbus::Error::Failure(format!("injected {operation}")))
}

impl MockRadio {
    pub fn new() -> Arc<Self> {
        Arc::new(MockRadio {
            state: Mutex::new(MockState {
                service_present: true,
                ..MockState::default()
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn record(&self, operation: &str, entry: String) -> Result<(), BridgeError> {
        let mut state = self.lock();
        state.log.push(entry);
        match state.failures.get_mut(operation) {
            Some(0) | None => Ok(()),
            Some(left) => {
                if *left != u32::MAX {
                    *left -= 1;
                }
                Err(injected(operation))
            }
        }
    }

    fn next_id(&self) -> u32 {
        let mut state = self.lock();
        state.next_id += 1;
        state.next_id
    }

    fn emit(&self, path: &str, interface: &str, event: RadioEvent) {
        let mut state = self.lock();
        if let Some(senders) = state.subscribers.get_mut(&key(path, interface)) {
            senders.retain(|sender| sender.send(event.clone()).is_ok());
        }
    }

    fn emit_manager(&self, event: ManagerEvent) {
        self.lock()
            .manager_subscribers
            .retain(|sender| sender.send(event.clone()).is_ok());
    }

    // Test setup

    pub fn set_service_present(&self, present: bool) {
        self.lock().service_present = present;
    }

    pub fn add_modem(&self, path: &str, properties: PropertyMap) {
        let mut state = self.lock();
        if !state.modems.iter().any(|m| m == path) {
            state.modems.push(path.to_string());
        }
        state
            .properties
            .insert(key(path, "org.ofono.Modem"), properties);
    }

    pub fn modem_properties(&self, path: &str) -> PropertyMap {
        self.lock()
            .properties
            .get(&key(path, "org.ofono.Modem"))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_interface_properties(&self, path: &str, interface: &str, properties: PropertyMap) {
        self.lock()
            .properties
            .insert(key(path, interface), properties);
    }

    pub fn property(&self, path: &str, interface: &str, name: &str) -> Option<PropertyValue> {
        self.lock()
            .properties
            .get(&key(path, interface))
            .and_then(|properties| properties.get(name).cloned())
    }

    pub fn seed_context(&self, modem: &str, path: &str, properties: PropertyMap) {
        let mut state = self.lock();
        state.contexts.push((modem.to_string(), path.to_string()));
        state
            .properties
            .insert(key(path, "org.ofono.ConnectionContext"), properties);
    }

    pub fn set_operators(&self, operators: Vec<RadioObject>) {
        self.lock().operators = operators;
    }

    /// Make the next `times` calls of `operation` fail; `u32::MAX` fails forever.
    pub fn fail(&self, operation: &str, times: u32) {
        self.lock().failures.insert(operation.to_string(), times);
    }

    /// Hold back the reply of the next `operation` for `delay`. The call takes effect at once.
    pub fn delay_reply(&self, operation: &str, delay: Duration) {
        self.lock().delays.insert(operation.to_string(), delay);
    }

    pub fn heal(&self, operation: &str) {
        self.lock().failures.remove(operation);
    }

    pub fn log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.lock().log.iter().filter(|e| *e == entry).count()
    }

    pub fn context_count(&self) -> usize {
        self.lock().contexts.len()
    }

    // oFono behaving on its own

    /// Change a property as oFono would, emitting `PropertyChanged`.
    pub fn change(&self, path: &str, interface: &str, name: &str, value: PropertyValue) {
        self.lock()
            .properties
            .entry(key(path, interface))
            .or_default()
            .insert(name.to_string(), value.clone());
        let radio_interface = RadioInterface::from(interface);
        let event = if radio_interface.is_per_object() {
            RadioEvent::ObjectPropertyChanged {
                path: path.to_string(),
                name: name.to_string(),
                value,
            }
        } else {
            RadioEvent::PropertyChanged {
                interface: radio_interface,
                name: name.to_string(),
                value,
            }
        };
        self.emit(path, interface, event);
    }

    /// Store a new network time report and emit `NetworkTimeChanged`.
    pub fn network_time_changed(&self, modem: &str, properties: PropertyMap) {
        self.set_interface_properties(modem, "org.ofono.NetworkTime", properties.clone());
        self.emit(
            modem,
            "org.ofono.NetworkTime",
            RadioEvent::PropertiesReplaced {
                interface: RadioInterface::NetworkTime,
                properties,
            },
        );
    }

    pub fn set_interfaces(&self, modem: &str, interfaces: &[&str]) {
        self.change(
            modem,
            "org.ofono.Modem",
            "Interfaces",
            PropertyValue::from(interfaces.to_vec()),
        );
    }

    pub fn announce_modem(&self, path: &str, properties: PropertyMap) {
        self.add_modem(path, properties.clone());
        self.emit_manager(ManagerEvent::ModemAdded(RadioObject::new(path, properties)));
    }

    pub fn withdraw_modem(&self, path: &str) {
        self.lock().modems.retain(|m| m != path);
        self.emit_manager(ManagerEvent::ModemRemoved(path.to_string()));
    }

    pub fn vanish(&self) {
        self.set_service_present(false);
        self.emit_manager(ManagerEvent::ServiceVanished);
    }

    pub fn appear(&self) {
        self.set_service_present(true);
        self.emit_manager(ManagerEvent::ServiceAppeared);
    }

    pub fn drop_context(&self, modem: &str, context: &str) {
        self.lock().contexts.retain(|(_, c)| c != context);
        self.emit(
            modem,
            "org.ofono.ConnectionManager",
            RadioEvent::ContextRemoved(context.to_string()),
        );
    }

    pub fn incoming_call(&self, modem: &str, path: &str, number: &str) {
        let properties: PropertyMap = [
            ("State".to_string(), PropertyValue::from("incoming")),
            ("LineIdentification".to_string(), PropertyValue::from(number)),
        ]
        .into_iter()
        .collect();
        {
            let mut state = self.lock();
            state.calls.push((modem.to_string(), path.to_string()));
            state
                .properties
                .insert(key(path, "org.ofono.VoiceCall"), properties.clone());
        }
        self.emit(
            modem,
            "org.ofono.VoiceCallManager",
            RadioEvent::CallAdded(RadioObject::new(path, properties)),
        );
    }

    pub fn end_call(&self, modem: &str, path: &str) {
        self.change(
            path,
            "org.ofono.VoiceCall",
            "State",
            PropertyValue::from("disconnected"),
        );
        self.lock().calls.retain(|(_, c)| c != path);
        self.emit(
            modem,
            "org.ofono.VoiceCallManager",
            RadioEvent::CallRemoved(path.to_string()),
        );
    }

    pub fn incoming_message(&self, modem: &str, text: &str, sender: &str) {
        let properties: PropertyMap = [
            ("Sender".to_string(), PropertyValue::from(sender)),
            (
                "SentTime".to_string(),
                PropertyValue::from("2025-03-01T10:00:00+0100"),
            ),
        ]
        .into_iter()
        .collect();
        self.emit(
            modem,
            "org.ofono.MessageManager",
            RadioEvent::IncomingMessage {
                text: text.to_string(),
                properties,
            },
        );
    }

    fn objects(&self, entries: &[(String, String)], modem: &str, interface: &str) -> Vec<RadioObject> {
        let state = self.lock();
        entries
            .iter()
            .filter(|(owner, _)| owner == modem)
            .map(|(_, path)| {
                RadioObject::new(
                    path.clone(),
                    state
                        .properties
                        .get(&key(path, interface))
                        .cloned()
                        .unwrap_or_default(),
                )
            })
            .collect()
    }
}

#[async_trait]
impl RadioService for MockRadio {
    async fn modems(&self) -> Result<Vec<RadioObject>, BridgeError> {
        self.record("GetModems", "GetModems".into())?;
        let paths = self.lock().modems.clone();
        Ok(paths
            .iter()
            .map(|path| RadioObject::new(path.clone(), self.modem_properties(path)))
            .collect())
    }

    async fn service_present(&self) -> Result<bool, BridgeError> {
        Ok(self.lock().service_present)
    }

    async fn subscribe_manager(
        &self,
        events: ManagerEventSender,
    ) -> Result<Subscription, BridgeError> {
        let (sender, subscription) = forward(events);
        self.lock().manager_subscribers.push(sender);
        Ok(subscription)
    }

    async fn properties(
        &self,
        path: &str,
        interface: &RadioInterface,
    ) -> Result<PropertyMap, BridgeError> {
        let method = interface.properties_method();
        self.record(method, format!("{method} {path} {interface}"))?;
        Ok(self
            .lock()
            .properties
            .get(&key(path, interface.as_str()))
            .cloned()
            .unwrap_or_default())
    }

    async fn set_property(
        &self,
        path: &str,
        interface: &RadioInterface,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), BridgeError> {
        let operation = format!("SetProperty {name}");
        self.record(&operation, format!("SetProperty {path} {name}={value:?}"))?;
        self.change(path, interface.as_str(), name, value);
        let delay = self.lock().delays.remove(&operation);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        path: &str,
        interface: &RadioInterface,
        events: EventSender,
    ) -> Result<Subscription, BridgeError> {
        let (sender, subscription) = forward(events);
        self.lock()
            .subscribers
            .entry(key(path, interface.as_str()))
            .or_default()
            .push(sender);
        Ok(subscription)
    }

    async fn enter_pin(&self, modem: &str, pin_type: &str, pin: &str) -> Result<(), BridgeError> {
        self.record("EnterPin", format!("EnterPin {modem} {pin_type} {pin}"))
    }

    async fn reset_pin(
        &self,
        modem: &str,
        puk_type: &str,
        puk: &str,
        new_pin: &str,
    ) -> Result<(), BridgeError> {
        self.record(
            "ResetPin",
            format!("ResetPin {modem} {puk_type} {puk} {new_pin}"),
        )
    }

    async fn lock_pin(&self, modem: &str, pin_type: &str, pin: &str) -> Result<(), BridgeError> {
        self.record("LockPin", format!("LockPin {modem} {pin_type} {pin}"))
    }

    async fn unlock_pin(&self, modem: &str, pin_type: &str, pin: &str) -> Result<(), BridgeError> {
        self.record("UnlockPin", format!("UnlockPin {modem} {pin_type} {pin}"))
    }

    async fn change_pin(
        &self,
        modem: &str,
        pin_type: &str,
        old_pin: &str,
        new_pin: &str,
    ) -> Result<(), BridgeError> {
        self.record(
            "ChangePin",
            format!("ChangePin {modem} {pin_type} {old_pin} {new_pin}"),
        )
    }

    async fn register(&self, modem: &str) -> Result<(), BridgeError> {
        self.record("Register", format!("Register {modem}"))
    }

    async fn register_operator(&self, operator: &str) -> Result<(), BridgeError> {
        self.record("RegisterOperator", format!("Register {operator}"))
    }

    async fn scan(&self, modem: &str) -> Result<Vec<RadioObject>, BridgeError> {
        self.record("Scan", format!("Scan {modem}"))?;
        Ok(self.lock().operators.clone())
    }

    async fn contexts(&self, modem: &str) -> Result<Vec<RadioObject>, BridgeError> {
        self.record("GetContexts", format!("GetContexts {modem}"))?;
        let contexts = self.lock().contexts.clone();
        Ok(self.objects(&contexts, modem, "org.ofono.ConnectionContext"))
    }

    async fn add_context(&self, modem: &str, context_type: &str) -> Result<String, BridgeError> {
        self.record("AddContext", format!("AddContext {modem} {context_type}"))?;
        let path = format!("{modem}/context{}", self.next_id());
        let properties: PropertyMap = [
            ("Type".to_string(), PropertyValue::from(context_type)),
            ("Active".to_string(), PropertyValue::from(false)),
            ("AccessPointName".to_string(), PropertyValue::from("")),
        ]
        .into_iter()
        .collect();
        self.seed_context(modem, &path, properties.clone());
        self.emit(
            modem,
            "org.ofono.ConnectionManager",
            RadioEvent::ContextAdded(RadioObject::new(path.clone(), properties)),
        );
        Ok(path)
    }

    async fn remove_context(&self, modem: &str, context: &str) -> Result<(), BridgeError> {
        self.record("RemoveContext", format!("RemoveContext {modem} {context}"))?;
        self.drop_context(modem, context);
        Ok(())
    }

    async fn calls(&self, modem: &str) -> Result<Vec<RadioObject>, BridgeError> {
        self.record("GetCalls", format!("GetCalls {modem}"))?;
        let calls = self.lock().calls.clone();
        Ok(self.objects(&calls, modem, "org.ofono.VoiceCall"))
    }

    async fn dial(&self, modem: &str, number: &str) -> Result<String, BridgeError> {
        self.record("Dial", format!("Dial {modem} {number}"))?;
        let path = format!("{modem}/voicecall{:02}", self.next_id());
        let properties: PropertyMap = [
            ("State".to_string(), PropertyValue::from("dialing")),
            ("LineIdentification".to_string(), PropertyValue::from(number)),
        ]
        .into_iter()
        .collect();
        {
            let mut state = self.lock();
            state.calls.push((modem.to_string(), path.clone()));
            state
                .properties
                .insert(key(&path, "org.ofono.VoiceCall"), properties.clone());
        }
        self.emit(
            modem,
            "org.ofono.VoiceCallManager",
            RadioEvent::CallAdded(RadioObject::new(path.clone(), properties)),
        );
        Ok(path)
    }

    async fn hangup_all(&self, modem: &str) -> Result<(), BridgeError> {
        self.record("HangupAll", format!("HangupAll {modem}"))
    }

    async fn hold_and_answer(&self, modem: &str) -> Result<(), BridgeError> {
        self.record("HoldAndAnswer", format!("HoldAndAnswer {modem}"))
    }

    async fn release_and_answer(&self, modem: &str) -> Result<(), BridgeError> {
        self.record("ReleaseAndAnswer", format!("ReleaseAndAnswer {modem}"))
    }

    async fn transfer(&self, modem: &str) -> Result<(), BridgeError> {
        self.record("Transfer", format!("Transfer {modem}"))
    }

    async fn send_tones(&self, modem: &str, tones: &str) -> Result<(), BridgeError> {
        self.record("SendTones", format!("SendTones {modem} {tones}"))
    }

    async fn create_multiparty(&self, modem: &str) -> Result<Vec<String>, BridgeError> {
        self.record("CreateMultiparty", format!("CreateMultiparty {modem}"))?;
        Ok(Vec::new())
    }

    async fn private_chat(&self, modem: &str, call: &str) -> Result<Vec<String>, BridgeError> {
        self.record("PrivateChat", format!("PrivateChat {modem} {call}"))?;
        Ok(Vec::new())
    }

    async fn answer(&self, call: &str) -> Result<(), BridgeError> {
        self.record("Answer", format!("Answer {call}"))?;
        self.change(call, "org.ofono.VoiceCall", "State", "active".into());
        Ok(())
    }

    async fn hangup(&self, call: &str) -> Result<(), BridgeError> {
        self.record("Hangup", format!("Hangup {call}"))
    }

    async fn deflect(&self, call: &str, number: &str) -> Result<(), BridgeError> {
        self.record("Deflect", format!("Deflect {call} {number}"))
    }

    async fn send_message(&self, modem: &str, to: &str, text: &str) -> Result<String, BridgeError> {
        self.record("SendMessage", format!("SendMessage {modem} {to} {text}"))?;
        Ok(format!("{modem}/message_{:02}", self.next_id()))
    }
}
