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

use crate::error::BridgeError;
use crate::modem::enums::{CallDirection, CallState, CallStateReason};
use crate::modem::ids::IdAllocator;
use crate::modem::notify::{Notification, Publisher};
use crate::modem::snapshot::{CallSnapshot, Published};
use crate::radio::value::{PropertyMap, PropertyMapExt, PropertyValue};
use crate::radio::{EventSender, RadioInterface, RadioObject, RadioService, Subscription};
use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;

fn direction(state: CallState) -> CallDirection {
    match state {
        CallState::RingingIn | CallState::Waiting => CallDirection::Incoming,
        _ => CallDirection::Outgoing,
    }
}

fn reason_for(state: CallState, direction: CallDirection) -> CallStateReason {
    match state {
        CallState::Active => CallStateReason::Accepted,
        CallState::Terminated => CallStateReason::Terminated,
        _ if direction == CallDirection::Incoming => CallStateReason::IncomingNew,
        CallState::Dialing | CallState::RingingOut => CallStateReason::OutgoingStarted,
        _ => CallStateReason::Unknown,
    }
}

/// Initial snapshot of a call from its oFono properties.
pub fn call_snapshot(properties: &PropertyMap) -> CallSnapshot {
    let state = properties
        .str_of("State")
        .map(CallState::from_ofono)
        .unwrap_or_default();
    let direction = direction(state);
    CallSnapshot {
        state,
        state_reason: reason_for(state, direction),
        direction,
        number: properties
            .str_of("LineIdentification")
            .unwrap_or_default()
            .to_string(),
        multiparty: properties.bool_of("Multiparty").unwrap_or(false),
    }
}

/// A voice call exported as `org.freedesktop.ModemManager1.Call`.
pub struct Call {
    path: String,
    radio_path: String,
    modem_path: String,
    radio: Arc<dyn RadioService>,
    publisher: Arc<dyn Publisher>,
    snapshot: Published<CallSnapshot>,
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("path", &self.path)
            .field("radio_path", &self.radio_path)
            .finish()
    }
}

impl Call {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn radio_path(&self) -> &str {
        &self.radio_path
    }

    pub fn snapshot(&self) -> &Published<CallSnapshot> {
        &self.snapshot
    }

    /// Outgoing calls are placed when they are created, so there is nothing left to start.
    pub async fn start(&self) -> Result<(), BridgeError> {
        debug!("{} already dialed", self.path);
        Ok(())
    }

    pub async fn accept(&self) -> Result<(), BridgeError> {
        self.radio.answer(&self.radio_path).await
    }

    pub async fn hangup(&self) -> Result<(), BridgeError> {
        self.radio.hangup(&self.radio_path).await
    }

    pub async fn deflect(&self, number: &str) -> Result<(), BridgeError> {
        self.radio.deflect(&self.radio_path, number).await
    }

    pub async fn send_dtmf(&self, tones: &str) -> Result<(), BridgeError> {
        self.radio.send_tones(&self.modem_path, tones).await
    }

    /// Join every active and held call into a conference.
    pub async fn join_multiparty(&self) -> Result<(), BridgeError> {
        self.radio.create_multiparty(&self.modem_path).await.map(|_| ())
    }

    /// Split this call off the conference, holding the others.
    pub async fn leave_multiparty(&self) -> Result<(), BridgeError> {
        self.radio
            .private_chat(&self.modem_path, &self.radio_path)
            .await
            .map(|_| ())
    }

    pub async fn on_property(&self, name: &str, value: &PropertyValue) {
        let old = self.snapshot.read(|s| s.state);
        let changed = self.snapshot.modify(|snapshot| match name {
            "State" => {
                if let Some(state) = value.as_str().map(CallState::from_ofono) {
                    snapshot.state = state;
                    snapshot.state_reason = reason_for(state, snapshot.direction);
                }
            }
            "LineIdentification" => {
                if let Some(number) = value.as_str() {
                    snapshot.number = number.to_string();
                }
            }
            "Multiparty" => {
                if let Some(multiparty) = value.as_bool() {
                    snapshot.multiparty = multiparty;
                }
            }
            _ => {}
        });
        if changed.is_empty() {
            return;
        }
        let (new, reason) = self.snapshot.read(|s| (s.state, s.state_reason));
        self.publisher
            .publish(Notification::CallChanged {
                path: self.path.clone(),
                changed,
            })
            .await;
        if old != new {
            debug!("{}: {old:?} -> {new:?}", self.path);
            self.publisher
                .publish(Notification::CallStateChanged {
                    path: self.path.clone(),
                    old,
                    new,
                    reason,
                })
                .await;
        }
    }
}

struct TrackedCall {
    call: Arc<Call>,
    _subscription: Option<Subscription>,
}

/// Creates, exports and removes the calls of one modem as oFono reports them.
pub struct CallRegistrar {
    modem_path: String,
    radio: Arc<dyn RadioService>,
    publisher: Arc<dyn Publisher>,
    ids: Arc<IdAllocator>,
    events: EventSender,
    calls: Vec<TrackedCall>,
}

impl CallRegistrar {
    pub fn new(
        modem_path: &str,
        radio: Arc<dyn RadioService>,
        publisher: Arc<dyn Publisher>,
        ids: Arc<IdAllocator>,
        events: EventSender,
    ) -> Self {
        CallRegistrar {
            modem_path: modem_path.to_string(),
            radio,
            publisher,
            ids,
            events,
            calls: Vec::new(),
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls
            .iter()
            .map(|tracked| tracked.call.path().to_string())
            .collect()
    }

    pub fn get(&self, path: &str) -> Option<Arc<Call>> {
        self.calls
            .iter()
            .find(|tracked| tracked.call.path() == path)
            .map(|tracked| tracked.call.clone())
    }

    pub fn by_radio_path(&self, radio_path: &str) -> Option<Arc<Call>> {
        self.calls
            .iter()
            .find(|tracked| tracked.call.radio_path() == radio_path)
            .map(|tracked| tracked.call.clone())
    }

    async fn track(&mut self, object: RadioObject) -> Arc<Call> {
        let subscription = match self
            .radio
            .subscribe(&object.path, &RadioInterface::VoiceCall, self.events.clone())
            .await
        {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                warn!("{}: cannot watch call {}: {e}", self.modem_path, object.path);
                None
            }
        };
        let call = Arc::new(Call {
            path: self.ids.next_call(),
            radio_path: object.path,
            modem_path: self.modem_path.clone(),
            radio: self.radio.clone(),
            publisher: self.publisher.clone(),
            snapshot: Published::new(call_snapshot(&object.properties)),
        });
        info!("{} exported for {}", call.path(), call.radio_path());
        self.calls.push(TrackedCall {
            call: call.clone(),
            _subscription: subscription,
        });
        self.publisher
            .publish(Notification::CallAdded(call.clone()))
            .await;
        call
    }

    /// Export a call announced by `CallAdded`. Calls already exported, such as ones this
    /// registrar dialed, are skipped.
    pub async fn on_call_added(&mut self, object: RadioObject) -> bool {
        if self.by_radio_path(&object.path).is_some() {
            return false;
        }
        self.track(object).await;
        true
    }

    pub async fn dial(&mut self, number: &str) -> Result<Arc<Call>, BridgeError> {
        let radio_path = self.radio.dial(&self.modem_path, number).await?;
        if let Some(call) = self.by_radio_path(&radio_path) {
            return Ok(call);
        }
        let mut properties = self
            .radio
            .properties(&radio_path, &RadioInterface::VoiceCall)
            .await
            .unwrap_or_default();
        properties
            .entry("State".to_string())
            .or_insert_with(|| PropertyValue::from("dialing"));
        properties
            .entry("LineIdentification".to_string())
            .or_insert_with(|| PropertyValue::from(number));
        Ok(self.track(RadioObject::new(radio_path, properties)).await)
    }

    fn untrack(&mut self, call_path: &str) -> Option<Arc<Call>> {
        let index = self
            .calls
            .iter()
            .position(|tracked| tracked.call.path() == call_path)?;
        Some(self.calls.remove(index).call)
    }

    pub async fn on_call_removed(&mut self, radio_path: &str) -> bool {
        let Some(call) = self.by_radio_path(radio_path) else {
            return false;
        };
        self.untrack(call.path());
        self.publisher
            .publish(Notification::CallRemoved(call.path().to_string()))
            .await;
        info!("{} ended", call.path());
        true
    }

    /// Remove a call on client request, hanging it up if it is still up.
    pub async fn delete(&mut self, path: &str) -> bool {
        let Some(call) = self.untrack(path) else {
            return false;
        };
        if call.snapshot().read(|s| s.state) != CallState::Terminated {
            if let Err(e) = call.hangup().await {
                warn!("Hanging up {path}: {e}");
            }
        }
        self.publisher
            .publish(Notification::CallRemoved(path.to_string()))
            .await;
        true
    }

    pub async fn on_call_property(
        &mut self,
        radio_path: &str,
        name: &str,
        value: &PropertyValue,
    ) -> bool {
        let Some(call) = self.by_radio_path(radio_path) else {
            return false;
        };
        call.on_property(name, value).await;
        true
    }

    /// Export the calls oFono already has, as found when the voice call manager appears.
    pub async fn discover(&mut self) -> bool {
        let calls = match self.radio.calls(&self.modem_path).await {
            Ok(calls) => calls,
            Err(e) => {
                warn!("{}: cannot list calls: {e}", self.modem_path);
                return false;
            }
        };
        let mut added = false;
        for call in calls {
            added |= self.on_call_added(call).await;
        }
        added
    }

    /// Drop every call, as when the voice call manager goes away.
    pub async fn clear(&mut self) -> bool {
        let removed: Vec<Arc<Call>> = self.calls.drain(..).map(|tracked| tracked.call).collect();
        for call in &removed {
            self.publisher
                .publish(Notification::CallRemoved(call.path().to_string()))
                .await;
        }
        !removed.is_empty()
    }
}
