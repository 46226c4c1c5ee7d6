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
use crate::modem::enums::{SmsPduType, SmsState};
use crate::modem::ids::IdAllocator;
use crate::modem::notify::{Notification, Publisher};
use crate::modem::snapshot::{Published, SmsSnapshot};
use crate::radio::RadioService;
use crate::radio::value::{PropertyMap, PropertyMapExt};
use log::{info, warn};
use std::fmt;
use std::sync::Arc;

/// Client supplied SMS properties for `Messaging.Create`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmsRequest {
    pub number: String,
    pub text: String,
    pub delivery_report_request: bool,
}

impl SmsRequest {
    /// Validate the `number` and `text` members of a `Create` request.
    pub fn from_properties(properties: &PropertyMap) -> Result<Self, BridgeError> {
        let number = properties
            .str_of("number")
            .filter(|number| !number.is_empty())
            .ok_or_else(|| BridgeError::Argument("SMS needs a number".into()))?;
        let text = properties
            .str_of("text")
            .ok_or_else(|| BridgeError::Argument("SMS needs a text".into()))?;
        Ok(SmsRequest {
            number: number.to_string(),
            text: text.to_string(),
            delivery_report_request: properties
                .bool_of("delivery-report-request")
                .unwrap_or(false),
        })
    }
}

/// A text message exported as `org.freedesktop.ModemManager1.Sms`.
pub struct Sms {
    path: String,
    modem_path: String,
    radio: Arc<dyn RadioService>,
    publisher: Arc<dyn Publisher>,
    snapshot: Published<SmsSnapshot>,
}

impl fmt::Debug for Sms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sms").field("path", &self.path).finish()
    }
}

impl Sms {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn snapshot(&self) -> &Published<SmsSnapshot> {
        &self.snapshot
    }

    async fn set_state(&self, state: SmsState) {
        let changed = self.snapshot.modify(|snapshot| snapshot.state = state);
        if !changed.is_empty() {
            self.publisher
                .publish(Notification::MessageChanged {
                    path: self.path.clone(),
                    changed,
                })
                .await;
        }
    }

    /// Hand an outgoing message to the message manager.
    pub async fn send(&self) -> Result<(), BridgeError> {
        let (pdu_type, number, text) = self
            .snapshot
            .read(|s| (s.pdu_type, s.number.clone(), s.text.clone()));
        if pdu_type != SmsPduType::Submit {
            return Err(BridgeError::Argument(format!(
                "{} is a received message",
                self.path
            )));
        }
        match self
            .radio
            .send_message(&self.modem_path, &number, &text)
            .await
        {
            Ok(radio_path) => {
                info!("{} sent as {radio_path}", self.path);
                self.set_state(SmsState::Sent).await;
                Ok(())
            }
            Err(e) => {
                self.set_state(SmsState::Stored).await;
                Err(e)
            }
        }
    }

    /// Messages are kept in memory only, so storing is a no-op.
    pub async fn store(&self, _storage: u32) -> Result<(), BridgeError> {
        Ok(())
    }
}

/// Exports received and client-created messages of one modem.
pub struct MessageRegistrar {
    modem_path: String,
    radio: Arc<dyn RadioService>,
    publisher: Arc<dyn Publisher>,
    ids: Arc<IdAllocator>,
    messages: Vec<Arc<Sms>>,
}

impl MessageRegistrar {
    pub fn new(
        modem_path: &str,
        radio: Arc<dyn RadioService>,
        publisher: Arc<dyn Publisher>,
        ids: Arc<IdAllocator>,
    ) -> Self {
        MessageRegistrar {
            modem_path: modem_path.to_string(),
            radio,
            publisher,
            ids,
            messages: Vec::new(),
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.messages
            .iter()
            .map(|sms| sms.path().to_string())
            .collect()
    }

    pub fn get(&self, path: &str) -> Option<Arc<Sms>> {
        self.messages.iter().find(|sms| sms.path() == path).cloned()
    }

    async fn export(&mut self, snapshot: SmsSnapshot, received: bool) -> Arc<Sms> {
        let sms = Arc::new(Sms {
            path: self.ids.next_message(),
            modem_path: self.modem_path.clone(),
            radio: self.radio.clone(),
            publisher: self.publisher.clone(),
            snapshot: Published::new(snapshot),
        });
        self.messages.push(sms.clone());
        self.publisher
            .publish(Notification::MessageAdded {
                sms: sms.clone(),
                received,
            })
            .await;
        sms
    }

    /// Export a message delivered by `IncomingMessage`.
    pub async fn on_incoming(&mut self, text: String, properties: &PropertyMap) -> Arc<Sms> {
        let snapshot = SmsSnapshot {
            state: SmsState::Received,
            pdu_type: SmsPduType::Deliver,
            number: properties.str_of("Sender").unwrap_or_default().to_string(),
            text,
            timestamp: properties.str_of("SentTime").unwrap_or_default().to_string(),
            delivery_report_request: false,
        };
        let sms = self.export(snapshot, true).await;
        info!("{}: received {}", self.modem_path, sms.path());
        sms
    }

    /// Export an outgoing message and, when the modem can send, send it right away. A failed send
    /// leaves the message stored; the path is still returned so the client can retry with `Send`.
    pub async fn create(&mut self, request: SmsRequest, can_send: bool) -> Arc<Sms> {
        let snapshot = SmsSnapshot {
            state: SmsState::Stored,
            pdu_type: SmsPduType::Submit,
            number: request.number,
            text: request.text,
            timestamp: String::new(),
            delivery_report_request: request.delivery_report_request,
        };
        let sms = self.export(snapshot, false).await;
        if can_send {
            if let Err(e) = sms.send().await {
                warn!("{}: sending {} failed: {e}", self.modem_path, sms.path());
            }
        }
        sms
    }

    pub async fn delete(&mut self, path: &str) -> bool {
        let Some(index) = self.messages.iter().position(|sms| sms.path() == path) else {
            return false;
        };
        self.messages.remove(index);
        self.publisher
            .publish(Notification::MessageRemoved(path.to_string()))
            .await;
        true
    }

    pub async fn clear(&mut self) {
        for sms in self.messages.drain(..) {
            self.publisher
                .publish(Notification::MessageRemoved(sms.path().to_string()))
                .await;
        }
    }
}
