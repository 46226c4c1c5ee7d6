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

//! [`RadioService`] over the system bus, talking to `org.ofono`.
//!
//! Method calls go through the typed proxies in [`crate::radio::proxies`], except for the
//! `GetProperties`/`SetProperty` pair, which every oFono interface shares and which is therefore
//! called on an untyped [`zbus::Proxy`] built for the requested interface.
//!
//! Signals are consumed with one match rule per subscribed object and interface. Every rule is
//! bound to the `org.ofono` sender, so other peers on the bus cannot inject radio events.

use crate::config::OFONO_BUS_NAME;
use crate::error::BridgeError;
use crate::radio::proxies::{
    ConnectionManagerProxy, ManagerProxy, MessageManagerProxy, NetworkOperatorProxy,
    NetworkRegistrationProxy, ObjectEntry, SimManagerProxy, VoiceCallManagerProxy, VoiceCallProxy,
};
use crate::radio::value::{PropertyMap, PropertyValue, property_map};
use crate::radio::{
    EventSender, ManagerEvent, ManagerEventSender, RadioEvent, RadioInterface, RadioObject,
    RadioService, Subscription,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, trace};
use std::collections::HashMap;
use zbus::proxy::CacheProperties;
use zbus::zvariant::{ObjectPath, OwnedObjectPath, OwnedValue};
use zbus::{Connection, MatchRule, Message, MessageStream};

/// Build a typed oFono proxy for `$path`, mapping failures to [`BridgeError::Radio`].
macro_rules! radio_proxy {
    ($proxy:ident, $conn:expr, $path:expr, $operation:expr) => {
        $proxy::builder($conn)
            .path($path)
            .map_err(|e| BridgeError::radio($operation, e))?
            .cache_properties(CacheProperties::No)
            .build()
            .await
            .map_err(|e| BridgeError::radio($operation, e))?
    };
}

pub struct OfonoService {
    connection: Connection,
}

impl OfonoService {
    pub fn new(connection: Connection) -> Self {
        OfonoService { connection }
    }

    async fn generic_proxy<'a>(
        &self,
        path: &'a str,
        interface: &'a RadioInterface,
        operation: &str,
    ) -> Result<zbus::Proxy<'a>, BridgeError> {
        zbus::Proxy::new(&self.connection, OFONO_BUS_NAME, path, interface.as_str())
            .await
            .map_err(|e| BridgeError::radio(operation, e))
    }

    async fn signal_stream(
        &self,
        rule: Result<MatchRule<'_>, zbus::Error>,
        operation: &str,
    ) -> Result<MessageStream, BridgeError> {
        let rule = rule.map_err(|e| BridgeError::radio(operation, e))?;
        MessageStream::for_match_rule(rule, &self.connection, None)
            .await
            .map_err(|e| BridgeError::radio(operation, e))
    }
}

/// Signals of `interface` on `path`, as sent by oFono.
fn ofono_signals<'m>(path: &'m str, interface: &'m str) -> Result<MatchRule<'m>, zbus::Error> {
    MatchRule::builder()
        .msg_type(zbus::message::Type::Signal)
        .sender(OFONO_BUS_NAME)
        .and_then(|b| b.path(path))
        .and_then(|b| b.interface(interface))
        .map(|b| b.build())
}

fn object_path<'a>(path: &'a str, what: &str) -> Result<ObjectPath<'a>, BridgeError> {
    ObjectPath::try_from(path).map_err(|e| BridgeError::Marshal {
        what: format!("{what} {path}"),
        e,
    })
}

fn radio_objects(entries: Vec<ObjectEntry>) -> Vec<RadioObject> {
    entries
        .into_iter()
        .map(|(path, properties)| RadioObject::new(path.as_str(), property_map(&properties)))
        .collect()
}

fn paths(paths: Vec<OwnedObjectPath>) -> Vec<String> {
    paths.into_iter().map(|p| p.as_str().to_string()).collect()
}

/// Translate one oFono signal received for `path`/`interface` into a [`RadioEvent`]. Signals the
/// engine does not consume, and bodies that do not deserialize, yield `None`.
pub(crate) fn decode_signal(
    path: &str,
    interface: &RadioInterface,
    message: &Message,
) -> Option<RadioEvent> {
    let header = message.header();
    let member = header.member()?.to_string();
    let body = message.body();
    let event = match member.as_str() {
        "PropertyChanged" => {
            let (name, value) = body.deserialize::<(String, OwnedValue)>().ok()?;
            let value = PropertyValue::from(&*value);
            if interface.is_per_object() {
                RadioEvent::ObjectPropertyChanged {
                    path: path.to_string(),
                    name,
                    value,
                }
            } else {
                RadioEvent::PropertyChanged {
                    interface: interface.clone(),
                    name,
                    value,
                }
            }
        }
        "ContextAdded" | "CallAdded" => {
            let (added, properties) = body.deserialize::<ObjectEntry>().ok()?;
            let object = RadioObject::new(added.as_str(), property_map(&properties));
            if member == "ContextAdded" {
                RadioEvent::ContextAdded(object)
            } else {
                RadioEvent::CallAdded(object)
            }
        }
        "ContextRemoved" => {
            RadioEvent::ContextRemoved(body.deserialize::<OwnedObjectPath>().ok()?.to_string())
        }
        "CallRemoved" => {
            RadioEvent::CallRemoved(body.deserialize::<OwnedObjectPath>().ok()?.to_string())
        }
        "IncomingMessage" => {
            let (text, properties) = body
                .deserialize::<(String, HashMap<String, OwnedValue>)>()
                .ok()?;
            RadioEvent::IncomingMessage {
                text,
                properties: property_map(&properties),
            }
        }
        "NetworkTimeChanged" => {
            let properties = body.deserialize::<HashMap<String, OwnedValue>>().ok()?;
            RadioEvent::PropertiesReplaced {
                interface: interface.clone(),
                properties: property_map(&properties),
            }
        }
        _ => return None,
    };
    Some(event)
}

fn decode_manager_signal(message: &Message) -> Option<ManagerEvent> {
    let header = message.header();
    let member = header.member()?.to_string();
    let body = message.body();
    match member.as_str() {
        "ModemAdded" => {
            let (path, properties) = body.deserialize::<ObjectEntry>().ok()?;
            Some(ManagerEvent::ModemAdded(RadioObject::new(
                path.as_str(),
                property_map(&properties),
            )))
        }
        "ModemRemoved" => Some(ManagerEvent::ModemRemoved(
            body.deserialize::<OwnedObjectPath>().ok()?.to_string(),
        )),
        "NameOwnerChanged" => {
            let (_name, _old, new) = body.deserialize::<(String, String, String)>().ok()?;
            if new.is_empty() {
                Some(ManagerEvent::ServiceVanished)
            } else {
                Some(ManagerEvent::ServiceAppeared)
            }
        }
        _ => None,
    }
}

#[async_trait]
impl RadioService for OfonoService {
    async fn modems(&self) -> Result<Vec<RadioObject>, BridgeError> {
        let proxy = radio_proxy!(ManagerProxy, &self.connection, "/", "GetModems");
        let modems = proxy
            .get_modems()
            .await
            .map_err(|e| BridgeError::radio("GetModems", e))?;
        Ok(radio_objects(modems))
    }

    async fn service_present(&self) -> Result<bool, BridgeError> {
        let dbus = zbus::fdo::DBusProxy::new(&self.connection)
            .await
            .map_err(|e| BridgeError::radio("NameHasOwner", e))?;
        let name = zbus::names::BusName::try_from(OFONO_BUS_NAME)
            .map_err(|e| BridgeError::radio("NameHasOwner", e.into()))?;
        dbus.name_has_owner(name)
            .await
            .map_err(|e| BridgeError::radio("NameHasOwner", e.into()))
    }

    async fn subscribe_manager(
        &self,
        events: ManagerEventSender,
    ) -> Result<Subscription, BridgeError> {
        let modem_rule = ofono_signals("/", "org.ofono.Manager");
        let mut modem_stream = self.signal_stream(modem_rule, "subscribe Manager").await?;

        let owner_rule = MatchRule::builder()
            .msg_type(zbus::message::Type::Signal)
            .sender("org.freedesktop.DBus")
            .and_then(|b| b.interface("org.freedesktop.DBus"))
            .and_then(|b| b.member("NameOwnerChanged"))
            .and_then(|b| b.add_arg(OFONO_BUS_NAME))
            .map(|b| b.build());
        let mut owner_stream = self
            .signal_stream(owner_rule, "subscribe NameOwnerChanged")
            .await?;

        let task = tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    Some(message) = modem_stream.next() => message,
                    Some(message) = owner_stream.next() => message,
                    else => break,
                };
                let Ok(message) = message else {
                    continue;
                };
                if let Some(event) = decode_manager_signal(&message) {
                    trace!("oFono manager event {event:?}");
                    if events.send(event).is_err() {
                        break;
                    }
                }
            }
        });
        Ok(Subscription::new(task))
    }

    async fn properties(
        &self,
        path: &str,
        interface: &RadioInterface,
    ) -> Result<PropertyMap, BridgeError> {
        let method = interface.properties_method();
        let proxy = self.generic_proxy(path, interface, method).await?;
        let raw: HashMap<String, OwnedValue> = proxy
            .call(method, &())
            .await
            .map_err(|e| BridgeError::radio(format!("{interface}.{method}"), e))?;
        Ok(property_map(&raw))
    }

    async fn set_property(
        &self,
        path: &str,
        interface: &RadioInterface,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), BridgeError> {
        debug!("Setting {interface}.{name} = {value:?} on {path}");
        let value = value.to_value()?;
        let proxy = self.generic_proxy(path, interface, "SetProperty").await?;
        proxy
            .call::<_, _, ()>("SetProperty", &(name, value))
            .await
            .map_err(|e| BridgeError::radio(format!("{interface}.SetProperty({name})"), e))
    }

    async fn subscribe(
        &self,
        path: &str,
        interface: &RadioInterface,
        events: EventSender,
    ) -> Result<Subscription, BridgeError> {
        let rule = ofono_signals(path, interface.as_str());
        let mut stream = self
            .signal_stream(rule, &format!("subscribe {interface}"))
            .await?;
        let path = path.to_string();
        let interface = interface.clone();
        let task = tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                let Ok(message) = message else {
                    continue;
                };
                let Some(event) = decode_signal(&path, &interface, &message) else {
                    continue;
                };
                trace!("{path} {interface}: {event:?}");
                if events.send(event).is_err() {
                    break;
                }
            }
        });
        Ok(Subscription::new(task))
    }

    async fn enter_pin(&self, modem: &str, pin_type: &str, pin: &str) -> Result<(), BridgeError> {
        let sim = radio_proxy!(SimManagerProxy, &self.connection, modem, "EnterPin");
        sim.enter_pin(pin_type, pin)
            .await
            .map_err(|e| BridgeError::radio("EnterPin", e))
    }

    async fn reset_pin(
        &self,
        modem: &str,
        puk_type: &str,
        puk: &str,
        new_pin: &str,
    ) -> Result<(), BridgeError> {
        let sim = radio_proxy!(SimManagerProxy, &self.connection, modem, "ResetPin");
        sim.reset_pin(puk_type, puk, new_pin)
            .await
            .map_err(|e| BridgeError::radio("ResetPin", e))
    }

    async fn lock_pin(&self, modem: &str, pin_type: &str, pin: &str) -> Result<(), BridgeError> {
        let sim = radio_proxy!(SimManagerProxy, &self.connection, modem, "LockPin");
        sim.lock_pin(pin_type, pin)
            .await
            .map_err(|e| BridgeError::radio("LockPin", e))
    }

    async fn unlock_pin(&self, modem: &str, pin_type: &str, pin: &str) -> Result<(), BridgeError> {
        let sim = radio_proxy!(SimManagerProxy, &self.connection, modem, "UnlockPin");
        sim.unlock_pin(pin_type, pin)
            .await
            .map_err(|e| BridgeError::radio("UnlockPin", e))
    }

    async fn change_pin(
        &self,
        modem: &str,
        pin_type: &str,
        old_pin: &str,
        new_pin: &str,
    ) -> Result<(), BridgeError> {
        let sim = radio_proxy!(SimManagerProxy, &self.connection, modem, "ChangePin");
        sim.change_pin(pin_type, old_pin, new_pin)
            .await
            .map_err(|e| BridgeError::radio("ChangePin", e))
    }

    async fn register(&self, modem: &str) -> Result<(), BridgeError> {
        let netreg = radio_proxy!(NetworkRegistrationProxy, &self.connection, modem, "Register");
        netreg
            .register()
            .await
            .map_err(|e| BridgeError::radio("NetworkRegistration.Register", e))
    }

    async fn register_operator(&self, operator: &str) -> Result<(), BridgeError> {
        let op = radio_proxy!(NetworkOperatorProxy, &self.connection, operator, "Register");
        op.register()
            .await
            .map_err(|e| BridgeError::radio("NetworkOperator.Register", e))
    }

    async fn scan(&self, modem: &str) -> Result<Vec<RadioObject>, BridgeError> {
        let netreg = radio_proxy!(NetworkRegistrationProxy, &self.connection, modem, "Scan");
        let operators = netreg
            .scan()
            .await
            .map_err(|e| BridgeError::radio("Scan", e))?;
        Ok(radio_objects(operators))
    }

    async fn contexts(&self, modem: &str) -> Result<Vec<RadioObject>, BridgeError> {
        let connman = radio_proxy!(ConnectionManagerProxy, &self.connection, modem, "GetContexts");
        let contexts = connman
            .get_contexts()
            .await
            .map_err(|e| BridgeError::radio("GetContexts", e))?;
        Ok(radio_objects(contexts))
    }

    async fn add_context(&self, modem: &str, context_type: &str) -> Result<String, BridgeError> {
        let connman = radio_proxy!(ConnectionManagerProxy, &self.connection, modem, "AddContext");
        let path = connman
            .add_context(context_type)
            .await
            .map_err(|e| BridgeError::radio("AddContext", e))?;
        Ok(path.to_string())
    }

    async fn remove_context(&self, modem: &str, context: &str) -> Result<(), BridgeError> {
        let connman = radio_proxy!(
            ConnectionManagerProxy,
            &self.connection,
            modem,
            "RemoveContext"
        );
        connman
            .remove_context(&object_path(context, "context")?)
            .await
            .map_err(|e| BridgeError::radio("RemoveContext", e))
    }

    async fn calls(&self, modem: &str) -> Result<Vec<RadioObject>, BridgeError> {
        let voice = radio_proxy!(VoiceCallManagerProxy, &self.connection, modem, "GetCalls");
        let calls = voice
            .get_calls()
            .await
            .map_err(|e| BridgeError::radio("GetCalls", e))?;
        Ok(radio_objects(calls))
    }

    async fn dial(&self, modem: &str, number: &str) -> Result<String, BridgeError> {
        let voice = radio_proxy!(VoiceCallManagerProxy, &self.connection, modem, "Dial");
        let path = voice
            .dial(number, "default")
            .await
            .map_err(|e| BridgeError::radio("Dial", e))?;
        Ok(path.to_string())
    }

    async fn hangup_all(&self, modem: &str) -> Result<(), BridgeError> {
        let voice = radio_proxy!(VoiceCallManagerProxy, &self.connection, modem, "HangupAll");
        voice
            .hangup_all()
            .await
            .map_err(|e| BridgeError::radio("HangupAll", e))
    }

    async fn hold_and_answer(&self, modem: &str) -> Result<(), BridgeError> {
        let voice = radio_proxy!(
            VoiceCallManagerProxy,
            &self.connection,
            modem,
            "HoldAndAnswer"
        );
        voice
            .hold_and_answer()
            .await
            .map_err(|e| BridgeError::radio("HoldAndAnswer", e))
    }

    async fn release_and_answer(&self, modem: &str) -> Result<(), BridgeError> {
        let voice = radio_proxy!(
            VoiceCallManagerProxy,
            &self.connection,
            modem,
            "ReleaseAndAnswer"
        );
        voice
            .release_and_answer()
            .await
            .map_err(|e| BridgeError::radio("ReleaseAndAnswer", e))
    }

    async fn transfer(&self, modem: &str) -> Result<(), BridgeError> {
        let voice = radio_proxy!(VoiceCallManagerProxy, &self.connection, modem, "Transfer");
        voice
            .transfer()
            .await
            .map_err(|e| BridgeError::radio("Transfer", e))
    }

    async fn send_tones(&self, modem: &str, tones: &str) -> Result<(), BridgeError> {
        let voice = radio_proxy!(VoiceCallManagerProxy, &self.connection, modem, "SendTones");
        voice
            .send_tones(tones)
            .await
            .map_err(|e| BridgeError::radio("SendTones", e))
    }

    async fn create_multiparty(&self, modem: &str) -> Result<Vec<String>, BridgeError> {
        let voice = radio_proxy!(
            VoiceCallManagerProxy,
            &self.connection,
            modem,
            "CreateMultiparty"
        );
        let calls = voice
            .create_multiparty()
            .await
            .map_err(|e| BridgeError::radio("CreateMultiparty", e))?;
        Ok(paths(calls))
    }

    async fn private_chat(&self, modem: &str, call: &str) -> Result<Vec<String>, BridgeError> {
        let voice = radio_proxy!(VoiceCallManagerProxy, &self.connection, modem, "PrivateChat");
        let calls = voice
            .private_chat(&object_path(call, "call")?)
            .await
            .map_err(|e| BridgeError::radio("PrivateChat", e))?;
        Ok(paths(calls))
    }

    async fn answer(&self, call: &str) -> Result<(), BridgeError> {
        let voice_call = radio_proxy!(VoiceCallProxy, &self.connection, call, "Answer");
        voice_call
            .answer()
            .await
            .map_err(|e| BridgeError::radio("Answer", e))
    }

    async fn hangup(&self, call: &str) -> Result<(), BridgeError> {
        let voice_call = radio_proxy!(VoiceCallProxy, &self.connection, call, "Hangup");
        voice_call
            .hangup()
            .await
            .map_err(|e| BridgeError::radio("Hangup", e))
    }

    async fn deflect(&self, call: &str, number: &str) -> Result<(), BridgeError> {
        let voice_call = radio_proxy!(VoiceCallProxy, &self.connection, call, "Deflect");
        voice_call
            .deflect(number)
            .await
            .map_err(|e| BridgeError::radio("Deflect", e))
    }

    async fn send_message(&self, modem: &str, to: &str, text: &str) -> Result<String, BridgeError> {
        let messages = radio_proxy!(MessageManagerProxy, &self.connection, modem, "SendMessage");
        let path = messages
            .send_message(to, text)
            .await
            .map_err(|e| BridgeError::radio("SendMessage", e))?;
        Ok(path.to_string())
    }
}
