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

use crate::comm::dbus::bearer_interface::BearerInterface;
use crate::comm::dbus::messaging_interface::{MessagingInterface, SmsInterface};
use crate::comm::dbus::modem3gpp_interface::{Modem3gppInterface, ProfileManagerInterface};
use crate::comm::dbus::modem_interface::{ModemInterface, SimpleInterface};
use crate::comm::dbus::signal_interface::SignalInterface;
use crate::comm::dbus::sim_interface::SimInterface;
use crate::comm::dbus::time_interface::TimeInterface;
use crate::comm::dbus::voice_interface::{CallInterface, VoiceInterface};
use crate::comm::dbus::object_path;
use crate::config::MM_BUS_NAME;
use crate::discovery::ModemExporter;
use crate::error::BridgeError;
use crate::modem::Modem;
use crate::modem::ids::{modem_path, sim_path};
use crate::modem::notify::{Notification, Publisher};
use async_trait::async_trait;
use log::{debug, trace, warn};
use std::sync::Arc;
use tokio::sync::OnceCell;
use zbus::Connection;
use zbus::object_server::{Interface, InterfaceRef};

/// Turns one modem's notifications into exports, unexports, signals and `PropertiesChanged`.
pub struct DbusPublisher {
    connection: Connection,
    modem_path: String,
    sim_path: String,
}

impl DbusPublisher {
    pub fn new(connection: Connection, index: u32) -> Self {
        DbusPublisher {
            connection,
            modem_path: modem_path(index),
            sim_path: sim_path(index),
        }
    }

    /// The interface at `path`, or `None` while it is not exported.
    async fn interface<I: Interface>(&self, path: &str) -> Option<InterfaceRef<I>> {
        self.connection
            .object_server()
            .interface::<_, I>(path)
            .await
            .ok()
    }

    async fn export<I: Interface>(&self, path: &str, interface: I) -> zbus::Result<()> {
        self.connection.object_server().at(path, interface).await?;
        trace!("Exported {} at {path}", I::name());
        Ok(())
    }

    async fn unexport<I: Interface>(&self, path: &str) -> zbus::Result<()> {
        self.connection.object_server().remove::<I, _>(path).await?;
        trace!("Unexported {} at {path}", I::name());
        Ok(())
    }

    async fn modem_changed(&self, fields: &[&'static str]) -> zbus::Result<()> {
        if let Some(iface) = self.interface::<ModemInterface>(&self.modem_path).await {
            let emitter = iface.signal_emitter();
            let modem = iface.get().await;
            for field in fields {
                match *field {
                    "state" => modem.state_changed(emitter).await?,
                    "state_failed_reason" => modem.state_failed_reason_changed(emitter).await?,
                    "power_state" => modem.power_state_changed(emitter).await?,
                    "unlock_required" => modem.unlock_required_changed(emitter).await?,
                    "unlock_retries" => modem.unlock_retries_changed(emitter).await?,
                    "signal_quality" => modem.signal_quality_changed(emitter).await?,
                    "access_technologies" => modem.access_technologies_changed(emitter).await?,
                    "current_capabilities" => modem.current_capabilities_changed(emitter).await?,
                    "supported_capabilities" => {
                        modem.supported_capabilities_changed(emitter).await?
                    }
                    "supported_modes" => modem.supported_modes_changed(emitter).await?,
                    "current_modes" => modem.current_modes_changed(emitter).await?,
                    "sim" => modem.sim_changed(emitter).await?,
                    "bearers" => modem.bearers_changed(emitter).await?,
                    "own_numbers" => modem.own_numbers_changed(emitter).await?,
                    "manufacturer" => modem.manufacturer_changed(emitter).await?,
                    "model" => modem.model_changed(emitter).await?,
                    "revision" => modem.revision_changed(emitter).await?,
                    "hardware_revision" => modem.hardware_revision_changed(emitter).await?,
                    "equipment_identifier" => {
                        modem.equipment_identifier_changed(emitter).await?;
                        modem.device_identifier_changed(emitter).await?;
                    }
                    "ports" => {
                        modem.ports_changed(emitter).await?;
                        modem.primary_port_changed(emitter).await?;
                    }
                    _ => {}
                }
            }
        }
        if fields.contains(&"calls") {
            if let Some(iface) = self.interface::<VoiceInterface>(&self.modem_path).await {
                iface.get().await.calls_changed(iface.signal_emitter()).await?;
            }
        }
        if fields.contains(&"messages") {
            if let Some(iface) = self.interface::<MessagingInterface>(&self.modem_path).await {
                iface
                    .get()
                    .await
                    .messages_changed(iface.signal_emitter())
                    .await?;
            }
        }
        Ok(())
    }

    async fn sim_changed(&self, fields: &[&'static str]) -> zbus::Result<()> {
        let Some(iface) = self.interface::<SimInterface>(&self.sim_path).await else {
            return Ok(());
        };
        let emitter = iface.signal_emitter();
        let sim = iface.get().await;
        for field in fields {
            match *field {
                "active" => sim.active_changed(emitter).await?,
                "sim_identifier" => sim.sim_identifier_changed(emitter).await?,
                "imsi" => sim.imsi_changed(emitter).await?,
                "operator_identifier" => sim.operator_identifier_changed(emitter).await?,
                "operator_name" => sim.operator_name_changed(emitter).await?,
                "emergency_numbers" => sim.emergency_numbers_changed(emitter).await?,
                _ => {}
            }
        }
        Ok(())
    }

    async fn registration_changed(&self, fields: &[&'static str]) -> zbus::Result<()> {
        let Some(iface) = self
            .interface::<Modem3gppInterface>(&self.modem_path)
            .await
        else {
            return Ok(());
        };
        let emitter = iface.signal_emitter();
        let registration = iface.get().await;
        for field in fields {
            match *field {
                "imei" => registration.imei_changed(emitter).await?,
                "registration_state" => registration.registration_state_changed(emitter).await?,
                "operator_code" => registration.operator_code_changed(emitter).await?,
                "operator_name" => registration.operator_name_changed(emitter).await?,
                _ => {}
            }
        }
        Ok(())
    }

    async fn signal_changed(&self, fields: &[&'static str]) -> zbus::Result<()> {
        let Some(iface) = self.interface::<SignalInterface>(&self.modem_path).await else {
            return Ok(());
        };
        let emitter = iface.signal_emitter();
        let signal = iface.get().await;
        for field in fields {
            match *field {
                "rate" => signal.rate_changed(emitter).await?,
                "rssi_threshold" => signal.rssi_threshold_changed(emitter).await?,
                "error_rate_threshold" => signal.error_rate_threshold_changed(emitter).await?,
                "gsm" => signal.gsm_changed(emitter).await?,
                "umts" => signal.umts_changed(emitter).await?,
                "lte" => signal.lte_changed(emitter).await?,
                "nr5g" => signal.nr5g_changed(emitter).await?,
                _ => {}
            }
        }
        Ok(())
    }

    async fn time_changed(&self, fields: &[&'static str]) -> zbus::Result<()> {
        let Some(iface) = self.interface::<TimeInterface>(&self.modem_path).await else {
            return Ok(());
        };
        let emitter = iface.signal_emitter();
        let time = iface.get().await;
        if fields.contains(&"offset") || fields.contains(&"dst_offset") {
            time.network_timezone_changed(emitter).await?;
        }
        if fields.contains(&"network_time") {
            if let Some(network_time) = time.reported_time() {
                TimeInterface::network_time_changed(emitter, &network_time).await?;
            }
        }
        Ok(())
    }

    async fn bearer_changed(&self, path: &str, fields: &[&'static str]) -> zbus::Result<()> {
        let Some(iface) = self.interface::<BearerInterface>(path).await else {
            return Ok(());
        };
        let emitter = iface.signal_emitter();
        let bearer = iface.get().await;
        for field in fields {
            match *field {
                "interface" => bearer.interface_changed(emitter).await?,
                "connected" => bearer.connected_changed(emitter).await?,
                "suspended" => bearer.suspended_changed(emitter).await?,
                "ip4_config" => bearer.ip4_config_changed(emitter).await?,
                "ip6_config" => bearer.ip6_config_changed(emitter).await?,
                "ip_timeout" => bearer.ip_timeout_changed(emitter).await?,
                "properties" => bearer.properties_changed(emitter).await?,
                _ => {}
            }
        }
        Ok(())
    }

    async fn call_changed(&self, path: &str, fields: &[&'static str]) -> zbus::Result<()> {
        let Some(iface) = self.interface::<CallInterface>(path).await else {
            return Ok(());
        };
        let emitter = iface.signal_emitter();
        let call = iface.get().await;
        for field in fields {
            match *field {
                "state" => call.state_changed(emitter).await?,
                "state_reason" => call.state_reason_changed(emitter).await?,
                "direction" => call.direction_changed(emitter).await?,
                "number" => call.number_changed(emitter).await?,
                "multiparty" => call.multiparty_changed(emitter).await?,
                _ => {}
            }
        }
        Ok(())
    }

    async fn message_changed(&self, path: &str, fields: &[&'static str]) -> zbus::Result<()> {
        let Some(iface) = self.interface::<SmsInterface>(path).await else {
            return Ok(());
        };
        let emitter = iface.signal_emitter();
        let sms = iface.get().await;
        for field in fields {
            match *field {
                "state" => sms.state_changed(emitter).await?,
                "pdu_type" => sms.pdu_type_changed(emitter).await?,
                "number" => sms.number_changed(emitter).await?,
                "text" => sms.text_changed(emitter).await?,
                "timestamp" => sms.timestamp_changed(emitter).await?,
                "delivery_report_request" => sms.delivery_report_request_changed(emitter).await?,
                _ => {}
            }
        }
        Ok(())
    }

    async fn deliver(&self, notification: Notification) -> Result<(), BridgeError> {
        match notification {
            Notification::ModemChanged(fields) => self.modem_changed(&fields).await?,
            Notification::StateChanged { old, new, reason } => {
                if let Some(iface) = self.interface::<ModemInterface>(&self.modem_path).await {
                    ModemInterface::emit_state_changed(
                        iface.signal_emitter(),
                        old as i32,
                        new as i32,
                        reason,
                    )
                    .await?;
                }
            }
            Notification::SimChanged(fields) => self.sim_changed(&fields).await?,
            Notification::RegistrationChanged(fields) => {
                self.registration_changed(&fields).await?
            }
            Notification::SignalChanged(fields) => self.signal_changed(&fields).await?,
            Notification::TimeChanged(fields) => self.time_changed(&fields).await?,
            Notification::BearerAdded(bearer) => {
                let path = bearer.path().to_string();
                self.export(&path, BearerInterface::new(bearer)).await?;
            }
            Notification::BearerChanged { path, changed } => {
                self.bearer_changed(&path, &changed).await?
            }
            Notification::BearerRemoved(path) => self.unexport::<BearerInterface>(&path).await?,
            Notification::CallAdded(call) => {
                let path = call.path().to_string();
                self.export(&path, CallInterface::new(call)).await?;
                if let Some(iface) = self.interface::<VoiceInterface>(&self.modem_path).await {
                    VoiceInterface::call_added(iface.signal_emitter(), object_path(&path)?)
                        .await?;
                }
            }
            Notification::CallChanged { path, changed } => {
                self.call_changed(&path, &changed).await?
            }
            Notification::CallStateChanged {
                path,
                old,
                new,
                reason,
            } => {
                if let Some(iface) = self.interface::<CallInterface>(&path).await {
                    CallInterface::emit_state_changed(
                        iface.signal_emitter(),
                        old as i32,
                        new as i32,
                        reason as u32,
                    )
                    .await?;
                }
            }
            Notification::CallRemoved(path) => {
                self.unexport::<CallInterface>(&path).await?;
                if let Some(iface) = self.interface::<VoiceInterface>(&self.modem_path).await {
                    VoiceInterface::call_deleted(iface.signal_emitter(), object_path(&path)?)
                        .await?;
                }
            }
            Notification::MessageAdded { sms, received } => {
                let path = sms.path().to_string();
                self.export(&path, SmsInterface::new(sms)).await?;
                if let Some(iface) = self.interface::<MessagingInterface>(&self.modem_path).await
                {
                    MessagingInterface::added(iface.signal_emitter(), object_path(&path)?, received)
                        .await?;
                }
            }
            Notification::MessageChanged { path, changed } => {
                self.message_changed(&path, &changed).await?
            }
            Notification::MessageRemoved(path) => {
                self.unexport::<SmsInterface>(&path).await?;
                if let Some(iface) = self.interface::<MessagingInterface>(&self.modem_path).await
                {
                    MessagingInterface::deleted(iface.signal_emitter(), object_path(&path)?)
                        .await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Publisher for DbusPublisher {
    async fn publish(&self, notification: Notification) {
        let description = format!("{notification:?}");
        if let Err(e) = self.deliver(notification).await {
            warn!("{}: could not publish {description}: {e}", self.modem_path);
        }
    }
}

/// Exports modems on the system bus and requests the ModemManager name with the first one.
pub struct DbusExporter {
    connection: Connection,
    name: OnceCell<()>,
}

impl DbusExporter {
    pub fn new(connection: Connection) -> Self {
        DbusExporter {
            connection,
            name: OnceCell::new(),
        }
    }

    async fn request_name(&self) -> Result<(), BridgeError> {
        self.name
            .get_or_try_init(|| async {
                self.connection.request_name(MM_BUS_NAME).await?;
                debug!("Acquired {MM_BUS_NAME}");
                Ok::<(), BridgeError>(())
            })
            .await?;
        Ok(())
    }

    async fn remove<I: Interface>(&self, path: &str) {
        if let Err(e) = self.connection.object_server().remove::<I, _>(path).await {
            debug!("Removing {} at {path}: {e}", I::name());
        }
    }
}

#[async_trait]
impl ModemExporter for DbusExporter {
    fn publisher(&self, index: u32) -> Arc<dyn Publisher> {
        Arc::new(DbusPublisher::new(self.connection.clone(), index))
    }

    async fn export(&self, modem: &Arc<Modem>) -> Result<(), BridgeError> {
        let server = self.connection.object_server();
        let path = modem.path();
        server.at(path, ModemInterface::new(modem.clone())).await?;
        server.at(path, Modem3gppInterface::new(modem.clone())).await?;
        server
            .at(path, ProfileManagerInterface::new(modem.clone()))
            .await?;
        server.at(path, SimpleInterface::new(modem.clone())).await?;
        server.at(path, VoiceInterface::new(modem.clone())).await?;
        server.at(path, MessagingInterface::new(modem.clone())).await?;
        server.at(path, SignalInterface::new(modem.clone())).await?;
        server.at(path, TimeInterface::new(modem.clone())).await?;
        server
            .at(modem.sim_path(), SimInterface::new(modem.clone()))
            .await?;
        self.request_name().await
    }

    async fn unexport(&self, modem: &Modem) {
        let (bearers, calls, messages) = modem
            .projection()
            .modem
            .read(|m| (m.bearers.clone(), m.calls.clone(), m.messages.clone()));
        for path in &bearers {
            self.remove::<BearerInterface>(path).await;
        }
        for path in &calls {
            self.remove::<CallInterface>(path).await;
        }
        for path in &messages {
            self.remove::<SmsInterface>(path).await;
        }
        let path = modem.path();
        self.remove::<TimeInterface>(path).await;
        self.remove::<SignalInterface>(path).await;
        self.remove::<MessagingInterface>(path).await;
        self.remove::<VoiceInterface>(path).await;
        self.remove::<SimpleInterface>(path).await;
        self.remove::<ProfileManagerInterface>(path).await;
        self.remove::<Modem3gppInterface>(path).await;
        self.remove::<ModemInterface>(path).await;
        self.remove::<SimInterface>(modem.sim_path()).await;
    }
}
