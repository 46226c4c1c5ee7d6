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

use crate::comm::dbus::{VariantDict, object_path, object_paths, request_properties};
use crate::modem::Modem;
use crate::modem::messages::Sms;
use crate::modem::snapshot::SmsSnapshot;
use log::info;
use std::sync::Arc;
use zbus::fdo;
use zbus::interface;
use zbus::object_server::SignalEmitter;
use zbus::zvariant::OwnedObjectPath;

/// MM_SMS_STORAGE_UNKNOWN: messages only live in memory.
const STORAGE_UNKNOWN: u32 = 0;

/// `org.freedesktop.ModemManager1.Modem.Messaging`.
pub struct MessagingInterface {
    modem: Arc<Modem>,
}

impl MessagingInterface {
    pub fn new(modem: Arc<Modem>) -> Self {
        MessagingInterface { modem }
    }

    fn message_paths(&self) -> Vec<String> {
        self.modem.projection().modem.read(|m| m.messages.clone())
    }
}

#[interface(name = "org.freedesktop.ModemManager1.Modem.Messaging")]
impl MessagingInterface {
    async fn list(&self) -> fdo::Result<Vec<OwnedObjectPath>> {
        Ok(object_paths(&self.message_paths())?)
    }

    async fn delete(&self, path: OwnedObjectPath) -> fdo::Result<()> {
        info!("Messaging.Delete({}) called on {}", path.as_str(), self.modem.path());
        self.modem.delete_sms(path.as_str()).await;
        Ok(())
    }

    async fn create(&self, properties: VariantDict) -> fdo::Result<OwnedObjectPath> {
        info!("Messaging.Create called on {}", self.modem.path());
        let sms = self
            .modem
            .create_sms(&request_properties(&properties))
            .await?;
        Ok(object_path(sms.path())?)
    }

    #[zbus(signal)]
    pub async fn added(
        emitter: &SignalEmitter<'_>,
        path: OwnedObjectPath,
        received: bool,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn deleted(emitter: &SignalEmitter<'_>, path: OwnedObjectPath) -> zbus::Result<()>;

    #[zbus(property)]
    fn messages(&self) -> fdo::Result<Vec<OwnedObjectPath>> {
        Ok(object_paths(&self.message_paths())?)
    }

    #[zbus(property)]
    fn supported_storages(&self) -> Vec<u32> {
        Vec::new()
    }

    #[zbus(property)]
    fn default_storage(&self) -> u32 {
        STORAGE_UNKNOWN
    }
}

/// `org.freedesktop.ModemManager1.Sms`.
pub struct SmsInterface {
    sms: Arc<Sms>,
}

impl SmsInterface {
    pub fn new(sms: Arc<Sms>) -> Self {
        SmsInterface { sms }
    }

    fn read<R>(&self, f: impl FnOnce(&SmsSnapshot) -> R) -> R {
        self.sms.snapshot().read(f)
    }
}

#[interface(name = "org.freedesktop.ModemManager1.Sms")]
impl SmsInterface {
    async fn send(&self) -> fdo::Result<()> {
        info!("Send called on {}", self.sms.path());
        Ok(self.sms.send().await?)
    }

    async fn store(&self, storage: u32) -> fdo::Result<()> {
        Ok(self.sms.store(storage).await?)
    }

    #[zbus(property)]
    fn state(&self) -> u32 {
        self.read(|s| s.state as u32)
    }

    #[zbus(property)]
    fn pdu_type(&self) -> u32 {
        self.read(|s| s.pdu_type as u32)
    }

    #[zbus(property)]
    fn number(&self) -> String {
        self.read(|s| s.number.clone())
    }

    #[zbus(property)]
    fn text(&self) -> String {
        self.read(|s| s.text.clone())
    }

    #[zbus(property)]
    fn data(&self) -> Vec<u8> {
        Vec::new()
    }

    #[zbus(property, name = "SMSC")]
    fn smsc(&self) -> String {
        String::new()
    }

    #[zbus(property)]
    fn class(&self) -> i32 {
        -1
    }

    #[zbus(property)]
    fn delivery_report_request(&self) -> bool {
        self.read(|s| s.delivery_report_request)
    }

    #[zbus(property)]
    fn message_reference(&self) -> u32 {
        0
    }

    #[zbus(property)]
    fn timestamp(&self) -> String {
        self.read(|s| s.timestamp.clone())
    }

    #[zbus(property)]
    fn discharge_timestamp(&self) -> String {
        String::new()
    }

    #[zbus(property)]
    fn delivery_state(&self) -> u32 {
        0
    }

    #[zbus(property)]
    fn storage(&self) -> u32 {
        STORAGE_UNKNOWN
    }
}
