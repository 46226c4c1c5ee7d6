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
use crate::error::BridgeError;
use crate::modem::Modem;
use crate::modem::calls::Call;
use crate::modem::snapshot::CallSnapshot;
use crate::radio::value::PropertyMapExt;
use log::info;
use std::sync::Arc;
use zbus::fdo;
use zbus::interface;
use zbus::object_server::SignalEmitter;
use zbus::zvariant::OwnedObjectPath;

/// `org.freedesktop.ModemManager1.Modem.Voice`.
pub struct VoiceInterface {
    modem: Arc<Modem>,
}

impl VoiceInterface {
    pub fn new(modem: Arc<Modem>) -> Self {
        VoiceInterface { modem }
    }

    fn call_paths(&self) -> Vec<String> {
        self.modem.projection().modem.read(|m| m.calls.clone())
    }
}

#[interface(name = "org.freedesktop.ModemManager1.Modem.Voice")]
impl VoiceInterface {
    async fn list_calls(&self) -> fdo::Result<Vec<OwnedObjectPath>> {
        Ok(object_paths(&self.call_paths())?)
    }

    async fn delete_call(&self, path: OwnedObjectPath) -> fdo::Result<()> {
        info!("DeleteCall({}) called on {}", path.as_str(), self.modem.path());
        self.modem.delete_call(path.as_str()).await;
        Ok(())
    }

    async fn create_call(&self, properties: VariantDict) -> fdo::Result<OwnedObjectPath> {
        let properties = request_properties(&properties);
        let number = properties
            .str_of("number")
            .ok_or_else(|| BridgeError::Argument("call needs a number".into()))?;
        info!("CreateCall({number}) called on {}", self.modem.path());
        let call = self.modem.create_call(number).await?;
        Ok(object_path(call.path())?)
    }

    async fn hold_and_accept(&self) -> fdo::Result<()> {
        info!("HoldAndAccept called on {}", self.modem.path());
        Ok(self.modem.hold_and_accept().await?)
    }

    async fn hangup_and_accept(&self) -> fdo::Result<()> {
        info!("HangupAndAccept called on {}", self.modem.path());
        Ok(self.modem.hangup_and_accept().await?)
    }

    async fn hangup_all(&self) -> fdo::Result<()> {
        info!("HangupAll called on {}", self.modem.path());
        Ok(self.modem.hangup_all().await?)
    }

    async fn transfer(&self) -> fdo::Result<()> {
        info!("Transfer called on {}", self.modem.path());
        Ok(self.modem.transfer().await?)
    }

    #[zbus(signal)]
    pub async fn call_added(emitter: &SignalEmitter<'_>, path: OwnedObjectPath)
    -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn call_deleted(
        emitter: &SignalEmitter<'_>,
        path: OwnedObjectPath,
    ) -> zbus::Result<()>;

    #[zbus(property)]
    fn calls(&self) -> fdo::Result<Vec<OwnedObjectPath>> {
        Ok(object_paths(&self.call_paths())?)
    }

    #[zbus(property)]
    fn emergency_only(&self) -> bool {
        false
    }
}

/// `org.freedesktop.ModemManager1.Call`.
pub struct CallInterface {
    call: Arc<Call>,
}

impl CallInterface {
    pub fn new(call: Arc<Call>) -> Self {
        CallInterface { call }
    }

    fn read<R>(&self, f: impl FnOnce(&CallSnapshot) -> R) -> R {
        self.call.snapshot().read(f)
    }
}

#[interface(name = "org.freedesktop.ModemManager1.Call")]
impl CallInterface {
    async fn start(&self) -> fdo::Result<()> {
        info!("Start called on {}", self.call.path());
        Ok(self.call.start().await?)
    }

    async fn accept(&self) -> fdo::Result<()> {
        info!("Accept called on {}", self.call.path());
        Ok(self.call.accept().await?)
    }

    async fn deflect(&self, number: &str) -> fdo::Result<()> {
        info!("Deflect({number}) called on {}", self.call.path());
        Ok(self.call.deflect(number).await?)
    }

    async fn join_multiparty(&self) -> fdo::Result<()> {
        info!("JoinMultiparty called on {}", self.call.path());
        Ok(self.call.join_multiparty().await?)
    }

    async fn leave_multiparty(&self) -> fdo::Result<()> {
        info!("LeaveMultiparty called on {}", self.call.path());
        Ok(self.call.leave_multiparty().await?)
    }

    async fn hangup(&self) -> fdo::Result<()> {
        info!("Hangup called on {}", self.call.path());
        Ok(self.call.hangup().await?)
    }

    async fn send_dtmf(&self, dtmf: &str) -> fdo::Result<()> {
        info!("SendDtmf({dtmf}) called on {}", self.call.path());
        Ok(self.call.send_dtmf(dtmf).await?)
    }

    #[zbus(signal, name = "StateChanged")]
    pub async fn emit_state_changed(
        emitter: &SignalEmitter<'_>,
        old: i32,
        new: i32,
        reason: u32,
    ) -> zbus::Result<()>;

    #[zbus(property)]
    fn state(&self) -> i32 {
        self.read(|c| c.state as i32)
    }

    #[zbus(property)]
    fn state_reason(&self) -> u32 {
        self.read(|c| c.state_reason as u32)
    }

    #[zbus(property)]
    fn direction(&self) -> u32 {
        self.read(|c| c.direction as u32)
    }

    #[zbus(property)]
    fn number(&self) -> String {
        self.read(|c| c.number.clone())
    }

    #[zbus(property)]
    fn multiparty(&self) -> bool {
        self.read(|c| c.multiparty)
    }

    #[zbus(property)]
    fn audio_port(&self) -> String {
        String::new()
    }

    #[zbus(property)]
    fn audio_format(&self) -> VariantDict {
        VariantDict::new()
    }
}
