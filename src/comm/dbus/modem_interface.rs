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

use crate::comm::dbus::{
    DictBuilder, VariantDict, not_supported, object_path, object_paths, request_properties,
};
use crate::modem::Modem;
use crate::modem::enums::{IP_FAMILY_IPV4, IP_FAMILY_IPV4V6, IP_FAMILY_IPV6};
use crate::modem::snapshot::ModemSnapshot;
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use zbus::fdo;
use zbus::interface;
use zbus::object_server::SignalEmitter;
use zbus::zvariant::OwnedObjectPath;

pub struct ModemInterface {
    modem: Arc<Modem>,
}

impl ModemInterface {
    pub fn new(modem: Arc<Modem>) -> Self {
        ModemInterface { modem }
    }

    fn read<R>(&self, f: impl FnOnce(&ModemSnapshot) -> R) -> R {
        self.modem.projection().modem.read(f)
    }
}

#[interface(name = "org.freedesktop.ModemManager1.Modem")]
impl ModemInterface {
    async fn enable(&self, enable: bool) -> fdo::Result<()> {
        info!("Enable({enable}) called on {}", self.modem.path());
        Ok(self.modem.enable(enable).await?)
    }

    async fn list_bearers(&self) -> fdo::Result<Vec<OwnedObjectPath>> {
        Ok(object_paths(&self.read(|m| m.bearers.clone()))?)
    }

    async fn create_bearer(&self, properties: VariantDict) -> fdo::Result<OwnedObjectPath> {
        info!("CreateBearer called on {}", self.modem.path());
        let bearer = self
            .modem
            .create_bearer(&request_properties(&properties))
            .await?;
        Ok(object_path(bearer.path())?)
    }

    async fn delete_bearer(&self, bearer: OwnedObjectPath) -> fdo::Result<()> {
        info!("DeleteBearer({}) called on {}", bearer.as_str(), self.modem.path());
        self.modem.delete_bearer(bearer.as_str()).await;
        Ok(())
    }

    async fn reset(&self) -> fdo::Result<()> {
        info!("Reset called on {}", self.modem.path());
        Ok(self.modem.reset().await?)
    }

    async fn factory_reset(&self, _code: &str) -> fdo::Result<()> {
        Err(not_supported("FactoryReset"))
    }

    async fn set_power_state(&self, state: u32) -> fdo::Result<()> {
        info!("SetPowerState({state}) called on {}", self.modem.path());
        Ok(self.modem.set_power_state(state).await?)
    }

    async fn set_current_capabilities(&self, _capabilities: u32) -> fdo::Result<()> {
        Err(not_supported("SetCurrentCapabilities"))
    }

    async fn set_current_modes(&self, modes: (u32, u32)) -> fdo::Result<()> {
        info!("SetCurrentModes({modes:?}) called on {}", self.modem.path());
        Ok(self.modem.set_current_modes(modes).await?)
    }

    async fn set_current_bands(&self, _bands: Vec<u32>) -> fdo::Result<()> {
        Err(not_supported("SetCurrentBands"))
    }

    async fn set_primary_sim_slot(&self, _sim_slot: u32) -> fdo::Result<()> {
        Err(not_supported("SetPrimarySimSlot"))
    }

    async fn get_cell_info(&self) -> Vec<VariantDict> {
        Vec::new()
    }

    async fn command(&self, _cmd: &str, _timeout: u32) -> fdo::Result<String> {
        Err(not_supported("Command"))
    }

    #[zbus(signal, name = "StateChanged")]
    pub async fn emit_state_changed(
        emitter: &SignalEmitter<'_>,
        old: i32,
        new: i32,
        reason: u32,
    ) -> zbus::Result<()>;

    #[zbus(property)]
    fn sim(&self) -> fdo::Result<OwnedObjectPath> {
        Ok(object_path(&self.read(|m| m.sim.clone()))?)
    }

    #[zbus(property)]
    fn sim_slots(&self) -> Vec<OwnedObjectPath> {
        Vec::new()
    }

    #[zbus(property)]
    fn primary_sim_slot(&self) -> u32 {
        0
    }

    #[zbus(property)]
    fn bearers(&self) -> fdo::Result<Vec<OwnedObjectPath>> {
        Ok(object_paths(&self.read(|m| m.bearers.clone()))?)
    }

    #[zbus(property)]
    fn supported_capabilities(&self) -> Vec<u32> {
        self.read(|m| m.supported_capabilities.clone())
    }

    #[zbus(property)]
    fn current_capabilities(&self) -> u32 {
        self.read(|m| m.current_capabilities)
    }

    #[zbus(property)]
    fn max_bearers(&self) -> u32 {
        4
    }

    #[zbus(property)]
    fn max_active_bearers(&self) -> u32 {
        2
    }

    #[zbus(property)]
    fn manufacturer(&self) -> String {
        self.read(|m| m.manufacturer.clone())
    }

    #[zbus(property)]
    fn model(&self) -> String {
        self.read(|m| m.model.clone())
    }

    #[zbus(property)]
    fn revision(&self) -> String {
        self.read(|m| m.revision.clone())
    }

    #[zbus(property)]
    fn hardware_revision(&self) -> String {
        self.read(|m| m.hardware_revision.clone())
    }

    #[zbus(property)]
    fn carrier_configuration(&self) -> String {
        String::new()
    }

    #[zbus(property)]
    fn carrier_configuration_revision(&self) -> String {
        String::new()
    }

    #[zbus(property)]
    fn device_identifier(&self) -> String {
        self.read(|m| m.equipment_identifier.clone())
    }

    #[zbus(property)]
    fn device(&self) -> String {
        self.modem.radio_path().to_string()
    }

    #[zbus(property)]
    fn drivers(&self) -> Vec<String> {
        vec!["ofono".to_string()]
    }

    #[zbus(property)]
    fn plugin(&self) -> String {
        "ofono2mm".to_string()
    }

    #[zbus(property)]
    fn primary_port(&self) -> String {
        self.read(|m| m.ports.first().map(|(name, _)| name.clone()))
            .unwrap_or_default()
    }

    #[zbus(property)]
    fn ports(&self) -> Vec<(String, u32)> {
        self.read(|m| m.ports.clone())
    }

    #[zbus(property)]
    fn equipment_identifier(&self) -> String {
        self.read(|m| m.equipment_identifier.clone())
    }

    #[zbus(property)]
    fn unlock_required(&self) -> u32 {
        self.read(|m| m.unlock_required as u32)
    }

    #[zbus(property)]
    fn unlock_retries(&self) -> HashMap<u32, u32> {
        self.read(|m| m.unlock_retries.iter().map(|(k, v)| (*k, *v)).collect())
    }

    #[zbus(property)]
    fn state(&self) -> i32 {
        self.read(|m| m.state as i32)
    }

    #[zbus(property)]
    fn state_failed_reason(&self) -> u32 {
        self.read(|m| m.state_failed_reason as u32)
    }

    #[zbus(property)]
    fn access_technologies(&self) -> u32 {
        self.read(|m| m.access_technologies)
    }

    #[zbus(property)]
    fn signal_quality(&self) -> (u32, bool) {
        self.read(|m| m.signal_quality)
    }

    #[zbus(property)]
    fn own_numbers(&self) -> Vec<String> {
        self.read(|m| m.own_numbers.clone())
    }

    #[zbus(property)]
    fn power_state(&self) -> u32 {
        self.read(|m| m.power_state as u32)
    }

    #[zbus(property)]
    fn supported_modes(&self) -> Vec<(u32, u32)> {
        self.read(|m| m.supported_modes.clone())
    }

    #[zbus(property)]
    fn current_modes(&self) -> (u32, u32) {
        self.read(|m| m.current_modes)
    }

    #[zbus(property)]
    fn supported_bands(&self) -> Vec<u32> {
        Vec::new()
    }

    #[zbus(property)]
    fn current_bands(&self) -> Vec<u32> {
        Vec::new()
    }

    #[zbus(property)]
    fn supported_ip_families(&self) -> u32 {
        IP_FAMILY_IPV4 | IP_FAMILY_IPV6 | IP_FAMILY_IPV4V6
    }
}

/// `org.freedesktop.ModemManager1.Modem.Simple`.
pub struct SimpleInterface {
    modem: Arc<Modem>,
}

impl SimpleInterface {
    pub fn new(modem: Arc<Modem>) -> Self {
        SimpleInterface { modem }
    }
}

#[interface(name = "org.freedesktop.ModemManager1.Modem.Simple")]
impl SimpleInterface {
    async fn connect(&self, properties: VariantDict) -> fdo::Result<OwnedObjectPath> {
        info!("Simple.Connect called on {}", self.modem.path());
        let bearer = self
            .modem
            .simple_connect(&request_properties(&properties))
            .await?;
        Ok(object_path(&bearer)?)
    }

    async fn disconnect(&self, bearer: OwnedObjectPath) -> fdo::Result<()> {
        info!("Simple.Disconnect({}) called on {}", bearer.as_str(), self.modem.path());
        Ok(self.modem.simple_disconnect(bearer.as_str()).await?)
    }

    async fn get_status(&self) -> fdo::Result<VariantDict> {
        let status = self.modem.simple_status();
        Ok(DictBuilder::new()
            .with("state", status.state as u32)?
            .with("signal-quality", status.signal_quality)?
            .with("access-technologies", status.access_technologies)?
            .with("m3gpp-registration-state", status.registration_state as u32)?
            .with("m3gpp-operator-code", status.operator_code)?
            .with("m3gpp-operator-name", status.operator_name)?
            .build())
    }
}
