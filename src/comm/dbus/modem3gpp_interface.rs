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

use crate::comm::dbus::{DictBuilder, VariantDict, not_supported, object_path};
use crate::error::BridgeError;
use crate::modem::snapshot::RegistrationSnapshot;
use crate::modem::{Modem, NetworkScanResult, Profile};
use log::info;
use std::sync::Arc;
use zbus::fdo;
use zbus::interface;
use zbus::object_server::SignalEmitter;
use zbus::zvariant::OwnedObjectPath;

fn scan_result_dict(result: NetworkScanResult) -> Result<VariantDict, BridgeError> {
    Ok(DictBuilder::new()
        .with("status", result.status)?
        .with("operator-long", result.operator_long)?
        .with("operator-short", result.operator_short)?
        .with("operator-code", result.operator_code)?
        .with("access-technology", result.access_technology)?
        .build())
}

fn profile_dict(profile: Profile) -> Result<VariantDict, BridgeError> {
    Ok(DictBuilder::new()
        .with("profile-id", profile.id as i32)?
        .with("apn", profile.apn)?
        .with("profile-name", profile.name)?
        .with("ip-type", profile.ip_type)?
        .with("user", profile.user)?
        .with("password", profile.password)?
        .build())
}

/// `org.freedesktop.ModemManager1.Modem.Modem3gpp`.
pub struct Modem3gppInterface {
    modem: Arc<Modem>,
}

impl Modem3gppInterface {
    pub fn new(modem: Arc<Modem>) -> Self {
        Modem3gppInterface { modem }
    }

    fn read<R>(&self, f: impl FnOnce(&RegistrationSnapshot) -> R) -> R {
        self.modem.projection().registration.read(f)
    }
}

#[interface(name = "org.freedesktop.ModemManager1.Modem.Modem3gpp")]
impl Modem3gppInterface {
    async fn register(&self, operator_id: &str) -> fdo::Result<()> {
        info!("Register({operator_id}) called on {}", self.modem.path());
        Ok(self.modem.register(operator_id).await?)
    }

    async fn scan(&self) -> fdo::Result<Vec<VariantDict>> {
        info!("Scan called on {}", self.modem.path());
        let results = self.modem.scan().await?;
        Ok(results
            .into_iter()
            .map(scan_result_dict)
            .collect::<Result<_, _>>()?)
    }

    #[zbus(property)]
    fn imei(&self) -> String {
        self.read(|r| r.imei.clone())
    }

    #[zbus(property)]
    fn registration_state(&self) -> u32 {
        self.read(|r| r.registration_state as u32)
    }

    #[zbus(property)]
    fn operator_code(&self) -> String {
        self.read(|r| r.operator_code.clone())
    }

    #[zbus(property)]
    fn operator_name(&self) -> String {
        self.read(|r| r.operator_name.clone())
    }

    #[zbus(property)]
    fn enabled_facility_locks(&self) -> u32 {
        0
    }

    #[zbus(property)]
    fn initial_eps_bearer(&self) -> fdo::Result<OwnedObjectPath> {
        Ok(object_path("/")?)
    }
}

/// `org.freedesktop.ModemManager1.Modem.Modem3gpp.ProfileManager`, listing internet contexts.
pub struct ProfileManagerInterface {
    modem: Arc<Modem>,
}

impl ProfileManagerInterface {
    pub fn new(modem: Arc<Modem>) -> Self {
        ProfileManagerInterface { modem }
    }
}

#[interface(name = "org.freedesktop.ModemManager1.Modem.Modem3gpp.ProfileManager")]
impl ProfileManagerInterface {
    async fn list(&self) -> fdo::Result<Vec<VariantDict>> {
        let profiles = self.modem.profiles().await?;
        Ok(profiles
            .into_iter()
            .map(profile_dict)
            .collect::<Result<_, _>>()?)
    }

    async fn set(&self, _requested_properties: VariantDict) -> fdo::Result<VariantDict> {
        Err(not_supported("ProfileManager.Set"))
    }

    async fn delete(&self, _properties: VariantDict) -> fdo::Result<()> {
        Err(not_supported("ProfileManager.Delete"))
    }

    #[zbus(signal)]
    pub async fn updated(emitter: &SignalEmitter<'_>) -> zbus::Result<()>;

    #[zbus(property)]
    fn index_field(&self) -> String {
        "profile-id".to_string()
    }
}
