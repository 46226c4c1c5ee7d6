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

use crate::comm::dbus::{DictBuilder, VariantDict, ip_config_dict};
use crate::error::BridgeError;
use crate::modem::bearer::{Bearer, BearerProperties};
use crate::modem::snapshot::BearerSnapshot;
use log::info;
use std::sync::Arc;
use zbus::fdo;
use zbus::interface;

/// MM_BEARER_TYPE_DEFAULT
const BEARER_TYPE_DEFAULT: u32 = 1;

fn properties_dict(properties: &BearerProperties) -> Result<VariantDict, BridgeError> {
    Ok(DictBuilder::new()
        .with("apn", properties.apn.clone())?
        .with_opt("user", properties.user.clone())?
        .with_opt("password", properties.password.clone())?
        .with_opt("ip-type", properties.ip_type)?
        .with_opt("allowed-auth", properties.allowed_auth)?
        .build())
}

pub struct BearerInterface {
    bearer: Arc<Bearer>,
}

impl BearerInterface {
    pub fn new(bearer: Arc<Bearer>) -> Self {
        BearerInterface { bearer }
    }

    fn read<R>(&self, f: impl FnOnce(&BearerSnapshot) -> R) -> R {
        self.bearer.snapshot().read(f)
    }
}

#[interface(name = "org.freedesktop.ModemManager1.Bearer")]
impl BearerInterface {
    /// Resolves once the context is active, or when a disconnect aborts the attempt.
    async fn connect(&self) -> fdo::Result<()> {
        info!("Connect called on {}", self.bearer.path());
        Ok(self.bearer.connect().await?)
    }

    async fn disconnect(&self) -> fdo::Result<()> {
        info!("Disconnect called on {}", self.bearer.path());
        Ok(self.bearer.disconnect().await?)
    }

    #[zbus(property)]
    fn interface(&self) -> String {
        self.read(|b| b.interface.clone())
    }

    #[zbus(property)]
    fn connected(&self) -> bool {
        self.read(|b| b.connected)
    }

    #[zbus(property)]
    fn suspended(&self) -> bool {
        self.read(|b| b.suspended)
    }

    #[zbus(property)]
    fn multiplexed(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn ip4_config(&self) -> fdo::Result<VariantDict> {
        Ok(self.read(|b| ip_config_dict(&b.ip4_config))?)
    }

    #[zbus(property)]
    fn ip6_config(&self) -> fdo::Result<VariantDict> {
        Ok(self.read(|b| ip_config_dict(&b.ip6_config))?)
    }

    #[zbus(property)]
    fn stats(&self) -> VariantDict {
        VariantDict::new()
    }

    #[zbus(property)]
    fn ip_timeout(&self) -> u32 {
        self.read(|b| b.ip_timeout)
    }

    #[zbus(property)]
    fn bearer_type(&self) -> u32 {
        BEARER_TYPE_DEFAULT
    }

    #[zbus(property)]
    fn profile_id(&self) -> i32 {
        -1
    }

    #[zbus(property)]
    fn properties(&self) -> fdo::Result<VariantDict> {
        Ok(self.read(|b| properties_dict(&b.properties))?)
    }
}
