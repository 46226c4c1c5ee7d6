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

use crate::comm::dbus::{DictBuilder, VariantDict, request_properties};
use crate::error::BridgeError;
use crate::modem::Modem;
use crate::modem::snapshot::{SignalSnapshot, SignalValues};
use log::info;
use std::sync::Arc;
use zbus::fdo;
use zbus::interface;

/// One technology dictionary. Values that were not measured are left out.
pub(crate) fn signal_values_dict(values: &SignalValues) -> Result<VariantDict, BridgeError> {
    Ok(DictBuilder::new()
        .with_opt("rssi", values.rssi)?
        .with_opt("rscp", values.rscp)?
        .with_opt("rsrq", values.rsrq)?
        .with_opt("rsrp", values.rsrp)?
        .with_opt("error-rate", values.error_rate)?
        .build())
}

/// `org.freedesktop.ModemManager1.Modem.Signal`, backed by `org.ofono.NetworkMonitor`.
pub struct SignalInterface {
    modem: Arc<Modem>,
}

impl SignalInterface {
    pub fn new(modem: Arc<Modem>) -> Self {
        SignalInterface { modem }
    }

    fn read<R>(&self, f: impl FnOnce(&SignalSnapshot) -> R) -> R {
        self.modem.projection().signal.read(f)
    }

    fn values(&self, f: impl FnOnce(&SignalSnapshot) -> &SignalValues) -> fdo::Result<VariantDict> {
        Ok(self.read(|signal| signal_values_dict(f(signal)))?)
    }
}

#[interface(name = "org.freedesktop.ModemManager1.Modem.Signal")]
impl SignalInterface {
    async fn setup(&self, rate: u32) -> fdo::Result<()> {
        info!("Signal.Setup({rate}) called on {}", self.modem.path());
        Ok(self.modem.setup_signal(rate).await?)
    }

    async fn setup_thresholds(&self, settings: VariantDict) -> fdo::Result<()> {
        Ok(self
            .modem
            .setup_signal_thresholds(&request_properties(&settings))
            .await?)
    }

    #[zbus(property)]
    fn rate(&self) -> u32 {
        self.read(|s| s.rate)
    }

    #[zbus(property)]
    fn rssi_threshold(&self) -> u32 {
        self.read(|s| s.rssi_threshold)
    }

    #[zbus(property)]
    fn error_rate_threshold(&self) -> bool {
        self.read(|s| s.error_rate_threshold)
    }

    #[zbus(property)]
    fn cdma(&self) -> VariantDict {
        VariantDict::new()
    }

    #[zbus(property)]
    fn evdo(&self) -> VariantDict {
        VariantDict::new()
    }

    #[zbus(property)]
    fn gsm(&self) -> fdo::Result<VariantDict> {
        self.values(|s| &s.gsm)
    }

    #[zbus(property)]
    fn umts(&self) -> fdo::Result<VariantDict> {
        self.values(|s| &s.umts)
    }

    #[zbus(property)]
    fn lte(&self) -> fdo::Result<VariantDict> {
        self.values(|s| &s.lte)
    }

    #[zbus(property)]
    fn nr5g(&self) -> fdo::Result<VariantDict> {
        self.values(|s| &s.nr5g)
    }
}
