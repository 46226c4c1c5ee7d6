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

use crate::comm::dbus::{DictBuilder, VariantDict};
use crate::error::BridgeError;
use crate::modem::Modem;
use crate::modem::snapshot::TimeSnapshot;
use std::sync::Arc;
use zbus::fdo;
use zbus::interface;
use zbus::object_server::SignalEmitter;

/// `NetworkTimezone`. Unknown offsets are left out; oFono never reports leap seconds.
pub(crate) fn timezone_dict(time: &TimeSnapshot) -> Result<VariantDict, BridgeError> {
    Ok(DictBuilder::new()
        .with_opt("offset", time.offset)?
        .with_opt("dst-offset", time.dst_offset)?
        .build())
}

/// `org.freedesktop.ModemManager1.Modem.Time`, backed by `org.ofono.NetworkTime`.
pub struct TimeInterface {
    modem: Arc<Modem>,
}

impl TimeInterface {
    pub fn new(modem: Arc<Modem>) -> Self {
        TimeInterface { modem }
    }

    /// The last network time report, without falling back to the local clock.
    pub fn reported_time(&self) -> Option<String> {
        self.modem.projection().time.read(|t| t.network_time.clone())
    }
}

#[interface(name = "org.freedesktop.ModemManager1.Modem.Time")]
impl TimeInterface {
    async fn get_network_time(&self) -> String {
        self.modem.network_time().await
    }

    #[zbus(signal)]
    pub async fn network_time_changed(emitter: &SignalEmitter<'_>, time: &str) -> zbus::Result<()>;

    #[zbus(property)]
    fn network_timezone(&self) -> fdo::Result<VariantDict> {
        Ok(self.modem.projection().time.read(timezone_dict)?)
    }
}
