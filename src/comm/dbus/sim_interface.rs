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

use crate::modem::Modem;
use crate::modem::snapshot::SimSnapshot;
use log::info;
use std::sync::Arc;
use zbus::fdo;
use zbus::interface;

/// `org.freedesktop.ModemManager1.Sim` of one modem. PIN operations are forwarded to oFono's
/// SIM manager and are silently ignored while the modem has none.
pub struct SimInterface {
    modem: Arc<Modem>,
}

impl SimInterface {
    pub fn new(modem: Arc<Modem>) -> Self {
        SimInterface { modem }
    }

    fn read<R>(&self, f: impl FnOnce(&SimSnapshot) -> R) -> R {
        self.modem.projection().sim.read(f)
    }
}

#[interface(name = "org.freedesktop.ModemManager1.Sim")]
impl SimInterface {
    async fn send_pin(&self, pin: &str) -> fdo::Result<()> {
        info!("SendPin called on {}", self.modem.sim_path());
        Ok(self.modem.send_pin(pin).await?)
    }

    async fn send_puk(&self, puk: &str, pin: &str) -> fdo::Result<()> {
        info!("SendPuk called on {}", self.modem.sim_path());
        Ok(self.modem.send_puk(puk, pin).await?)
    }

    async fn enable_pin(&self, pin: &str, enabled: bool) -> fdo::Result<()> {
        info!("EnablePin({enabled}) called on {}", self.modem.sim_path());
        Ok(self.modem.enable_pin(pin, enabled).await?)
    }

    async fn change_pin(&self, old_pin: &str, new_pin: &str) -> fdo::Result<()> {
        info!("ChangePin called on {}", self.modem.sim_path());
        Ok(self.modem.change_pin(old_pin, new_pin).await?)
    }

    #[zbus(property)]
    fn active(&self) -> bool {
        self.read(|s| s.active)
    }

    #[zbus(property)]
    fn sim_identifier(&self) -> String {
        self.read(|s| s.sim_identifier.clone())
    }

    #[zbus(property)]
    fn imsi(&self) -> String {
        self.read(|s| s.imsi.clone())
    }

    #[zbus(property)]
    fn eid(&self) -> String {
        String::new()
    }

    #[zbus(property)]
    fn operator_identifier(&self) -> String {
        self.read(|s| s.operator_identifier.clone())
    }

    #[zbus(property)]
    fn operator_name(&self) -> String {
        self.read(|s| s.operator_name.clone())
    }

    #[zbus(property)]
    fn emergency_numbers(&self) -> Vec<String> {
        self.read(|s| s.emergency_numbers.clone())
    }

    /// Physical SIM.
    #[zbus(property)]
    fn sim_type(&self) -> u32 {
        1
    }
}
