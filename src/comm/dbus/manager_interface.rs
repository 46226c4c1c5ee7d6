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

use crate::comm::dbus::VariantDict;
use crate::config::MM_VERSION;
use crate::discovery::Discovery;
use crate::error::BridgeError;
use log::{LevelFilter, debug, info, warn};
use std::sync::Arc;
use zbus::fdo;
use zbus::interface;

/// Map a ModemManager logging level (`ERR`, `WARN`, `INFO`, `DEBUG`) or a `log` level name to a
/// filter.
pub fn level_filter(level: &str) -> Option<LevelFilter> {
    match level.to_ascii_uppercase().as_str() {
        "ERR" | "ERROR" => Some(LevelFilter::Error),
        "WARN" | "WARNING" => Some(LevelFilter::Warn),
        "MSG" | "INFO" => Some(LevelFilter::Info),
        "DEBUG" => Some(LevelFilter::Debug),
        "TRACE" => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// `org.freedesktop.ModemManager1` at the root object.
pub struct ManagerInterface {
    discovery: Arc<Discovery>,
}

impl ManagerInterface {
    pub fn new(discovery: Arc<Discovery>) -> Self {
        ManagerInterface { discovery }
    }
}

#[interface(name = "org.freedesktop.ModemManager1")]
impl ManagerInterface {
    /// Starts a discovery pass in the background.
    async fn scan_devices(&self) -> fdo::Result<()> {
        info!("ScanDevices called");
        let discovery = self.discovery.clone();
        tokio::spawn(async move {
            if let Err(e) = discovery.rescan().await {
                warn!("ScanDevices: {e}");
            }
        });
        Ok(())
    }

    async fn set_logging(&self, level: &str) -> fdo::Result<()> {
        info!("SetLogging({level}) called");
        let filter = level_filter(level)
            .ok_or_else(|| BridgeError::Argument(format!("unknown logging level {level}")))?;
        log::set_max_level(filter);
        Ok(())
    }

    async fn report_kernel_event(&self, properties: VariantDict) -> fdo::Result<()> {
        debug!("Ignoring kernel event with {} properties", properties.len());
        Ok(())
    }

    async fn inhibit_device(&self, uid: &str, inhibit: bool) -> fdo::Result<()> {
        debug!("Ignoring InhibitDevice({uid}, {inhibit})");
        Ok(())
    }

    #[zbus(property)]
    fn version(&self) -> String {
        MM_VERSION.to_string()
    }
}
