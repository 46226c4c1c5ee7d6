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

//! ofono2mm - ModemManager compatibility daemon for oFono.
//!
//! This is the main entry point of the ofono2mm daemon, which lets clients written against the
//! ModemManager D-Bus API (NetworkManager, GNOME and Plasma shells, phone UIs) drive modems that
//! are managed by oFono. The daemon:
//! - Watches `org.ofono` on the system bus and follows its modems as they come and go
//! - Exports one `org.freedesktop.ModemManager1.Modem` object per oFono modem, with its SIM,
//!   bearers, voice calls and SMS messages as sibling objects
//! - Derives the ModemManager state machine from oFono properties and emits only real changes
//! - Translates ModemManager method calls into oFono method calls and property writes
//!
//! # DBus Service
//!
//! - **Service Name**: `org.freedesktop.ModemManager1`, requested once the first modem is
//!   exported
//! - **Manager and ObjectManager**: `/org/freedesktop/ModemManager1`
//! - **Modems**: `/org/freedesktop/ModemManager1/Modem/{n}`
//! - **SIMs, bearers, calls, messages**: `/org/freedesktop/ModemManager1/{SIM,Bearer,Call,SMS}/{n}`
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (`trace`, `debug`, `info`, `warn`, `error`
//!   or `off`). Defaults to `info`. `SetLogging` on the manager object lowers or raises it at
//!   runtime.
//!
//! # Configuration
//!
//! Retry timings and the modem path filter are read from `/usr/lib/ofono2mm/config.toml` and
//! `/etc/ofono2mm/config.toml`. See [`ofono2mm::config`].
//!
//! # Architecture
//!
//! At startup, the daemon:
//! 1. Loads the settings
//! 2. Connects to the system DBus and serves the manager object
//! 3. Runs discovery, which exports every modem oFono already knows
//! 4. Keeps following oFono's modem set and each modem's notifications until terminated

use log::info;
use ofono2mm::comm::dbus::exporter::DbusExporter;
use ofono2mm::comm::dbus::manager_interface::ManagerInterface;
use ofono2mm::config::{self, MM_OBJECT_PATH};
use ofono2mm::discovery::Discovery;
use ofono2mm::radio::ofono::OfonoService;
use std::error::Error;
use std::future::pending;
use std::sync::Arc;
use zbus::{connection, fdo};

/// Main entry point for the ofono2mm daemon.
///
/// # Returns: `Result<(), Box<dyn Error>>`
/// * `Ok(())` - Never returns under normal operation (runs until terminated)
/// * `Err(Box<dyn Error>)` - Initialization error (DBus connection failed, etc.)
///
/// # Examples
///
/// ```bash
/// # Run with default logging (info level)
/// ofono2mm
///
/// # Run with debug logging
/// RUST_LOG=debug ofono2mm
/// ```
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let settings = config::settings().clone();

    let conn = connection::Builder::system()?
        .serve_at(MM_OBJECT_PATH, fdo::ObjectManager)?
        .build()
        .await?;

    let radio = Arc::new(OfonoService::new(conn.clone()));
    let exporter = Arc::new(DbusExporter::new(conn.clone()));
    let discovery = Discovery::new(radio, exporter, settings);
    conn.object_server()
        .at(MM_OBJECT_PATH, ManagerInterface::new(discovery.clone()))
        .await?;

    info!("Started ModemManager1 compatibility service for oFono");
    discovery.run().await?;

    // The oFono watch only ends when the bus connection goes away.
    pending::<()>().await;

    Ok(())
}
