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

//! Daemon-wide constants and the runtime [`Settings`].
//!
//! Settings are layered: `/etc/ofono2mm/config.toml` overrides `/usr/lib/ofono2mm/config.toml`,
//! which overrides the hardcoded defaults below. A missing or malformed file is logged and
//! skipped so the daemon always comes up.

pub mod config_files;

use crate::config::config_files::{DefaultsToml, defaults_from_file};
use log::{trace, warn};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Well-known name requested on the system bus once the first modem has been exported.
pub static MM_BUS_NAME: &str = "org.freedesktop.ModemManager1";

/// Path of the manager object and root of every exported object.
pub static MM_OBJECT_PATH: &str = "/org/freedesktop/ModemManager1";

/// ModemManager API version advertised through the manager's `Version` property.
pub static MM_VERSION: &str = "1.22.0";

/// Bus name of the oFono daemon.
pub static OFONO_BUS_NAME: &str = "org.ofono";

/// Vendor supplied configuration, overridden by [`USER_CONFIG_PATH`].
pub static VENDOR_CONFIG_PATH: &str = "/usr/lib/ofono2mm/config.toml";

/// Administrator supplied configuration.
pub static USER_CONFIG_PATH: &str = "/etc/ofono2mm/config.toml";

// Hardcoded fallbacks used when no config file provides a value.
pub static CONNECT_RETRY_DELAY: Duration = Duration::from_secs(5);
pub static CALL_END_RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Fixed delay between two attempts of the bearer connect operation.
    pub connect_retry_delay: Duration,
    /// `None` retries until the connect succeeds or is cancelled.
    pub connect_max_attempts: Option<u32>,
    /// Grace delay before the internet context is re-activated after a voice call ends.
    pub call_end_reconnect_delay: Duration,
    /// Only oFono modems whose object path starts with this prefix are exported.
    pub modem_path_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            connect_retry_delay: CONNECT_RETRY_DELAY,
            connect_max_attempts: None,
            call_end_reconnect_delay: CALL_END_RECONNECT_DELAY,
            modem_path_prefix: String::new(),
        }
    }
}

impl From<DefaultsToml> for Settings {
    fn from(value: DefaultsToml) -> Self {
        trace!("Creating Settings from {value:?}");
        let fallback = Settings::default();
        Settings {
            connect_retry_delay: value
                .connect_retry_delay_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| {
                    trace!("No connect_retry_delay_secs provided. Using hardcoded value.");
                    fallback.connect_retry_delay
                }),
            connect_max_attempts: match value.connect_max_attempts {
                Some(0) | None => None,
                Some(n) => Some(n),
            },
            call_end_reconnect_delay: value
                .call_end_reconnect_delay_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| {
                    trace!("No call_end_reconnect_delay_secs provided. Using hardcoded value.");
                    fallback.call_end_reconnect_delay
                }),
            modem_path_prefix: value.modem_path_prefix.unwrap_or_default(),
        }
    }
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// User config overrides vendor config and vendor config overrides hardcoded defaults
fn init_settings() -> Settings {
    let vendor_config = defaults_from_file(Path::new(VENDOR_CONFIG_PATH)).unwrap_or_else(|e| {
        warn!("Using hardcoded defaults for vendor config because loading config failed: {e}");
        DefaultsToml::default()
    });
    let user_config = defaults_from_file(Path::new(USER_CONFIG_PATH)).unwrap_or_else(|e| {
        warn!("Using hardcoded defaults for user config because loading config failed: {e}");
        DefaultsToml::default()
    });
    trace!("Merging user_config: {user_config:?} with vendor_config {vendor_config:?}");
    let settings: Settings = user_config.merge(vendor_config).into();
    trace!("Resulting settings: {settings:?}");
    settings
}

/// Settings of this daemon instance, loaded on first access.
pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(init_settings)
}
