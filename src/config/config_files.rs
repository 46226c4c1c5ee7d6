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

use crate::error::BridgeError;
use log::trace;
use serde::Deserialize;
use std::path::Path;

/// This is the top level struct which holds all sections
#[derive(Debug, Deserialize)]
struct TomlConfig {
    defaults: Option<DefaultsToml>,
}

/// This is the "defaults" section struct
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct DefaultsToml {
    pub connect_retry_delay_secs: Option<u64>,
    pub connect_max_attempts: Option<u32>,
    pub call_end_reconnect_delay_secs: Option<u64>,
    pub modem_path_prefix: Option<String>,
}

impl DefaultsToml {
    pub(crate) fn merge(self, fallback: DefaultsToml) -> DefaultsToml {
        DefaultsToml {
            connect_retry_delay_secs: self
                .connect_retry_delay_secs
                .or(fallback.connect_retry_delay_secs),
            connect_max_attempts: self.connect_max_attempts.or(fallback.connect_max_attempts),
            call_end_reconnect_delay_secs: self
                .call_end_reconnect_delay_secs
                .or(fallback.call_end_reconnect_delay_secs),
            modem_path_prefix: self.modem_path_prefix.or(fallback.modem_path_prefix),
        }
    }
}

fn toml_str_to_defaults(toml_string: &str, file_path: &Path) -> Result<DefaultsToml, BridgeError> {
    let config: TomlConfig = toml::from_str(toml_string).map_err(|e| BridgeError::TomlDe {
        file: file_path.into(),
        e,
    })?;
    match config.defaults {
        Some(defaults) => Ok(defaults),
        None => Err(BridgeError::Internal(format!(
            "{file_path:?} did not contain a `[defaults]` section."
        ))),
    }
}

pub(crate) fn defaults_from_file(file_path: &Path) -> Result<DefaultsToml, BridgeError> {
    if !file_path.is_file() {
        return Err(BridgeError::Internal(format!(
            "Config file not found in {file_path:?}"
        )));
    }
    trace!("Attempting to read from {file_path:?}");
    let toml_string = std::fs::read_to_string(file_path).map_err(|e| BridgeError::IORead {
        file: file_path.into(),
        e,
    })?;
    toml_str_to_defaults(&toml_string, file_path)
}
