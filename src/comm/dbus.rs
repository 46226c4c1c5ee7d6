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

//! The ModemManager1 objects exported on the system bus.
//!
//! Each interface struct wraps an engine object and reads its properties from the published
//! snapshots. Method calls are forwarded to the engine; [`BridgeError`]s are converted to
//! `fdo::Error`s at this boundary.

pub mod bearer_interface;
pub mod exporter;
pub mod manager_interface;
pub mod messaging_interface;
pub mod modem3gpp_interface;
pub mod modem_interface;
pub mod signal_interface;
pub mod sim_interface;
pub mod time_interface;
pub mod voice_interface;

use crate::error::BridgeError;
use crate::modem::snapshot::IpConfig;
use crate::radio::value::{PropertyMap, property_map};
use std::collections::HashMap;
use zbus::fdo;
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

/// An `a{sv}` dictionary as sent and received on the bus.
pub type VariantDict = HashMap<String, OwnedValue>;

pub(crate) fn object_path(path: &str) -> Result<OwnedObjectPath, BridgeError> {
    OwnedObjectPath::try_from(path).map_err(|e| BridgeError::Marshal {
        what: format!("object path {path}"),
        e,
    })
}

pub(crate) fn object_paths(paths: &[String]) -> Result<Vec<OwnedObjectPath>, BridgeError> {
    paths.iter().map(|path| object_path(path)).collect()
}

pub(crate) fn owned_value<'v>(
    what: &str,
    value: impl Into<Value<'v>>,
) -> Result<OwnedValue, BridgeError> {
    OwnedValue::try_from(value.into()).map_err(|e| BridgeError::Marshal {
        what: what.to_string(),
        e,
    })
}

/// Builds an `a{sv}` dictionary entry by entry.
#[derive(Default)]
pub(crate) struct DictBuilder {
    dict: VariantDict,
}

impl DictBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with<'v>(
        mut self,
        key: &str,
        value: impl Into<Value<'v>>,
    ) -> Result<Self, BridgeError> {
        self.dict.insert(key.to_string(), owned_value(key, value)?);
        Ok(self)
    }

    pub(crate) fn with_opt<'v, V: Into<Value<'v>>>(
        self,
        key: &str,
        value: Option<V>,
    ) -> Result<Self, BridgeError> {
        match value {
            Some(value) => self.with(key, value),
            None => Ok(self),
        }
    }

    pub(crate) fn build(self) -> VariantDict {
        self.dict
    }
}

/// Read a client supplied `a{sv}` into the engine's property model.
pub(crate) fn request_properties(request: &VariantDict) -> PropertyMap {
    property_map(request)
}

/// `Ip4Config`/`Ip6Config` of a bearer.
pub(crate) fn ip_config_dict(config: &IpConfig) -> Result<VariantDict, BridgeError> {
    let mut builder = DictBuilder::new()
        .with("method", config.method as u32)?
        .with_opt("address", config.address.clone())?
        .with_opt("prefix", config.prefix)?
        .with_opt("gateway", config.gateway.clone())?
        .with_opt("mtu", config.mtu)?;
    for (index, server) in config.dns.iter().enumerate() {
        builder = builder.with(&format!("dns{}", index + 1), server.clone())?;
    }
    Ok(builder.build())
}

pub(crate) fn not_supported(method: &str) -> fdo::Error {
    fdo::Error::NotSupported(format!("{method} is not supported"))
}
