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

use log::error;
use std::path::PathBuf;
use std::time::Duration;
use zbus::fdo;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("BridgeError::Argument: {0}")]
    Argument(String),
    #[error("BridgeError::Radio: oFono call {operation} failed: {e}")]
    Radio { operation: String, e: zbus::Error },
    #[error("BridgeError::Marshal: Could not convert {what}: {e}")]
    Marshal {
        what: String,
        e: zbus::zvariant::Error,
    },
    #[error("BridgeError::CapabilityAbsent: modem does not provide {0}")]
    CapabilityAbsent(String),
    #[error("BridgeError::Cancelled: {0}")]
    Cancelled(String),
    #[error("BridgeError::RetriesExhausted: gave up after {attempts} attempts spaced {delay:?}: {last}")]
    RetriesExhausted {
        attempts: u32,
        delay: Duration,
        last: Box<BridgeError>,
    },
    #[error("BridgeError::UnknownObject: no object exported at {0}")]
    UnknownObject(String),
    #[error("BridgeError::IORead: An IO error occurred when reading from {file:?}: {e}")]
    IORead { file: PathBuf, e: std::io::Error },
    #[error("BridgeError::TomlDe: Failed to parse {file:?}: {e}")]
    TomlDe {
        file: PathBuf,
        e: toml::de::Error,
    },
    #[error("BridgeError::Bus: {0}")]
    Bus(#[from] zbus::Error),
    #[error("BridgeError::Internal: An Internal error occurred: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Wrap a failed call against the radio service, naming the operation for the log.
    pub fn radio(operation: impl Into<String>, e: zbus::Error) -> Self {
        BridgeError::Radio {
            operation: operation.into(),
            e,
        }
    }

    /// Whether a connect attempt that failed this way should be tried again.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            BridgeError::Cancelled(..)
                | BridgeError::Argument(..)
                | BridgeError::RetriesExhausted { .. }
                | BridgeError::CapabilityAbsent(..)
        )
    }
}

impl From<BridgeError> for fdo::Error {
    fn from(err: BridgeError) -> Self {
        error!("{err}");
        match err {
            BridgeError::Argument(..) => fdo::Error::InvalidArgs(err.to_string()),
            BridgeError::CapabilityAbsent(..) => fdo::Error::NotSupported(err.to_string()),
            BridgeError::UnknownObject(..) => fdo::Error::UnknownObject(err.to_string()),
            BridgeError::IORead { .. } => fdo::Error::IOError(err.to_string()),
            _ => fdo::Error::Failed(err.to_string()),
        }
    }
}
