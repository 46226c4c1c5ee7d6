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

//! Modem discovery: keeps the set of exported modems equal to the set oFono reports.
//!
//! Full passes run at startup, when oFono (re)appears on the bus, and on `ScanDevices`. They are
//! serialized by the scan lock and diff the current modem set by oFono path, so a modem that is
//! still present keeps its ModemManager path. `ModemAdded` and `ModemRemoved` are applied
//! incrementally under the same lock.

use crate::config::Settings;
use crate::error::BridgeError;
use crate::modem::Modem;
use crate::modem::ids::IdAllocator;
use crate::modem::notify::Publisher;
use crate::modem::retry::RetryPolicy;
use crate::radio::{ManagerEvent, RadioObject, RadioService};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Makes modems visible to clients.
#[async_trait]
pub trait ModemExporter: Send + Sync {
    /// The publisher the modem with this index reports its changes through.
    fn publisher(&self, index: u32) -> Arc<dyn Publisher>;

    async fn export(&self, modem: &Arc<Modem>) -> Result<(), BridgeError>;

    /// Withdraw the modem and every sub-object it still lists.
    async fn unexport(&self, modem: &Modem);
}

pub struct Discovery {
    radio: Arc<dyn RadioService>,
    exporter: Arc<dyn ModemExporter>,
    ids: Arc<IdAllocator>,
    settings: Settings,
    scan_lock: tokio::sync::Mutex<()>,
    modems: Mutex<BTreeMap<String, Arc<Modem>>>,
}

impl Discovery {
    pub fn new(
        radio: Arc<dyn RadioService>,
        exporter: Arc<dyn ModemExporter>,
        settings: Settings,
    ) -> Arc<Self> {
        Arc::new(Discovery {
            radio,
            exporter,
            ids: Arc::new(IdAllocator::new()),
            settings,
            scan_lock: tokio::sync::Mutex::new(()),
            modems: Mutex::new(BTreeMap::new()),
        })
    }

    fn lock_modems(&self) -> MutexGuard<'_, BTreeMap<String, Arc<Modem>>> {
        self.modems.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exported modems, ordered by oFono path.
    pub fn modems(&self) -> Vec<Arc<Modem>> {
        self.lock_modems().values().cloned().collect()
    }

    fn accepts(&self, radio_path: &str) -> bool {
        radio_path.starts_with(&self.settings.modem_path_prefix)
    }

    /// Run a full discovery pass. Listing the modems is retried until oFono answers.
    pub async fn rescan(&self) -> Result<(), BridgeError> {
        let _guard = self.scan_lock.lock().await;
        let policy = RetryPolicy::new(self.settings.connect_retry_delay, None);
        let found = policy
            .run("GetModems", |_| self.radio.modems())
            .await?;
        let wanted: BTreeSet<String> = found
            .iter()
            .filter(|modem| self.accepts(&modem.path))
            .map(|modem| modem.path.clone())
            .collect();
        let current: Vec<String> = self.lock_modems().keys().cloned().collect();
        for radio_path in current.iter().filter(|path| !wanted.contains(*path)) {
            self.remove_modem(radio_path).await;
        }
        for modem in found {
            self.add_modem(modem).await;
        }
        debug!("Discovery pass done, {} modems exported", self.lock_modems().len());
        Ok(())
    }

    async fn add_modem(&self, object: RadioObject) {
        if !self.accepts(&object.path) {
            debug!("Ignoring {} outside of the configured prefix", object.path);
            return;
        }
        if self.lock_modems().contains_key(&object.path) {
            return;
        }
        let index = self.ids.next_modem();
        let radio_path = object.path.clone();
        let modem = Modem::new(
            index,
            object,
            self.radio.clone(),
            self.exporter.publisher(index),
            self.ids.clone(),
            &self.settings,
        );
        modem.start().await;
        if let Err(e) = self.exporter.export(&modem).await {
            warn!("Could not export {radio_path}: {e}");
            modem.shutdown().await;
            return;
        }
        info!("Added {radio_path} as {}", modem.path());
        self.lock_modems().insert(radio_path, modem);
    }

    async fn remove_modem(&self, radio_path: &str) {
        let Some(modem) = self.lock_modems().remove(radio_path) else {
            return;
        };
        modem.shutdown().await;
        self.exporter.unexport(&modem).await;
        info!("Removed {radio_path} ({})", modem.path());
    }

    /// Unexport every modem, as when oFono leaves the bus.
    pub async fn clear(&self) {
        let _guard = self.scan_lock.lock().await;
        let current: Vec<String> = self.lock_modems().keys().cloned().collect();
        for radio_path in current {
            self.remove_modem(&radio_path).await;
        }
    }

    /// Apply one change of the oFono modem set.
    pub async fn handle_event(&self, event: ManagerEvent) {
        match event {
            ManagerEvent::ModemAdded(object) => {
                let _guard = self.scan_lock.lock().await;
                self.add_modem(object).await;
            }
            ManagerEvent::ModemRemoved(radio_path) => {
                let _guard = self.scan_lock.lock().await;
                self.remove_modem(&radio_path).await;
            }
            ManagerEvent::ServiceAppeared => {
                info!("oFono appeared");
                if let Err(e) = self.rescan().await {
                    warn!("Discovery after oFono appeared failed: {e}");
                }
            }
            ManagerEvent::ServiceVanished => {
                info!("oFono vanished, withdrawing all modems");
                self.clear().await;
            }
        }
    }

    /// Follow the oFono manager until its event stream ends.
    pub async fn run(self: Arc<Self>) -> Result<(), BridgeError> {
        let (events, mut receiver) = mpsc::unbounded_channel();
        let _subscription = self.radio.subscribe_manager(events).await?;
        if self.radio.service_present().await? {
            self.rescan().await?;
        } else {
            info!("oFono is not running yet, waiting for it");
        }
        while let Some(event) = receiver.recv().await {
            self.handle_event(event).await;
        }
        Ok(())
    }
}
