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

use crate::radio::value::{PropertyMap, PropertyValue};
use crate::radio::{EventSender, RadioInterface, RadioService, Subscription};
use log::{debug, trace, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

struct TrackedInterface {
    properties: PropertyMap,
    _subscription: Option<Subscription>,
}

/// Live property cache for the capability interfaces one oFono modem advertises.
///
/// The key set always equals the modem's last `Interfaces` list. Adding an interface fetches its
/// properties and subscribes to its changes; removing it drops the subscription, after which no
/// event for that interface is forwarded, and any already queued is ignored by
/// [`InterfaceTracker::on_property_changed`].
pub struct InterfaceTracker {
    modem_path: String,
    radio: Arc<dyn RadioService>,
    events: EventSender,
    interfaces: BTreeMap<RadioInterface, TrackedInterface>,
}

/// Interfaces that appeared and disappeared in one [`InterfaceTracker::sync`].
#[derive(Debug, Default, PartialEq)]
pub struct InterfaceDelta {
    pub added: Vec<RadioInterface>,
    pub removed: Vec<RadioInterface>,
}

impl InterfaceTracker {
    pub fn new(modem_path: &str, radio: Arc<dyn RadioService>, events: EventSender) -> Self {
        InterfaceTracker {
            modem_path: modem_path.to_string(),
            radio,
            events,
            interfaces: BTreeMap::new(),
        }
    }

    /// Start tracking `interface`. Failures are not fatal: the interface is recorded with
    /// whatever could be obtained, possibly an empty property map and no subscription.
    pub async fn add_interface(&mut self, interface: RadioInterface) {
        if self.interfaces.contains_key(&interface) {
            return;
        }
        // Subscribe first so that no change is lost between the fetch and the subscription.
        let subscription = match self
            .radio
            .subscribe(&self.modem_path, &interface, self.events.clone())
            .await
        {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                warn!("{}: cannot watch {interface}: {e}", self.modem_path);
                None
            }
        };
        let properties = match self.radio.properties(&self.modem_path, &interface).await {
            Ok(properties) => properties,
            Err(e) => {
                warn!("{}: cannot read {interface}: {e}", self.modem_path);
                PropertyMap::new()
            }
        };
        debug!(
            "{}: tracking {interface} with {} properties",
            self.modem_path,
            properties.len()
        );
        self.interfaces.insert(
            interface,
            TrackedInterface {
                properties,
                _subscription: subscription,
            },
        );
    }

    pub fn remove_interface(&mut self, interface: &RadioInterface) -> bool {
        let removed = self.interfaces.remove(interface).is_some();
        if removed {
            debug!("{}: {interface} went away", self.modem_path);
        }
        removed
    }

    /// Update one cached key. Returns false, and changes nothing, when the interface is not
    /// tracked.
    pub fn on_property_changed(
        &mut self,
        interface: &RadioInterface,
        name: &str,
        value: PropertyValue,
    ) -> bool {
        match self.interfaces.get_mut(interface) {
            Some(tracked) => {
                tracked.properties.insert(name.to_string(), value);
                true
            }
            None => {
                trace!(
                    "{}: ignoring {interface}.{name} for an untracked interface",
                    self.modem_path
                );
                false
            }
        }
    }

    /// Swap a tracked interface's whole cache for `properties`. Untracked interfaces are left
    /// alone and yield false.
    pub fn replace_properties(
        &mut self,
        interface: &RadioInterface,
        properties: PropertyMap,
    ) -> bool {
        match self.interfaces.get_mut(interface) {
            Some(tracked) => {
                tracked.properties = properties;
                true
            }
            None => false,
        }
    }

    /// Read a tracked interface again. Used for interfaces that report no changes of their own,
    /// such as the serving cell measurements. On a read failure the cache is kept.
    pub async fn reload(&mut self, interface: &RadioInterface) -> bool {
        if !self.interfaces.contains_key(interface) {
            return false;
        }
        match self.radio.properties(&self.modem_path, interface).await {
            Ok(properties) => self.replace_properties(interface, properties),
            Err(e) => {
                warn!("{}: cannot refresh {interface}: {e}", self.modem_path);
                false
            }
        }
    }

    /// Bring the tracked set in line with the modem's advertised `Interfaces` list.
    pub async fn sync(&mut self, advertised: &[String]) -> InterfaceDelta {
        let wanted: BTreeSet<RadioInterface> = advertised
            .iter()
            .map(|name| RadioInterface::from(name.as_str()))
            .filter(|interface| *interface != RadioInterface::Modem)
            .collect();
        let current: BTreeSet<RadioInterface> = self.interfaces.keys().cloned().collect();

        let mut delta = InterfaceDelta::default();
        for interface in current.difference(&wanted) {
            self.remove_interface(interface);
            delta.removed.push(interface.clone());
        }
        for interface in wanted.difference(&current) {
            self.add_interface(interface.clone()).await;
            delta.added.push(interface.clone());
        }
        delta
    }

    pub fn properties(&self, interface: &RadioInterface) -> Option<&PropertyMap> {
        self.interfaces
            .get(interface)
            .map(|tracked| &tracked.properties)
    }

    pub fn contains(&self, interface: &RadioInterface) -> bool {
        self.interfaces.contains_key(interface)
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &RadioInterface> {
        self.interfaces.keys()
    }

    /// Drop every interface and its subscription.
    pub fn clear(&mut self) {
        self.interfaces.clear();
    }
}
