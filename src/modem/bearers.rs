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
use crate::modem::bearer::{Bearer, BearerProperties};
use crate::modem::enums::PORT_TYPE_NET;
use crate::modem::ids::IdAllocator;
use crate::modem::notify::{Notification, Publisher};
use crate::modem::retry::RetryPolicy;
use crate::radio::value::{PropertyMapExt, PropertyValue};
use crate::radio::{EventSender, RadioInterface, RadioObject, RadioService, Subscription};
use log::{debug, info, warn};
use std::sync::Arc;

/// Context type oFono uses for packet data towards the internet.
pub const INTERNET_CONTEXT: &str = "internet";

struct BoundBearer {
    bearer: Arc<Bearer>,
    _subscription: Option<Subscription>,
}

/// The bearers of one modem, each bound to exactly one oFono connection context.
pub struct BearerManager {
    modem_path: String,
    radio: Arc<dyn RadioService>,
    publisher: Arc<dyn Publisher>,
    ids: Arc<IdAllocator>,
    policy: RetryPolicy,
    events: EventSender,
    bearers: Vec<BoundBearer>,
    ports: Vec<String>,
}

impl BearerManager {
    pub fn new(
        modem_path: &str,
        radio: Arc<dyn RadioService>,
        publisher: Arc<dyn Publisher>,
        ids: Arc<IdAllocator>,
        policy: RetryPolicy,
        events: EventSender,
    ) -> Self {
        BearerManager {
            modem_path: modem_path.to_string(),
            radio,
            publisher,
            ids,
            policy,
            events,
            bearers: Vec::new(),
            ports: Vec::new(),
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.bearers
            .iter()
            .map(|bound| bound.bearer.path().to_string())
            .collect()
    }

    pub fn all(&self) -> Vec<Arc<Bearer>> {
        self.bearers.iter().map(|bound| bound.bearer.clone()).collect()
    }

    pub fn get(&self, path: &str) -> Option<Arc<Bearer>> {
        self.bearers
            .iter()
            .find(|bound| bound.bearer.path() == path)
            .map(|bound| bound.bearer.clone())
    }

    pub fn by_context(&self, context_path: &str) -> Option<Arc<Bearer>> {
        self.bearers
            .iter()
            .find(|bound| bound.bearer.context_path() == context_path)
            .map(|bound| bound.bearer.clone())
    }

    pub fn find_by_apn(&self, apn: &str) -> Option<Arc<Bearer>> {
        self.bearers
            .iter()
            .find(|bound| bound.bearer.properties().apn == apn)
            .map(|bound| bound.bearer.clone())
    }

    /// Network interfaces reported by the bearers' contexts, as `(name, MM_MODEM_PORT_TYPE_NET)`.
    pub fn ports(&self) -> Vec<(String, u32)> {
        self.ports
            .iter()
            .map(|port| (port.clone(), PORT_TYPE_NET))
            .collect()
    }

    /// Context to bring back up after a voice call: the first bearer the client wants connected.
    pub fn reconnect_target(&self) -> Option<String> {
        self.bearers
            .iter()
            .find(|bound| bound.bearer.wants_connection())
            .map(|bound| bound.bearer.context_path().to_string())
    }

    fn add_port(&mut self, interface: Option<String>) -> bool {
        match interface {
            Some(interface) if !self.ports.contains(&interface) => {
                debug!("{}: new network port {interface}", self.modem_path);
                self.ports.push(interface);
                true
            }
            _ => false,
        }
    }

    /// Export a bearer for `context` and start following its properties. Returns whether the
    /// port list changed.
    async fn bind(&mut self, context: RadioObject) -> (Arc<Bearer>, bool) {
        let bearer = Bearer::new(
            self.ids.next_bearer(),
            context.path.clone(),
            BearerProperties::from_context(&context.properties),
            self.radio.clone(),
            self.publisher.clone(),
            self.policy,
        );
        let subscription = match self
            .radio
            .subscribe(
                &context.path,
                &RadioInterface::ConnectionContext,
                self.events.clone(),
            )
            .await
        {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                warn!("{}: cannot watch {}: {e}", self.modem_path, context.path);
                None
            }
        };
        info!("{} bound to {}", bearer.path(), context.path);
        self.bearers.push(BoundBearer {
            bearer: bearer.clone(),
            _subscription: subscription,
        });
        self.publisher
            .publish(Notification::BearerAdded(bearer.clone()))
            .await;
        let interface = bearer.load_context(&context.properties).await;
        let ports_changed = self.add_port(interface);
        (bearer, ports_changed)
    }

    /// Allocate a context for `properties` and bind a new, disconnected bearer to it. An unbound
    /// internet context with the same APN is reused.
    pub async fn create(
        &mut self,
        properties: BearerProperties,
    ) -> Result<Arc<Bearer>, BridgeError> {
        let existing = self
            .radio
            .contexts(&self.modem_path)
            .await?
            .into_iter()
            .find(|context| {
                context.properties.str_of("Type") == Some(INTERNET_CONTEXT)
                    && context.properties.str_of("AccessPointName") == Some(properties.apn.as_str())
                    && self.by_context(&context.path).is_none()
            });
        let added = existing.is_none();
        let mut context = match existing {
            Some(context) => {
                debug!("Reusing context {} for APN {}", context.path, properties.apn);
                context
            }
            None => {
                let path = self
                    .radio
                    .add_context(&self.modem_path, INTERNET_CONTEXT)
                    .await?;
                let properties = self
                    .radio
                    .properties(&path, &RadioInterface::ConnectionContext)
                    .await
                    .unwrap_or_default();
                RadioObject::new(path, properties)
            }
        };
        for (name, value) in properties.context_settings() {
            if let Err(e) = self
                .radio
                .set_property(
                    &context.path,
                    &RadioInterface::ConnectionContext,
                    name,
                    value.clone(),
                )
                .await
            {
                if added {
                    self.discard_context(&context.path).await;
                }
                return Err(e);
            }
            context.properties.insert(name.to_string(), value);
        }
        let (bearer, _) = self.bind(context).await;
        Ok(bearer)
    }

    async fn discard_context(&self, context_path: &str) {
        debug!("Removing unconfigured context {context_path}");
        if let Err(e) = self
            .radio
            .remove_context(&self.modem_path, context_path)
            .await
        {
            warn!("Removing context {context_path}: {e}");
        }
    }

    fn unbind(&mut self, path: &str) -> Option<Arc<Bearer>> {
        let index = self
            .bearers
            .iter()
            .position(|bound| bound.bearer.path() == path)?;
        Some(self.bearers.remove(index).bearer)
    }

    /// Remove the bearer at `path` together with its context. Returns false when there is no
    /// such bearer.
    pub async fn delete(&mut self, path: &str) -> bool {
        let Some(bearer) = self.unbind(path) else {
            debug!("{}: no bearer {path} to delete", self.modem_path);
            return false;
        };
        bearer.shutdown().await;
        self.discard_context(bearer.context_path()).await;
        self.publisher
            .publish(Notification::BearerRemoved(path.to_string()))
            .await;
        info!("{path} deleted");
        true
    }

    /// Bind every internet context not yet bound. Returns whether the port list changed.
    pub async fn discover(&mut self) -> bool {
        let contexts = match self.radio.contexts(&self.modem_path).await {
            Ok(contexts) => contexts,
            Err(e) => {
                warn!("{}: cannot list contexts: {e}", self.modem_path);
                return false;
            }
        };
        let mut ports_changed = false;
        for context in contexts {
            ports_changed |= self.on_context_added(context).await;
        }
        ports_changed
    }

    pub async fn on_context_added(&mut self, context: RadioObject) -> bool {
        if context.properties.str_of("Type") != Some(INTERNET_CONTEXT)
            || self.by_context(&context.path).is_some()
        {
            return false;
        }
        self.bind(context).await.1
    }

    pub async fn on_context_removed(&mut self, context_path: &str) -> bool {
        let Some(bearer) = self.by_context(context_path) else {
            return false;
        };
        self.unbind(bearer.path());
        bearer.shutdown().await;
        self.publisher
            .publish(Notification::BearerRemoved(bearer.path().to_string()))
            .await;
        info!("{} removed with its context", bearer.path());
        true
    }

    /// Route a context property change. Returns whether the port list changed.
    pub async fn on_context_property(
        &mut self,
        context_path: &str,
        name: &str,
        value: &PropertyValue,
    ) -> bool {
        let Some(bearer) = self.by_context(context_path) else {
            return false;
        };
        let interface = bearer.on_context_property(name, value).await;
        self.add_port(interface)
    }

    pub fn owns_context(&self, context_path: &str) -> bool {
        self.by_context(context_path).is_some()
    }

    /// Stop every bearer's background work and forget them.
    pub async fn shutdown(&mut self) {
        for bound in self.bearers.drain(..) {
            bound.bearer.shutdown().await;
        }
        self.ports.clear();
    }
}
