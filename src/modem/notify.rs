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

use crate::modem::bearer::Bearer;
use crate::modem::calls::Call;
use crate::modem::enums::{CallState, CallStateReason, ModemState};
use crate::modem::messages::Sms;
use async_trait::async_trait;
use std::sync::Arc;

/// A change of engine state that clients of one modem must hear about. Field lists are
/// [`crate::modem::snapshot::StateDiff`] names of the snapshot concerned.
#[derive(Debug, Clone)]
pub enum Notification {
    ModemChanged(Vec<&'static str>),
    StateChanged {
        old: ModemState,
        new: ModemState,
        reason: u32,
    },
    SimChanged(Vec<&'static str>),
    RegistrationChanged(Vec<&'static str>),
    SignalChanged(Vec<&'static str>),
    TimeChanged(Vec<&'static str>),
    BearerAdded(Arc<Bearer>),
    BearerChanged {
        path: String,
        changed: Vec<&'static str>,
    },
    BearerRemoved(String),
    CallAdded(Arc<Call>),
    CallChanged {
        path: String,
        changed: Vec<&'static str>,
    },
    CallStateChanged {
        path: String,
        old: CallState,
        new: CallState,
        reason: CallStateReason,
    },
    CallRemoved(String),
    MessageAdded {
        sms: Arc<Sms>,
        received: bool,
    },
    MessageChanged {
        path: String,
        changed: Vec<&'static str>,
    },
    MessageRemoved(String),
}

/// Delivers notifications of one modem to its clients. Delivery is best-effort; an
/// implementation logs failures instead of returning them.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, notification: Notification);

    async fn publish_all(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            self.publish(notification).await;
        }
    }
}
