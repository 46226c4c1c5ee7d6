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

//! Typed ModemManager state vectors and their publication.
//!
//! Every exported object reads its properties from a snapshot struct published through a
//! [`tokio::sync::watch`] channel. The engine recomputes a snapshot in full, hands it to
//! [`Published::publish`], and gets back the names of the fields that differ from the previous
//! value. Only those are announced on the bus.

use crate::modem::bearer::BearerProperties;
use crate::modem::enums::{
    CallDirection, CallState, CallStateReason, FailedReason, IpMethod, LockType, ModemState,
    PowerState, RegistrationState, SmsPduType, SmsState,
};
pub use ofono2mm_macros::StateDiff;
use std::collections::BTreeMap;
use tokio::sync::watch;

/// Field-by-field comparison of two values of a snapshot struct. Derived with
/// `#[derive(StateDiff)]`; the reported names are the Rust field names.
pub trait StateDiff {
    fn changed_fields(&self, previous: &Self) -> Vec<&'static str>;
}

/// The latest value of a snapshot, with change detection on publication.
#[derive(Debug)]
pub struct Published<T> {
    sender: watch::Sender<T>,
}

impl<T: StateDiff> Published<T> {
    pub fn new(initial: T) -> Self {
        Published {
            sender: watch::Sender::new(initial),
        }
    }

    /// Replace the current value with `next` if any field differs, and return the differing
    /// fields. Receivers are only woken when the result is non-empty.
    pub fn publish(&self, next: T) -> Vec<&'static str> {
        let mut changed = Vec::new();
        self.sender.send_if_modified(|current| {
            changed = next.changed_fields(current);
            if changed.is_empty() {
                return false;
            }
            *current = next;
            true
        });
        changed
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.sender.borrow())
    }
}

impl<T: StateDiff + Clone> Published<T> {
    pub fn current(&self) -> T {
        self.sender.borrow().clone()
    }

    /// Apply `f` to a copy of the current value and publish the result.
    pub fn modify(&self, f: impl FnOnce(&mut T)) -> Vec<&'static str> {
        let mut next = self.current();
        f(&mut next);
        self.publish(next)
    }
}

/// `org.freedesktop.ModemManager1.Modem` and the modem-level lists of its sub-interfaces.
#[derive(Debug, Clone, Default, PartialEq, StateDiff)]
pub struct ModemSnapshot {
    pub state: ModemState,
    pub state_failed_reason: FailedReason,
    pub power_state: PowerState,
    pub unlock_required: LockType,
    pub unlock_retries: BTreeMap<u32, u32>,
    pub signal_quality: (u32, bool),
    pub access_technologies: u32,
    pub current_capabilities: u32,
    pub supported_capabilities: Vec<u32>,
    pub supported_modes: Vec<(u32, u32)>,
    pub current_modes: (u32, u32),
    pub sim: String,
    pub bearers: Vec<String>,
    pub own_numbers: Vec<String>,
    pub manufacturer: String,
    pub model: String,
    pub revision: String,
    pub hardware_revision: String,
    pub equipment_identifier: String,
    pub ports: Vec<(String, u32)>,
    pub calls: Vec<String>,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, StateDiff)]
pub struct SimSnapshot {
    pub active: bool,
    pub sim_identifier: String,
    pub imsi: String,
    pub operator_identifier: String,
    pub operator_name: String,
    pub emergency_numbers: Vec<String>,
}

/// `org.freedesktop.ModemManager1.Modem.Modem3gpp`.
#[derive(Debug, Clone, Default, PartialEq, StateDiff)]
pub struct RegistrationSnapshot {
    pub imei: String,
    pub registration_state: RegistrationState,
    pub operator_code: String,
    pub operator_name: String,
}

/// One technology dictionary of `Modem.Signal`. Absent values are left out on the bus.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalValues {
    pub rssi: Option<f64>,
    pub rscp: Option<f64>,
    pub rsrq: Option<f64>,
    pub rsrp: Option<f64>,
    pub error_rate: Option<f64>,
}

/// `org.freedesktop.ModemManager1.Modem.Signal`. CDMA and EV-DO are never measured.
#[derive(Debug, Clone, Default, PartialEq, StateDiff)]
pub struct SignalSnapshot {
    pub rate: u32,
    pub rssi_threshold: u32,
    pub error_rate_threshold: bool,
    pub gsm: SignalValues,
    pub umts: SignalValues,
    pub lte: SignalValues,
    pub nr5g: SignalValues,
}

/// `org.freedesktop.ModemManager1.Modem.Time`. Offsets are minutes.
#[derive(Debug, Clone, Default, PartialEq, StateDiff)]
pub struct TimeSnapshot {
    pub network_time: Option<String>,
    pub offset: Option<i32>,
    pub dst_offset: Option<i32>,
}

/// One IP family of a bearer's `Ip4Config`/`Ip6Config`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IpConfig {
    pub method: IpMethod,
    pub address: Option<String>,
    pub prefix: Option<u32>,
    pub dns: Vec<String>,
    pub gateway: Option<String>,
    pub mtu: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, StateDiff)]
pub struct BearerSnapshot {
    pub interface: String,
    pub connected: bool,
    pub suspended: bool,
    pub ip4_config: IpConfig,
    pub ip6_config: IpConfig,
    pub ip_timeout: u32,
    pub properties: BearerProperties,
}

#[derive(Debug, Clone, Default, PartialEq, StateDiff)]
pub struct CallSnapshot {
    pub state: CallState,
    pub state_reason: CallStateReason,
    pub direction: CallDirection,
    pub number: String,
    pub multiparty: bool,
}

#[derive(Debug, Clone, Default, PartialEq, StateDiff)]
pub struct SmsSnapshot {
    pub state: SmsState,
    pub pdu_type: SmsPduType,
    pub number: String,
    pub text: String,
    pub timestamp: String,
    pub delivery_report_request: bool,
}
