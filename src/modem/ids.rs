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

//! Object path allocation for exported ModemManager objects.

use crate::config::MM_OBJECT_PATH;
use std::sync::atomic::{AtomicU32, Ordering};

/// Hands out monotonically increasing identifiers, one sequence per object kind.
///
/// ModemManager sub-object paths are flat (`/Bearer/3`, not `/Modem/0/Bearer/3`), so one
/// allocator is shared by every modem of a discovery session. Identifiers are never reused.
#[derive(Debug, Default)]
pub struct IdAllocator {
    modems: AtomicU32,
    bearers: AtomicU32,
    calls: AtomicU32,
    messages: AtomicU32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_modem(&self) -> u32 {
        self.modems.fetch_add(1, Ordering::Relaxed)
    }

    pub fn next_bearer(&self) -> String {
        bearer_path(self.bearers.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_call(&self) -> String {
        call_path(self.calls.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_message(&self) -> String {
        sms_path(self.messages.fetch_add(1, Ordering::Relaxed))
    }
}

pub fn modem_path(index: u32) -> String {
    format!("{MM_OBJECT_PATH}/Modem/{index}")
}

pub fn sim_path(index: u32) -> String {
    format!("{MM_OBJECT_PATH}/SIM/{index}")
}

pub fn bearer_path(id: u32) -> String {
    format!("{MM_OBJECT_PATH}/Bearer/{id}")
}

pub fn call_path(id: u32) -> String {
    format!("{MM_OBJECT_PATH}/Call/{id}")
}

pub fn sms_path(id: u32) -> String {
    format!("{MM_OBJECT_PATH}/SMS/{id}")
}
