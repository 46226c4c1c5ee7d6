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

//! ofono2mm exposes modems managed by oFono through the ModemManager1 D-Bus API.
//!
//! The library holds the whole daemon so that the engine can be driven without a bus:
//! - [`radio`] is the seam towards oFono;
//! - [`modem`] is the reconciliation and bearer-lifecycle engine;
//! - [`comm`] exports the engine's state as ModemManager1 objects;
//! - [`discovery`] finds modems and keeps the exported set in sync.

pub mod comm;
pub mod config;
pub mod discovery;
pub mod error;
pub mod modem;
pub mod radio;
