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

use std::collections::HashMap;
use zbus::zvariant::{ObjectPath, OwnedObjectPath, OwnedValue};
use zbus::{Result, proxy};

/// An oFono object path with its property dictionary, as returned by the list methods.
pub type ObjectEntry = (OwnedObjectPath, HashMap<String, OwnedValue>);

#[proxy(
    default_service = "org.ofono",
    interface = "org.ofono.Manager",
    default_path = "/"
)]
pub trait Manager {
    async fn get_modems(&self) -> Result<Vec<ObjectEntry>>;
}

#[proxy(default_service = "org.ofono", interface = "org.ofono.SimManager")]
pub trait SimManager {
    async fn enter_pin(&self, pin_type: &str, pin: &str) -> Result<()>;
    async fn reset_pin(&self, puk_type: &str, puk: &str, new_pin: &str) -> Result<()>;
    async fn lock_pin(&self, pin_type: &str, pin: &str) -> Result<()>;
    async fn unlock_pin(&self, pin_type: &str, pin: &str) -> Result<()>;
    async fn change_pin(&self, pin_type: &str, old_pin: &str, new_pin: &str) -> Result<()>;
}

#[proxy(default_service = "org.ofono", interface = "org.ofono.NetworkRegistration")]
pub trait NetworkRegistration {
    async fn register(&self) -> Result<()>;
    async fn scan(&self) -> Result<Vec<ObjectEntry>>;
}

#[proxy(default_service = "org.ofono", interface = "org.ofono.NetworkOperator")]
pub trait NetworkOperator {
    async fn register(&self) -> Result<()>;
}

#[proxy(default_service = "org.ofono", interface = "org.ofono.ConnectionManager")]
pub trait ConnectionManager {
    async fn get_contexts(&self) -> Result<Vec<ObjectEntry>>;
    async fn add_context(&self, context_type: &str) -> Result<OwnedObjectPath>;
    async fn remove_context(&self, path: &ObjectPath<'_>) -> Result<()>;
}

#[proxy(default_service = "org.ofono", interface = "org.ofono.VoiceCallManager")]
pub trait VoiceCallManager {
    async fn get_calls(&self) -> Result<Vec<ObjectEntry>>;
    async fn dial(&self, number: &str, hide_callerid: &str) -> Result<OwnedObjectPath>;
    async fn hangup_all(&self) -> Result<()>;
    async fn hold_and_answer(&self) -> Result<()>;
    async fn release_and_answer(&self) -> Result<()>;
    async fn transfer(&self) -> Result<()>;
    async fn send_tones(&self, tones: &str) -> Result<()>;
    async fn create_multiparty(&self) -> Result<Vec<OwnedObjectPath>>;
    async fn private_chat(&self, call: &ObjectPath<'_>) -> Result<Vec<OwnedObjectPath>>;
}

#[proxy(default_service = "org.ofono", interface = "org.ofono.VoiceCall")]
pub trait VoiceCall {
    async fn answer(&self) -> Result<()>;
    async fn hangup(&self) -> Result<()>;
    async fn deflect(&self, number: &str) -> Result<()>;
}

#[proxy(default_service = "org.ofono", interface = "org.ofono.MessageManager")]
pub trait MessageManager {
    async fn send_message(&self, to: &str, text: &str) -> Result<OwnedObjectPath>;
}
