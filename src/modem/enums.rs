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

//! ModemManager enumerations, with the numeric values of the ModemManager1 API.

#[repr(i32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ModemState {
    #[default]
    Unknown = 0,
    Locked = 2,
    Disabled = 3,
    Enabled = 6,
    Searching = 7,
    Registered = 8,
}

#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FailedReason {
    #[default]
    None = 0,
    SimMissing = 2,
}

#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    #[default]
    Unknown = 0,
    Off = 1,
    On = 3,
}

#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockType {
    #[default]
    Unknown = 0,
    None = 1,
    SimPin = 2,
    SimPin2 = 3,
    SimPuk = 4,
    SimPuk2 = 5,
    PhSpPin = 6,
    PhSpPuk = 7,
    PhNetPin = 8,
    PhNetPuk = 9,
    PhSimPin = 10,
    PhCorpPin = 11,
    PhCorpPuk = 12,
    PhFsimPin = 13,
    PhFsimPuk = 14,
    PhNetsubPin = 15,
    PhNetsubPuk = 16,
}

impl LockType {
    /// Map an oFono `PinRequired` value, or a key of the `Retries` dictionary.
    pub fn from_ofono(pin_type: &str) -> Self {
        match pin_type {
            "none" => LockType::None,
            "pin" => LockType::SimPin,
            "pin2" => LockType::SimPin2,
            "puk" => LockType::SimPuk,
            "puk2" => LockType::SimPuk2,
            "service" => LockType::PhSpPin,
            "servicepuk" => LockType::PhSpPuk,
            "network" => LockType::PhNetPin,
            "networkpuk" => LockType::PhNetPuk,
            "phone" => LockType::PhSimPin,
            "corp" => LockType::PhCorpPin,
            "corppuk" => LockType::PhCorpPuk,
            "firstphone" => LockType::PhFsimPin,
            "firstphonepuk" => LockType::PhFsimPuk,
            "netsub" => LockType::PhNetsubPin,
            "netsubpuk" => LockType::PhNetsubPuk,
            _ => LockType::SimPin,
        }
    }
}

/// `MMModem3gppRegistrationState`. `Idle` exists in the API but is never derived from oFono.
#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Idle = 0,
    Home = 1,
    Searching = 2,
    Denied = 3,
    #[default]
    Unknown = 4,
    Roaming = 5,
}

#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    #[default]
    Unknown = 0,
    Dialing = 1,
    RingingOut = 2,
    RingingIn = 3,
    Active = 4,
    Held = 5,
    Waiting = 6,
    Terminated = 7,
}

impl CallState {
    pub fn from_ofono(state: &str) -> Self {
        match state {
            "incoming" => CallState::RingingIn,
            "waiting" => CallState::Waiting,
            "dialing" => CallState::Dialing,
            "alerting" => CallState::RingingOut,
            "active" => CallState::Active,
            "held" => CallState::Held,
            "disconnected" => CallState::Terminated,
            _ => CallState::Unknown,
        }
    }
}

#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CallStateReason {
    #[default]
    Unknown = 0,
    OutgoingStarted = 1,
    IncomingNew = 2,
    Accepted = 3,
    Terminated = 4,
}

#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CallDirection {
    #[default]
    Unknown = 0,
    Incoming = 1,
    Outgoing = 2,
}

#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SmsState {
    #[default]
    Unknown = 0,
    Stored = 1,
    Receiving = 2,
    Received = 3,
    Sending = 4,
    Sent = 5,
}

#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SmsPduType {
    #[default]
    Unknown = 0,
    Deliver = 1,
    Submit = 2,
}

#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum IpMethod {
    #[default]
    Unknown = 0,
    Static = 2,
    Dhcp = 3,
}

impl IpMethod {
    pub fn from_ofono(method: &str) -> Self {
        match method {
            "static" => IpMethod::Static,
            "dhcp" => IpMethod::Dhcp,
            _ => IpMethod::Unknown,
        }
    }
}

/// `MMModemPortType` value of a network interface.
pub const PORT_TYPE_NET: u32 = 2;

// MMModemCapability bits.
pub const CAPABILITY_GSM_UMTS: u32 = 1 << 2;
pub const CAPABILITY_LTE: u32 = 1 << 3;
pub const CAPABILITY_5GNR: u32 = 1 << 6;

// MMModemMode bits.
pub const MODE_NONE: u32 = 0;
pub const MODE_2G: u32 = 1 << 1;
pub const MODE_3G: u32 = 1 << 2;
pub const MODE_4G: u32 = 1 << 3;
pub const MODE_5G: u32 = 1 << 4;

// MMModemAccessTechnology bits.
pub const ACCESS_TECHNOLOGY_GSM: u32 = 1 << 1;
pub const ACCESS_TECHNOLOGY_GPRS: u32 = 1 << 3;
pub const ACCESS_TECHNOLOGY_EDGE: u32 = 1 << 4;
pub const ACCESS_TECHNOLOGY_UMTS: u32 = 1 << 5;
pub const ACCESS_TECHNOLOGY_LTE: u32 = 1 << 14;
pub const ACCESS_TECHNOLOGY_5GNR: u32 = 1 << 15;

// MMBearerIpFamily bits and MMBearerAllowedAuth bits.
pub const IP_FAMILY_IPV4: u32 = 1;
pub const IP_FAMILY_IPV6: u32 = 2;
pub const IP_FAMILY_IPV4V6: u32 = 4;
pub const IP_FAMILY_ANY: u32 = 8;
pub const ALLOWED_AUTH_NONE: u32 = 1;
pub const ALLOWED_AUTH_PAP: u32 = 2;
pub const ALLOWED_AUTH_CHAP: u32 = 4;
