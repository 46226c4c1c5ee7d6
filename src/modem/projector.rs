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

//! Derivation of the ModemManager state vectors from the cached oFono properties.
//!
//! [`RadioState`] is a typed read of the interface cache. The `project_*` functions turn it into
//! snapshots without side effects, and [`Projection`] publishes the results and reports what
//! changed.

use crate::modem::enums::{
    ACCESS_TECHNOLOGY_5GNR, ACCESS_TECHNOLOGY_EDGE, ACCESS_TECHNOLOGY_GPRS, ACCESS_TECHNOLOGY_GSM,
    ACCESS_TECHNOLOGY_LTE, ACCESS_TECHNOLOGY_UMTS, CAPABILITY_5GNR, CAPABILITY_GSM_UMTS,
    CAPABILITY_LTE, FailedReason, LockType, MODE_2G, MODE_3G, MODE_4G, MODE_5G, MODE_NONE,
    ModemState, PowerState, RegistrationState,
};
use crate::modem::notify::Notification;
use crate::modem::snapshot::{
    ModemSnapshot, Published, RegistrationSnapshot, SignalSnapshot, SignalValues, SimSnapshot,
    TimeSnapshot,
};
use crate::modem::tracker::InterfaceTracker;
use crate::radio::RadioInterface;
use crate::radio::value::{PropertyMap, PropertyMapExt};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimState {
    pub present: bool,
    pub pin_required: Option<String>,
    pub card_identifier: Option<String>,
    pub subscriber_identity: Option<String>,
    pub subscriber_numbers: Vec<String>,
    pub retries: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkState {
    pub status: Option<String>,
    pub name: Option<String>,
    pub mobile_country_code: Option<String>,
    pub mobile_network_code: Option<String>,
    pub strength: Option<u32>,
    pub technology: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadioSettingsState {
    pub available_technologies: Vec<String>,
    pub technology_preference: Option<String>,
}

/// Serving cell measurements from `org.ofono.NetworkMonitor`, as raw 3GPP 27.007 indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkMonitorState {
    pub technology: Option<String>,
    pub received_signal_strength: Option<u32>,
    pub bit_error_rate: Option<u32>,
    pub reference_signal_received_quality: Option<u32>,
    pub reference_signal_received_power: Option<u32>,
    pub received_signal_code_power: Option<u32>,
}

/// `org.ofono.NetworkTime`. `timezone` is in seconds east of UTC, `dst` in hours.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkTimeState {
    pub utc: Option<i64>,
    pub timezone: Option<i32>,
    pub dst: Option<i32>,
}

/// What the projection reads from oFono. `None` means the interface is not advertised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadioState {
    pub powered: bool,
    pub online: bool,
    pub serial: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub revision: Option<String>,
    pub sim: Option<SimState>,
    pub network: Option<NetworkState>,
    pub radio_settings: Option<RadioSettingsState>,
    pub monitor: Option<NetworkMonitorState>,
    pub time: Option<NetworkTimeState>,
    pub emergency_numbers: Vec<String>,
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

impl SimState {
    pub fn from_properties(properties: &PropertyMap) -> Self {
        let retries = properties
            .map_of("Retries")
            .map(|retries| {
                retries
                    .iter()
                    .filter_map(|(pin, left)| left.as_u32().map(|left| (pin.clone(), left)))
                    .collect()
            })
            .unwrap_or_default();
        SimState {
            present: properties.bool_of("Present").unwrap_or(false),
            pin_required: owned(properties.str_of("PinRequired")),
            card_identifier: owned(properties.str_of("CardIdentifier")),
            subscriber_identity: owned(properties.str_of("SubscriberIdentity")),
            subscriber_numbers: properties
                .strings_of("SubscriberNumbers")
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
            retries,
        }
    }
}

impl NetworkState {
    pub fn from_properties(properties: &PropertyMap) -> Self {
        NetworkState {
            status: owned(properties.str_of("Status")),
            name: owned(properties.str_of("Name")),
            mobile_country_code: owned(properties.str_of("MobileCountryCode")),
            mobile_network_code: owned(properties.str_of("MobileNetworkCode")),
            strength: properties.u32_of("Strength"),
            technology: owned(properties.str_of("Technology")),
        }
    }
}

impl RadioSettingsState {
    pub fn from_properties(properties: &PropertyMap) -> Self {
        RadioSettingsState {
            available_technologies: properties
                .strings_of("AvailableTechnologies")
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
            technology_preference: owned(properties.str_of("TechnologyPreference")),
        }
    }
}

impl NetworkMonitorState {
    pub fn from_properties(properties: &PropertyMap) -> Self {
        NetworkMonitorState {
            technology: owned(properties.str_of("Technology")),
            received_signal_strength: properties.u32_of("ReceivedSignalStrength"),
            bit_error_rate: properties.u32_of("BitErrorRate"),
            reference_signal_received_quality: properties.u32_of("ReferenceSignalReceivedQuality"),
            reference_signal_received_power: properties.u32_of("ReferenceSignalReceivedPower"),
            received_signal_code_power: properties.u32_of("ReceivedSignalCodePower"),
        }
    }
}

impl NetworkTimeState {
    pub fn from_properties(properties: &PropertyMap) -> Self {
        let small = |key: &str| properties.i64_of(key).and_then(|v| i32::try_from(v).ok());
        NetworkTimeState {
            utc: properties.i64_of("UTC"),
            timezone: small("Timezone"),
            dst: small("DST"),
        }
    }
}

impl RadioState {
    pub fn from_cache(base: &PropertyMap, tracker: &InterfaceTracker) -> Self {
        RadioState {
            powered: base.bool_of("Powered").unwrap_or(false),
            online: base.bool_of("Online").unwrap_or(false),
            serial: owned(base.str_of("Serial")),
            manufacturer: owned(base.str_of("Manufacturer")),
            model: owned(base.str_of("Model")),
            revision: owned(base.str_of("Revision")),
            sim: tracker
                .properties(&RadioInterface::SimManager)
                .map(SimState::from_properties),
            network: tracker
                .properties(&RadioInterface::NetworkRegistration)
                .map(NetworkState::from_properties),
            radio_settings: tracker
                .properties(&RadioInterface::RadioSettings)
                .map(RadioSettingsState::from_properties),
            monitor: tracker
                .properties(&RadioInterface::NetworkMonitor)
                .map(NetworkMonitorState::from_properties),
            time: tracker
                .properties(&RadioInterface::NetworkTime)
                .map(NetworkTimeState::from_properties),
            emergency_numbers: tracker
                .properties(&RadioInterface::VoiceCallManager)
                .and_then(|voice| voice.strings_of("EmergencyNumbers"))
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
        }
    }

    fn sim_present(&self) -> bool {
        self.sim.as_ref().is_some_and(|sim| sim.present)
    }
}

/// Inputs of the modem snapshot that the engine owns rather than oFono.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionInputs {
    pub sim_path: String,
    pub bearers: Vec<String>,
    pub ports: Vec<(String, u32)>,
    pub calls: Vec<String>,
    pub messages: Vec<String>,
    pub signal: SignalSetup,
}

/// Client settings of `Modem.Signal`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalSetup {
    /// Refresh period in seconds, 0 when disabled.
    pub rate: u32,
    pub rssi_threshold: u32,
    pub error_rate_threshold: bool,
}

/// oFono registration `Status` to `MMModem3gppRegistrationState`. Unrecognised values, including
/// "unregistered", read as unknown.
pub fn registration_state(status: Option<&str>) -> RegistrationState {
    match status {
        Some("registered") => RegistrationState::Home,
        Some("searching") => RegistrationState::Searching,
        Some("denied") => RegistrationState::Denied,
        Some("roaming") => RegistrationState::Roaming,
        _ => RegistrationState::Unknown,
    }
}

pub fn access_technology(technology: &str) -> u32 {
    match technology {
        "gsm" => ACCESS_TECHNOLOGY_GSM,
        "gprs" => ACCESS_TECHNOLOGY_GPRS,
        "edge" => ACCESS_TECHNOLOGY_EDGE,
        "umts" | "hspa" | "hsdpa" | "hsupa" => ACCESS_TECHNOLOGY_UMTS,
        "lte" => ACCESS_TECHNOLOGY_LTE,
        "nr" => ACCESS_TECHNOLOGY_5GNR,
        _ => 0,
    }
}

pub fn mode_for_technology(technology: &str) -> u32 {
    match technology {
        "gsm" => MODE_2G,
        "umts" => MODE_3G,
        "lte" => MODE_4G,
        "nr" => MODE_5G,
        _ => MODE_NONE,
    }
}

/// oFono `TechnologyPreference` for a ModemManager preferred mode.
pub fn technology_for_mode(mode: u32) -> Option<&'static str> {
    match mode {
        MODE_2G => Some("gsm"),
        MODE_3G => Some("umts"),
        MODE_4G => Some("lte"),
        MODE_5G => Some("nr"),
        _ => None,
    }
}

/// Capability bits and allowed-mode bits for a list of available technologies.
pub fn capabilities_and_modes(technologies: &[String]) -> (u32, u32) {
    technologies
        .iter()
        .fold((0, MODE_NONE), |(capabilities, modes), technology| {
            let capability = match technology.as_str() {
                "gsm" | "umts" => CAPABILITY_GSM_UMTS,
                "lte" => CAPABILITY_LTE,
                "nr" => CAPABILITY_5GNR,
                _ => 0,
            };
            (
                capabilities | capability,
                modes | mode_for_technology(technology),
            )
        })
}

/// Enumerate `(allowed, preferred)` pairs, most capable first: the full mask preferring its
/// highest mode, then the mask without that mode, and so on.
pub fn supported_modes(allowed: u32) -> Vec<(u32, u32)> {
    if allowed == MODE_NONE {
        return vec![(MODE_NONE, MODE_NONE)];
    }
    let mut modes = Vec::new();
    let mut mask = allowed;
    while mask != 0 {
        let highest = 1 << (u32::BITS - 1 - mask.leading_zeros());
        modes.push((mask, highest));
        mask &= !highest;
    }
    modes
}

pub fn current_modes(supported: &[(u32, u32)], preferred: u32) -> (u32, u32) {
    supported
        .iter()
        .find(|(_, p)| *p == preferred)
        .or_else(|| supported.first())
        .copied()
        .unwrap_or((MODE_NONE, MODE_NONE))
}

pub fn unlock_required(sim: Option<&SimState>) -> LockType {
    match sim {
        Some(sim) if sim.present => sim
            .pin_required
            .as_deref()
            .map(LockType::from_ofono)
            .unwrap_or(LockType::Unknown),
        _ => LockType::Unknown,
    }
}

fn operator_code(network: &NetworkState) -> String {
    format!(
        "{}{}",
        network.mobile_country_code.as_deref().unwrap_or_default(),
        network.mobile_network_code.as_deref().unwrap_or_default()
    )
}

/// Modem `State`, `StateFailedReason` and `PowerState`.
pub fn modem_state(radio: &RadioState) -> (ModemState, FailedReason, PowerState) {
    if !radio.powered {
        return (ModemState::Disabled, FailedReason::None, PowerState::Off);
    }
    let Some(sim) = radio.sim.as_ref().filter(|sim| sim.present) else {
        return (ModemState::Unknown, FailedReason::SimMissing, PowerState::On);
    };
    let state = if sim.pin_required.as_deref() != Some("none") {
        ModemState::Locked
    } else if !radio.online {
        ModemState::Disabled
    } else {
        match radio
            .network
            .as_ref()
            .and_then(|network| network.status.as_deref())
        {
            None => ModemState::Enabled,
            Some("registered") | Some("roaming") => ModemState::Registered,
            Some("searching") => ModemState::Searching,
            Some(_) => ModemState::Enabled,
        }
    };
    (state, FailedReason::None, PowerState::On)
}

pub fn project_modem(radio: &RadioState, inputs: &ProjectionInputs) -> ModemSnapshot {
    let (state, state_failed_reason, power_state) = modem_state(radio);
    let registered = state == ModemState::Registered;

    let signal_quality = match radio.network.as_ref().and_then(|n| n.strength) {
        Some(strength) if registered => (strength, true),
        _ => (0, true),
    };
    let access_technologies = match radio.network.as_ref().and_then(|n| n.technology.as_deref()) {
        Some(technology) if registered => access_technology(technology),
        _ => 0,
    };

    let (capabilities, allowed) = radio
        .radio_settings
        .as_ref()
        .map(|settings| capabilities_and_modes(&settings.available_technologies))
        .unwrap_or((0, MODE_NONE));
    let preferred = radio
        .radio_settings
        .as_ref()
        .and_then(|settings| settings.technology_preference.as_deref())
        .map(mode_for_technology)
        .unwrap_or(MODE_NONE);
    let supported_modes = supported_modes(allowed);
    let current_modes = current_modes(&supported_modes, preferred);

    let unlock_retries = radio
        .sim
        .as_ref()
        .map(|sim| {
            sim.retries
                .iter()
                .map(|(pin, left)| (LockType::from_ofono(pin) as u32, *left))
                .collect()
        })
        .unwrap_or_default();

    ModemSnapshot {
        state,
        state_failed_reason,
        power_state,
        unlock_required: unlock_required(radio.sim.as_ref()),
        unlock_retries,
        signal_quality,
        access_technologies,
        current_capabilities: capabilities,
        supported_capabilities: vec![capabilities],
        supported_modes,
        current_modes,
        sim: if radio.sim_present() {
            inputs.sim_path.clone()
        } else {
            "/".to_string()
        },
        bearers: inputs.bearers.clone(),
        own_numbers: radio
            .sim
            .as_ref()
            .map(|sim| sim.subscriber_numbers.clone())
            .unwrap_or_default(),
        manufacturer: radio.manufacturer.clone().unwrap_or_default(),
        model: radio.model.clone().unwrap_or_default(),
        revision: radio.revision.clone().unwrap_or_default(),
        hardware_revision: radio.revision.clone().unwrap_or_default(),
        equipment_identifier: radio.serial.clone().unwrap_or_default(),
        ports: inputs.ports.clone(),
        calls: inputs.calls.clone(),
        messages: inputs.messages.clone(),
    }
}

pub fn project_sim(radio: &RadioState) -> SimSnapshot {
    let sim = radio.sim.as_ref();
    let network = radio.network.as_ref();
    SimSnapshot {
        active: sim.is_some_and(|sim| sim.present),
        sim_identifier: sim
            .and_then(|sim| sim.card_identifier.clone())
            .unwrap_or_default(),
        imsi: sim
            .and_then(|sim| sim.subscriber_identity.clone())
            .unwrap_or_default(),
        operator_identifier: network.map(operator_code).unwrap_or_default(),
        operator_name: network
            .and_then(|network| network.name.clone())
            .unwrap_or_default(),
        emergency_numbers: radio.emergency_numbers.clone(),
    }
}

pub fn project_registration(radio: &RadioState) -> RegistrationSnapshot {
    let network = radio.network.as_ref();
    RegistrationSnapshot {
        imei: radio.serial.clone().unwrap_or_default(),
        registration_state: registration_state(network.and_then(|n| n.status.as_deref())),
        operator_code: network.map(operator_code).unwrap_or_default(),
        operator_name: network.and_then(|n| n.name.clone()).unwrap_or_default(),
    }
}

/// `<rssi>` index of 27.007 `+CSQ` to dBm. 99 and anything above 31 mean unknown.
pub fn rssi_dbm(index: u32) -> Option<f64> {
    (index <= 31).then(|| -113.0 + 2.0 * f64::from(index))
}

/// `<rsrq>` index of 27.007 `+CESQ` to dB.
pub fn rsrq_db(index: u32) -> Option<f64> {
    (index <= 34).then(|| -20.0 + 0.5 * f64::from(index))
}

/// `<rsrp>` index of 27.007 `+CESQ` to dBm.
pub fn rsrp_dbm(index: u32) -> Option<f64> {
    (index <= 97).then(|| -141.0 + f64::from(index))
}

/// `<rscp>` index of 27.007 `+CESQ` to dBm.
pub fn rscp_dbm(index: u32) -> Option<f64> {
    (index <= 96).then(|| -121.0 + f64::from(index))
}

const BIT_ERROR_RATES: [f64; 8] = [0.14, 0.28, 0.57, 1.13, 2.26, 4.53, 9.05, 18.1];

/// `<ber>` index of 27.007 `+CSQ` to the median bit error rate in percent.
pub fn bit_error_rate(index: u32) -> Option<f64> {
    usize::try_from(index)
        .ok()
        .and_then(|index| BIT_ERROR_RATES.get(index))
        .copied()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TechnologyFamily {
    Gsm,
    Umts,
    Lte,
    Nr,
}

fn technology_family(technology: &str) -> Option<TechnologyFamily> {
    match technology {
        "gsm" | "gprs" | "edge" => Some(TechnologyFamily::Gsm),
        "umts" | "hspa" | "hsdpa" | "hsupa" => Some(TechnologyFamily::Umts),
        "lte" => Some(TechnologyFamily::Lte),
        "nr" => Some(TechnologyFamily::Nr),
        _ => None,
    }
}

/// `Modem.Signal`. Measurements land in the dictionary of the serving technology, falling back
/// to the registration's technology; when neither is known every dictionary carries them.
pub fn project_signal(radio: &RadioState, setup: &SignalSetup) -> SignalSnapshot {
    let mut snapshot = SignalSnapshot {
        rate: setup.rate,
        rssi_threshold: setup.rssi_threshold,
        error_rate_threshold: setup.error_rate_threshold,
        ..SignalSnapshot::default()
    };
    let Some(monitor) = radio.monitor.as_ref() else {
        return snapshot;
    };
    let rssi = monitor.received_signal_strength.and_then(rssi_dbm);
    let error_rate = monitor.bit_error_rate.and_then(bit_error_rate);
    let rsrq = monitor.reference_signal_received_quality.and_then(rsrq_db);
    let rsrp = monitor.reference_signal_received_power.and_then(rsrp_dbm);
    let rscp = monitor.received_signal_code_power.and_then(rscp_dbm);

    let gsm = SignalValues {
        rssi,
        error_rate,
        ..SignalValues::default()
    };
    let umts = SignalValues {
        rssi,
        rscp,
        error_rate,
        ..SignalValues::default()
    };
    let lte = SignalValues {
        rssi,
        rsrq,
        rsrp,
        error_rate,
        ..SignalValues::default()
    };
    let nr5g = SignalValues {
        rsrq,
        rsrp,
        error_rate,
        ..SignalValues::default()
    };

    let family = monitor
        .technology
        .as_deref()
        .or_else(|| radio.network.as_ref().and_then(|n| n.technology.as_deref()))
        .and_then(technology_family);
    match family {
        Some(TechnologyFamily::Gsm) => snapshot.gsm = gsm,
        Some(TechnologyFamily::Umts) => snapshot.umts = umts,
        Some(TechnologyFamily::Lte) => snapshot.lte = lte,
        Some(TechnologyFamily::Nr) => snapshot.nr5g = nr5g,
        None => {
            snapshot.gsm = gsm;
            snapshot.umts = umts;
            snapshot.lte = lte;
            snapshot.nr5g = nr5g;
        }
    }
    snapshot
}

/// Render a network timestamp as RFC 3339 in the network's local offset.
pub fn network_time_string(utc: i64, timezone: Option<i32>) -> Option<String> {
    let offset = FixedOffset::east_opt(timezone.unwrap_or(0))?;
    DateTime::from_timestamp(utc, 0)
        .map(|time| time.with_timezone(&offset).to_rfc3339_opts(SecondsFormat::Secs, false))
}

/// `Modem.Time`. Offsets are reported in minutes.
pub fn project_time(radio: &RadioState) -> TimeSnapshot {
    let Some(time) = radio.time.as_ref() else {
        return TimeSnapshot::default();
    };
    TimeSnapshot {
        network_time: time
            .utc
            .and_then(|utc| network_time_string(utc, time.timezone)),
        offset: time.timezone.map(|seconds| seconds / 60),
        dst_offset: time.dst.map(|hours| hours * 60),
    }
}

/// The published snapshots of one modem that derive from its interface cache.
#[derive(Debug)]
pub struct Projection {
    pub modem: Published<ModemSnapshot>,
    pub sim: Published<SimSnapshot>,
    pub registration: Published<RegistrationSnapshot>,
    pub signal: Published<SignalSnapshot>,
    pub time: Published<TimeSnapshot>,
}

impl Default for Projection {
    fn default() -> Self {
        Projection::new()
    }
}

impl Projection {
    pub fn new() -> Self {
        Projection {
            modem: Published::new(ModemSnapshot::default()),
            sim: Published::new(SimSnapshot::default()),
            registration: Published::new(RegistrationSnapshot::default()),
            signal: Published::new(SignalSnapshot::default()),
            time: Published::new(TimeSnapshot::default()),
        }
    }

    /// Recompute every snapshot and return the notifications for what differs.
    pub fn update(&self, radio: &RadioState, inputs: &ProjectionInputs) -> Vec<Notification> {
        let mut notifications = Vec::new();

        let old_state = self.modem.read(|modem| modem.state);
        let modem = project_modem(radio, inputs);
        let new_state = modem.state;
        let changed = self.modem.publish(modem);
        if !changed.is_empty() {
            notifications.push(Notification::ModemChanged(changed));
        }
        if old_state != new_state {
            notifications.push(Notification::StateChanged {
                old: old_state,
                new: new_state,
                reason: 0,
            });
        }

        let changed = self.sim.publish(project_sim(radio));
        if !changed.is_empty() {
            notifications.push(Notification::SimChanged(changed));
        }

        let changed = self.registration.publish(project_registration(radio));
        if !changed.is_empty() {
            notifications.push(Notification::RegistrationChanged(changed));
        }

        let changed = self.signal.publish(project_signal(radio, &inputs.signal));
        if !changed.is_empty() {
            notifications.push(Notification::SignalChanged(changed));
        }

        let changed = self.time.publish(project_time(radio));
        if !changed.is_empty() {
            notifications.push(Notification::TimeChanged(changed));
        }
        notifications
    }
}
