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

use crate::common::radio::MockRadio;
use crate::common::{
    MODEM, RecordingPublisher, props, registered_modem, settle, start_modem, test_settings,
    wait_until,
};
use googletest::prelude::*;
use ofono2mm::modem::enums::{
    ACCESS_TECHNOLOGY_LTE, FailedReason, LockType, MODE_2G, MODE_3G, ModemState, PowerState,
    RegistrationState,
};
use ofono2mm::modem::notify::Notification;
use ofono2mm::radio::RadioObject;
use rstest::*;

#[gtest]
#[tokio::test]
async fn registered_modem_projects_every_state_vector() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    let snapshot = modem.projection().modem.current();
    expect_that!(snapshot.state, eq(ModemState::Registered));
    expect_that!(snapshot.power_state, eq(PowerState::On));
    expect_that!(snapshot.signal_quality, eq((70, true)));
    expect_that!(snapshot.access_technologies, eq(ACCESS_TECHNOLOGY_LTE));
    expect_that!(snapshot.unlock_required, eq(LockType::None));
    expect_that!(snapshot.sim, eq("/org/freedesktop/ModemManager1/SIM/0"));
    expect_that!(snapshot.own_numbers, elements_are![eq("+491701234567")]);
    expect_that!(snapshot.equipment_identifier, eq("356938035643809"));

    let registration = modem.projection().registration.current();
    expect_that!(registration.registration_state, eq(RegistrationState::Home));
    expect_that!(registration.operator_code, eq("26201"));
    expect_that!(registration.operator_name, eq("Example Net"));

    let sim = modem.projection().sim.current();
    expect_that!(sim.active, eq(true));
    expect_that!(sim.imsi, eq("262010000000001"));
    expect_that!(sim.emergency_numbers, elements_are![eq("112"), eq("911")]);
}

#[gtest]
#[tokio::test]
async fn powered_off_modem_is_disabled() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let mut base = radio.modem_properties(MODEM);
    base.insert("Powered".into(), false.into());
    radio.add_modem(MODEM, base);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    let snapshot = modem.projection().modem.current();
    expect_that!(snapshot.state, eq(ModemState::Disabled));
    expect_that!(snapshot.power_state, eq(PowerState::Off));
}

#[gtest]
#[tokio::test]
async fn missing_sim_reports_failure_reason() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    radio.set_interface_properties(MODEM, "org.ofono.SimManager", props([("Present", false.into())]));
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    let snapshot = modem.projection().modem.current();
    expect_that!(snapshot.state, eq(ModemState::Unknown));
    expect_that!(snapshot.state_failed_reason, eq(FailedReason::SimMissing));
    expect_that!(snapshot.sim, eq("/"));
}

#[gtest]
#[tokio::test]
#[rstest]
#[case::pin("pin", LockType::SimPin)]
#[case::puk("puk", LockType::SimPuk)]
async fn pin_required_locks_the_modem(#[case] pin_required: &str, #[case] lock: LockType) {
    let radio = MockRadio::new();
    registered_modem(&radio);
    radio.set_interface_properties(
        MODEM,
        "org.ofono.SimManager",
        props([("Present", true.into()), ("PinRequired", pin_required.into())]),
    );
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    let snapshot = modem.projection().modem.current();
    expect_that!(snapshot.state, eq(ModemState::Locked));
    expect_that!(snapshot.unlock_required, eq(lock));
}

#[gtest]
#[tokio::test]
async fn technology_and_signal_are_zero_unless_registered() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    radio.change(
        MODEM,
        "org.ofono.NetworkRegistration",
        "Status",
        "searching".into(),
    );
    wait_until(|| modem.projection().modem.read(|m| m.state) == ModemState::Searching).await;

    let snapshot = modem.projection().modem.current();
    expect_that!(snapshot.access_technologies, eq(0));
    expect_that!(snapshot.signal_quality, eq((0, true)));
}

#[gtest]
#[tokio::test]
async fn only_changed_fields_are_published() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;
    settle().await;
    publisher.take();

    radio.change(MODEM, "org.ofono.NetworkRegistration", "Strength", 80u32.into());
    wait_until(|| modem.projection().modem.read(|m| m.signal_quality) == (80, true)).await;
    settle().await;
    expect_that!(publisher.modem_fields(), eq(&vec!["signal_quality"]));

    // Same value again: nothing to publish.
    publisher.take();
    radio.change(MODEM, "org.ofono.NetworkRegistration", "Strength", 80u32.into());
    settle().await;
    expect_that!(publisher.modem_fields(), is_empty());
}

#[gtest]
#[tokio::test]
async fn going_offline_emits_state_changed() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;
    settle().await;
    publisher.take();

    modem.enable(false).await.unwrap();
    wait_until(|| modem.projection().modem.read(|m| m.state) == ModemState::Disabled).await;
    settle().await;

    expect_that!(radio.count("SetProperty /ril_0 Online=Bool(false)"), eq(1));
    expect_that!(
        publisher.count(|n| matches!(
            n,
            Notification::StateChanged {
                old: ModemState::Registered,
                new: ModemState::Disabled,
                ..
            }
        )),
        eq(1)
    );
}

#[gtest]
#[tokio::test]
async fn interface_hot_unplug_and_replug() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    let without_netreg = [
        "org.ofono.SimManager",
        "org.ofono.RadioSettings",
        "org.ofono.ConnectionManager",
        "org.ofono.VoiceCallManager",
        "org.ofono.MessageManager",
    ];
    radio.set_interfaces(MODEM, &without_netreg);
    wait_until(|| modem.projection().modem.read(|m| m.state) == ModemState::Enabled).await;
    expect_that!(
        modem.projection().registration.read(|r| r.registration_state),
        eq(RegistrationState::Unknown)
    );

    // oFono keeps talking about the removed interface: ignored.
    radio.change(MODEM, "org.ofono.NetworkRegistration", "Strength", 10u32.into());
    settle().await;
    expect_that!(modem.projection().modem.read(|m| m.signal_quality), eq((0, true)));
    expect_that!(
        modem.register("").await,
        err(displays_as(contains_substring("BridgeError::CapabilityAbsent")))
    );

    let mut all = without_netreg.to_vec();
    all.push("org.ofono.NetworkRegistration");
    radio.set_interfaces(MODEM, &all);
    wait_until(|| modem.projection().modem.read(|m| m.state) == ModemState::Registered).await;
    expect_that!(modem.projection().modem.read(|m| m.signal_quality), eq((10, true)));
}

#[gtest]
#[tokio::test]
async fn current_modes_map_to_technology_preference() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    modem.set_current_modes((MODE_2G | MODE_3G, MODE_3G)).await.unwrap();
    expect_that!(
        radio.count("SetProperty /ril_0 TechnologyPreference=Str(\"umts\")"),
        eq(1)
    );

    // No preferred mode: the most capable allowed one.
    modem.set_current_modes((MODE_2G | MODE_3G, 0)).await.unwrap();
    expect_that!(
        radio.count("SetProperty /ril_0 TechnologyPreference=Str(\"umts\")"),
        eq(2)
    );
    expect_that!(
        modem.set_current_modes((0, 0)).await,
        err(displays_as(contains_substring("BridgeError::Argument")))
    );
}

#[gtest]
#[tokio::test]
async fn sim_operations_use_the_sim_manager() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    modem.send_pin("1234").await.unwrap();
    modem.send_puk("12345678", "4321").await.unwrap();
    modem.enable_pin("4321", false).await.unwrap();
    modem.change_pin("4321", "0000").await.unwrap();

    expect_that!(radio.count("EnterPin /ril_0 pin 1234"), eq(1));
    expect_that!(radio.count("ResetPin /ril_0 puk 12345678 4321"), eq(1));
    expect_that!(radio.count("UnlockPin /ril_0 pin 4321"), eq(1));
    expect_that!(radio.count("ChangePin /ril_0 pin 4321 0000"), eq(1));
}

#[gtest]
#[tokio::test]
async fn register_and_scan_use_network_registration() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    radio.set_operators(vec![RadioObject::new(
        "/ril_0/operator/26202",
        props([
            ("Status", "forbidden".into()),
            ("Name", "Other Net".into()),
            ("MobileCountryCode", "262".into()),
            ("MobileNetworkCode", "02".into()),
            ("Technologies", vec!["gsm", "lte"].into()),
        ]),
    )]);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    modem.register("").await.unwrap();
    modem.register("26202").await.unwrap();
    expect_that!(radio.count("Register /ril_0"), eq(1));
    expect_that!(radio.count("Register /ril_0/operator/26202"), eq(1));

    let results = modem.scan().await.unwrap();
    assert_that!(results.len(), eq(1));
    expect_that!(results[0].status, eq(3));
    expect_that!(results[0].operator_long, eq("Other Net"));
    expect_that!(results[0].operator_code, eq("26202"));
    expect_that!(
        results[0].access_technology,
        eq((1 << 1) | ACCESS_TECHNOLOGY_LTE)
    );
}
