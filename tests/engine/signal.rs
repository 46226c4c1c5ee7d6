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
};
use googletest::prelude::*;
use ofono2mm::modem::notify::Notification;
use ofono2mm::radio::value::PropertyValue;
use std::time::Duration;

const SERVING_CELL: &str = "GetServingCellInformation /ril_0 org.ofono.NetworkMonitor";

/// `registered_modem` that also advertises the network monitor and network time.
fn monitored_modem(radio: &MockRadio) {
    registered_modem(radio);
    radio.change(
        MODEM,
        "org.ofono.Modem",
        "Interfaces",
        PropertyValue::from(vec![
            "org.ofono.SimManager",
            "org.ofono.NetworkRegistration",
            "org.ofono.RadioSettings",
            "org.ofono.NetworkMonitor",
            "org.ofono.NetworkTime",
        ]),
    );
    radio.set_interface_properties(
        MODEM,
        "org.ofono.NetworkMonitor",
        props([
            ("Technology", "lte".into()),
            ("ReceivedSignalStrength", 21u8.into()),
            ("BitErrorRate", 0u8.into()),
            ("ReferenceSignalReceivedPower", 50u8.into()),
        ]),
    );
}

#[gtest]
#[tokio::test(start_paused = true)]
async fn signal_setup_refreshes_serving_cell_measurements() {
    let radio = MockRadio::new();
    monitored_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    modem.setup_signal(10).await.unwrap();
    let signal = modem.projection().signal.current();
    expect_that!(signal.rate, eq(10));
    expect_that!(signal.lte.rssi, some(eq(-71.0)));
    expect_that!(signal.lte.rsrp, some(eq(-91.0)));
    expect_that!(radio.count(SERVING_CELL), eq(2));

    radio.set_interface_properties(
        MODEM,
        "org.ofono.NetworkMonitor",
        props([
            ("Technology", "lte".into()),
            ("ReceivedSignalStrength", 31u8.into()),
        ]),
    );
    publisher.take();
    tokio::time::sleep(Duration::from_secs(11)).await;
    settle().await;

    expect_that!(radio.count(SERVING_CELL), eq(3));
    expect_that!(
        modem.projection().signal.current().lte.rssi,
        some(eq(-51.0))
    );
    expect_that!(
        publisher.count(
            |n| matches!(n, Notification::SignalChanged(fields) if fields.contains(&"lte"))
        ),
        eq(1)
    );

    modem.setup_signal(0).await.unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;
    settle().await;
    expect_that!(radio.count(SERVING_CELL), eq(4));
    expect_that!(modem.projection().signal.current().rate, eq(0));
}

#[gtest]
#[tokio::test]
async fn signal_thresholds_are_published() {
    let radio = MockRadio::new();
    monitored_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    modem
        .setup_signal_thresholds(&props([
            ("rssi-threshold", 4u32.into()),
            ("error-rate-threshold", true.into()),
        ]))
        .await
        .unwrap();

    let signal = modem.projection().signal.current();
    expect_that!(signal.rssi_threshold, eq(4));
    expect_that!(signal.error_rate_threshold, eq(true));
    expect_that!(
        modem
            .setup_signal_thresholds(&props([("rssi-threshold", "high".into())]))
            .await,
        err(anything())
    );
    expect_that!(modem.projection().signal.current().rssi_threshold, eq(4));
}

#[gtest]
#[tokio::test]
async fn network_time_reports_are_projected() {
    let radio = MockRadio::new();
    monitored_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;
    expect_that!(modem.projection().time.current().network_time, none());

    radio.network_time_changed(
        MODEM,
        props([
            ("UTC", PropertyValue::Int64(1_700_000_000)),
            ("Timezone", PropertyValue::Int32(7200)),
            ("DST", 1u32.into()),
        ]),
    );
    settle().await;

    let time = modem.projection().time.current();
    expect_that!(time.network_time, some(eq("2023-11-15T00:13:20+02:00")));
    expect_that!(time.offset, some(eq(120)));
    expect_that!(time.dst_offset, some(eq(60)));
    expect_that!(
        publisher.count(|n| matches!(n, Notification::TimeChanged(_))),
        eq(1)
    );
    expect_that!(modem.network_time().await, eq("2023-11-15T00:13:20+02:00"));
}

#[gtest]
#[tokio::test]
async fn network_time_falls_back_to_the_local_clock() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    let time = modem.network_time().await;

    expect_that!(chrono::DateTime::parse_from_rfc3339(&time), ok(anything()));
    expect_that!(radio.count("GetNetworkTime /ril_0 org.ofono.NetworkTime"), eq(0));
}
