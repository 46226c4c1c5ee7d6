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
use ofono2mm::modem::bearer::BearerPhase;
use ofono2mm::modem::enums::{IpMethod, PORT_TYPE_NET};
use ofono2mm::modem::notify::Notification;
use ofono2mm::radio::value::PropertyValue;
use std::time::Duration;

static BEARER: &str = "/org/freedesktop/ModemManager1/Bearer/0";
static CONTEXT: &str = "/ril_0/context1";
static ACTIVATE: &str = "SetProperty /ril_0/context1 Active=Bool(true)";

#[gtest]
#[tokio::test]
async fn create_then_delete_round_trip() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    let bearer = modem
        .create_bearer(&props([("apn", "internet.example".into())]))
        .await
        .unwrap();
    expect_that!(bearer.path(), eq(BEARER));
    expect_that!(bearer.context_path(), eq(CONTEXT));
    expect_that!(bearer.properties().apn, eq("internet.example"));
    expect_that!(modem.projection().modem.read(|m| m.bearers.clone()), eq(&vec![BEARER.to_string()]));
    expect_that!(radio.count("AddContext /ril_0 internet"), eq(1));
    expect_that!(
        radio.property(CONTEXT, "org.ofono.ConnectionContext", "AccessPointName"),
        some(eq(&PropertyValue::from("internet.example")))
    );

    modem.delete_bearer(BEARER).await;
    settle().await;
    expect_that!(modem.projection().modem.read(|m| m.bearers.len()), eq(0));
    expect_that!(radio.context_count(), eq(0));
    expect_that!(
        publisher.count(|n| matches!(n, Notification::BearerRemoved(path) if path == BEARER)),
        eq(1)
    );

    // Unknown paths are ignored.
    modem.delete_bearer(BEARER).await;
    expect_that!(radio.count(&format!("RemoveContext /ril_0 {CONTEXT}")), eq(1));
}

#[gtest]
#[tokio::test]
async fn simple_connect_is_idempotent() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;
    let request = props([("apn", "internet.example".into())]);

    let first = modem.simple_connect(&request).await.unwrap();
    let second = modem.simple_connect(&request).await.unwrap();
    settle().await;

    expect_that!(first, eq(BEARER));
    expect_that!(second, eq(BEARER));
    expect_that!(radio.count(ACTIVATE), eq(1));
    expect_that!(radio.count("AddContext /ril_0 internet"), eq(1));
    let bearer = modem.bearer(BEARER).await.unwrap();
    expect_that!(bearer.phase(), eq(BearerPhase::Connected));
    expect_that!(bearer.snapshot().read(|b| b.connected), eq(true));
}

#[gtest]
#[tokio::test(start_paused = true)]
async fn connect_retries_until_the_context_activates() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;
    let bearer = modem
        .create_bearer(&props([("apn", "internet.example".into())]))
        .await
        .unwrap();

    radio.fail("SetProperty Active", 2);
    bearer.connect().await.unwrap();

    expect_that!(radio.count(ACTIVATE), eq(3));
    expect_that!(bearer.is_connected(), eq(true));
}

#[gtest]
#[tokio::test(start_paused = true)]
async fn concurrent_connects_share_one_activation() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;
    let bearer = modem
        .create_bearer(&props([("apn", "internet.example".into())]))
        .await
        .unwrap();

    radio.fail("SetProperty Active", 2);
    let (first, second) = tokio::join!(bearer.connect(), bearer.connect());
    settle().await;

    expect_that!(first, ok(anything()));
    expect_that!(second, ok(anything()));
    expect_that!(radio.count(ACTIVATE), eq(3));
    expect_that!(bearer.phase(), eq(BearerPhase::Connected));
    expect_that!(
        publisher.count(|n| matches!(
            n,
            Notification::BearerChanged { changed, .. } if changed.contains(&"connected")
        )),
        eq(1)
    );
}

#[gtest]
#[tokio::test(start_paused = true)]
async fn disconnect_wins_over_a_late_activation_reply() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;
    let bearer = modem
        .create_bearer(&props([("apn", "internet.example".into())]))
        .await
        .unwrap();

    radio.delay_reply("SetProperty Active", Duration::from_secs(5));
    let connecting = tokio::spawn({
        let bearer = bearer.clone();
        async move { bearer.connect().await }
    });
    wait_until(|| radio.count(ACTIVATE) == 1).await;

    bearer.disconnect().await.unwrap();
    connecting.await.unwrap().unwrap();
    settle().await;

    expect_that!(bearer.phase(), eq(BearerPhase::Disconnected));
    expect_that!(bearer.wants_connection(), eq(false));
    expect_that!(bearer.snapshot().read(|b| b.connected), eq(false));
    expect_that!(
        radio.property(CONTEXT, "org.ofono.ConnectionContext", "Active"),
        some(eq(&PropertyValue::from(false)))
    );
}

#[gtest]
#[tokio::test]
async fn refused_deactivation_is_reported() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;
    modem
        .simple_connect(&props([("apn", "internet.example".into())]))
        .await
        .unwrap();
    let bearer = modem.bearer(BEARER).await.unwrap();

    radio.fail("SetProperty Active", 1);
    expect_that!(
        bearer.disconnect().await,
        err(displays_as(contains_substring("BridgeError::Radio")))
    );
    expect_that!(bearer.phase(), eq(BearerPhase::Disconnecting));
    expect_that!(bearer.snapshot().read(|b| b.connected), eq(true));

    bearer.disconnect().await.unwrap();
    settle().await;
    expect_that!(bearer.phase(), eq(BearerPhase::Disconnected));
    expect_that!(bearer.snapshot().read(|b| b.connected), eq(false));
}

#[gtest]
#[tokio::test]
async fn unconfigurable_new_context_is_removed_again() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    radio.fail("SetProperty AccessPointName", 1);
    expect_that!(
        modem
            .create_bearer(&props([("apn", "internet.example".into())]))
            .await,
        err(displays_as(contains_substring("BridgeError::Radio")))
    );
    settle().await;

    expect_that!(radio.count(&format!("RemoveContext /ril_0 {CONTEXT}")), eq(1));
    expect_that!(radio.context_count(), eq(0));
    expect_that!(modem.projection().modem.read(|m| m.bearers.len()), eq(0));
}

#[gtest]
#[tokio::test(start_paused = true)]
async fn bounded_connect_gives_up() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let mut settings = test_settings();
    settings.connect_max_attempts = Some(3);
    let modem = start_modem(&radio, &publisher, &settings).await;
    let bearer = modem
        .create_bearer(&props([("apn", "internet.example".into())]))
        .await
        .unwrap();

    radio.fail("SetProperty Active", u32::MAX);
    expect_that!(
        bearer.connect().await,
        err(displays_as(contains_substring("BridgeError::RetriesExhausted")))
    );
    expect_that!(radio.count(ACTIVATE), eq(3));
    expect_that!(bearer.phase(), eq(BearerPhase::Disconnected));
}

#[gtest]
#[tokio::test(start_paused = true)]
async fn disconnect_cancels_a_pending_reconnect() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;
    modem
        .simple_connect(&props([("apn", "internet.example".into())]))
        .await
        .unwrap();
    let bearer = modem.bearer(BEARER).await.unwrap();

    // The network drops the link and the radio refuses to bring it back.
    radio.fail("SetProperty Active", u32::MAX);
    radio.change(CONTEXT, "org.ofono.ConnectionContext", "Active", false.into());
    wait_until(|| bearer.phase() == BearerPhase::Reconnecting).await;
    expect_that!(bearer.has_pending_reconnect(), eq(true));

    radio.heal("SetProperty Active");
    modem.simple_disconnect(BEARER).await.unwrap();
    expect_that!(bearer.phase(), eq(BearerPhase::Disconnected));
    expect_that!(bearer.has_pending_reconnect(), eq(false));

    let attempts = radio.count(ACTIVATE);
    tokio::time::sleep(Duration::from_secs(30)).await;
    expect_that!(radio.count(ACTIVATE), eq(attempts));
    expect_that!(bearer.snapshot().read(|b| b.connected), eq(false));
}

#[gtest]
#[tokio::test(start_paused = true)]
async fn dropped_link_is_reconnected() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;
    modem
        .simple_connect(&props([("apn", "internet.example".into())]))
        .await
        .unwrap();
    let bearer = modem.bearer(BEARER).await.unwrap();

    radio.change(CONTEXT, "org.ofono.ConnectionContext", "Active", false.into());
    wait_until(|| radio.count(ACTIVATE) == 2).await;
    wait_until(|| !bearer.has_pending_reconnect()).await;
    expect_that!(bearer.phase(), eq(BearerPhase::Connected));
}

#[gtest]
#[tokio::test]
async fn existing_context_is_bound_at_start() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let settings = props([
        ("Interface", "rmnet_data0".into()),
        ("Method", "static".into()),
        ("Address", "10.0.0.2".into()),
        ("Netmask", "255.255.255.0".into()),
        ("Gateway", "10.0.0.1".into()),
        ("DomainNameServers", vec!["10.0.0.53"].into()),
    ]);
    radio.seed_context(
        MODEM,
        "/ril_0/context9",
        props([
            ("Type", "internet".into()),
            ("Active", true.into()),
            ("AccessPointName", "internet.example".into()),
            ("Settings", settings.into()),
        ]),
    );
    radio.seed_context(
        MODEM,
        "/ril_0/context10",
        props([("Type", "mms".into()), ("Active", false.into())]),
    );
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    let snapshot = modem.projection().modem.current();
    expect_that!(snapshot.bearers, eq(&vec![BEARER.to_string()]));
    expect_that!(
        snapshot.ports,
        eq(&vec![("rmnet_data0".to_string(), PORT_TYPE_NET)])
    );
    let bearer = modem.bearer(BEARER).await.unwrap();
    expect_that!(bearer.is_connected(), eq(true));
    let ip4 = bearer.snapshot().read(|b| b.ip4_config.clone());
    expect_that!(ip4.method, eq(IpMethod::Static));
    expect_that!(ip4.address.as_deref(), some(eq("10.0.0.2")));
    expect_that!(ip4.prefix, some(eq(24)));
    expect_that!(ip4.dns, eq(&vec!["10.0.0.53".to_string()]));
}

#[gtest]
#[tokio::test]
async fn context_removed_by_ofono_removes_the_bearer() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;
    modem
        .create_bearer(&props([("apn", "internet.example".into())]))
        .await
        .unwrap();

    radio.drop_context(MODEM, CONTEXT);
    wait_until(|| modem.projection().modem.read(|m| m.bearers.is_empty())).await;
    expect_that!(modem.bearer(BEARER).await, none());
}

#[gtest]
#[tokio::test]
async fn bearers_need_a_connection_manager() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;
    radio.set_interfaces(MODEM, &["org.ofono.SimManager", "org.ofono.NetworkRegistration"]);
    settle().await;

    expect_that!(
        modem
            .create_bearer(&props([("apn", "internet.example".into())]))
            .await,
        err(displays_as(contains_substring("BridgeError::CapabilityAbsent")))
    );
}
