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
use ofono2mm::modem::enums::{SmsPduType, SmsState};
use ofono2mm::modem::notify::Notification;
use rstest::*;

static SMS: &str = "/org/freedesktop/ModemManager1/SMS/0";

#[gtest]
#[tokio::test]
async fn created_message_is_sent_right_away() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    let sms = modem
        .create_sms(&props([
            ("number", "+491701234567".into()),
            ("text", "hello".into()),
        ]))
        .await
        .unwrap();

    expect_that!(sms.path(), eq(SMS));
    expect_that!(radio.count("SendMessage /ril_0 +491701234567 hello"), eq(1));
    let snapshot = sms.snapshot().current();
    expect_that!(snapshot.state, eq(SmsState::Sent));
    expect_that!(snapshot.pdu_type, eq(SmsPduType::Submit));
    expect_that!(
        publisher.count(|n| matches!(n, Notification::MessageAdded { received: false, .. })),
        eq(1)
    );
    expect_that!(modem.projection().modem.read(|m| m.messages.clone()), eq(&vec![SMS.to_string()]));
}

#[gtest]
#[tokio::test]
async fn failed_send_keeps_the_message_for_a_retry() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;
    radio.fail("SendMessage", 1);

    let sms = modem
        .create_sms(&props([
            ("number", "+491701234567".into()),
            ("text", "hello".into()),
        ]))
        .await
        .unwrap();
    expect_that!(sms.snapshot().read(|s| s.state), eq(SmsState::Stored));

    sms.send().await.unwrap();
    expect_that!(sms.snapshot().read(|s| s.state), eq(SmsState::Sent));
    expect_that!(radio.count("SendMessage /ril_0 +491701234567 hello"), eq(2));
}

#[gtest]
#[tokio::test]
#[rstest]
#[case::no_number(props([("text", "hello".into())]))]
#[case::empty_number(props([("number", "".into()), ("text", "hello".into())]))]
#[case::no_text(props([("number", "+491701234567".into())]))]
async fn incomplete_requests_are_rejected(
    #[case] request: ofono2mm::radio::value::PropertyMap,
) {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    expect_that!(
        modem.create_sms(&request).await,
        err(displays_as(contains_substring("BridgeError::Argument")))
    );
    expect_that!(modem.projection().modem.read(|m| m.messages.len()), eq(0));
}

#[gtest]
#[tokio::test]
async fn incoming_message_is_exported_as_received() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;

    radio.incoming_message(MODEM, "see you at eight", "+4930123456");
    wait_until(|| modem.projection().modem.read(|m| !m.messages.is_empty())).await;

    let sms = modem.sms(SMS).await.unwrap();
    let snapshot = sms.snapshot().current();
    expect_that!(snapshot.state, eq(SmsState::Received));
    expect_that!(snapshot.pdu_type, eq(SmsPduType::Deliver));
    expect_that!(snapshot.number, eq("+4930123456"));
    expect_that!(snapshot.text, eq("see you at eight"));
    expect_that!(snapshot.timestamp, eq("2025-03-01T10:00:00+0100"));
    expect_that!(
        publisher.count(|n| matches!(n, Notification::MessageAdded { received: true, .. })),
        eq(1)
    );
    expect_that!(
        sms.send().await,
        err(displays_as(contains_substring("BridgeError::Argument")))
    );
}

#[gtest]
#[tokio::test]
async fn deleted_message_is_withdrawn() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;
    radio.incoming_message(MODEM, "hello", "+4930123456");
    wait_until(|| modem.projection().modem.read(|m| !m.messages.is_empty())).await;

    modem.delete_sms(SMS).await;

    expect_that!(modem.sms(SMS).await, none());
    expect_that!(modem.projection().modem.read(|m| m.messages.len()), eq(0));
    expect_that!(
        publisher.count(|n| matches!(n, Notification::MessageRemoved(path) if path == SMS)),
        eq(1)
    );
}

#[gtest]
#[tokio::test]
async fn without_message_manager_the_message_stays_stored() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let publisher = RecordingPublisher::new();
    let modem = start_modem(&radio, &publisher, &test_settings()).await;
    radio.set_interfaces(MODEM, &["org.ofono.SimManager", "org.ofono.NetworkRegistration"]);
    settle().await;

    let sms = modem
        .create_sms(&props([
            ("number", "+491701234567".into()),
            ("text", "hello".into()),
        ]))
        .await
        .unwrap();

    expect_that!(sms.snapshot().read(|s| s.state), eq(SmsState::Stored));
    expect_that!(radio.log().iter().any(|e| e.starts_with("SendMessage")), eq(false));
}
