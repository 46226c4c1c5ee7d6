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
use crate::common::{MODEM, RecordingPublisher, registered_modem, test_settings, wait_until};
use async_trait::async_trait;
use googletest::prelude::*;
use ofono2mm::config::Settings;
use ofono2mm::discovery::{Discovery, ModemExporter};
use ofono2mm::error::BridgeError;
use ofono2mm::modem::Modem;
use ofono2mm::modem::notify::Publisher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Keeps the exported ModemManager paths instead of serving them.
#[derive(Default)]
struct RecordingExporter {
    exported: Mutex<Vec<String>>,
    unexported: Mutex<Vec<String>>,
    refuse: AtomicBool,
}

impl RecordingExporter {
    fn exported(&self) -> Vec<String> {
        self.exported.lock().unwrap().clone()
    }

    fn unexported(&self) -> Vec<String> {
        self.unexported.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModemExporter for RecordingExporter {
    fn publisher(&self, _index: u32) -> Arc<dyn Publisher> {
        RecordingPublisher::new()
    }

    async fn export(&self, modem: &Arc<Modem>) -> Result<(), BridgeError> {
        if self.refuse.load(Ordering::Relaxed) {
            return Err(BridgeError::Internal("export refused".into()));
        }
        self.exported.lock().unwrap().push(modem.path().to_string());
        Ok(())
    }

    async fn unexport(&self, modem: &Modem) {
        self.unexported.lock().unwrap().push(modem.path().to_string());
    }
}

fn discovery(
    radio: &Arc<MockRadio>,
    settings: Settings,
) -> (Arc<Discovery>, Arc<RecordingExporter>) {
    let exporter = Arc::new(RecordingExporter::default());
    let discovery = Discovery::new(radio.clone(), exporter.clone(), settings);
    (discovery, exporter)
}

fn radio_paths(discovery: &Discovery) -> Vec<String> {
    discovery
        .modems()
        .iter()
        .map(|modem| modem.radio_path().to_string())
        .collect()
}

#[gtest]
#[tokio::test]
async fn rescan_exports_known_modems_once() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let (discovery, exporter) = discovery(&radio, test_settings());

    discovery.rescan().await.unwrap();
    discovery.rescan().await.unwrap();

    expect_that!(
        exporter.exported(),
        eq(&vec!["/org/freedesktop/ModemManager1/Modem/0".to_string()])
    );
    expect_that!(radio_paths(&discovery), eq(&vec![MODEM.to_string()]));
}

#[gtest]
#[tokio::test]
async fn rescan_withdraws_modems_that_left() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    radio.add_modem("/ril_1", radio.modem_properties(MODEM));
    let (discovery, exporter) = discovery(&radio, test_settings());
    discovery.rescan().await.unwrap();
    expect_that!(discovery.modems().len(), eq(2));

    radio.withdraw_modem("/ril_1");
    discovery.rescan().await.unwrap();

    expect_that!(radio_paths(&discovery), eq(&vec![MODEM.to_string()]));
    expect_that!(
        exporter.unexported(),
        eq(&vec!["/org/freedesktop/ModemManager1/Modem/1".to_string()])
    );
}

#[gtest]
#[tokio::test]
async fn modems_outside_the_prefix_are_ignored() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    radio.add_modem("/hfp/org/bluez/hci0/dev_00_11_22_33_44_55", Default::default());
    let mut settings = test_settings();
    settings.modem_path_prefix = "/ril_".into();
    let (discovery, exporter) = discovery(&radio, settings);

    discovery.rescan().await.unwrap();

    expect_that!(radio_paths(&discovery), eq(&vec![MODEM.to_string()]));
    expect_that!(exporter.exported().len(), eq(1));
}

#[gtest]
#[tokio::test]
async fn refused_export_leaves_no_modem_behind() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let (discovery, exporter) = discovery(&radio, test_settings());
    exporter.refuse.store(true, Ordering::Relaxed);

    discovery.rescan().await.unwrap();

    expect_that!(discovery.modems().len(), eq(0));
}

#[gtest]
#[tokio::test(start_paused = true)]
async fn listing_modems_is_retried() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    radio.fail("GetModems", 2);
    let (discovery, exporter) = discovery(&radio, test_settings());

    discovery.rescan().await.unwrap();

    expect_that!(radio.count("GetModems"), eq(3));
    expect_that!(exporter.exported().len(), eq(1));
}

#[gtest]
#[tokio::test]
async fn follows_the_ofono_manager() {
    let radio = MockRadio::new();
    registered_modem(&radio);
    let (discovery, exporter) = discovery(&radio, test_settings());
    tokio::spawn(discovery.clone().run());
    wait_until(|| discovery.modems().len() == 1).await;

    radio.announce_modem("/ril_1", radio.modem_properties(MODEM));
    wait_until(|| discovery.modems().len() == 2).await;
    expect_that!(
        exporter.exported(),
        eq(&vec![
            "/org/freedesktop/ModemManager1/Modem/0".to_string(),
            "/org/freedesktop/ModemManager1/Modem/1".to_string(),
        ])
    );

    radio.withdraw_modem("/ril_1");
    wait_until(|| discovery.modems().len() == 1).await;

    radio.vanish();
    wait_until(|| discovery.modems().is_empty()).await;
    expect_that!(exporter.unexported().len(), eq(2));

    // A modem keeps no path across an oFono restart.
    radio.appear();
    wait_until(|| discovery.modems().len() == 1).await;
    expect_that!(
        discovery.modems()[0].path(),
        eq("/org/freedesktop/ModemManager1/Modem/2")
    );
}
