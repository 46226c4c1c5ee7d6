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

use crate::config::Settings;
use crate::error::BridgeError;
use log::warn;
use std::future::Future;
use std::time::Duration;

/// Fixed-delay retry used for the bearer connect operation and for modem discovery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub delay: Duration,
    /// `None` keeps trying until the operation succeeds or fails with a non-retryable error.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn new(delay: Duration, max_attempts: Option<u32>) -> Self {
        RetryPolicy {
            delay,
            max_attempts,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        RetryPolicy::new(settings.connect_retry_delay, settings.connect_max_attempts)
    }

    /// Run `attempt` until it succeeds. The closure receives the 1-based attempt number.
    ///
    /// Errors for which [`BridgeError::is_retryable`] is false end the loop at once and are
    /// returned unchanged. When the configured attempt count runs out, the last error is wrapped
    /// in [`BridgeError::RetriesExhausted`].
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, BridgeError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, BridgeError>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let e = match attempt(attempts).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };
            if self.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(BridgeError::RetriesExhausted {
                    attempts,
                    delay: self.delay,
                    last: Box::new(e),
                });
            }
            warn!(
                "{operation} attempt {attempts} failed: {e}. Retrying in {:?}",
                self.delay
            );
            tokio::time::sleep(self.delay).await;
        }
    }
}
