// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Simulation timestamps
//!
//! All frame timing is carried as microseconds since the Unix epoch. The
//! scheduler that drives the simulation supplies `now`; nothing in the core
//! reads the clock on its own.

use std::time::{SystemTime, UNIX_EPOCH};

/// Microseconds since the Unix epoch
pub type Timestamp = u64;

/// Expiry value of an entity that never dies of old age
pub const IMMORTAL: Timestamp = u64::MAX;

/// Number of microseconds in one second
pub const USECS_PER_SECOND: u64 = 1_000_000;

/// Current wall-clock time in microseconds
pub fn usec_timestamp_now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as Timestamp)
        .unwrap_or(0)
}

/// Convert a microsecond interval to seconds
pub fn usecs_to_seconds(usecs: u64) -> f64 {
    usecs as f64 / USECS_PER_SECOND as f64
}

/// Convert seconds to a microsecond interval, saturating on overflow
pub fn seconds_to_usecs(seconds: f64) -> u64 {
    if seconds <= 0.0 || !seconds.is_finite() {
        return if seconds == f64::INFINITY { u64::MAX } else { 0 };
    }
    let usecs = seconds * USECS_PER_SECOND as f64;
    if usecs >= u64::MAX as f64 {
        u64::MAX
    } else {
        usecs as u64
    }
}

/// Seconds elapsed from `since` to `now`, zero if the clock went backwards
pub fn elapsed_seconds(since: Timestamp, now: Timestamp) -> f64 {
    usecs_to_seconds(now.saturating_sub(since))
}
