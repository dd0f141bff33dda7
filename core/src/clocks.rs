// Forkful
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Collection of clock implementations.
//!
//! All timestamps handed out by these clocks have microsecond resolution because that is the
//! resolution supported by timestamps in the PostgreSQL database, and the SQLite backend stores
//! timestamps as integer microseconds too.

use time::OffsetDateTime;

/// Generic definition of a clock.
pub trait Clock {
    /// Returns the current UTC time.
    fn now_utc(&self) -> OffsetDateTime;
}

/// Truncates `ts` to microsecond resolution.
fn truncate_to_micros(ts: OffsetDateTime) -> OffsetDateTime {
    let nanos = ts.unix_timestamp_nanos() / 1000 * 1000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap_or(ts)
}

/// Clock implementation that uses the system clock.
#[derive(Clone, Default)]
pub struct SystemClock {}

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        truncate_to_micros(OffsetDateTime::now_utc())
    }
}

/// Test utilities.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Builds a UTC timestamp from its components.  All values must be valid.
    pub fn utc_datetime(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> OffsetDateTime {
        let month = time::Month::try_from(month).expect("Hardcoded month must be valid");
        let date = time::Date::from_calendar_date(year, month, day)
            .expect("Hardcoded date must be valid");
        let time =
            time::Time::from_hms(hour, minute, second).expect("Hardcoded time must be valid");
        date.with_time(time).assume_utc()
    }

    /// A clock that returns a monotonically increasing timestamp every time it is queried.
    ///
    /// Every query advances the clock by one second, which guarantees that entities created in
    /// sequence during a test get distinct and ordered timestamps.
    pub struct MonotonicClock {
        /// Current fake time in seconds since the epoch.
        now_secs: AtomicI64,
    }

    impl MonotonicClock {
        /// Creates a new clock whose first query returns `start_secs` since the epoch.
        pub fn new(start_secs: i64) -> Self {
            Self { now_secs: AtomicI64::new(start_secs) }
        }
    }

    impl Clock for MonotonicClock {
        fn now_utc(&self) -> OffsetDateTime {
            let now_secs = self.now_secs.fetch_add(1, Ordering::SeqCst);
            OffsetDateTime::from_unix_timestamp(now_secs).expect("Fake time must be in range")
        }
    }

}
