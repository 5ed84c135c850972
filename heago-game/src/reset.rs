//! Daily reset scheduler.
//!
//! Dailies are unchecked once per local calendar day. A gap of several days
//! collapses into one reset; streaks and history are never touched here.
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use log::info;

use crate::constants::MAX_RESET_CHECK_SECS;
use crate::state::SaveState;

/// Result of a reset check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetOutcome {
    pub reset: bool,
    /// Dailies that were checked and are now cleared.
    pub cleared: usize,
}

/// Whether `now` falls on a different local calendar day than the last reset.
#[must_use]
pub fn needs_daily_reset<Tz: TimeZone>(state: &SaveState, now: &DateTime<Tz>) -> bool {
    let last = state.last_reset.with_timezone(&now.timezone()).date_naive();
    last != now.date_naive()
}

/// Clear every daily's `done` flag if the calendar day changed since the last reset.
pub fn run_daily_reset<Tz: TimeZone>(state: &mut SaveState, now: &DateTime<Tz>) -> ResetOutcome {
    if !needs_daily_reset(state, now) {
        return ResetOutcome::default();
    }
    let mut cleared = 0;
    for daily in &mut state.dailies {
        if daily.done {
            cleared += 1;
        }
        daily.done = false;
    }
    state.last_reset = now.with_timezone(&Utc);
    info!("daily reset for {}: {cleared} dailies cleared", now.date_naive());
    ResetOutcome {
        reset: true,
        cleared,
    }
}

/// Cooperative interval for re-checking the reset while a session stays open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetSchedule {
    interval: TimeDelta,
    next_check: Option<DateTime<Utc>>,
}

impl ResetSchedule {
    /// Check every `interval`, kept between one second and one day.
    #[must_use]
    pub fn every(interval: TimeDelta) -> Self {
        let longest = TimeDelta::seconds(i64::try_from(MAX_RESET_CHECK_SECS).unwrap_or(i64::MAX));
        Self {
            interval: interval.clamp(TimeDelta::seconds(1), longest),
            next_check: None,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> TimeDelta {
        self.interval
    }

    #[must_use]
    pub fn is_due<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.next_check
            .is_none_or(|next| now.with_timezone(&Utc) >= next)
    }

    /// Run the reset if the interval elapsed; otherwise do nothing.
    pub fn poll<Tz: TimeZone>(&mut self, state: &mut SaveState, now: &DateTime<Tz>) -> ResetOutcome {
        if !self.is_due(now) {
            return ResetOutcome::default();
        }
        // Past the end of representable time there is nothing left to schedule.
        self.next_check = now.with_timezone(&Utc).checked_add_signed(self.interval);
        if self.next_check.is_none() {
            self.next_check = Some(DateTime::<Utc>::MAX_UTC);
        }
        run_daily_reset(state, now)
    }
}
