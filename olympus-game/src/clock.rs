//! Pause-aware temporal model.
//!
//! Every subsystem resolves "now" through [`ClockState::effective_now`] so that
//! day and week arithmetic stays consistent with the pause guarantee: time
//! spent paused never counts toward gaps, thresholds, or expiries.
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::SIMULATED_HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SystemState {
    #[default]
    Active,
    Paused,
}

impl SystemState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
        }
    }

    #[must_use]
    pub const fn is_paused(self) -> bool {
        matches!(self, Self::Paused)
    }
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted clock fields.
///
/// `pause_start_time` is `Some` exactly when `system_state` is
/// [`SystemState::Paused`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClockState {
    pub system_state: SystemState,
    pub pause_start_time: Option<DateTime<Utc>>,
    /// Accumulated paused time in milliseconds.
    pub total_paused_ms: i64,
    pub simulated_date: Option<NaiveDate>,
}

impl ClockState {
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.system_state.is_paused()
    }

    #[must_use]
    pub fn total_paused(&self) -> Duration {
        Duration::milliseconds(self.total_paused_ms)
    }

    /// Resolve the engine's notion of "now" from the real wall-clock instant.
    #[must_use]
    pub fn effective_now(&self, real_now: DateTime<Utc>) -> DateTime<Utc> {
        if let Some(date) = self.simulated_date {
            return simulated_instant(date);
        }
        if self.is_paused()
            && let Some(start) = self.pause_start_time
        {
            return start;
        }
        real_now - self.total_paused()
    }

    #[must_use]
    pub fn effective_today(&self, real_now: DateTime<Utc>) -> NaiveDate {
        self.effective_now(real_now).date_naive()
    }

    /// Flip between active and paused, returning the new state.
    pub fn toggle(&mut self, real_now: DateTime<Utc>) -> SystemState {
        match self.system_state {
            SystemState::Active => {
                self.system_state = SystemState::Paused;
                self.pause_start_time = Some(real_now);
            }
            SystemState::Paused => {
                if let Some(start) = self.pause_start_time.take() {
                    let paused = (real_now - start).num_milliseconds().max(0);
                    self.total_paused_ms = self.total_paused_ms.saturating_add(paused);
                }
                self.system_state = SystemState::Active;
            }
        }
        self.system_state
    }

    /// Developer override pinning "today" to a fixed date. `None` clears it.
    pub fn set_simulated_date(&mut self, date: Option<NaiveDate>) {
        self.simulated_date = date;
    }

    /// Restore the pause invariant after loading a hand-edited document.
    pub fn normalize(&mut self, real_now: DateTime<Utc>) {
        match (self.system_state, self.pause_start_time) {
            (SystemState::Paused, None) => self.pause_start_time = Some(real_now),
            (SystemState::Active, Some(_)) => self.pause_start_time = None,
            _ => {}
        }
        self.total_paused_ms = self.total_paused_ms.max(0);
    }
}

fn simulated_instant(date: NaiveDate) -> DateTime<Utc> {
    let noon = NaiveTime::from_hms_opt(SIMULATED_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(noon))
}

/// Monday of the ISO week containing `date`.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Stable key for the ISO week containing `date`, e.g. `2026-W42`.
#[must_use]
pub fn week_key(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

/// Signed whole days from `from` to `to`.
#[must_use]
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Parse a note-store date string. Accepts `YYYY-MM-DD`, optionally followed
/// by a time component.
#[must_use]
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
