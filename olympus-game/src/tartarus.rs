//! Death-threshold tracking and the Tartarus penalty state.
use chrono::{Days, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use twox_hash::XxHash64;

use crate::activity::{ActivityDescriptor, total_weekly_target};
use crate::clock::days_between;
use crate::constants::{
    HADES_WRATH_AFTER_DAYS, MAX_FAILED_THRESHOLD_DAYS, PENANCE_LOW_MAX_TIER, PENANCE_MID_MAX_TIER,
    PENANCE_SEED_DOMAIN, PENANCE_TASKS_HIGH, PENANCE_TASKS_LOW, PENANCE_TASKS_MID,
    THRESHOLD_REQUIRED_RATIO, THRESHOLD_WINDOW_DAYS, TOKEN_COST_ESCAPE, TOKEN_COST_SKIP_TASK,
};
use crate::ledger::ActivitySnapshot;
use crate::numbers::{ceil_f64_to_u32, usize_to_u32};

const LOW_BAND_POOL: [&str; 5] = [
    "Write one sentence about why the streak slipped",
    "Drink a full glass of water",
    "Tidy your workspace for five minutes",
    "Take a ten-minute walk",
    "Plan tomorrow's first task",
];

const MID_BAND_POOL: [&str; 6] = [
    "Complete a 20-minute focused work block",
    "Do 20 push-ups or an equivalent exercise",
    "Journal a page about what is blocking you",
    "Go to bed before midnight",
    "Clear your message backlog",
    "Prepare a proper meal",
];

const HIGH_BAND_POOL: [&str; 7] = [
    "Complete a 45-minute deep work session",
    "Exercise for 30 minutes",
    "Spend an hour without your phone",
    "Write a full weekly review",
    "Finish one task you have been avoiding",
    "Wake up at your target time",
    "Meditate for 15 minutes",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PenanceBand {
    #[default]
    Low,
    Mid,
    High,
}

impl PenanceBand {
    #[must_use]
    pub const fn for_tier(tier: u8) -> Self {
        if tier <= PENANCE_LOW_MAX_TIER {
            Self::Low
        } else if tier <= PENANCE_MID_MAX_TIER {
            Self::Mid
        } else {
            Self::High
        }
    }

    #[must_use]
    pub const fn required_tasks(self) -> usize {
        match self {
            Self::Low => PENANCE_TASKS_LOW,
            Self::Mid => PENANCE_TASKS_MID,
            Self::High => PENANCE_TASKS_HIGH,
        }
    }

    #[must_use]
    pub const fn pool(self) -> &'static [&'static str] {
        match self {
            Self::Low => &LOW_BAND_POOL,
            Self::Mid => &MID_BAND_POOL,
            Self::High => &HIGH_BAND_POOL,
        }
    }
}

impl fmt::Display for PenanceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Mid => "mid",
            Self::High => "high",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenanceTask {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TartarusState {
    pub in_tartarus: bool,
    pub tartarus_start_date: Option<NaiveDate>,
    pub penance_band: PenanceBand,
    pub penance_tasks: Vec<PenanceTask>,
    pub failed_threshold_days: u8,
    pub hades_wrath_applied: bool,
    /// Effective day the last failed threshold check was counted.
    #[serde(alias = "last_threshold_check")]
    pub last_failed_day: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ThresholdCheck {
    /// Not evaluated: paused or in Tartarus.
    Skipped,
    Passed { required: u32, actual: u32 },
    /// Threshold missed and counted as a new failed day.
    Failed {
        required: u32,
        actual: u32,
        failed_days: u8,
    },
    /// Threshold missed again on a day that was already counted.
    StillFailing {
        required: u32,
        actual: u32,
        failed_days: u8,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscapeMethod {
    Penance,
    Tokens,
}

impl fmt::Display for EscapeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Penance => "penance",
            Self::Tokens => "tokens",
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TartarusError {
    #[error("not in Tartarus")]
    NotInTartarus,
    #[error("already in Tartarus")]
    AlreadyInTartarus,
    #[error("no penance task with id {0}")]
    UnknownTask(String),
    #[error("penance task {0} is already complete")]
    TaskAlreadyComplete(String),
    #[error("need {need} discipline tokens (have {have})")]
    InsufficientTokens { have: u8, need: u8 },
    #[error("penance incomplete: {completed} of {required} tasks done")]
    PenanceIncomplete { completed: usize, required: usize },
}

/// Completions required across the trailing window:
/// ten percent of the enabled weekly targets, rounded up.
#[must_use]
pub fn required_completions(activities: &[ActivityDescriptor]) -> u32 {
    let total = f64::from(total_weekly_target(activities));
    ceil_f64_to_u32(total * THRESHOLD_REQUIRED_RATIO)
}

/// Completions across enabled activities in `[today - 2, today]`.
#[must_use]
pub fn recent_completions(snapshots: &[ActivitySnapshot], today: NaiveDate) -> u32 {
    let back = u64::try_from(THRESHOLD_WINDOW_DAYS - 1).unwrap_or(0);
    let from = today.checked_sub_days(Days::new(back)).unwrap_or(today);
    snapshots
        .iter()
        .filter(|s| s.descriptor.enabled)
        .map(|s| s.completions_between(from, today))
        .fold(0_u32, u32::saturating_add)
}

/// Deterministic penance list for a visit starting on `start` at `tier`.
#[must_use]
pub fn generate_penance(tier: u8, start: NaiveDate) -> (PenanceBand, Vec<PenanceTask>) {
    let band = PenanceBand::for_tier(tier);
    let seed_input = format!("{start}:{tier}");
    let seed = XxHash64::oneshot(PENANCE_SEED_DOMAIN, seed_input.as_bytes());
    let mut rng = ChaCha20Rng::seed_from_u64(seed);

    let mut pool: Vec<&str> = band.pool().to_vec();
    let count = band.required_tasks().min(pool.len());
    let tasks = (1..=count)
        .map(|n| {
            let pick = rng.random_range(0..pool.len());
            PenanceTask {
                id: format!("penance-{n}"),
                description: pool.swap_remove(pick).to_string(),
                completed: false,
            }
        })
        .collect();
    (band, tasks)
}

impl TartarusState {
    /// Evaluate the trailing-window activity threshold. A miss counts at
    /// most once per effective day; a pass always clears the counter.
    pub fn check_death_threshold(
        &mut self,
        activities: &[ActivityDescriptor],
        snapshots: &[ActivitySnapshot],
        today: NaiveDate,
        paused: bool,
    ) -> ThresholdCheck {
        if paused || self.in_tartarus {
            return ThresholdCheck::Skipped;
        }
        let required = required_completions(activities);
        let actual = recent_completions(snapshots, today);
        if actual >= required {
            if self.failed_threshold_days > 0 {
                log::info!("death threshold recovered ({actual}/{required})");
            }
            self.failed_threshold_days = 0;
            self.last_failed_day = None;
            return ThresholdCheck::Passed { required, actual };
        }
        if self.last_failed_day == Some(today) {
            return ThresholdCheck::StillFailing {
                required,
                actual,
                failed_days: self.failed_threshold_days,
            };
        }
        self.last_failed_day = Some(today);
        self.failed_threshold_days = self
            .failed_threshold_days
            .saturating_add(1)
            .min(MAX_FAILED_THRESHOLD_DAYS);
        log::info!(
            "death threshold missed ({actual}/{required}), {} failed days",
            self.failed_threshold_days
        );
        ThresholdCheck::Failed {
            required,
            actual,
            failed_days: self.failed_threshold_days,
        }
    }

    /// Advisory countdown shown to the player.
    #[must_use]
    pub fn days_until_tartarus(&self) -> u8 {
        MAX_FAILED_THRESHOLD_DAYS.saturating_sub(self.failed_threshold_days)
    }

    #[must_use]
    pub fn threshold_breached(&self) -> bool {
        self.failed_threshold_days >= MAX_FAILED_THRESHOLD_DAYS
    }

    /// Enter Tartarus. Boss HP refill is handled by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`TartarusError::AlreadyInTartarus`] on re-entry.
    pub fn enter(&mut self, tier: u8, today: NaiveDate) -> Result<&[PenanceTask], TartarusError> {
        if self.in_tartarus {
            return Err(TartarusError::AlreadyInTartarus);
        }
        self.in_tartarus = true;
        self.tartarus_start_date = Some(today);
        self.failed_threshold_days = 0;
        self.last_failed_day = None;
        self.hades_wrath_applied = false;
        self.penance_tasks.clear();
        self.assign_penance(tier);
        Ok(&self.penance_tasks)
    }

    /// Fill an empty penance list for the current visit.
    pub fn assign_penance(&mut self, tier: u8) {
        let start = self.tartarus_start_date.unwrap_or_default();
        let (band, tasks) = generate_penance(tier, start);
        self.penance_band = band;
        self.penance_tasks = tasks;
    }

    #[must_use]
    pub fn days_in_tartarus(&self, today: NaiveDate) -> i64 {
        self.tartarus_start_date
            .map_or(0, |start| days_between(start, today).max(0))
    }

    #[must_use]
    pub fn completed_tasks(&self) -> usize {
        self.penance_tasks.iter().filter(|t| t.completed).count()
    }

    /// Tasks that must be complete to walk out: the whole list, which only
    /// exceeds the band count after Wrath.
    #[must_use]
    pub fn required_tasks(&self) -> usize {
        self.penance_tasks
            .len()
            .max(self.penance_band.required_tasks())
    }

    #[must_use]
    pub fn can_escape(&self) -> bool {
        self.in_tartarus && self.completed_tasks() >= self.required_tasks()
    }

    fn task_mut(&mut self, id: &str) -> Result<&mut PenanceTask, TartarusError> {
        if !self.in_tartarus {
            return Err(TartarusError::NotInTartarus);
        }
        let task = self
            .penance_tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TartarusError::UnknownTask(id.to_string()))?;
        if task.completed {
            return Err(TartarusError::TaskAlreadyComplete(id.to_string()));
        }
        Ok(task)
    }

    /// Mark a penance task done.
    ///
    /// # Errors
    ///
    /// Fails outside Tartarus, for unknown ids, or for finished tasks.
    pub fn complete_task(&mut self, id: &str) -> Result<(), TartarusError> {
        self.task_mut(id)?.completed = true;
        Ok(())
    }

    /// Spend one discipline token to mark a task done.
    ///
    /// # Errors
    ///
    /// Fails like [`complete_task`](Self::complete_task), or when no token is
    /// available. Tokens are only spent on success.
    pub fn skip_task(&mut self, id: &str, tokens: &mut u8) -> Result<(), TartarusError> {
        let have = *tokens;
        let task = self.task_mut(id)?;
        if have < TOKEN_COST_SKIP_TASK {
            return Err(TartarusError::InsufficientTokens {
                have,
                need: TOKEN_COST_SKIP_TASK,
            });
        }
        task.completed = true;
        *tokens = have - TOKEN_COST_SKIP_TASK;
        Ok(())
    }

    /// Leave Tartarus, either by finished penance or by spending tokens.
    ///
    /// # Errors
    ///
    /// Fails outside Tartarus, with unfinished penance, or without enough
    /// tokens.
    pub fn escape(&mut self, method: EscapeMethod, tokens: &mut u8) -> Result<(), TartarusError> {
        if !self.in_tartarus {
            return Err(TartarusError::NotInTartarus);
        }
        match method {
            EscapeMethod::Penance => {
                if !self.can_escape() {
                    return Err(TartarusError::PenanceIncomplete {
                        completed: self.completed_tasks(),
                        required: self.required_tasks(),
                    });
                }
            }
            EscapeMethod::Tokens => {
                if *tokens < TOKEN_COST_ESCAPE {
                    return Err(TartarusError::InsufficientTokens {
                        have: *tokens,
                        need: TOKEN_COST_ESCAPE,
                    });
                }
                *tokens -= TOKEN_COST_ESCAPE;
            }
        }
        self.in_tartarus = false;
        self.tartarus_start_date = None;
        self.penance_tasks.clear();
        self.hades_wrath_applied = false;
        log::info!("escaped Tartarus via {method}");
        Ok(())
    }

    /// One-time escalation: after three days with penance unfinished, every
    /// incomplete task is duplicated. Returns the number of tasks added.
    pub fn apply_hades_wrath(&mut self, today: NaiveDate, paused: bool) -> Option<usize> {
        if paused
            || !self.in_tartarus
            || self.hades_wrath_applied
            || self.days_in_tartarus(today) < HADES_WRATH_AFTER_DAYS
            || self.completed_tasks() >= self.penance_band.required_tasks()
        {
            return None;
        }
        let duplicates: Vec<PenanceTask> = self
            .penance_tasks
            .iter()
            .filter(|t| !t.completed)
            .map(|t| PenanceTask {
                id: format!("{}-wrath", t.id),
                description: format!("{} (Hades' Wrath)", t.description),
                completed: false,
            })
            .collect();
        let added = duplicates.len();
        self.penance_tasks.extend(duplicates);
        self.hades_wrath_applied = true;
        log::info!(
            "Hades' Wrath doubled the remaining penance: {} tasks outstanding",
            self.penance_tasks.len() - self.completed_tasks()
        );
        Some(added)
    }

    #[must_use]
    pub fn outstanding_tasks(&self) -> u32 {
        usize_to_u32(self.penance_tasks.len() - self.completed_tasks())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityConfig, TrackingMode};
    use crate::ledger::CompletionRecord;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn activity(target: u32) -> ActivityDescriptor {
        ActivityDescriptor::builtin(&ActivityConfig {
            id: String::from("write"),
            name: String::from("Write"),
            folder: String::from("Writing"),
            field: String::from("wrote"),
            damage_per_completion: 1,
            weekly_target: target,
            tracking_mode: TrackingMode::Daily,
            damage_per_week: 0,
            enabled: true,
        })
    }

    fn snapshot(target: u32, days: &[u32]) -> ActivitySnapshot {
        ActivitySnapshot {
            descriptor: activity(target),
            records: days
                .iter()
                .map(|d| CompletionRecord::new(format!("2026-10-{d:02}"), true))
                .collect(),
            discipline_count: 0,
        }
    }

    #[test]
    fn required_is_ten_percent_rounded_up() {
        assert_eq!(required_completions(&[activity(7)]), 1);
        assert_eq!(required_completions(&[activity(21)]), 3);
        assert_eq!(required_completions(&[]), 0);
    }

    #[test]
    fn threshold_counts_trailing_three_days_once_per_day() {
        let activities = [activity(30)];
        let mut state = TartarusState::default();
        // Required 3; the 17th is outside the window.
        let snaps = [snapshot(30, &[17, 19, 20])];
        let check = state.check_death_threshold(&activities, &snaps, date(21), false);
        assert_eq!(
            check,
            ThresholdCheck::Failed {
                required: 3,
                actual: 2,
                failed_days: 1
            }
        );
        assert_eq!(
            state.check_death_threshold(&activities, &snaps, date(21), false),
            ThresholdCheck::StillFailing {
                required: 3,
                actual: 2,
                failed_days: 1
            }
        );
        assert_eq!(state.days_until_tartarus(), 2);

        let snaps = [snapshot(30, &[20, 21, 22])];
        let check = state.check_death_threshold(&activities, &snaps, date(22), false);
        assert_eq!(
            check,
            ThresholdCheck::Passed {
                required: 3,
                actual: 3
            }
        );
        assert_eq!(state.failed_threshold_days, 0);
    }

    #[test]
    fn threshold_skipped_while_paused() {
        let mut state = TartarusState::default();
        let check = state.check_death_threshold(&[activity(70)], &[], date(21), true);
        assert_eq!(check, ThresholdCheck::Skipped);
        assert!(state.last_failed_day.is_none());
    }

    #[test]
    fn failed_days_cap_at_three() {
        let mut state = TartarusState::default();
        for d in 10..16 {
            state.check_death_threshold(&[activity(70)], &[], date(d), false);
        }
        assert_eq!(state.failed_threshold_days, 3);
        assert!(state.threshold_breached());
        assert_eq!(state.days_until_tartarus(), 0);
    }

    #[test]
    fn penance_is_banded_and_deterministic() {
        let (band, low) = generate_penance(4, date(1));
        assert_eq!(band, PenanceBand::Low);
        assert_eq!(low.len(), 3);
        let (band, mid) = generate_penance(9, date(1));
        assert_eq!(band, PenanceBand::Mid);
        assert_eq!(mid.len(), 4);
        assert_eq!(mid, generate_penance(9, date(1)).1);
        let (_, high) = generate_penance(13, date(1));
        assert_eq!(high.len(), 5);
        let mut descriptions: Vec<_> = high.iter().map(|t| t.description.clone()).collect();
        descriptions.sort();
        descriptions.dedup();
        assert_eq!(descriptions.len(), 5);
    }

    #[test]
    fn wrath_duplicates_incomplete_tasks_once() {
        let mut state = TartarusState::default();
        state.enter(9, date(10)).unwrap();
        state.complete_task("penance-1").unwrap();
        state.complete_task("penance-2").unwrap();
        assert_eq!(state.apply_hades_wrath(date(12), false), None);
        assert_eq!(state.apply_hades_wrath(date(13), true), None);
        assert_eq!(state.apply_hades_wrath(date(13), false), Some(2));
        assert_eq!(state.penance_tasks.len(), 6);
        assert_eq!(state.outstanding_tasks(), 4);
        assert_eq!(state.apply_hades_wrath(date(20), false), None);
        assert_eq!(state.required_tasks(), 6);
    }

    #[test]
    fn escape_requires_all_tasks_or_three_tokens() {
        let mut state = TartarusState::default();
        state.enter(2, date(10)).unwrap();
        let mut tokens = 2;
        assert_eq!(
            state.escape(EscapeMethod::Penance, &mut tokens),
            Err(TartarusError::PenanceIncomplete {
                completed: 0,
                required: 3
            })
        );
        assert_eq!(
            state.escape(EscapeMethod::Tokens, &mut tokens),
            Err(TartarusError::InsufficientTokens { have: 2, need: 3 })
        );
        state.skip_task("penance-1", &mut tokens).unwrap();
        assert_eq!(tokens, 1);
        state.complete_task("penance-2").unwrap();
        state.complete_task("penance-3").unwrap();
        assert!(state.can_escape());
        state.escape(EscapeMethod::Penance, &mut tokens).unwrap();
        assert!(!state.in_tartarus);
        assert!(state.penance_tasks.is_empty());
        assert!(state.tartarus_start_date.is_none());
    }

    #[test]
    fn token_escape_ignores_penance() {
        let mut state = TartarusState::default();
        state.enter(20, date(10)).unwrap();
        let mut tokens = 3;
        state.escape(EscapeMethod::Tokens, &mut tokens).unwrap();
        assert_eq!(tokens, 0);
        assert!(!state.in_tartarus);
    }

    #[test]
    fn task_errors_are_specific() {
        let mut state = TartarusState::default();
        assert_eq!(
            state.complete_task("penance-1"),
            Err(TartarusError::NotInTartarus)
        );
        state.enter(1, date(10)).unwrap();
        assert_eq!(
            state.enter(1, date(11)).map(<[PenanceTask]>::len),
            Err(TartarusError::AlreadyInTartarus)
        );
        state.complete_task("penance-1").unwrap();
        assert_eq!(
            state.complete_task("penance-1"),
            Err(TartarusError::TaskAlreadyComplete(String::from("penance-1")))
        );
        let mut tokens = 0;
        assert_eq!(
            state.skip_task("penance-2", &mut tokens),
            Err(TartarusError::InsufficientTokens { have: 0, need: 1 })
        );
        assert_eq!(
            state.complete_task("nope"),
            Err(TartarusError::UnknownTask(String::from("nope")))
        );
    }
}
