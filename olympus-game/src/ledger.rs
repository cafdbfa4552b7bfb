//! Completion ledger and damage conversion.
//!
//! The ledger remembers, per activity, how many completions were already
//! turned into damage. Each pass diffs the collaborator's current counts
//! against it so only new work deals damage. Damage is one-directional: when
//! a completion disappears the ledger resyncs downward without clawing back
//! damage that was already dealt.
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::activity::{ActivityDescriptor, TrackingMode};
use crate::clock::{parse_record_date, week_key, week_start};
use crate::constants::{
    DISCIPLINE_COMPLETIONS_PER_TOKEN, DISCIPLINE_DAMAGE_FACTOR, MAX_DISCIPLINE_TOKENS,
    STREAK_MULTIPLIERS,
};
use crate::numbers::{round_f64_to_u32, usize_to_u32};
use crate::streak::StreakState;

/// One row returned by the note-store collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub date: String,
    pub completed: bool,
}

impl CompletionRecord {
    #[must_use]
    pub fn new(date: impl Into<String>, completed: bool) -> Self {
        Self {
            date: date.into(),
            completed,
        }
    }
}

/// Everything the collaborator reported for one activity during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySnapshot {
    pub descriptor: ActivityDescriptor,
    pub records: Vec<CompletionRecord>,
    pub discipline_count: u32,
}

impl ActivitySnapshot {
    #[must_use]
    pub fn completed_count(&self) -> u32 {
        usize_to_u32(self.records.iter().filter(|r| r.completed).count())
    }

    /// Completions dated within `[from, to]`, inclusive. Undated records are
    /// ignored.
    #[must_use]
    pub fn completions_between(&self, from: NaiveDate, to: NaiveDate) -> u32 {
        let count = self
            .records
            .iter()
            .filter(|r| r.completed)
            .filter_map(|r| parse_record_date(&r.date))
            .filter(|date| *date >= from && *date <= to)
            .count();
        usize_to_u32(count)
    }

    /// Completions in the ISO week containing `day`.
    #[must_use]
    pub fn completions_in_week(&self, day: NaiveDate) -> u32 {
        let start = week_start(day);
        let end = start.checked_add_days(Days::new(6)).unwrap_or(start);
        self.completions_between(start, end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LedgerEntry {
    pub last_completion_count: u32,
    pub last_discipline_count: u32,
    /// ISO week key of the last weekly-mode payout.
    pub weekly_award_week: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CompletionLedger {
    entries: BTreeMap<String, LedgerEntry>,
}

impl CompletionLedger {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&LedgerEntry> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: LedgerEntry) {
        self.entries.insert(key.into(), entry);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ActivityDamage {
    pub activity_id: String,
    pub new_completions: u32,
    pub new_discipline: u32,
    pub damage: u32,
}

/// Result of one conversion pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DamageReport {
    /// Damage to apply to the boss after the streak multiplier.
    pub total_damage: u32,
    /// Damage before the streak multiplier.
    pub raw_damage: u32,
    pub multiplier: f64,
    pub total_new_completions: u32,
    pub total_new_discipline: u32,
    pub tokens_earned: u8,
    /// True when damage was withheld because the player is in Tartarus.
    pub suppressed: bool,
    pub per_activity: Vec<ActivityDamage>,
}

/// Damage multiplier for a run of consecutive perfect weeks.
#[must_use]
pub fn streak_multiplier(consecutive_perfect_weeks: u32) -> f64 {
    let last = STREAK_MULTIPLIERS.len() - 1;
    let idx = usize::try_from(consecutive_perfect_weeks).map_or(last, |n| n.min(last));
    STREAK_MULTIPLIERS[idx]
}

/// Feed discipline completions into the token counter, returning how many
/// tokens were minted. The counter keeps rolling once tokens are capped.
pub fn accrue_discipline(streak: &mut StreakState, new_discipline: u32) -> u8 {
    streak.discipline_completion_count = streak
        .discipline_completion_count
        .saturating_add(new_discipline);
    let mut minted = 0;
    while streak.discipline_completion_count >= DISCIPLINE_COMPLETIONS_PER_TOKEN {
        streak.discipline_completion_count -= DISCIPLINE_COMPLETIONS_PER_TOKEN;
        if streak.discipline_tokens < MAX_DISCIPLINE_TOKENS {
            streak.discipline_tokens += 1;
            minted += 1;
        }
    }
    minted
}

/// Diff every snapshot against the ledger and turn new completions into
/// damage.
pub fn convert(
    snapshots: &[ActivitySnapshot],
    ledger: &mut CompletionLedger,
    streak: &mut StreakState,
    today: NaiveDate,
    in_tartarus: bool,
) -> DamageReport {
    let mut report = DamageReport {
        multiplier: 1.0,
        ..DamageReport::default()
    };

    for snapshot in snapshots {
        let outcome = convert_activity(snapshot, ledger, today);
        report.raw_damage = report.raw_damage.saturating_add(outcome.damage);
        report.total_new_completions = report
            .total_new_completions
            .saturating_add(outcome.new_completions);
        report.total_new_discipline = report
            .total_new_discipline
            .saturating_add(outcome.new_discipline);
        if outcome.new_completions > 0 || outcome.damage > 0 {
            report.per_activity.push(outcome);
        }
    }

    report.tokens_earned = accrue_discipline(streak, report.total_new_discipline);

    if in_tartarus {
        report.suppressed = report.raw_damage > 0;
        report.total_damage = 0;
    } else {
        report.multiplier = streak_multiplier(streak.consecutive_perfect_weeks);
        report.total_damage = round_f64_to_u32(f64::from(report.raw_damage) * report.multiplier);
    }
    log::debug!(
        "converted {} new completions into {} damage (x{:.2}, suppressed: {})",
        report.total_new_completions,
        report.total_damage,
        report.multiplier,
        report.suppressed
    );
    report
}

fn convert_activity(
    snapshot: &ActivitySnapshot,
    ledger: &mut CompletionLedger,
    today: NaiveDate,
) -> ActivityDamage {
    let descriptor = &snapshot.descriptor;
    let current = snapshot.completed_count();
    let current_discipline = snapshot.discipline_count.min(current);
    let mut outcome = ActivityDamage {
        activity_id: descriptor.id.clone(),
        ..ActivityDamage::default()
    };

    let key = descriptor.ledger_key();
    if !ledger.entries.contains_key(&key) {
        // First sighting establishes the baseline so history is not replayed
        // as damage.
        let weekly_award_week = weekly_target_met(snapshot, today).then(|| week_key(today));
        ledger.entries.insert(
            key,
            LedgerEntry {
                last_completion_count: current,
                last_discipline_count: current_discipline,
                weekly_award_week,
            },
        );
        return outcome;
    }
    let Some(entry) = ledger.entries.get_mut(&key) else {
        return outcome;
    };

    if !descriptor.enabled {
        entry.last_completion_count = current;
        entry.last_discipline_count = current_discipline;
        return outcome;
    }

    let last = entry.last_completion_count;
    if current > last {
        let delta = current - last;
        let discipline_delta = current_discipline
            .saturating_sub(entry.last_discipline_count)
            .min(delta);
        let regular = delta - discipline_delta;
        if descriptor.tracking_mode == TrackingMode::Daily {
            let per = descriptor.damage_per_completion;
            let discipline_damage = per.saturating_mul(DISCIPLINE_DAMAGE_FACTOR);
            outcome.damage = regular
                .saturating_mul(per)
                .saturating_add(discipline_delta.saturating_mul(discipline_damage));
        }
        outcome.new_completions = delta;
        outcome.new_discipline = discipline_delta;
        entry.last_completion_count = current;
        entry.last_discipline_count = current_discipline;
    } else if current < last {
        log::debug!(
            "ledger resync for {}: {} -> {} completions",
            descriptor.id,
            last,
            current
        );
        entry.last_completion_count = current;
        entry.last_discipline_count = current_discipline;
    } else if current_discipline != entry.last_discipline_count {
        entry.last_discipline_count = current_discipline;
    }

    if descriptor.tracking_mode == TrackingMode::Weekly && weekly_target_met(snapshot, today) {
        let key = week_key(today);
        if entry.weekly_award_week.as_deref() != Some(key.as_str()) {
            outcome.damage = outcome.damage.saturating_add(descriptor.damage_per_week);
            entry.weekly_award_week = Some(key);
        }
    }

    outcome
}

fn weekly_target_met(snapshot: &ActivitySnapshot, today: NaiveDate) -> bool {
    let target = snapshot.descriptor.weekly_target.max(1);
    snapshot.completions_in_week(today) >= target
}
