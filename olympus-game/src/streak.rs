//! Perfect-week streak tracking.
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::clock::week_start;
use crate::ledger::ActivitySnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StreakState {
    pub consecutive_perfect_weeks: u32,
    /// Spendable discipline tokens, capped at
    /// [`MAX_DISCIPLINE_TOKENS`](crate::constants::MAX_DISCIPLINE_TOKENS).
    pub discipline_tokens: u8,
    /// Discipline completions banked toward the next token.
    pub discipline_completion_count: u32,
    /// Monday of the most recently evaluated complete week.
    pub last_evaluated_week: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekOutcome {
    pub week_start: NaiveDate,
    pub perfect: bool,
    /// Streak length after this week was applied.
    pub streak: u32,
}

/// True when at least one activity is enabled and every enabled activity met
/// its weekly target in the week starting at `monday`.
#[must_use]
pub fn is_perfect_week(snapshots: &[ActivitySnapshot], monday: NaiveDate) -> bool {
    let mut enabled = snapshots.iter().filter(|s| s.descriptor.enabled).peekable();
    if enabled.peek().is_none() {
        return false;
    }
    enabled.all(|s| s.completions_in_week(monday) >= s.descriptor.weekly_target)
}

/// Evaluate every fully elapsed week since the last evaluation, in order.
///
/// The first call only records the previous week as the starting point so a
/// fresh install does not judge weeks it never observed.
pub fn evaluate_weeks(
    streak: &mut StreakState,
    snapshots: &[ActivitySnapshot],
    today: NaiveDate,
) -> Vec<WeekOutcome> {
    let current = week_start(today);
    let Some(mut last) = streak.last_evaluated_week else {
        streak.last_evaluated_week = current.checked_sub_days(Days::new(7));
        return Vec::new();
    };

    let mut outcomes = Vec::new();
    while let Some(next) = last.checked_add_days(Days::new(7)) {
        if next >= current {
            break;
        }
        let perfect = is_perfect_week(snapshots, next);
        if perfect {
            streak.consecutive_perfect_weeks = streak.consecutive_perfect_weeks.saturating_add(1);
        } else {
            streak.consecutive_perfect_weeks = 0;
        }
        outcomes.push(WeekOutcome {
            week_start: next,
            perfect,
            streak: streak.consecutive_perfect_weeks,
        });
        last = next;
    }
    streak.last_evaluated_week = Some(last);
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityConfig, ActivityDescriptor, TrackingMode};
    use crate::ledger::CompletionRecord;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn snapshot(days: &[u32], target: u32) -> ActivitySnapshot {
        ActivitySnapshot {
            descriptor: ActivityDescriptor::builtin(&ActivityConfig {
                id: String::from("meditate"),
                name: String::from("Meditate"),
                folder: String::from("Daily"),
                field: String::from("meditated"),
                damage_per_completion: 1,
                weekly_target: target,
                tracking_mode: TrackingMode::Daily,
                damage_per_week: 0,
                enabled: true,
            }),
            records: days
                .iter()
                .map(|d| CompletionRecord::new(format!("2026-10-{d:02}"), true))
                .collect(),
            discipline_count: 0,
        }
    }

    #[test]
    fn first_evaluation_only_sets_anchor() {
        let mut streak = StreakState::default();
        let outcomes = evaluate_weeks(&mut streak, &[snapshot(&[], 1)], date(21));
        assert!(outcomes.is_empty());
        assert_eq!(streak.last_evaluated_week, Some(date(12)));
    }

    #[test]
    fn elapsed_weeks_are_judged_in_order() {
        // Week of 5th met, week of 12th missed, week of 19th still running.
        let snap = snapshot(&[5, 6, 13], 2);
        let mut streak = StreakState {
            consecutive_perfect_weeks: 3,
            last_evaluated_week: Some(NaiveDate::from_ymd_opt(2026, 9, 28).unwrap()),
            ..StreakState::default()
        };
        let outcomes = evaluate_weeks(&mut streak, &[snap], date(21));
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].perfect);
        assert_eq!(outcomes[0].streak, 4);
        assert!(!outcomes[1].perfect);
        assert_eq!(streak.consecutive_perfect_weeks, 0);
        assert_eq!(streak.last_evaluated_week, Some(date(12)));
        assert!(evaluate_weeks(&mut streak, &[snapshot(&[], 1)], date(25)).is_empty());
    }

    #[test]
    fn no_enabled_activities_is_never_perfect() {
        let mut snap = snapshot(&[5, 6, 7], 1);
        snap.descriptor.enabled = false;
        assert!(!is_perfect_week(&[snap], date(5)));
    }
}
