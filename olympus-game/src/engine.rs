//! Trigger entry points that drive the progression subsystems.
//!
//! [`ProgressionEngine`] owns the collaborators (a [`NoteStore`] and a
//! [`NotificationSink`]) and mutates a caller-owned [`Settings`] aggregate in
//! place. Every entry point runs to completion; persisting the aggregate
//! afterwards is the caller's job.
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::NoteStore;
use crate::activity::{ActivityDescriptor, lowest_weekly_target, total_weekly_target};
use crate::boss::{BossTransition, ScalingConfig, boss_name, compute_max_hp};
use crate::clock::SystemState;
use crate::ledger::{self, ActivitySnapshot, DamageReport};
use crate::notify::{Notification, NotificationSink};
use crate::rewards::{BankedReward, ClaimedReward, PendingReward, RewardError, RewardTier};
use crate::settings::Settings;
use crate::streak::{self, WeekOutcome};
use crate::tartarus::{EscapeMethod, TartarusError, ThresholdCheck};

/// Everything one note-store pass changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    pub effective_now: DateTime<Utc>,
    pub damage: DamageReport,
    /// HP actually removed from the boss.
    pub hp_dealt: u32,
    pub max_hp_rescaled: bool,
    pub transition: Option<BossTransition>,
    pub threshold: ThresholdCheck,
    pub wrath_added: Option<usize>,
    pub weeks: Vec<WeekOutcome>,
    pub rewards_earned: Vec<PendingReward>,
    pub rewards_expired: Vec<PendingReward>,
}

/// Max HP for `tier` under the given scaling and activity configuration.
#[must_use]
pub fn max_hp_for_tier(scaling: &ScalingConfig, activities: &[ActivityDescriptor], tier: u8) -> u32 {
    compute_max_hp(
        total_weekly_target(activities),
        tier,
        scaling,
        lowest_weekly_target(activities),
    )
}

pub struct ProgressionEngine<N, K>
where
    N: NoteStore,
    K: NotificationSink,
{
    notes: N,
    sink: K,
}

impl<N, K> ProgressionEngine<N, K>
where
    N: NoteStore,
    K: NotificationSink,
{
    /// Create an engine reading from `notes` and reporting to `sink`.
    pub const fn new(notes: N, sink: K) -> Self {
        Self { notes, sink }
    }

    pub const fn notes(&self) -> &N {
        &self.notes
    }

    pub const fn notes_mut(&mut self) -> &mut N {
        &mut self.notes
    }

    pub const fn sink(&self) -> &K {
        &self.sink
    }

    pub const fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn into_parts(self) -> (N, K) {
        (self.notes, self.sink)
    }

    fn emit(&mut self, event: Notification) {
        self.sink.notify(&event);
    }

    /// Read every configured activity from the note store. Read failures
    /// degrade to an empty record list.
    pub fn collect_snapshots(&self, activities: &[ActivityDescriptor]) -> Vec<ActivitySnapshot> {
        activities
            .iter()
            .map(|descriptor| {
                let source = &descriptor.source;
                let records = self
                    .notes
                    .get_completions(&source.folder, &source.field)
                    .unwrap_or_else(|err| {
                        log::warn!("failed to read completions for {}: {err}", descriptor.id);
                        Vec::new()
                    });
                let discipline_count = self
                    .notes
                    .count_discipline_completions(&source.folder, &source.field)
                    .unwrap_or_else(|err| {
                        log::warn!(
                            "failed to count discipline completions for {}: {err}",
                            descriptor.id
                        );
                        0
                    });
                ActivitySnapshot {
                    descriptor: descriptor.clone(),
                    records,
                    discipline_count,
                }
            })
            .collect()
    }

    /// Full recomputation after the note store changed. Runs damage, the
    /// boss check, the failure threshold, perfect-week evaluation and the
    /// reward expiry sweep, in that order.
    pub fn on_note_store_changed(
        &mut self,
        settings: &mut Settings,
        real_now: DateTime<Utc>,
    ) -> PassReport {
        let now = settings.clock.effective_now(real_now);
        let today = now.date_naive();
        let paused = settings.clock.is_paused();
        let activities = settings.activity_descriptors();
        let snapshots = self.collect_snapshots(&activities);

        let max_hp_rescaled = sync_max_hp(settings, &activities);
        if settings.tartarus.in_tartarus && settings.tartarus.penance_tasks.is_empty() {
            settings.tartarus.assign_penance(settings.boss.current_tier);
        }

        let mut rewards_earned = Vec::new();
        let in_tartarus = settings.tartarus.in_tartarus;
        let tokens_before = settings.streak.discipline_tokens;
        let damage = ledger::convert(
            &snapshots,
            &mut settings.ledger,
            &mut settings.streak,
            today,
            in_tartarus,
        );
        if settings.streak.discipline_tokens > tokens_before {
            self.emit(Notification::TokenEarned {
                tokens: settings.streak.discipline_tokens,
            });
        }

        let reward_tier = RewardTier::for_player_tier(settings.boss.current_tier);
        let hp_dealt = settings.boss.apply_damage(damage.total_damage);
        let transition = self.check_boss(settings, &activities, now, &mut rewards_earned);

        if !in_tartarus && damage.total_new_completions > 0 {
            let earned = settings.rewards.accrue_activity(
                damage.total_new_completions,
                reward_tier.activity_interval(),
                reward_tier,
                now,
            );
            self.announce_rewards(&earned);
            rewards_earned.extend(earned);
        }

        let threshold =
            settings
                .tartarus
                .check_death_threshold(&activities, &snapshots, today, paused);
        if let ThresholdCheck::Failed {
            required, actual, ..
        } = threshold
        {
            self.emit(Notification::ThresholdFailed {
                actual,
                required,
                days_until_tartarus: settings.tartarus.days_until_tartarus(),
            });
        }

        let wrath_added = settings.tartarus.apply_hades_wrath(today, paused);
        if let Some(added) = wrath_added {
            self.emit(Notification::HadesWrath { added });
        }

        let weeks = self.evaluate_streak(settings, &snapshots, today, now, &mut rewards_earned);

        let rewards_expired = self.sweep_expired(settings, now);

        PassReport {
            effective_now: now,
            damage,
            hp_dealt,
            max_hp_rescaled,
            transition,
            threshold,
            wrath_added,
            weeks,
            rewards_earned,
            rewards_expired,
        }
    }

    fn check_boss(
        &mut self,
        settings: &mut Settings,
        activities: &[ActivityDescriptor],
        now: DateTime<Utc>,
        rewards_earned: &mut Vec<PendingReward>,
    ) -> Option<BossTransition> {
        let scaling = settings.scaling;
        let transition = settings
            .boss
            .check_transitions(scaling.max_tier(), |tier| {
                max_hp_for_tier(&scaling, activities, tier)
            })?;

        match &transition {
            BossTransition::RankUp { tier } => {
                self.emit(Notification::RankUp {
                    tier: *tier,
                    boss: boss_name(*tier).to_string(),
                });
            }
            BossTransition::Defeated {
                defeated_tier,
                new_tier,
                ..
            } => {
                self.emit(Notification::BossDefeated {
                    boss: boss_name(*defeated_tier).to_string(),
                    new_tier: *new_tier,
                });
                let reward = settings
                    .rewards
                    .award_boss(RewardTier::for_player_tier(*defeated_tier), now);
                self.announce_rewards(std::slice::from_ref(&reward));
                rewards_earned.push(reward);
            }
            BossTransition::Conquered { tier } => {
                self.emit(Notification::Conquered {
                    boss: boss_name(*tier).to_string(),
                });
                let reward = settings
                    .rewards
                    .award_boss(RewardTier::for_player_tier(*tier), now);
                self.announce_rewards(std::slice::from_ref(&reward));
                rewards_earned.push(reward);
            }
        }
        Some(transition)
    }

    fn evaluate_streak(
        &mut self,
        settings: &mut Settings,
        snapshots: &[ActivitySnapshot],
        today: NaiveDate,
        now: DateTime<Utc>,
        rewards_earned: &mut Vec<PendingReward>,
    ) -> Vec<WeekOutcome> {
        let mut previous = settings.streak.consecutive_perfect_weeks;
        let weeks = streak::evaluate_weeks(&mut settings.streak, snapshots, today);
        for week in &weeks {
            if week.perfect {
                self.emit(Notification::PerfectWeek {
                    streak: week.streak,
                });
                let tier = RewardTier::for_player_tier(settings.boss.current_tier);
                if let Some(reward) =
                    settings
                        .rewards
                        .accrue_perfect_week(tier.streak_interval(), tier, now)
                {
                    self.announce_rewards(std::slice::from_ref(&reward));
                    rewards_earned.push(reward);
                }
            } else if previous > 0 {
                self.emit(Notification::StreakBroken { previous });
            }
            previous = week.streak;
        }
        weeks
    }

    fn sweep_expired(&mut self, settings: &mut Settings, now: DateTime<Utc>) -> Vec<PendingReward> {
        let expired = settings.rewards.sweep_expired(now);
        for reward in &expired {
            log::info!("reward {} expired unclaimed", reward.id);
            self.emit(Notification::RewardExpired {
                id: reward.id.clone(),
                tier: reward.tier,
            });
        }
        expired
    }

    fn announce_rewards(&mut self, rewards: &[PendingReward]) {
        for reward in rewards {
            log::info!("{} reward {} earned ({})", reward.kind, reward.id, reward.tier);
            self.emit(Notification::RewardEarned {
                id: reward.id.clone(),
                kind: reward.kind,
                tier: reward.tier,
            });
        }
    }

    /// Pause or resume the effective clock.
    pub fn toggle_system_state(
        &mut self,
        settings: &mut Settings,
        real_now: DateTime<Utc>,
    ) -> SystemState {
        let state = settings.clock.toggle(real_now);
        self.emit(Notification::SystemToggled { state });
        state
    }

    /// Pin (or clear) the simulated date used for testing.
    pub fn set_simulated_date(&mut self, settings: &mut Settings, date: Option<NaiveDate>) {
        settings.clock.set_simulated_date(date);
    }

    /// Direct damage outside the completion ledger. Ignored in Tartarus.
    pub fn deal_manual_damage(
        &mut self,
        settings: &mut Settings,
        amount: u32,
        real_now: DateTime<Utc>,
    ) -> Option<BossTransition> {
        if settings.tartarus.in_tartarus {
            log::debug!("manual damage of {amount} suppressed in Tartarus");
            return None;
        }
        let activities = settings.activity_descriptors();
        sync_max_hp(settings, &activities);
        let dealt = settings.boss.apply_damage(amount);
        log::debug!("manual damage dealt {dealt} HP");
        let now = settings.clock.effective_now(real_now);
        let mut earned = Vec::new();
        self.check_boss(settings, &activities, now, &mut earned)
    }

    /// Enter Tartarus: refill the boss, roll penance for the current tier.
    ///
    /// # Errors
    ///
    /// Returns [`TartarusError::AlreadyInTartarus`] on re-entry.
    pub fn enter_tartarus(
        &mut self,
        settings: &mut Settings,
        real_now: DateTime<Utc>,
    ) -> Result<(), TartarusError> {
        let today = settings.clock.effective_today(real_now);
        let tasks = settings
            .tartarus
            .enter(settings.boss.current_tier, today)?
            .len();
        let activities = settings.activity_descriptors();
        sync_max_hp(settings, &activities);
        settings.boss.reset_hp();
        log::info!("entered Tartarus on {today} with {tasks} penance tasks");
        self.emit(Notification::TartarusEntered { tasks });
        Ok(())
    }

    /// Leave Tartarus via finished penance or by spending tokens.
    ///
    /// # Errors
    ///
    /// See [`TartarusState::escape`](crate::tartarus::TartarusState::escape).
    pub fn escape_tartarus(
        &mut self,
        settings: &mut Settings,
        method: EscapeMethod,
    ) -> Result<(), TartarusError> {
        settings
            .tartarus
            .escape(method, &mut settings.streak.discipline_tokens)?;
        self.emit(Notification::TartarusEscaped { method });
        Ok(())
    }

    /// Mark a penance task complete.
    ///
    /// # Errors
    ///
    /// See [`TartarusState::complete_task`](crate::tartarus::TartarusState::complete_task).
    pub fn complete_penance_task(
        &mut self,
        settings: &mut Settings,
        id: &str,
    ) -> Result<(), TartarusError> {
        settings.tartarus.complete_task(id)
    }

    /// Spend a discipline token to skip a penance task.
    ///
    /// # Errors
    ///
    /// See [`TartarusState::skip_task`](crate::tartarus::TartarusState::skip_task).
    pub fn skip_penance_task(
        &mut self,
        settings: &mut Settings,
        id: &str,
    ) -> Result<(), TartarusError> {
        settings
            .tartarus
            .skip_task(id, &mut settings.streak.discipline_tokens)
    }

    /// Claim a pending reward into history.
    ///
    /// # Errors
    ///
    /// Returns [`RewardError::UnknownPending`] for unknown ids.
    pub fn claim_reward(
        &mut self,
        settings: &mut Settings,
        id: &str,
        choice: &str,
        real_now: DateTime<Utc>,
    ) -> Result<ClaimedReward, RewardError> {
        let now = settings.clock.effective_now(real_now);
        let claimed = settings.rewards.claim(id, choice, now)?;
        log::info!("reward {id} claimed as {choice:?}");
        Ok(claimed)
    }

    /// Move a pending reward into the bank.
    ///
    /// # Errors
    ///
    /// Fails below the banking tier, when the bank is full, or for unknown
    /// ids.
    pub fn bank_reward(
        &mut self,
        settings: &mut Settings,
        id: &str,
        real_now: DateTime<Utc>,
    ) -> Result<BankedReward, RewardError> {
        let now = settings.clock.effective_now(real_now);
        let banked = settings
            .rewards
            .bank(id, settings.boss.current_tier, now)?;
        log::info!("reward {id} banked");
        Ok(banked)
    }

    /// Re-issue a banked reward as pending with a fresh expiry.
    ///
    /// # Errors
    ///
    /// Returns [`RewardError::UnknownBanked`] for unknown ids.
    pub fn redeem_banked(
        &mut self,
        settings: &mut Settings,
        id: &str,
        real_now: DateTime<Utc>,
    ) -> Result<PendingReward, RewardError> {
        let now = settings.clock.effective_now(real_now);
        let reward = settings.rewards.redeem_banked(id, now)?;
        log::info!("banked reward {id} redeemed, expires {}", reward.expires_at);
        Ok(reward)
    }

    /// Toggle the `used` flag on a claimed reward.
    ///
    /// # Errors
    ///
    /// Returns [`RewardError::UnknownClaimed`] for unknown ids.
    pub fn mark_reward_used(
        &mut self,
        settings: &mut Settings,
        id: &str,
        used: bool,
    ) -> Result<(), RewardError> {
        settings.rewards.mark_used(id, used)
    }
}

/// Bring the boss max HP in line with the current activity targets.
fn sync_max_hp(settings: &mut Settings, activities: &[ActivityDescriptor]) -> bool {
    let max_hp = max_hp_for_tier(&settings.scaling, activities, settings.boss.current_tier);
    let changed = settings.boss.rescale(max_hp);
    if changed {
        log::debug!(
            "boss max HP rescaled to {max_hp} at tier {}",
            settings.boss.current_tier
        );
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityConfig, TrackingMode};
    use crate::ledger::CompletionRecord;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fmt;

    #[derive(Debug)]
    struct Unreadable;

    impl fmt::Display for Unreadable {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("vault locked")
        }
    }

    impl std::error::Error for Unreadable {}

    #[derive(Default)]
    struct Notes {
        records: RefCell<HashMap<String, Vec<CompletionRecord>>>,
        broken: bool,
    }

    impl NoteStore for Notes {
        type Error = Unreadable;

        fn get_completions(
            &self,
            folder: &str,
            _field: &str,
        ) -> Result<Vec<CompletionRecord>, Self::Error> {
            if self.broken {
                return Err(Unreadable);
            }
            Ok(self.records.borrow().get(folder).cloned().unwrap_or_default())
        }

        fn count_discipline_completions(
            &self,
            _folder: &str,
            _field: &str,
        ) -> Result<u32, Self::Error> {
            if self.broken {
                return Err(Unreadable);
            }
            Ok(0)
        }
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.activities.push(ActivityConfig {
            id: "gym".into(),
            name: "Gym".into(),
            folder: "Gym".into(),
            field: "done".into(),
            damage_per_completion: 1,
            weekly_target: 7,
            tracking_mode: TrackingMode::Daily,
            damage_per_week: 0,
            enabled: true,
        });
        settings
    }

    fn noon(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn read_failures_degrade_to_zero_completions() {
        let notes = Notes {
            broken: true,
            ..Notes::default()
        };
        let mut settings = settings();
        let mut engine = ProgressionEngine::new(notes, Vec::new());
        let report = engine.on_note_store_changed(&mut settings, noon(4));
        assert_eq!(report.damage.total_damage, 0);
        assert!(report.max_hp_rescaled);
        assert_eq!(settings.boss.boss_current_hp, 35);
    }

    #[test]
    fn manual_damage_is_ignored_in_tartarus() {
        let mut settings = settings();
        let mut engine = ProgressionEngine::new(Notes::default(), Vec::new());
        engine.on_note_store_changed(&mut settings, noon(4));
        engine.enter_tartarus(&mut settings, noon(4)).unwrap();
        assert_eq!(engine.deal_manual_damage(&mut settings, 30, noon(4)), None);
        assert_eq!(settings.boss.boss_current_hp, 35);
        assert!(matches!(
            engine.sink().last(),
            Some(Notification::TartarusEntered { tasks: 3 })
        ));
    }

    #[test]
    fn toggling_notifies_and_freezes_time() {
        let mut settings = settings();
        let mut engine = ProgressionEngine::new(Notes::default(), Vec::new());
        let state = engine.toggle_system_state(&mut settings, noon(4));
        assert_eq!(state, SystemState::Paused);
        let report = engine.on_note_store_changed(&mut settings, noon(9));
        assert_eq!(report.effective_now, noon(4));
        assert_eq!(report.threshold, ThresholdCheck::Skipped);
        assert_eq!(
            engine.sink()[0],
            Notification::SystemToggled {
                state: SystemState::Paused
            }
        );
    }
}
