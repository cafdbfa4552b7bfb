use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use olympus_game::constants::{
    BANKING_MIN_TIER, MAX_BANKED_REWARDS, MAX_DISCIPLINE_TOKENS, MAX_FAILED_THRESHOLD_DAYS,
};
use olympus_game::{
    BossTransition, CompletionRecord, EscapeMethod, Notification, NoteStore, PassReport,
    ProgressionEngine, Settings,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;

use crate::scenarios::Scenario;

/// Note vault the scripted player writes into.
#[derive(Debug, Clone, Default)]
pub struct ScriptedNotes {
    records: HashMap<String, Vec<CompletionRecord>>,
    discipline: HashMap<String, u32>,
}

impl ScriptedNotes {
    pub fn record(&mut self, folder: &str, date: NaiveDate, discipline: bool) {
        self.records
            .entry(folder.to_string())
            .or_default()
            .push(CompletionRecord::new(date.to_string(), true));
        if discipline {
            *self.discipline.entry(folder.to_string()).or_default() += 1;
        }
    }

    #[must_use]
    pub fn total_records(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }
}

impl NoteStore for ScriptedNotes {
    type Error = Infallible;

    fn get_completions(
        &self,
        folder: &str,
        _field: &str,
    ) -> Result<Vec<CompletionRecord>, Self::Error> {
        Ok(self.records.get(folder).cloned().unwrap_or_default())
    }

    fn count_discipline_completions(&self, folder: &str, _field: &str) -> Result<u32, Self::Error> {
        Ok(self.discipline.get(folder).copied().unwrap_or(0))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub scenario: String,
    pub seed: u64,
    pub days: u32,
    pub completions: usize,
    pub total_damage: u64,
    pub final_tier: u8,
    pub boss_current_hp: u32,
    pub boss_max_hp: u32,
    pub rank_ups: u32,
    pub bosses_defeated: u32,
    pub conquered: bool,
    pub rewards_earned: u32,
    pub rewards_claimed: u32,
    pub rewards_banked: u32,
    pub rewards_expired: u32,
    pub tartarus_visits: u32,
    pub tartarus_escapes: u32,
    pub wrath_triggers: u32,
    pub longest_streak: u32,
    pub discipline_tokens: u8,
    pub notifications: usize,
    pub violations: Vec<String>,
}

impl SimulationSummary {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

fn noon(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc() + chrono::Duration::hours(12)
}

/// Drive one scenario through `days` consecutive real days.
#[must_use]
pub fn run_simulation(
    scenario: &Scenario,
    seed: u64,
    start: NaiveDate,
    days: u32,
) -> SimulationSummary {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut settings = scenario.settings();
    let mut engine = ProgressionEngine::new(ScriptedNotes::default(), Vec::<Notification>::new());
    let mut summary = SimulationSummary {
        scenario: scenario.key.to_string(),
        seed,
        days,
        ..SimulationSummary::default()
    };
    let mut frozen_at: Option<DateTime<Utc>> = None;

    for day in 0..days {
        let Some(date) = start.checked_add_days(Days::new(u64::from(day))) else {
            summary.violations.push(format!("day {day}: calendar overflow"));
            break;
        };
        let real_now = noon(date);

        let should_pause = scenario
            .pause_window
            .is_some_and(|(from, to)| (from..to).contains(&day));
        if should_pause != settings.clock.is_paused() {
            engine.toggle_system_state(&mut settings, real_now);
        }

        if !settings.clock.is_paused() {
            record_day(scenario, &mut rng, &mut engine, &settings, real_now);
        }

        let was_in_tartarus = settings.tartarus.in_tartarus;
        let report = engine.on_note_store_changed(&mut settings, real_now);
        tally(&mut summary, &report);

        if settings.clock.is_paused() {
            let frozen = *frozen_at.get_or_insert(report.effective_now);
            if frozen != report.effective_now {
                summary
                    .violations
                    .push(format!("day {day}: effective time moved while paused"));
            }
        } else {
            frozen_at = None;
        }
        if was_in_tartarus && report.damage.total_damage > 0 {
            summary
                .violations
                .push(format!("day {day}: damage dealt inside Tartarus"));
        }

        play_tartarus(scenario, &mut rng, &mut engine, &mut settings, &mut summary, real_now);
        if scenario.claims_rewards {
            manage_rewards(&mut rng, &mut engine, &mut settings, &mut summary, real_now);
        }

        for violation in check_invariants(&settings, &report) {
            summary.violations.push(format!("day {day}: {violation}"));
        }
    }

    summary.completions = engine.notes().total_records();
    summary.final_tier = settings.boss.current_tier;
    summary.boss_current_hp = settings.boss.boss_current_hp;
    summary.boss_max_hp = settings.boss.boss_max_hp;
    summary.conquered = settings.boss.conquered;
    summary.discipline_tokens = settings.streak.discipline_tokens;
    summary.notifications = engine.sink().len();
    log::debug!(
        "{} seed {seed}: tier {} after {days} days",
        scenario.key,
        summary.final_tier
    );
    summary
}

fn record_day(
    scenario: &Scenario,
    rng: &mut ChaCha20Rng,
    engine: &mut ProgressionEngine<ScriptedNotes, Vec<Notification>>,
    settings: &Settings,
    real_now: DateTime<Utc>,
) {
    let today = settings.clock.effective_today(real_now);
    for activity in settings.activity_descriptors() {
        if !activity.enabled || !rng.random_bool(scenario.completion_chance) {
            continue;
        }
        let discipline = rng.random_bool(scenario.discipline_chance);
        engine
            .notes_mut()
            .record(&activity.source.folder, today, discipline);
    }
}

fn tally(summary: &mut SimulationSummary, report: &PassReport) {
    summary.total_damage += u64::from(report.damage.total_damage);
    match report.transition {
        Some(BossTransition::RankUp { .. }) => summary.rank_ups += 1,
        Some(BossTransition::Defeated { .. } | BossTransition::Conquered { .. }) => {
            summary.bosses_defeated += 1;
        }
        None => {}
    }
    if report.wrath_added.is_some() {
        summary.wrath_triggers += 1;
    }
    summary.rewards_earned += u32::try_from(report.rewards_earned.len()).unwrap_or(u32::MAX);
    summary.rewards_expired += u32::try_from(report.rewards_expired.len()).unwrap_or(u32::MAX);
    for week in &report.weeks {
        summary.longest_streak = summary.longest_streak.max(week.streak);
    }
}

fn play_tartarus(
    scenario: &Scenario,
    rng: &mut ChaCha20Rng,
    engine: &mut ProgressionEngine<ScriptedNotes, Vec<Notification>>,
    settings: &mut Settings,
    summary: &mut SimulationSummary,
    real_now: DateTime<Utc>,
) {
    if !settings.tartarus.in_tartarus {
        if scenario.accepts_tartarus && settings.tartarus.threshold_breached() {
            match engine.enter_tartarus(settings, real_now) {
                Ok(()) => summary.tartarus_visits += 1,
                Err(err) => summary.violations.push(format!("enter Tartarus: {err}")),
            }
        }
        return;
    }

    let outstanding: Vec<String> = settings
        .tartarus
        .penance_tasks
        .iter()
        .filter(|t| !t.completed)
        .map(|t| t.id.clone())
        .collect();
    for id in outstanding {
        if rng.random_bool(scenario.penance_chance)
            && let Err(err) = engine.complete_penance_task(settings, &id)
        {
            summary.violations.push(format!("complete {id}: {err}"));
        }
    }

    let method = if settings.tartarus.can_escape() {
        Some(EscapeMethod::Penance)
    } else if settings.streak.discipline_tokens >= 3 {
        Some(EscapeMethod::Tokens)
    } else {
        None
    };
    if let Some(method) = method {
        match engine.escape_tartarus(settings, method) {
            Ok(()) => summary.tartarus_escapes += 1,
            Err(err) => summary.violations.push(format!("escape via {method}: {err}")),
        }
    }
}

fn manage_rewards(
    rng: &mut ChaCha20Rng,
    engine: &mut ProgressionEngine<ScriptedNotes, Vec<Notification>>,
    settings: &mut Settings,
    summary: &mut SimulationSummary,
    real_now: DateTime<Utc>,
) {
    if !settings.rewards.banked_rewards.is_empty() && rng.random_bool(0.2) {
        let id = settings.rewards.banked_rewards[0].id.clone();
        if let Err(err) = engine.redeem_banked(settings, &id, real_now) {
            summary.violations.push(format!("redeem {id}: {err}"));
        }
    }

    let pending: Vec<String> = settings
        .rewards
        .pending_rewards
        .iter()
        .map(|r| r.id.clone())
        .collect();
    for id in pending {
        let can_bank = settings.boss.current_tier >= BANKING_MIN_TIER
            && settings.rewards.banked_rewards.len() < MAX_BANKED_REWARDS;
        if can_bank && rng.random_bool(0.3) {
            match engine.bank_reward(settings, &id, real_now) {
                Ok(_) => summary.rewards_banked += 1,
                Err(err) => summary.violations.push(format!("bank {id}: {err}")),
            }
        } else if rng.random_bool(0.5) {
            match engine.claim_reward(settings, &id, "treat", real_now) {
                Ok(_) => summary.rewards_claimed += 1,
                Err(err) => summary.violations.push(format!("claim {id}: {err}")),
            }
        }
    }
}

/// Structural checks that must hold after every pass.
#[must_use]
pub fn check_invariants(settings: &Settings, report: &PassReport) -> Vec<String> {
    let mut violations = Vec::new();
    let boss = &settings.boss;
    if boss.boss_current_hp > boss.boss_max_hp {
        violations.push(format!(
            "boss HP {} exceeds max {}",
            boss.boss_current_hp, boss.boss_max_hp
        ));
    }
    if boss.current_tier == 0 || boss.current_tier > settings.scaling.max_tier() {
        violations.push(format!("tier {} out of range", boss.current_tier));
    }
    if settings.streak.discipline_tokens > MAX_DISCIPLINE_TOKENS {
        violations.push(format!(
            "{} discipline tokens held",
            settings.streak.discipline_tokens
        ));
    }
    if settings.tartarus.failed_threshold_days > MAX_FAILED_THRESHOLD_DAYS {
        violations.push(format!(
            "{} failed threshold days",
            settings.tartarus.failed_threshold_days
        ));
    }
    if settings.rewards.banked_rewards.len() > MAX_BANKED_REWARDS {
        violations.push(format!(
            "{} banked rewards",
            settings.rewards.banked_rewards.len()
        ));
    }
    if let Some(stale) = settings
        .rewards
        .pending_rewards
        .iter()
        .find(|r| r.is_expired(report.effective_now))
    {
        violations.push(format!("pending reward {} outlived its expiry", stale.id));
    }
    if !settings.tartarus.in_tartarus && !settings.tartarus.penance_tasks.is_empty() {
        violations.push("penance tasks left outside Tartarus".to_string());
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::{catalog, find_scenario};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    #[test]
    fn same_seed_replays_identically() {
        let scenario = find_scenario("steady").unwrap();
        let first = run_simulation(&scenario, 42, start(), 21);
        let second = run_simulation(&scenario, 42, start(), 21);
        assert_eq!(first, second);
    }

    #[test]
    fn catalog_runs_without_invariant_violations() {
        for scenario in catalog() {
            let summary = run_simulation(&scenario, 7, start(), 35);
            assert!(
                summary.passed(),
                "{} violated invariants: {:?}",
                scenario.key,
                summary.violations
            );
        }
    }

    #[test]
    fn slacker_ends_up_in_tartarus() {
        let scenario = find_scenario("slacker").unwrap();
        let summary = run_simulation(&scenario, 3, start(), 28);
        assert!(summary.tartarus_visits >= 1);
    }

    #[test]
    fn perfectionist_builds_a_streak() {
        let scenario = find_scenario("perfectionist").unwrap();
        let summary = run_simulation(&scenario, 11, start(), 28);
        assert!(summary.longest_streak >= 2);
        assert!(summary.total_damage > 0);
        assert!(summary.bosses_defeated >= 1);
    }

    #[test]
    fn hoarder_lets_rewards_expire() {
        let scenario = find_scenario("hoarder").unwrap();
        let summary = run_simulation(&scenario, 5, start(), 28);
        assert_eq!(summary.rewards_claimed, 0);
        assert!(summary.rewards_expired > 0);
    }

    #[test]
    fn invariant_check_flags_overfull_boss() {
        let mut settings = Settings::default();
        settings.boss.boss_max_hp = 10;
        settings.boss.boss_current_hp = 11;
        let report = ProgressionEngine::new(ScriptedNotes::default(), Vec::<Notification>::new())
            .on_note_store_changed(&mut Settings::default(), noon(start()));
        let violations = check_invariants(&settings, &report);
        assert_eq!(violations.len(), 1);
    }
}
