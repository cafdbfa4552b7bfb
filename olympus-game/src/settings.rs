//! The persisted settings aggregate and its schema migrations.
//!
//! The engine mutates a [`Settings`] value in place; loading and saving it is
//! the caller's job. Documents written by older releases are upgraded once
//! at load time by [`migrate`], so steady-state engine code only ever sees the
//! current shape.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::activity::{ActivityConfig, ActivityDescriptor, CustomHabitConfig};
use crate::boss::{BossState, ScalingConfig};
use crate::clock::ClockState;
use crate::constants::{MAX_DISCIPLINE_TOKENS, SETTINGS_SCHEMA_VERSION};
use crate::ledger::CompletionLedger;
use crate::rewards::RewardState;
use crate::streak::StreakState;
use crate::tartarus::TartarusState;

const SCHEMA_KEY: &str = "schema_version";
const BOSS_FIELDS: [&str; 4] = [
    "current_tier",
    "boss_max_hp",
    "boss_current_hp",
    "tier_advanced_at_50_percent",
];
const STREAK_FIELDS: [&str; 3] = [
    "consecutive_perfect_weeks",
    "discipline_tokens",
    "discipline_completion_count",
];
const REWARD_FIELDS: [&str; 5] = [
    "activity_reward_counter",
    "streak_reward_counter",
    "pending_rewards",
    "banked_rewards",
    "claimed_rewards",
];

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("settings document must be a JSON object")]
    NotAnObject,
    #[error("settings schema {found} is newer than supported schema {supported}")]
    UnsupportedVersion { found: u64, supported: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub schema_version: u32,
    pub clock: ClockState,
    pub activities: Vec<ActivityConfig>,
    pub custom_habits: Vec<CustomHabitConfig>,
    pub scaling: ScalingConfig,
    pub ledger: CompletionLedger,
    pub boss: BossState,
    pub streak: StreakState,
    pub tartarus: TartarusState,
    pub rewards: RewardState,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: SETTINGS_SCHEMA_VERSION,
            clock: ClockState::default(),
            activities: Vec::new(),
            custom_habits: Vec::new(),
            scaling: ScalingConfig::default(),
            ledger: CompletionLedger::default(),
            boss: BossState::default(),
            streak: StreakState::default(),
            tartarus: TartarusState::default(),
            rewards: RewardState::default(),
        }
    }
}

impl Settings {
    /// Parse and upgrade a persisted document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, not an object, or written
    /// by a newer schema.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Upgrade and deserialize an already parsed document.
    ///
    /// # Errors
    ///
    /// See [`Settings::from_json`].
    pub fn from_value(value: Value) -> Result<Self, SettingsError> {
        let migrated = migrate(value)?;
        Ok(serde_json::from_value(migrated)?)
    }

    /// Serialize the current document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Built-in activities followed by custom habits, as one list.
    #[must_use]
    pub fn activity_descriptors(&self) -> Vec<ActivityDescriptor> {
        self.activities
            .iter()
            .map(ActivityDescriptor::from)
            .chain(self.custom_habits.iter().map(ActivityDescriptor::from))
            .collect()
    }

    /// Repair invariants a hand-edited or partially migrated document may
    /// violate.
    pub fn normalize(&mut self, real_now: DateTime<Utc>) {
        self.clock.normalize(real_now);
        let max_tier = self.scaling.max_tier();
        self.boss.current_tier = self.boss.current_tier.clamp(1, max_tier);
        self.boss.boss_current_hp = self.boss.boss_current_hp.min(self.boss.boss_max_hp);
        self.streak.discipline_tokens = self.streak.discipline_tokens.min(MAX_DISCIPLINE_TOKENS);
        self.schema_version = SETTINGS_SCHEMA_VERSION;
    }
}

/// Upgrade a raw settings document to [`SETTINGS_SCHEMA_VERSION`].
///
/// - v0 → v1: `habits` becomes `activities`, `tokens` becomes
///   `discipline_tokens`.
/// - v1 → v2: flat boss and streak fields fold into `boss` and `streak`.
/// - v2 → v3: flat reward fields fold into `rewards`.
///
/// # Errors
///
/// Returns an error for non-object documents or unknown future versions.
pub fn migrate(value: Value) -> Result<Value, SettingsError> {
    let Value::Object(mut doc) = value else {
        return Err(SettingsError::NotAnObject);
    };
    let found = doc.get(SCHEMA_KEY).and_then(Value::as_u64).unwrap_or(0);
    if found > u64::from(SETTINGS_SCHEMA_VERSION) {
        return Err(SettingsError::UnsupportedVersion {
            found,
            supported: SETTINGS_SCHEMA_VERSION,
        });
    }

    if found < 1 {
        rename_field(&mut doc, "habits", "activities");
        rename_field(&mut doc, "tokens", "discipline_tokens");
    }
    if found < 2 {
        fold_fields(&mut doc, "boss", &BOSS_FIELDS);
        fold_fields(&mut doc, "streak", &STREAK_FIELDS);
    }
    if found < 3 {
        fold_fields(&mut doc, "rewards", &REWARD_FIELDS);
    }
    if found < u64::from(SETTINGS_SCHEMA_VERSION) {
        log::info!("migrated settings from schema {found} to {SETTINGS_SCHEMA_VERSION}");
    }
    doc.insert(SCHEMA_KEY.to_string(), Value::from(SETTINGS_SCHEMA_VERSION));
    Ok(Value::Object(doc))
}

fn rename_field(doc: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = doc.remove(from) {
        doc.entry(to.to_string()).or_insert(value);
    }
}

fn fold_fields(doc: &mut Map<String, Value>, target: &str, fields: &[&str]) {
    let moved: Vec<(String, Value)> = fields
        .iter()
        .filter_map(|field| doc.remove(*field).map(|v| ((*field).to_string(), v)))
        .collect();
    if moved.is_empty() {
        return;
    }
    let slot = doc
        .entry(target.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(nested) = slot {
        for (field, value) in moved {
            nested.entry(field).or_insert(value);
        }
    }
}
