//! Activity configuration and the unified descriptor the engine consumes.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    #[default]
    Daily,
    Weekly,
}

impl TrackingMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the note-store collaborator should look for completions. Opaque to
/// the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ActivitySource {
    pub folder: String,
    pub field: String,
}

impl ActivitySource {
    #[must_use]
    pub fn new(folder: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            field: field.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityOrigin {
    Builtin,
    CustomHabit,
}

/// A built-in activity as stored in settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityConfig {
    pub id: String,
    pub name: String,
    pub folder: String,
    pub field: String,
    #[serde(default = "default_damage")]
    pub damage_per_completion: u32,
    #[serde(default = "default_weekly_target")]
    pub weekly_target: u32,
    #[serde(default)]
    pub tracking_mode: TrackingMode,
    #[serde(default)]
    pub damage_per_week: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// A user-defined habit. Custom habits always track daily.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomHabitConfig {
    pub id: String,
    pub name: String,
    pub folder: String,
    pub field: String,
    #[serde(default = "default_damage")]
    pub damage: u32,
    #[serde(default = "default_weekly_target")]
    pub weekly_target: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_damage() -> u32 {
    1
}

const fn default_weekly_target() -> u32 {
    7
}

const fn default_enabled() -> bool {
    true
}

/// The minimal capability set every tracked activity exposes, regardless of
/// which configuration shape it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDescriptor {
    pub id: String,
    pub name: String,
    pub origin: ActivityOrigin,
    pub source: ActivitySource,
    pub damage_per_completion: u32,
    pub weekly_target: u32,
    pub tracking_mode: TrackingMode,
    pub damage_per_week: u32,
    pub enabled: bool,
}

impl ActivityDescriptor {
    #[must_use]
    pub fn builtin(config: &ActivityConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            origin: ActivityOrigin::Builtin,
            source: ActivitySource::new(&config.folder, &config.field),
            damage_per_completion: config.damage_per_completion,
            weekly_target: config.weekly_target,
            tracking_mode: config.tracking_mode,
            damage_per_week: config.damage_per_week,
            enabled: config.enabled,
        }
    }

    #[must_use]
    pub fn custom_habit(habit: &CustomHabitConfig) -> Self {
        Self {
            id: habit.id.clone(),
            name: habit.name.clone(),
            origin: ActivityOrigin::CustomHabit,
            source: ActivitySource::new(&habit.folder, &habit.field),
            damage_per_completion: habit.damage,
            weekly_target: habit.weekly_target,
            tracking_mode: TrackingMode::Daily,
            damage_per_week: 0,
            enabled: habit.enabled,
        }
    }

    /// Ledger key. Custom habits are namespaced so they cannot collide with
    /// built-in ids.
    #[must_use]
    pub fn ledger_key(&self) -> String {
        match self.origin {
            ActivityOrigin::Builtin => self.id.clone(),
            ActivityOrigin::CustomHabit => format!("custom:{}", self.id),
        }
    }
}

impl From<&ActivityConfig> for ActivityDescriptor {
    fn from(value: &ActivityConfig) -> Self {
        Self::builtin(value)
    }
}

impl From<&CustomHabitConfig> for ActivityDescriptor {
    fn from(value: &CustomHabitConfig) -> Self {
        Self::custom_habit(value)
    }
}

/// Sum of weekly targets over enabled activities.
#[must_use]
pub fn total_weekly_target(activities: &[ActivityDescriptor]) -> u32 {
    activities
        .iter()
        .filter(|a| a.enabled)
        .map(|a| a.weekly_target)
        .fold(0_u32, u32::saturating_add)
}

/// Smallest positive weekly target over enabled activities, or 1 when none
/// exist.
#[must_use]
pub fn lowest_weekly_target(activities: &[ActivityDescriptor]) -> u32 {
    activities
        .iter()
        .filter(|a| a.enabled && a.weekly_target > 0)
        .map(|a| a.weekly_target)
        .min()
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workout() -> ActivityConfig {
        ActivityConfig {
            id: String::from("workout"),
            name: String::from("Workout"),
            folder: String::from("Journal/Workouts"),
            field: String::from("done"),
            damage_per_completion: 2,
            weekly_target: 4,
            tracking_mode: TrackingMode::Daily,
            damage_per_week: 0,
            enabled: true,
        }
    }

    #[test]
    fn custom_habits_share_the_descriptor_shape() {
        let habit = CustomHabitConfig {
            id: String::from("workout"),
            name: String::from("Stretch"),
            folder: String::from("Habits"),
            field: String::from("stretch"),
            damage: 1,
            weekly_target: 7,
            enabled: false,
        };
        let builtin = ActivityDescriptor::from(&workout());
        let custom = ActivityDescriptor::from(&habit);
        assert_eq!(custom.tracking_mode, TrackingMode::Daily);
        assert_ne!(builtin.ledger_key(), custom.ledger_key());
        assert_eq!(custom.source, ActivitySource::new("Habits", "stretch"));
    }

    #[test]
    fn totals_ignore_disabled_activities() {
        let mut off = workout();
        off.enabled = false;
        off.weekly_target = 100;
        let activities = vec![
            ActivityDescriptor::builtin(&workout()),
            ActivityDescriptor::builtin(&off),
        ];
        assert_eq!(total_weekly_target(&activities), 4);
        assert_eq!(lowest_weekly_target(&activities), 4);
        assert_eq!(lowest_weekly_target(&[]), 1);
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let parsed: ActivityConfig = serde_json::from_str(
            r#"{"id":"read","name":"Read","folder":"Books","field":"read"}"#,
        )
        .unwrap();
        assert_eq!(parsed.damage_per_completion, 1);
        assert_eq!(parsed.weekly_target, 7);
        assert!(parsed.enabled);
    }
}
