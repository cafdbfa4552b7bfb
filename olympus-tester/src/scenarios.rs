use olympus_game::{ActivityConfig, CustomHabitConfig, ScalingConfig, Settings, TrackingMode};

use crate::util::split_csv;

/// A scripted player profile driven through the engine day by day.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Chance that each enabled activity is completed on a given day.
    pub completion_chance: f64,
    /// Chance that a completion is also tagged as discipline work.
    pub discipline_chance: f64,
    /// Chance per day to finish each outstanding penance task.
    pub penance_chance: f64,
    /// Whether the player walks into Tartarus once the threshold breaks.
    pub accepts_tartarus: bool,
    pub claims_rewards: bool,
    /// Half-open day range during which the system is paused.
    pub pause_window: Option<(u32, u32)>,
    pub start_tier: u8,
    pub scaling: ScalingConfig,
}

impl Scenario {
    fn base(key: &'static str, name: &'static str, description: &'static str) -> Self {
        Self {
            key,
            name,
            description,
            completion_chance: 0.8,
            discipline_chance: 0.1,
            penance_chance: 0.6,
            accepts_tartarus: true,
            claims_rewards: true,
            pause_window: None,
            start_tier: 1,
            scaling: ScalingConfig::default(),
        }
    }

    /// Fresh settings with the standard activity roster for this profile.
    #[must_use]
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.scaling = self.scaling;
        settings.boss.current_tier = self.start_tier;
        settings.activities = vec![
            activity("workout", "Workout", 4, TrackingMode::Daily, 0),
            activity("reading", "Reading", 7, TrackingMode::Daily, 0),
            activity("long-run", "Long run", 1, TrackingMode::Weekly, 6),
        ];
        settings.custom_habits = vec![CustomHabitConfig {
            id: "meditate".to_string(),
            name: "Meditate".to_string(),
            folder: "Habits/Meditate".to_string(),
            field: "done".to_string(),
            damage: 1,
            weekly_target: 5,
            enabled: true,
        }];
        settings
    }
}

fn activity(
    id: &str,
    name: &str,
    weekly_target: u32,
    tracking_mode: TrackingMode,
    damage_per_week: u32,
) -> ActivityConfig {
    ActivityConfig {
        id: id.to_string(),
        name: name.to_string(),
        folder: format!("Log/{name}"),
        field: "completed".to_string(),
        damage_per_completion: 1,
        weekly_target,
        tracking_mode,
        damage_per_week,
        enabled: true,
    }
}

#[must_use]
pub fn catalog() -> Vec<Scenario> {
    vec![
        Scenario::base(
            "steady",
            "Steady Player",
            "Completes most habits most days",
        ),
        Scenario {
            completion_chance: 1.0,
            discipline_chance: 0.3,
            ..Scenario::base(
                "perfectionist",
                "Perfectionist",
                "Never misses a habit; builds long streaks",
            )
        },
        Scenario {
            completion_chance: 0.05,
            discipline_chance: 0.0,
            penance_chance: 0.4,
            ..Scenario::base(
                "slacker",
                "Slacker",
                "Rarely records anything and spends time in Tartarus",
            )
        },
        Scenario {
            completion_chance: 0.7,
            pause_window: Some((10, 17)),
            ..Scenario::base(
                "vacation",
                "Vacation",
                "Pauses the system for a week mid-run",
            )
        },
        Scenario {
            completion_chance: 0.75,
            start_tier: 11,
            scaling: ScalingConfig::auto_dynamic(),
            ..Scenario::base(
                "veteran",
                "Veteran",
                "Starts at tier 11 with auto-dynamic scaling and banks rewards",
            )
        },
        Scenario {
            claims_rewards: false,
            ..Scenario::base(
                "hoarder",
                "Hoarder",
                "Never claims rewards and lets them expire",
            )
        },
    ]
}

#[must_use]
pub fn find_scenario(key: &str) -> Option<Scenario> {
    catalog().into_iter().find(|s| s.key == key)
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog().iter().map(|s| (s.key, s.description)).collect()
}

/// Expand a comma-separated scenario list; `all` selects the whole catalog.
#[must_use]
pub fn expand_scenarios(arg: &str) -> Vec<String> {
    let mut keys = split_csv(arg);
    if keys.iter().any(|k| k == "all") {
        keys.retain(|k| k != "all");
        for scenario in catalog() {
            if !keys.iter().any(|k| k == scenario.key) {
                keys.push(scenario.key.to_string());
            }
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_keys_are_unique_and_findable() {
        let keys: Vec<_> = catalog().iter().map(|s| s.key).collect();
        for key in &keys {
            assert_eq!(keys.iter().filter(|k| *k == key).count(), 1);
            assert!(find_scenario(key).is_some());
        }
        assert!(find_scenario("nope").is_none());
    }

    #[test]
    fn all_expands_to_the_catalog_without_duplicates() {
        let keys = expand_scenarios("slacker, all");
        assert_eq!(keys[0], "slacker");
        assert_eq!(keys.len(), catalog().len());
    }

    #[test]
    fn settings_combine_builtin_and_custom_activities() {
        let scenario = find_scenario("veteran").unwrap();
        let settings = scenario.settings();
        assert_eq!(settings.boss.current_tier, 11);
        assert_eq!(settings.activity_descriptors().len(), 4);
    }
}
