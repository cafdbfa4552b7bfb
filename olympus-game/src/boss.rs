//! Boss fight system: HP scaling and tier advancement.
use serde::{Deserialize, Serialize};

use crate::constants::{
    AUTO_TIER_ONE_TARGET_WEEKS, DEFAULT_AUTO_MAX_MULT, DEFAULT_MANUAL_MAX_MULT,
    DEFAULT_MANUAL_MIN_MULT, MAX_TIER, MIN_BOSS_HP, RANK_UP_HP_RATIO, TIERS_PER_BOSS,
};
use crate::numbers::round_f64_to_u32;

/// Boss names, one per tier pair.
pub const BOSS_NAMES: [&str; 13] = [
    "Nemean Lion",
    "Lernaean Hydra",
    "Stymphalian Flock",
    "Cretan Bull",
    "Erymanthian Boar",
    "Geryon",
    "Scylla",
    "Charybdis",
    "Medusa",
    "Minotaur",
    "Typhon",
    "Kronos",
    "Hades",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScalingMode {
    /// Multiply the weekly target total by a multiplier interpolated across
    /// tiers.
    Manual {
        #[serde(default = "default_min_mult")]
        min_mult: f64,
        #[serde(default = "default_max_mult")]
        max_mult: f64,
    },
    /// Interpolate HP directly between four weeks of the lightest activity
    /// and `auto_max_multiplier` weeks of the full target.
    AutoDynamic {
        #[serde(default = "default_auto_max_mult")]
        auto_max_multiplier: f64,
    },
}

const fn default_min_mult() -> f64 {
    DEFAULT_MANUAL_MIN_MULT
}

const fn default_max_mult() -> f64 {
    DEFAULT_MANUAL_MAX_MULT
}

const fn default_auto_max_mult() -> f64 {
    DEFAULT_AUTO_MAX_MULT
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredScaling")]
pub struct ScalingConfig {
    #[serde(flatten)]
    pub mode: ScalingMode,
    pub max_tier: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StoredMode {
    Manual,
    AutoDynamic,
}

/// Persisted scaling shape. Every key is optional; gaps take the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoredScaling {
    mode: Option<StoredMode>,
    min_mult: Option<f64>,
    max_mult: Option<f64>,
    auto_max_multiplier: Option<f64>,
    max_tier: Option<u8>,
}

impl From<StoredScaling> for ScalingConfig {
    fn from(stored: StoredScaling) -> Self {
        let mode = match stored.mode.unwrap_or(StoredMode::Manual) {
            StoredMode::Manual => ScalingMode::Manual {
                min_mult: stored.min_mult.unwrap_or(DEFAULT_MANUAL_MIN_MULT),
                max_mult: stored.max_mult.unwrap_or(DEFAULT_MANUAL_MAX_MULT),
            },
            StoredMode::AutoDynamic => ScalingMode::AutoDynamic {
                auto_max_multiplier: stored
                    .auto_max_multiplier
                    .unwrap_or(DEFAULT_AUTO_MAX_MULT),
            },
        };
        Self {
            mode,
            max_tier: stored.max_tier.unwrap_or(MAX_TIER),
        }
    }
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            mode: ScalingMode::Manual {
                min_mult: DEFAULT_MANUAL_MIN_MULT,
                max_mult: DEFAULT_MANUAL_MAX_MULT,
            },
            max_tier: MAX_TIER,
        }
    }
}

impl ScalingConfig {
    #[must_use]
    pub fn auto_dynamic() -> Self {
        Self {
            mode: ScalingMode::AutoDynamic {
                auto_max_multiplier: DEFAULT_AUTO_MAX_MULT,
            },
            max_tier: MAX_TIER,
        }
    }

    #[must_use]
    pub fn max_tier(&self) -> u8 {
        self.max_tier.max(1)
    }

    /// Fractional progress of `tier` through the tier range, in `[0, 1]`.
    #[must_use]
    pub fn tier_progress(&self, tier: u8) -> f64 {
        let max = self.max_tier();
        if max <= 1 {
            return 0.0;
        }
        let tier = tier.clamp(1, max);
        f64::from(tier - 1) / f64::from(max - 1)
    }
}

/// A zero `boss_max_hp` marks a boss that has not been scaled yet; the first
/// [`BossState::rescale`] fills it to full health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossState {
    pub current_tier: u8,
    pub boss_max_hp: u32,
    pub boss_current_hp: u32,
    /// Set once the odd tier of the current boss pair has ranked up at half
    /// HP.
    pub tier_advanced_at_50_percent: bool,
    /// Set once the final boss falls.
    pub conquered: bool,
}

impl Default for BossState {
    fn default() -> Self {
        Self {
            current_tier: 1,
            boss_max_hp: 0,
            boss_current_hp: 0,
            tier_advanced_at_50_percent: false,
            conquered: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BossTransition {
    /// Half HP reached on the first tier of a boss pair.
    RankUp { tier: u8 },
    /// HP reached zero below the final tier.
    Defeated {
        defeated_tier: u8,
        new_tier: u8,
        new_max_hp: u32,
    },
    /// The final boss fell. Emitted once.
    Conquered { tier: u8 },
}

/// Index into [`BOSS_NAMES`] for a tier; two consecutive tiers share a boss.
#[must_use]
pub fn boss_index(tier: u8) -> usize {
    let pair = tier.max(1).div_ceil(TIERS_PER_BOSS);
    usize::from(pair - 1).min(BOSS_NAMES.len() - 1)
}

#[must_use]
pub fn boss_name(tier: u8) -> &'static str {
    BOSS_NAMES[boss_index(tier)]
}

/// Boss HP for a tier under the given scaling configuration.
#[must_use]
pub fn compute_max_hp(
    total_weekly_target: u32,
    tier: u8,
    scaling: &ScalingConfig,
    lowest_weekly_target: u32,
) -> u32 {
    let progress = scaling.tier_progress(tier);
    let total = f64::from(total_weekly_target);
    let hp = match scaling.mode {
        ScalingMode::Manual { min_mult, max_mult } => {
            let multiplier = min_mult + (max_mult - min_mult) * progress;
            total * multiplier
        }
        ScalingMode::AutoDynamic {
            auto_max_multiplier,
        } => {
            let start = f64::from(lowest_weekly_target) * AUTO_TIER_ONE_TARGET_WEEKS;
            let end = total * auto_max_multiplier;
            start + (end - start) * progress
        }
    };
    round_f64_to_u32(hp).max(MIN_BOSS_HP)
}

impl BossState {
    #[must_use]
    pub fn new(max_hp: u32) -> Self {
        let max_hp = max_hp.max(MIN_BOSS_HP);
        Self {
            boss_max_hp: max_hp,
            boss_current_hp: max_hp,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn boss_name(&self) -> &'static str {
        boss_name(self.current_tier)
    }

    /// Percentage of HP remaining, 0 to 100.
    #[must_use]
    pub fn hp_percent(&self) -> f64 {
        if self.boss_max_hp == 0 {
            return 0.0;
        }
        f64::from(self.boss_current_hp) / f64::from(self.boss_max_hp) * 100.0
    }

    #[must_use]
    pub const fn is_scaled(&self) -> bool {
        self.boss_max_hp > 0
    }

    /// Install a freshly computed max HP, clamping current HP when the pool
    /// shrank. An unscaled boss starts at full health. Returns true when the
    /// max changed.
    pub fn rescale(&mut self, max_hp: u32) -> bool {
        let max_hp = max_hp.max(MIN_BOSS_HP);
        if max_hp == self.boss_max_hp {
            return false;
        }
        let fresh = !self.is_scaled();
        self.boss_max_hp = max_hp;
        if fresh {
            self.reset_hp();
        } else {
            self.boss_current_hp = self.boss_current_hp.min(max_hp);
        }
        true
    }

    /// Refill HP to the current maximum.
    pub fn reset_hp(&mut self) {
        self.boss_current_hp = self.boss_max_hp;
    }

    /// Subtract damage, saturating at zero. Returns the damage actually dealt.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let dealt = amount.min(self.boss_current_hp);
        self.boss_current_hp -= dealt;
        dealt
    }

    /// Evaluate the advancement rules once. At most one transition fires.
    pub fn check_transitions<F>(&mut self, max_tier: u8, max_hp_for_tier: F) -> Option<BossTransition>
    where
        F: FnOnce(u8) -> u32,
    {
        if !self.is_scaled() {
            return None;
        }
        let max_tier = max_tier.max(1);
        self.current_tier = self.current_tier.clamp(1, max_tier);
        let half = f64::from(self.boss_max_hp) * RANK_UP_HP_RATIO;

        if self.current_tier % TIERS_PER_BOSS == 1
            && self.current_tier < max_tier
            && self.boss_current_hp > 0
            && f64::from(self.boss_current_hp) <= half
            && !self.tier_advanced_at_50_percent
        {
            self.current_tier += 1;
            self.tier_advanced_at_50_percent = true;
            log::info!("ranked up to tier {} mid-fight", self.current_tier);
            return Some(BossTransition::RankUp {
                tier: self.current_tier,
            });
        }

        if self.boss_current_hp == 0 {
            if self.current_tier < max_tier {
                let defeated_tier = self.current_tier;
                self.current_tier += 1;
                self.tier_advanced_at_50_percent = false;
                self.boss_max_hp = max_hp_for_tier(self.current_tier).max(MIN_BOSS_HP);
                self.reset_hp();
                log::info!(
                    "{} defeated at tier {defeated_tier}; advancing to tier {}",
                    boss_name(defeated_tier),
                    self.current_tier
                );
                return Some(BossTransition::Defeated {
                    defeated_tier,
                    new_tier: self.current_tier,
                    new_max_hp: self.boss_max_hp,
                });
            }
            if !self.conquered {
                self.conquered = true;
                log::info!("final boss conquered at tier {}", self.current_tier);
                return Some(BossTransition::Conquered {
                    tier: self.current_tier,
                });
            }
        }
        None
    }
}
