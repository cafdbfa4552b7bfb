//! Centralized balance and tuning constants for Olympus progression logic.
//!
//! These values define the deterministic math for the progression engine.
//! Keeping them together ensures that balance can only be adjusted via
//! code changes reviewed in version control, rather than through the
//! persisted settings document.

// Notification keys --------------------------------------------------------
pub(crate) const LOG_BOSS_RANK_UP: &str = "log.boss.rank-up";
pub(crate) const LOG_BOSS_DEFEATED: &str = "log.boss.defeated";
pub(crate) const LOG_BOSS_CONQUERED: &str = "log.boss.conquered";
pub(crate) const LOG_REWARD_EARNED: &str = "log.reward.earned";
pub(crate) const LOG_REWARD_EXPIRED: &str = "log.reward.expired";
pub(crate) const LOG_TOKEN_EARNED: &str = "log.discipline.token";
pub(crate) const LOG_THRESHOLD_FAILED: &str = "log.threshold.failed";
pub(crate) const LOG_TARTARUS_ENTER: &str = "log.tartarus.enter";
pub(crate) const LOG_TARTARUS_ESCAPE: &str = "log.tartarus.escape";
pub(crate) const LOG_HADES_WRATH: &str = "log.tartarus.wrath";
pub(crate) const LOG_PERFECT_WEEK: &str = "log.streak.perfect-week";
pub(crate) const LOG_STREAK_BROKEN: &str = "log.streak.broken";
pub(crate) const LOG_SYSTEM_PAUSED: &str = "log.system.paused";
pub(crate) const LOG_SYSTEM_RESUMED: &str = "log.system.resumed";

// Tier and boss scaling ----------------------------------------------------
pub const MAX_TIER: u8 = 26;
pub const TIERS_PER_BOSS: u8 = 2;
pub(crate) const RANK_UP_HP_RATIO: f64 = 0.5;
pub(crate) const DEFAULT_MANUAL_MIN_MULT: f64 = 5.0;
pub(crate) const DEFAULT_MANUAL_MAX_MULT: f64 = 20.0;
pub(crate) const DEFAULT_AUTO_MAX_MULT: f64 = 20.0;
pub(crate) const AUTO_TIER_ONE_TARGET_WEEKS: f64 = 4.0;
pub(crate) const MIN_BOSS_HP: u32 = 1;

// Damage -------------------------------------------------------------------
pub(crate) const DISCIPLINE_DAMAGE_FACTOR: u32 = 2;
/// Streak multipliers indexed by consecutive perfect weeks; the last entry
/// applies to every longer streak.
pub(crate) const STREAK_MULTIPLIERS: [f64; 6] = [1.00, 1.05, 1.12, 1.20, 1.30, 1.40];

// Discipline token economy -------------------------------------------------
pub const MAX_DISCIPLINE_TOKENS: u8 = 3;
pub(crate) const DISCIPLINE_COMPLETIONS_PER_TOKEN: u32 = 5;
pub(crate) const TOKEN_COST_SKIP_TASK: u8 = 1;
pub(crate) const TOKEN_COST_ESCAPE: u8 = 3;

// Death threshold and Tartarus ----------------------------------------------
pub(crate) const THRESHOLD_WINDOW_DAYS: i64 = 3;
pub(crate) const THRESHOLD_REQUIRED_RATIO: f64 = 0.1;
pub const MAX_FAILED_THRESHOLD_DAYS: u8 = 3;
pub(crate) const HADES_WRATH_AFTER_DAYS: i64 = 3;
pub(crate) const PENANCE_LOW_MAX_TIER: u8 = 4;
pub(crate) const PENANCE_MID_MAX_TIER: u8 = 12;
pub(crate) const PENANCE_TASKS_LOW: usize = 3;
pub(crate) const PENANCE_TASKS_MID: usize = 4;
pub(crate) const PENANCE_TASKS_HIGH: usize = 5;
pub(crate) const PENANCE_SEED_DOMAIN: u64 = 0x7A27_A305;

// Rewards ------------------------------------------------------------------
pub(crate) const REWARD_EXPIRY_DAYS: i64 = 7;
pub const MAX_BANKED_REWARDS: usize = 3;
pub const BANKING_MIN_TIER: u8 = 11;
pub(crate) const REWARD_MICRO_MAX_TIER: u8 = 4;
pub(crate) const REWARD_MINI_MAX_TIER: u8 = 10;
pub(crate) const REWARD_STANDARD_MAX_TIER: u8 = 16;
pub(crate) const REWARD_QUALITY_MAX_TIER: u8 = 22;
/// `(activity_interval, streak_interval)` per reward bucket, micro to premium.
pub(crate) const REWARD_INTERVALS: [(u32, u32); 5] = [(3, 1), (5, 2), (8, 3), (12, 4), (18, 5)];

// Clock --------------------------------------------------------------------
pub(crate) const SIMULATED_HOUR: u32 = 12;

// Settings schema ------------------------------------------------------------
pub const SETTINGS_SCHEMA_VERSION: u32 = 3;
