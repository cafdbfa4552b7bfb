//! Olympus Progression Engine
//!
//! Platform-agnostic progression logic for a gamified habit tracker. Recorded
//! habit completions become damage against a ladder of bosses, with streak
//! bonuses, a failure state (Tartarus) and a reward economy layered on top.
//! This crate has no UI or storage dependencies; callers supply a
//! [`NoteStore`] and persist the [`Settings`] aggregate themselves.

pub mod activity;
pub mod boss;
pub mod clock;
pub mod constants;
pub mod engine;
pub mod ledger;
pub mod notify;
pub mod numbers;
pub mod rewards;
pub mod settings;
pub mod streak;
pub mod tartarus;

// Re-export commonly used types
pub use activity::{
    ActivityConfig, ActivityDescriptor, ActivityOrigin, ActivitySource, CustomHabitConfig,
    TrackingMode,
};
pub use boss::{BossState, BossTransition, ScalingConfig, ScalingMode, boss_name, compute_max_hp};
pub use clock::{ClockState, SystemState, days_between, week_key, week_start};
pub use engine::{PassReport, ProgressionEngine};
pub use ledger::{
    ActivitySnapshot, CompletionLedger, CompletionRecord, DamageReport, LedgerEntry,
};
pub use notify::{LogSink, Notification, NotificationSink, NullSink};
pub use rewards::{
    BankedReward, ClaimedReward, PendingReward, RewardError, RewardKind, RewardState, RewardTier,
};
pub use settings::{Settings, SettingsError, migrate};
pub use streak::{StreakState, WeekOutcome};
pub use tartarus::{
    EscapeMethod, PenanceBand, PenanceTask, TartarusError, TartarusState, ThresholdCheck,
};

/// Read access to the notes a user records completions in.
/// Platform-specific implementations should provide this
pub trait NoteStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Every dated completion record stored under `folder` for `field`.
    ///
    /// # Errors
    ///
    /// Returns an error if the notes cannot be read.
    fn get_completions(&self, folder: &str, field: &str)
    -> Result<Vec<CompletionRecord>, Self::Error>;

    /// Number of completions marked as discipline work.
    ///
    /// # Errors
    ///
    /// Returns an error if the notes cannot be read.
    fn count_discipline_completions(&self, folder: &str, field: &str) -> Result<u32, Self::Error>;
}

impl<N: NoteStore + ?Sized> NoteStore for &N {
    type Error = N::Error;

    fn get_completions(
        &self,
        folder: &str,
        field: &str,
    ) -> Result<Vec<CompletionRecord>, Self::Error> {
        (**self).get_completions(folder, field)
    }

    fn count_discipline_completions(&self, folder: &str, field: &str) -> Result<u32, Self::Error> {
        (**self).count_discipline_completions(folder, field)
    }
}
