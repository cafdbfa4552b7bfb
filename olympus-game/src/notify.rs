//! Notification port for human-readable engine events.
//!
//! The engine never owns a logger or a global event buffer. Callers inject a
//! [`NotificationSink`]; tests typically pass a `Vec<Notification>` and assert
//! on what was emitted.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock::SystemState;
use crate::constants::{
    LOG_BOSS_CONQUERED, LOG_BOSS_DEFEATED, LOG_BOSS_RANK_UP, LOG_HADES_WRATH, LOG_PERFECT_WEEK,
    LOG_REWARD_EARNED, LOG_REWARD_EXPIRED, LOG_STREAK_BROKEN, LOG_SYSTEM_PAUSED,
    LOG_SYSTEM_RESUMED, LOG_TARTARUS_ENTER, LOG_TARTARUS_ESCAPE, LOG_THRESHOLD_FAILED,
    LOG_TOKEN_EARNED, THRESHOLD_WINDOW_DAYS,
};
use crate::rewards::{RewardKind, RewardTier};
use crate::tartarus::EscapeMethod;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    RankUp {
        tier: u8,
        boss: String,
    },
    BossDefeated {
        boss: String,
        new_tier: u8,
    },
    Conquered {
        boss: String,
    },
    RewardEarned {
        id: String,
        kind: RewardKind,
        tier: RewardTier,
    },
    RewardExpired {
        id: String,
        tier: RewardTier,
    },
    TokenEarned {
        tokens: u8,
    },
    ThresholdFailed {
        actual: u32,
        required: u32,
        days_until_tartarus: u8,
    },
    TartarusEntered {
        tasks: usize,
    },
    TartarusEscaped {
        method: EscapeMethod,
    },
    HadesWrath {
        added: usize,
    },
    PerfectWeek {
        streak: u32,
    },
    StreakBroken {
        previous: u32,
    },
    SystemToggled {
        state: SystemState,
    },
}

impl Notification {
    /// Stable key for the event, independent of its display text.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::RankUp { .. } => LOG_BOSS_RANK_UP,
            Self::BossDefeated { .. } => LOG_BOSS_DEFEATED,
            Self::Conquered { .. } => LOG_BOSS_CONQUERED,
            Self::RewardEarned { .. } => LOG_REWARD_EARNED,
            Self::RewardExpired { .. } => LOG_REWARD_EXPIRED,
            Self::TokenEarned { .. } => LOG_TOKEN_EARNED,
            Self::ThresholdFailed { .. } => LOG_THRESHOLD_FAILED,
            Self::TartarusEntered { .. } => LOG_TARTARUS_ENTER,
            Self::TartarusEscaped { .. } => LOG_TARTARUS_ESCAPE,
            Self::HadesWrath { .. } => LOG_HADES_WRATH,
            Self::PerfectWeek { .. } => LOG_PERFECT_WEEK,
            Self::StreakBroken { .. } => LOG_STREAK_BROKEN,
            Self::SystemToggled {
                state: SystemState::Paused,
            } => LOG_SYSTEM_PAUSED,
            Self::SystemToggled {
                state: SystemState::Active,
            } => LOG_SYSTEM_RESUMED,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RankUp { tier, boss } => {
                write!(f, "Ranked up to tier {tier} while fighting the {boss}")
            }
            Self::BossDefeated { boss, new_tier } => {
                write!(f, "The {boss} is defeated! Advancing to tier {new_tier}")
            }
            Self::Conquered { boss } => write!(f, "{boss} has fallen. Olympus is yours"),
            Self::RewardEarned { kind, tier, .. } => {
                write!(f, "Reward earned: {tier} ({kind})")
            }
            Self::RewardExpired { tier, .. } => write!(f, "A {tier} reward expired unclaimed"),
            Self::TokenEarned { tokens } => {
                write!(f, "Discipline token earned ({tokens} held)")
            }
            Self::ThresholdFailed {
                actual,
                required,
                days_until_tartarus,
            } => write!(
                f,
                "Only {actual} of {required} completions in the last \
                 {THRESHOLD_WINDOW_DAYS} days; {days_until_tartarus} days until Tartarus"
            ),
            Self::TartarusEntered { tasks } => {
                write!(f, "Cast into Tartarus: {tasks} penance tasks await")
            }
            Self::TartarusEscaped { method } => write!(f, "Escaped Tartarus via {method}"),
            Self::HadesWrath { added } => {
                write!(f, "Hades' Wrath! {added} penance tasks added")
            }
            Self::PerfectWeek { streak } => {
                write!(f, "Perfect week! Streak is now {streak}")
            }
            Self::StreakBroken { previous } => {
                write!(f, "Streak of {previous} perfect weeks broken")
            }
            Self::SystemToggled { state } => write!(f, "System {state}"),
        }
    }
}

/// Receiver for engine events. Informational only; nothing flows back.
pub trait NotificationSink {
    fn notify(&mut self, event: &Notification);
}

impl NotificationSink for Vec<Notification> {
    fn notify(&mut self, event: &Notification) {
        self.push(event.clone());
    }
}

/// Forwards events to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&mut self, event: &Notification) {
        log::info!("[{}] {event}", event.key());
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&mut self, _event: &Notification) {}
}

impl<S: NotificationSink + ?Sized> NotificationSink for &mut S {
    fn notify(&mut self, event: &Notification) {
        (**self).notify(event);
    }
}
