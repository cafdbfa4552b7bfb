//! Reward drops: earning, expiry, banking, and claims.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::constants::{
    BANKING_MIN_TIER, MAX_BANKED_REWARDS, REWARD_EXPIRY_DAYS, REWARD_INTERVALS,
    REWARD_MICRO_MAX_TIER, REWARD_MINI_MAX_TIER, REWARD_QUALITY_MAX_TIER,
    REWARD_STANDARD_MAX_TIER,
};

/// Reward size bucket derived from the player's tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardTier {
    Micro,
    Mini,
    Standard,
    Quality,
    Premium,
}

impl RewardTier {
    pub const ALL: [Self; 5] = [
        Self::Micro,
        Self::Mini,
        Self::Standard,
        Self::Quality,
        Self::Premium,
    ];

    #[must_use]
    pub const fn for_player_tier(tier: u8) -> Self {
        if tier <= REWARD_MICRO_MAX_TIER {
            Self::Micro
        } else if tier <= REWARD_MINI_MAX_TIER {
            Self::Mini
        } else if tier <= REWARD_STANDARD_MAX_TIER {
            Self::Standard
        } else if tier <= REWARD_QUALITY_MAX_TIER {
            Self::Quality
        } else {
            Self::Premium
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Micro => 0,
            Self::Mini => 1,
            Self::Standard => 2,
            Self::Quality => 3,
            Self::Premium => 4,
        }
    }

    /// New completions needed per activity-triggered drop.
    #[must_use]
    pub const fn activity_interval(self) -> u32 {
        REWARD_INTERVALS[self.index()].0
    }

    /// Perfect weeks needed per streak-triggered drop.
    #[must_use]
    pub const fn streak_interval(self) -> u32 {
        REWARD_INTERVALS[self.index()].1
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Micro => "micro",
            Self::Mini => "mini",
            Self::Standard => "standard",
            Self::Quality => "quality",
            Self::Premium => "premium",
        }
    }
}

impl fmt::Display for RewardTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardKind {
    Activity,
    Streak,
    Boss,
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Activity => "activity",
            Self::Streak => "streak",
            Self::Boss => "boss",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReward {
    pub id: String,
    pub tier: RewardTier,
    pub kind: RewardKind,
    pub earned_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingReward {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankedReward {
    pub id: String,
    pub tier: RewardTier,
    pub kind: RewardKind,
    pub banked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedReward {
    pub id: String,
    pub tier: RewardTier,
    pub kind: RewardKind,
    pub choice: String,
    pub earned_at: DateTime<Utc>,
    pub claimed_at: DateTime<Utc>,
    #[serde(default)]
    pub used: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RewardState {
    pub activity_reward_counter: u32,
    pub streak_reward_counter: u32,
    pub pending_rewards: Vec<PendingReward>,
    pub banked_rewards: Vec<BankedReward>,
    pub claimed_rewards: Vec<ClaimedReward>,
    pub next_reward_id: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RewardError {
    #[error("no pending reward with id {0}")]
    UnknownPending(String),
    #[error("no banked reward with id {0}")]
    UnknownBanked(String),
    #[error("no claimed reward with id {0}")]
    UnknownClaimed(String),
    #[error("banking unlocks at tier {min} (current tier {tier})")]
    BankingLocked { tier: u8, min: u8 },
    #[error("reward bank is full ({capacity} slots)")]
    BankFull { capacity: usize },
}

fn expiry_window() -> Duration {
    Duration::days(REWARD_EXPIRY_DAYS)
}

impl RewardState {
    fn mint(&mut self, tier: RewardTier, kind: RewardKind, now: DateTime<Utc>) -> PendingReward {
        self.next_reward_id = self.next_reward_id.saturating_add(1);
        let reward = PendingReward {
            id: format!("reward-{}", self.next_reward_id),
            tier,
            kind,
            earned_at: now,
            expires_at: now + expiry_window(),
        };
        self.pending_rewards.push(reward.clone());
        reward
    }

    /// Add new completions to the activity counter and emit one reward for
    /// every full interval crossed.
    pub fn accrue_activity(
        &mut self,
        new_completions: u32,
        interval: u32,
        tier: RewardTier,
        now: DateTime<Utc>,
    ) -> Vec<PendingReward> {
        let interval = interval.max(1);
        self.activity_reward_counter = self.activity_reward_counter.saturating_add(new_completions);
        let mut earned = Vec::new();
        while self.activity_reward_counter >= interval {
            self.activity_reward_counter -= interval;
            earned.push(self.mint(tier, RewardKind::Activity, now));
        }
        earned
    }

    /// Count one confirmed perfect week toward the streak reward.
    pub fn accrue_perfect_week(
        &mut self,
        interval: u32,
        tier: RewardTier,
        now: DateTime<Utc>,
    ) -> Option<PendingReward> {
        self.streak_reward_counter = self.streak_reward_counter.saturating_add(1);
        if self.streak_reward_counter >= interval.max(1) {
            self.streak_reward_counter = 0;
            return Some(self.mint(tier, RewardKind::Streak, now));
        }
        None
    }

    /// Unconditional drop for a boss defeat.
    pub fn award_boss(&mut self, tier: RewardTier, now: DateTime<Utc>) -> PendingReward {
        self.mint(tier, RewardKind::Boss, now)
    }

    /// Remove and return every pending reward whose expiry has passed.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> Vec<PendingReward> {
        let (expired, live): (Vec<_>, Vec<_>) = self
            .pending_rewards
            .drain(..)
            .partition(|reward| reward.is_expired(now));
        self.pending_rewards = live;
        expired
    }

    fn take_pending(&mut self, id: &str) -> Result<PendingReward, RewardError> {
        let idx = self
            .pending_rewards
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| RewardError::UnknownPending(id.to_string()))?;
        Ok(self.pending_rewards.remove(idx))
    }

    /// Finalize a pending reward into claim history.
    ///
    /// # Errors
    ///
    /// Returns [`RewardError::UnknownPending`] when no pending reward has `id`.
    pub fn claim(
        &mut self,
        id: &str,
        choice: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<ClaimedReward, RewardError> {
        let pending = self.take_pending(id)?;
        let claimed = ClaimedReward {
            id: pending.id,
            tier: pending.tier,
            kind: pending.kind,
            choice: choice.into(),
            earned_at: pending.earned_at,
            claimed_at: now,
            used: false,
        };
        self.claimed_rewards.push(claimed.clone());
        Ok(claimed)
    }

    /// Move a pending reward into the bank.
    ///
    /// # Errors
    ///
    /// Fails below the banking tier, when the bank is full, or when `id` is
    /// not pending. Nothing changes on failure.
    pub fn bank(
        &mut self,
        id: &str,
        player_tier: u8,
        now: DateTime<Utc>,
    ) -> Result<BankedReward, RewardError> {
        if player_tier < BANKING_MIN_TIER {
            return Err(RewardError::BankingLocked {
                tier: player_tier,
                min: BANKING_MIN_TIER,
            });
        }
        if self.banked_rewards.len() >= MAX_BANKED_REWARDS {
            return Err(RewardError::BankFull {
                capacity: MAX_BANKED_REWARDS,
            });
        }
        let pending = self.take_pending(id)?;
        let banked = BankedReward {
            id: pending.id,
            tier: pending.tier,
            kind: pending.kind,
            banked_at: now,
        };
        self.banked_rewards.push(banked.clone());
        Ok(banked)
    }

    /// Re-issue a banked reward as pending with a fresh expiry.
    ///
    /// # Errors
    ///
    /// Returns [`RewardError::UnknownBanked`] when no banked reward has `id`.
    pub fn redeem_banked(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<PendingReward, RewardError> {
        let idx = self
            .banked_rewards
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| RewardError::UnknownBanked(id.to_string()))?;
        let banked = self.banked_rewards.remove(idx);
        let reward = PendingReward {
            id: banked.id,
            tier: banked.tier,
            kind: banked.kind,
            earned_at: now,
            expires_at: now + expiry_window(),
        };
        self.pending_rewards.push(reward.clone());
        Ok(reward)
    }

    /// Toggle the `used` flag on a claimed reward.
    ///
    /// # Errors
    ///
    /// Returns [`RewardError::UnknownClaimed`] when no claim has `id`.
    pub fn mark_used(&mut self, id: &str, used: bool) -> Result<(), RewardError> {
        let claimed = self
            .claimed_rewards
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RewardError::UnknownClaimed(id.to_string()))?;
        claimed.used = used;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn buckets_follow_player_tier() {
        assert_eq!(RewardTier::for_player_tier(1), RewardTier::Micro);
        assert_eq!(RewardTier::for_player_tier(4), RewardTier::Micro);
        assert_eq!(RewardTier::for_player_tier(10), RewardTier::Mini);
        assert_eq!(RewardTier::for_player_tier(16), RewardTier::Standard);
        assert_eq!(RewardTier::for_player_tier(22), RewardTier::Quality);
        assert_eq!(RewardTier::for_player_tier(26), RewardTier::Premium);
    }

    #[test]
    fn intervals_strictly_increase() {
        for pair in RewardTier::ALL.windows(2) {
            assert!(pair[0].activity_interval() < pair[1].activity_interval());
            assert!(pair[0].streak_interval() < pair[1].streak_interval());
        }
    }

    #[test]
    fn crossing_multiple_intervals_emits_multiple_rewards() {
        let mut state = RewardState::default();
        let earned = state.accrue_activity(7, 3, RewardTier::Micro, now());
        assert_eq!(earned.len(), 2);
        assert_eq!(state.activity_reward_counter, 1);
        assert_eq!(state.pending_rewards.len(), 2);
        assert_ne!(earned[0].id, earned[1].id);
    }

    #[test]
    fn streak_counter_resets_after_drop() {
        let mut state = RewardState::default();
        assert!(state.accrue_perfect_week(2, RewardTier::Mini, now()).is_none());
        let reward = state.accrue_perfect_week(2, RewardTier::Mini, now()).unwrap();
        assert_eq!(reward.kind, RewardKind::Streak);
        assert_eq!(state.streak_reward_counter, 0);
    }

    #[test]
    fn sweep_removes_only_expired() {
        let mut state = RewardState::default();
        let stale = now() - Duration::days(8);
        state.accrue_activity(3, 3, RewardTier::Micro, stale);
        state.award_boss(RewardTier::Micro, now());
        let expired = state.sweep_expired(now());
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].earned_at, stale);
        assert_eq!(state.pending_rewards.len(), 1);
        assert_eq!(state.pending_rewards[0].kind, RewardKind::Boss);
    }

    #[test]
    fn banking_requires_tier_and_capacity() {
        let mut state = RewardState::default();
        for _ in 0..4 {
            state.award_boss(RewardTier::Standard, now());
        }
        assert_eq!(
            state.bank("reward-1", 10, now()),
            Err(RewardError::BankingLocked { tier: 10, min: 11 })
        );
        for id in ["reward-1", "reward-2", "reward-3"] {
            state.bank(id, 11, now()).unwrap();
        }
        assert_eq!(
            state.bank("reward-4", 11, now()),
            Err(RewardError::BankFull { capacity: 3 })
        );
        assert_eq!(state.pending_rewards.len(), 1);
    }

    #[test]
    fn redeem_issues_fresh_expiry() {
        let mut state = RewardState::default();
        let earned = state.award_boss(RewardTier::Standard, now());
        state.bank(&earned.id, 12, now()).unwrap();
        let later = now() + Duration::days(30);
        let redeemed = state.redeem_banked(&earned.id, later).unwrap();
        assert_eq!(redeemed.expires_at, later + Duration::days(7));
        assert!(state.banked_rewards.is_empty());
        assert!(state.sweep_expired(later).is_empty());
    }

    #[test]
    fn claim_moves_into_history_and_can_be_marked_used() {
        let mut state = RewardState::default();
        let earned = state.award_boss(RewardTier::Micro, now());
        let claimed = state.claim(&earned.id, "Fancy coffee", now()).unwrap();
        assert!(!claimed.used);
        assert!(state.pending_rewards.is_empty());
        state.mark_used(&earned.id, true).unwrap();
        assert!(state.claimed_rewards[0].used);
        assert_eq!(
            state.claim(&earned.id, "again", now()),
            Err(RewardError::UnknownPending(earned.id.clone()))
        );
    }
}
