//! 奖励领取条件与资格校验

pub mod eligibility;
pub mod evaluator;
pub mod models;

pub use eligibility::{EligibilityReason, RewardEligibility};
pub use evaluator::{RewardConditionEvaluator, RewardOutcome};
pub use models::{
    HandlerType, LeaderboardPeriod, LeaderboardScoreCondition, OneOrMany,
    RequiresRewardsCondition, RequiresRewardsMode, Reward, RewardConditions, RewardContext,
    ShareConfig, TimeWindow, Uniqueness, UserSegment,
};
