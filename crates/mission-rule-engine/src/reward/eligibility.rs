//! 奖励领取资格校验
//!
//! 依次检查：启用状态、总配额、分享门槛、领取条件。

use super::evaluator::{RewardConditionEvaluator, RewardOutcome};
use super::models::{Reward, RewardContext};
use crate::error::Result;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// 资格校验结果原因
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EligibilityReason {
    /// 校验通过
    Eligible,
    /// 奖励未启用
    Inactive,
    /// 配额已耗尽
    QuotaExhausted { used: u32, quota: u32 },
    /// 需先分享
    ShareRequired,
    /// 领取条件不满足
    ConditionsNotMet { failed: Vec<String> },
}

impl EligibilityReason {
    /// 返回拒绝原因的错误码
    pub fn deny_code(&self) -> Option<&'static str> {
        match self {
            Self::Eligible => None,
            Self::Inactive => Some("REWARD_INACTIVE"),
            Self::QuotaExhausted { .. } => Some("REWARD_QUOTA_EXHAUSTED"),
            Self::ShareRequired => Some("SHARE_REQUIRED"),
            Self::ConditionsNotMet { .. } => Some("CONDITIONS_NOT_MET"),
        }
    }

    /// 返回人类可读的描述信息
    pub fn message(&self) -> String {
        match self {
            Self::Eligible => "Eligible".to_string(),
            Self::Inactive => "Reward is not active".to_string(),
            Self::QuotaExhausted { used, quota } => {
                format!("Reward quota exhausted: {} used out of {}", used, quota)
            }
            Self::ShareRequired => "Reward requires sharing before it can be claimed".to_string(),
            Self::ConditionsNotMet { failed } => {
                format!("Conditions not met: {}", failed.join("; "))
            }
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// 资格校验结果
#[derive(Debug, Clone, Serialize)]
pub struct RewardEligibility {
    pub eligible: bool,
    pub reward_id: Uuid,
    pub user_id: String,
    pub reason: EligibilityReason,
    /// 只有走到条件评估时才有值
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RewardOutcome>,
}

impl Reward {
    /// 校验用户是否可以领取该奖励
    pub fn check_eligibility(&self, context: &RewardContext) -> Result<RewardEligibility> {
        let (reason, outcome) = if !self.is_active {
            (EligibilityReason::Inactive, None)
        } else if let (Some(quota), true) = (self.quota, self.is_quota_exhausted()) {
            (
                EligibilityReason::QuotaExhausted {
                    used: self.quota_used,
                    quota,
                },
                None,
            )
        } else if self.requires_share() && !context.has_shared {
            (EligibilityReason::ShareRequired, None)
        } else {
            let outcome = RewardConditionEvaluator::evaluate(self.conditions.as_ref(), context)?;
            let reason = if outcome.passed {
                EligibilityReason::Eligible
            } else {
                EligibilityReason::ConditionsNotMet {
                    failed: outcome
                        .checks
                        .iter()
                        .filter(|c| !c.passed)
                        .map(|c| c.description.clone())
                        .collect(),
                }
            };
            (reason, Some(outcome))
        };

        let result = RewardEligibility {
            eligible: reason.is_eligible(),
            reward_id: self.reward_id,
            user_id: context.user_id.clone(),
            reason,
            outcome,
        };

        self.log_eligibility(&result);
        Ok(result)
    }

    fn log_eligibility(&self, result: &RewardEligibility) {
        if result.eligible {
            info!(
                reward_id = %result.reward_id,
                user_id = %result.user_id,
                "奖励资格校验通过"
            );
        } else {
            warn!(
                reward_id = %result.reward_id,
                user_id = %result.user_id,
                deny_code = result.reason.deny_code(),
                deny_message = %result.reason.message(),
                "奖励资格校验未通过"
            );
        }
    }
}
