//! 任务规则引擎
//!
//! 游戏化平台的规则能力，支持：
//! - 任务条件（单条件 / 条件数组 / AND-OR 嵌套组）的解析、校验与评估
//! - 奖励领取条件与资格校验
//! - 奖励过期时间计算
//! - 任务生命周期分析与配置风险提示
//!
//! 所有评估都是纯函数：不做 I/O，相同输入得到相同输出。

pub mod cli;
pub mod compiler;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod expiration;
pub mod mission;
pub mod models;
pub mod operators;
pub mod reward;
pub mod time;

pub use compiler::{CompiledConditions, RuleCompiler};
pub use error::{Result, RuleError};
pub use evaluator::{ConditionEvaluator, LeafOutcome};
pub use executor::RuleExecutor;
pub use expiration::{ExpirationConfig, ExpirationMode, ExpirationPolicy};
pub use mission::{CycleAnalysis, MissionCycleAnalyzer, MissionFormData};
pub use models::{
    CheckResult, Condition, ConditionGroup, ConditionNode, Conditions, EvaluationContext,
    EvaluationOutcome,
};
pub use operators::{LogicalOperator, Operator};
pub use reward::{RewardConditionEvaluator, RewardConditions, RewardContext, RewardOutcome};
pub use time::CalendarPeriod;

/// 评估任务条件，未配置条件时直接通过
pub fn evaluate(
    conditions: Option<&Conditions>,
    ctx: &EvaluationContext,
) -> Result<EvaluationOutcome> {
    RuleExecutor::new().evaluate(conditions, ctx)
}

/// 使用默认阈值分析任务生命周期
pub fn analyze(mission: &MissionFormData) -> CycleAnalysis {
    mission::cycle::analyze(mission)
}
