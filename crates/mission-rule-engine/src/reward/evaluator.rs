//! 奖励条件评估器
//!
//! 每个具名槽位都是一个高层叶子条件，按各自的规则对 [`RewardContext`] 求值，
//! 再按 `mode` 组合。诊断条目与通用条件使用同一结构。

use super::models::{
    LeaderboardScoreCondition, RequiresRewardsCondition, RequiresRewardsMode, RewardConditions,
    RewardContext, TimeWindow, Uniqueness, UserSegment,
};
use crate::error::{Result, RuleError};
use crate::evaluator::ConditionEvaluator;
use crate::models::CheckResult;
use crate::operators::LogicalOperator;
use crate::time::{add_days, parse_instant, start_of_day, ParsedInstant};
use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// 奖励条件评估结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardOutcome {
    pub passed: bool,
    pub checks: Vec<CheckResult>,
    /// 需由后端服务处理、本引擎未求值的槽位
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deferred: Vec<String>,
}

/// 时间窗口上界
enum UpperBound {
    Inclusive(DateTime<FixedOffset>),
    Exclusive(DateTime<FixedOffset>),
}

impl UpperBound {
    fn admits(&self, now: &DateTime<FixedOffset>) -> bool {
        match self {
            Self::Inclusive(end) => now <= end,
            Self::Exclusive(end) => now < end,
        }
    }
}

/// 奖励条件评估器
pub struct RewardConditionEvaluator;

impl RewardConditionEvaluator {
    /// 评估奖励领取条件
    ///
    /// 未配置条件或没有任何可求值槽位时直接通过。
    pub fn evaluate(
        conditions: Option<&RewardConditions>,
        context: &RewardContext,
    ) -> Result<RewardOutcome> {
        let Some(conditions) = conditions else {
            return Ok(RewardOutcome {
                passed: true,
                checks: Vec::new(),
                deferred: Vec::new(),
            });
        };

        Self::validate(conditions).inspect_err(|e| {
            warn!(user_id = %context.user_id, code = e.code(), error = %e, "奖励条件配置错误");
        })?;

        let mut checks = Vec::new();
        let mut slot_results = Vec::new();

        if let Some(requires) = &conditions.requires_rewards {
            // 数组形式的多个前置条件之间隐式 AND
            let mut all_passed = true;
            for cond in requires.as_slice() {
                let check = Self::check_requires_rewards(cond, context);
                all_passed &= check.passed;
                checks.push(check);
            }
            slot_results.push(all_passed);
        }

        if let Some(window) = &conditions.time_window {
            let check = Self::check_time_window(window, &context.now)?;
            slot_results.push(check.passed);
            checks.push(check);
        }

        if let Some(uniqueness) = &conditions.uniqueness {
            let check = Self::check_uniqueness(uniqueness, context);
            slot_results.push(check.passed);
            checks.push(check);
        }

        if let Some(segment) = &conditions.requires_user_segment {
            let check = Self::check_user_segment(segment, context);
            slot_results.push(check.passed);
            checks.push(check);
        }

        if let Some(leaderboard) = &conditions.requires_leaderboard_score {
            let check = Self::check_leaderboard_score(leaderboard, context)?;
            slot_results.push(check.passed);
            checks.push(check);
        }

        let passed = if slot_results.is_empty() {
            true
        } else {
            match conditions.mode() {
                LogicalOperator::And => slot_results.iter().all(|r| *r),
                LogicalOperator::Or => slot_results.iter().any(|r| *r),
            }
        };

        let deferred: Vec<String> = conditions
            .deferred_slots()
            .into_iter()
            .map(str::to_string)
            .collect();

        debug!(
            user_id = %context.user_id,
            passed,
            checks = checks.len(),
            deferred = ?deferred,
            "奖励条件评估完成"
        );

        Ok(RewardOutcome {
            passed,
            checks,
            deferred,
        })
    }

    /// 校验奖励条件配置
    pub fn validate(conditions: &RewardConditions) -> Result<()> {
        if let Some(window) = &conditions.time_window {
            Self::validate_time_window(window)?;
        }

        if let Some(uniqueness) = &conditions.uniqueness {
            if uniqueness.max_per_user == 0 {
                return Err(RuleError::InvalidValue {
                    field: "uniqueness.maxPerUser".to_string(),
                    reason: "必须大于 0".to_string(),
                });
            }
        }

        if let Some(leaderboard) = &conditions.requires_leaderboard_score {
            ConditionEvaluator::check_operand(&leaderboard.op, &leaderboard.value)?;
        }

        Ok(())
    }

    fn validate_time_window(window: &TimeWindow) -> Result<()> {
        // 使用 UTC 偏移只为检查格式，实际求值按 now 的偏移解释日期
        let utc = Utc.fix();
        if let Some(start) = &window.start_date {
            parse_lower_bound(start, utc)?;
        }
        if let Some(end) = &window.end_date {
            parse_upper_bound(end, utc)?;
        }

        if let Some(days) = &window.days_of_week {
            if let Some(day) = days.iter().find(|d| **d > 6) {
                return Err(RuleError::InvalidValue {
                    field: "timeWindow.daysOfWeek".to_string(),
                    reason: format!("星期取值必须在 0-6 之间，实际为 {}", day),
                });
            }
        }

        if let Some((start, end)) = window.hours {
            if end > 24 {
                return Err(RuleError::InvalidValue {
                    field: "timeWindow.hours".to_string(),
                    reason: format!("小时取值必须在 0-24 之间，实际为 [{}, {}]", start, end),
                });
            }
            // 不支持跨零点的区间（如 22-6）
            if start > end {
                return Err(RuleError::InvalidValue {
                    field: "timeWindow.hours".to_string(),
                    reason: format!("开始小时 {} 大于结束小时 {}，不支持跨零点区间", start, end),
                });
            }
        }

        Ok(())
    }

    fn check_requires_rewards(
        cond: &RequiresRewardsCondition,
        context: &RewardContext,
    ) -> CheckResult {
        let effective = cond.effective_reward_ids();
        let held: Vec<&str> = effective
            .iter()
            .copied()
            .filter(|id| context.granted_reward_ids.contains(*id))
            .collect();

        // 剔除后为空时：all 恒真，any 恒假
        let passed = match cond.mode {
            RequiresRewardsMode::All => held.len() == effective.len(),
            RequiresRewardsMode::Any => !held.is_empty(),
        };

        let mode = match cond.mode {
            RequiresRewardsMode::All => "all",
            RequiresRewardsMode::Any => "any",
        };

        CheckResult::new(
            format!(
                "requires {} of rewards [{}] (held: [{}])",
                mode,
                effective.join(", "),
                held.join(", ")
            ),
            passed,
        )
    }

    fn check_time_window(window: &TimeWindow, now: &DateTime<FixedOffset>) -> Result<CheckResult> {
        let offset = *now.offset();
        let mut failures = Vec::new();

        if let Some(start) = &window.start_date {
            if *now < parse_lower_bound(start, offset)? {
                failures.push(format!("before start {}", start));
            }
        }

        if let Some(end) = &window.end_date {
            if !parse_upper_bound(end, offset)?.admits(now) {
                failures.push(format!("after end {}", end));
            }
        }

        if let Some(days) = &window.days_of_week {
            let today = now.weekday().num_days_from_sunday();
            if !days.contains(&today) {
                failures.push(format!("day {} not in {:?}", today, days));
            }
        }

        if let Some((start, end)) = window.hours {
            let hour = now.hour();
            if hour < start || hour >= end {
                failures.push(format!("hour {} not in [{}, {})", hour, start, end));
            }
        }

        let description = if failures.is_empty() {
            format!("time window satisfied at {}", now.to_rfc3339())
        } else {
            format!("time window: {}", failures.join("; "))
        };

        Ok(CheckResult::new(description, failures.is_empty()))
    }

    fn check_uniqueness(uniqueness: &Uniqueness, context: &RewardContext) -> CheckResult {
        CheckResult::new(
            format!(
                "granted {} of max {} per user",
                context.prior_grants, uniqueness.max_per_user
            ),
            context.prior_grants < uniqueness.max_per_user,
        )
    }

    fn check_user_segment(segment: &UserSegment, context: &RewardContext) -> CheckResult {
        let phone = context.phone_number.as_deref();

        // 空列表与未设置等价
        let allow_ids = segment.user_ids.as_deref().filter(|l| !l.is_empty());
        let allow_phones = segment.phone_numbers.as_deref().filter(|l| !l.is_empty());

        let included = if allow_ids.is_none() && allow_phones.is_none() {
            true
        } else {
            allow_ids.is_some_and(|ids| ids.contains(&context.user_id))
                || allow_phones
                    .zip(phone)
                    .is_some_and(|(phones, p)| phones.iter().any(|x| x == p))
        };

        let excluded = segment
            .exclude_user_ids
            .as_deref()
            .is_some_and(|ids| ids.contains(&context.user_id))
            || segment
                .exclude_phone_numbers
                .as_deref()
                .zip(phone)
                .is_some_and(|(phones, p)| phones.iter().any(|x| x == p));

        let description = if excluded {
            format!("user {} is in the exclusion list", context.user_id)
        } else if included {
            format!("user {} is in the segment", context.user_id)
        } else {
            format!("user {} is not in the segment", context.user_id)
        };

        CheckResult::new(description, included && !excluded)
    }

    fn check_leaderboard_score(
        cond: &LeaderboardScoreCondition,
        context: &RewardContext,
    ) -> Result<CheckResult> {
        let score = context.leaderboard_score.map(Value::from);
        let leaf = ConditionEvaluator::evaluate(score.as_ref(), &cond.op, &cond.value)?;

        let mut description = format!("leaderboard score {} {}", cond.op.symbol(), cond.value);
        if let Some(period) = cond.period {
            description.push_str(&format!(" ({:?})", period).to_lowercase());
        }
        match (leaf.note(), &score) {
            (Some(note), _) => description.push_str(&format!(" ({})", note)),
            (None, Some(actual)) => description.push_str(&format!(" (actual: {})", actual)),
            (None, None) => {}
        }

        Ok(CheckResult::new(description, leaf.passed()))
    }
}

/// 解析窗口起点：纯日期取当天零点
fn parse_lower_bound(s: &str, offset: FixedOffset) -> Result<DateTime<FixedOffset>> {
    match parse_instant(s, "timeWindow.startDate")? {
        ParsedInstant::At(dt) => Ok(dt.with_timezone(&offset)),
        ParsedInstant::Date(date) => start_of_day(date, offset, "timeWindow.startDate"),
    }
}

/// 解析窗口终点：纯日期覆盖当天全天
fn parse_upper_bound(s: &str, offset: FixedOffset) -> Result<UpperBound> {
    match parse_instant(s, "timeWindow.endDate")? {
        ParsedInstant::At(dt) => Ok(UpperBound::Inclusive(dt.with_timezone(&offset))),
        ParsedInstant::Date(date) => {
            let start = start_of_day(date, offset, "timeWindow.endDate")?;
            Ok(UpperBound::Exclusive(add_days(start, 1, "timeWindow.endDate")?))
        }
    }
}
