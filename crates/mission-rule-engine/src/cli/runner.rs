//! 命令执行器
//!
//! 负责执行各 CLI 子命令的具体逻辑，返回待输出的文本。

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use validator::Validate;

use gamify_shared::config::AppConfig;

use crate::compiler::RuleCompiler;
use crate::executor::RuleExecutor;
use crate::expiration::ExpirationConfig;
use crate::mission::{CycleAnalysis, MissionCycleAnalyzer, MissionFormData};
use crate::models::{Conditions, EvaluationContext};
use crate::reward::{Reward, RewardContext};

/// 命令执行器
///
/// 持有由配置派生的评估参数，main 只负责解析参数和输出。
pub struct CommandRunner {
    utc_offset: FixedOffset,
    trace_enabled: bool,
    analyzer: MissionCycleAnalyzer,
}

impl CommandRunner {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let minutes = config.evaluation.utc_offset_minutes;
        let utc_offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .with_context(|| format!("无效的时区偏移: {} 分钟", minutes))?;

        Ok(Self {
            utc_offset,
            trace_enabled: config.evaluation.trace_enabled,
            analyzer: MissionCycleAnalyzer::new(config.mission_analysis.clone()),
        })
    }

    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.utc_offset)
    }

    /// 执行 evaluate 命令
    pub fn run_evaluate(&self, conditions: &Path, context: &Path, trace: bool) -> Result<String> {
        self.evaluate(read_json(conditions)?, read_json(context)?, trace)
    }

    pub fn evaluate(&self, conditions: Value, context: Value, trace: bool) -> Result<String> {
        let conditions: Option<Conditions> =
            serde_json::from_value(conditions).context("条件格式错误")?;
        let ctx = EvaluationContext::from_value(context)?;

        let executor = if trace || self.trace_enabled {
            RuleExecutor::new().with_trace()
        } else {
            RuleExecutor::new()
        };

        let outcome = executor.evaluate(conditions.as_ref(), &ctx)?;
        info!(passed = outcome.passed, checks = outcome.checks.len(), "条件评估完成");
        to_pretty(&outcome)
    }

    /// 执行 check-reward 命令
    pub fn run_check_reward(&self, reward: &Path, context: &Path) -> Result<String> {
        self.check_reward(read_json(reward)?, read_json(context)?)
    }

    pub fn check_reward(&self, reward: Value, mut context: Value) -> Result<String> {
        let reward: Reward = serde_json::from_value(reward).context("奖励格式错误")?;
        if let Err(errors) = reward.validate() {
            warn!(reward_id = %reward.reward_id, %errors, "奖励配置未通过校验");
            bail!("奖励 {} 配置有误: {}", reward.reward_id, errors);
        }

        if let Some(obj) = context.as_object_mut() {
            if !obj.contains_key("now") {
                obj.insert("now".to_string(), json!(self.now().to_rfc3339()));
            }
        }
        let context: RewardContext =
            serde_json::from_value(context).context("用户上下文格式错误")?;

        let eligibility = reward.check_eligibility(&context)?;
        to_pretty(&eligibility)
    }

    /// 执行 analyze 命令
    pub fn run_analyze(&self, mission: &Path, as_json: bool) -> Result<String> {
        self.analyze(read_json(mission)?, as_json)
    }

    pub fn analyze(&self, mission: Value, as_json: bool) -> Result<String> {
        let mission: MissionFormData = serde_json::from_value(mission).context("任务格式错误")?;
        let analysis = self.analyzer.analyze(&mission);

        if as_json {
            to_pretty(&analysis)
        } else {
            Ok(render_analysis(&analysis))
        }
    }

    /// 执行 validate 命令，配置有误时返回错误
    pub fn run_validate(&self, mission: &Path) -> Result<String> {
        self.validate(read_json(mission)?)
    }

    pub fn validate(&self, mission: Value) -> Result<String> {
        let mission: MissionFormData = serde_json::from_value(mission).context("任务格式错误")?;
        let mut problems = Vec::new();

        if let Err(errors) = mission.validate() {
            let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
            fields.sort_by(|a, b| a.0.cmp(&b.0));
            for (field, field_errors) in fields {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    problems.push(format!("{}: {}", field, message));
                }
            }
        }

        if let Some(conditions) = &mission.conditions {
            if let Err(e) = RuleCompiler::validate(conditions) {
                problems.push(format!("conditions: {}", e));
            }
        }

        if let Some(expiration) = &mission.reward_expiration_config {
            if let Err(e) = expiration.policy() {
                problems.push(format!("rewardExpirationConfig: {}", e));
            }
        }

        if problems.is_empty() {
            return Ok(format!("{}: OK", mission.code));
        }

        bail!("{} 配置有误:\n  {}", mission.code, problems.join("\n  "))
    }

    /// 执行 expiry 命令
    pub fn run_expiry(&self, config: &Path, granted_at: Option<&str>) -> Result<String> {
        self.expiry(read_json(config)?, granted_at)
    }

    pub fn expiry(&self, config: Value, granted_at: Option<&str>) -> Result<String> {
        let config: ExpirationConfig =
            serde_json::from_value(config).context("过期配置格式错误")?;
        let granted_at = match granted_at {
            Some(s) => DateTime::parse_from_rfc3339(s)
                .with_context(|| format!("无法解析发放时间: {}", s))?,
            None => self.now(),
        };

        let expires_at = config.expires_at(granted_at)?;
        to_pretty(&json!({
            "grantedAt": granted_at.to_rfc3339(),
            "expiresAt": expires_at.map(|t| t.to_rfc3339()),
            "description": config.describe(),
        }))
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("读取文件失败: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("JSON 解析失败: {}", path.display()))
}

fn to_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("序列化输出失败")
}

fn render_analysis(analysis: &CycleAnalysis) -> String {
    let mut out = String::new();
    out.push_str(&analysis.summary);
    out.push('\n');

    for (i, step) in analysis.steps.iter().enumerate() {
        out.push_str(&format!("\n{}. {}: {}\n", i + 1, step.title, step.description));
        for detail in &step.details {
            out.push_str(&format!("   {}\n", detail));
        }
    }

    if !analysis.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for warning in &analysis.warnings {
            out.push_str(&format!("  ! {}\n", warning));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> CommandRunner {
        CommandRunner::new(&AppConfig::default()).unwrap()
    }

    fn mission() -> Value {
        json!({
            "code": "weekly-win",
            "name": "Win 3 games",
            "triggerEvent": "game:win",
            "missionType": "count",
            "missionPeriod": "weekly_mon",
            "targetValue": 3,
            "maxCompletions": 4,
            "rewardType": "score",
            "rewardValue": 50
        })
    }

    #[test]
    fn test_invalid_offset_rejected() {
        let mut config = AppConfig::default();
        config.evaluation.utc_offset_minutes = 24 * 60;
        assert!(CommandRunner::new(&config).is_err());

        // 换算成秒时溢出 i32
        config.evaluation.utc_offset_minutes = i32::MAX;
        assert!(CommandRunner::new(&config).is_err());
    }

    #[test]
    fn test_evaluate_outputs_outcome() {
        let output = runner()
            .evaluate(
                json!([{"field": "score", "op": "gte", "value": 100}]),
                json!({"score": 120}),
                false,
            )
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["passed"], json!(true));
        assert_eq!(value["checks"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_evaluate_null_conditions() {
        let output = runner().evaluate(Value::Null, json!({}), false).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["passed"], json!(true));
    }

    #[test]
    fn test_evaluate_rejects_non_object_context() {
        assert!(runner().evaluate(Value::Null, json!([1, 2]), false).is_err());
    }

    #[test]
    fn test_check_reward_injects_now() {
        let reward = json!({
            "rewardId": "0190a6f4-0000-7000-8000-000000000001",
            "gameId": "0190a6f4-0000-7000-8000-000000000002",
            "name": "Badge",
            "handlerType": "system",
            "probability": 100.0
        });
        let output = runner()
            .check_reward(reward, json!({"userId": "u-1"}))
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["eligible"], json!(true));
    }

    #[test]
    fn test_check_reward_rejects_invalid_reward() {
        let reward = json!({
            "rewardId": "0190a6f4-0000-7000-8000-000000000001",
            "gameId": "0190a6f4-0000-7000-8000-000000000002",
            "name": "Badge",
            "handlerType": "system",
            "probability": 120.0
        });
        let err = runner()
            .check_reward(reward, json!({"userId": "u-1"}))
            .unwrap_err()
            .to_string();
        assert!(err.contains("配置有误"));
    }

    #[test]
    fn test_analyze_text_output() {
        let output = runner().analyze(mission(), false).unwrap();
        assert!(output.contains("1. Trigger"));
        assert!(output.contains("5. Reset"));
        assert!(!output.contains("Warnings"));
    }

    #[test]
    fn test_validate_reports_problems() {
        assert!(runner().validate(mission()).unwrap().ends_with("OK"));

        let mut bad = mission();
        bad["code"] = json!("Weekly Win");
        bad["conditions"] = json!({"field": "mode", "op": "in", "value": "ranked"});
        let err = runner().validate(bad).unwrap_err().to_string();
        assert!(err.contains("code"));
        assert!(err.contains("conditions"));
    }

    #[test]
    fn test_expiry_output() {
        let output = runner()
            .expiry(json!({"mode": "ttl", "ttlDays": 7}), Some("2024-01-15T10:00:00Z"))
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["expiresAt"], json!("2024-01-22T10:00:00+00:00"));
    }

    #[test]
    fn test_expiry_out_of_range_ttl_is_error() {
        let result = runner().expiry(
            json!({"mode": "ttl", "ttlDays": 4_000_000_000_u32}),
            Some("2024-01-15T10:00:00Z"),
        );
        assert!(result.is_err());
    }
}
