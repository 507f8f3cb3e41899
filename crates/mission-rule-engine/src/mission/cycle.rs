//! 任务周期分析
//!
//! 把任务配置翻译成"触发 → 累计 → 完成 → 发奖 → 重置"五个阶段的说明，
//! 并给出配置层面的风险提示。纯函数，不做任何 I/O，也不会失败。

use super::models::{MissionFormData, MissionPeriod, MissionType, RewardType};
use crate::compiler::RuleCompiler;
use crate::models::{ConditionGroup, ConditionNode};
use gamify_shared::config::MissionAnalysisConfig;
use serde::Serialize;
use std::fmt;
use tracing::debug;
use validator::Validate;

/// 周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleStage {
    Trigger,
    Track,
    Complete,
    Reward,
    Reset,
}

impl CycleStage {
    pub const ALL: [CycleStage; 5] = [
        Self::Trigger,
        Self::Track,
        Self::Complete,
        Self::Reward,
        Self::Reset,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Trigger => "Trigger",
            Self::Track => "Track",
            Self::Complete => "Complete",
            Self::Reward => "Reward",
            Self::Reset => "Reset",
        }
    }
}

/// 单个阶段的说明
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleStep {
    pub stage: CycleStage,
    pub title: String,
    pub description: String,
    pub details: Vec<String>,
}

impl CycleStep {
    fn new(stage: CycleStage, description: String, details: Vec<String>) -> Self {
        Self {
            stage,
            title: stage.title().to_string(),
            description,
            details,
        }
    }
}

/// 风险提示类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    SingleTargetMismatch,
    UnboundedCompletions,
    StreakWithoutPeriod,
    ZeroValueReward,
    ClientTriggerHighValue,
    InvalidField,
    InvalidConditions,
    IncompleteExpiration,
}

/// 配置风险提示
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleWarning {
    pub code: WarningCode,
    pub message: String,
}

impl CycleWarning {
    fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CycleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// 分析结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleAnalysis {
    pub steps: Vec<CycleStep>,
    pub summary: String,
    pub warnings: Vec<CycleWarning>,
}

impl CycleAnalysis {
    pub fn has_warning(&self, code: WarningCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }

    pub fn step(&self, stage: CycleStage) -> Option<&CycleStep> {
        self.steps.iter().find(|s| s.stage == stage)
    }
}

/// 任务周期分析器
#[derive(Debug, Clone, Default)]
pub struct MissionCycleAnalyzer {
    config: MissionAnalysisConfig,
}

impl MissionCycleAnalyzer {
    pub fn new(config: MissionAnalysisConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, mission: &MissionFormData) -> CycleAnalysis {
        let steps = CycleStage::ALL
            .iter()
            .map(|stage| match stage {
                CycleStage::Trigger => Self::trigger_step(mission),
                CycleStage::Track => Self::track_step(mission),
                CycleStage::Complete => Self::complete_step(mission),
                CycleStage::Reward => Self::reward_step(mission),
                CycleStage::Reset => Self::reset_step(mission),
            })
            .collect();

        let warnings = self.collect_warnings(mission);

        debug!(
            code = %mission.code,
            mission_type = mission.mission_type.as_str(),
            warnings = warnings.len(),
            "任务周期分析完成"
        );

        CycleAnalysis {
            steps,
            summary: Self::summary(mission),
            warnings,
        }
    }

    fn trigger_step(mission: &MissionFormData) -> CycleStep {
        let description = format!(
            "Progress advances on `{}` events, i.e. when {}.",
            mission.trigger_event,
            mission.trigger_event.label()
        );

        let mut details = Vec::new();
        if mission.allow_fe_trigger {
            details.push(
                "Client-reported events may advance progress without server-side verification."
                    .to_string(),
            );
        } else {
            details.push("Only server-verified events count toward progress.".to_string());
        }
        if !mission.is_active {
            details.push("Mission is inactive: no events are processed until it is enabled.".to_string());
        }

        CycleStep::new(CycleStage::Trigger, description, details)
    }

    fn track_step(mission: &MissionFormData) -> CycleStep {
        let event = mission.trigger_event;
        let target = mission.target_value;

        let (description, details) = match mission.mission_type {
            MissionType::Single => (
                format!("A single qualifying `{}` event completes the mission.", event),
                vec!["The target is implicitly 1.".to_string()],
            ),
            MissionType::Count => (
                format!(
                    "Each qualifying `{}` event adds 1 to progress, up to {}.",
                    event, target
                ),
                vec!["Events do not need to be consecutive.".to_string()],
            ),
            MissionType::Streak => match mission.mission_period.unit() {
                Some(unit) => (
                    format!(
                        "Progress counts consecutive {}s with at least one qualifying `{}` event; {} in a row are required.",
                        unit, event, target
                    ),
                    vec![format!(
                        "Missing a {} breaks the streak and resets progress to 0.",
                        unit
                    )],
                ),
                None => (
                    format!(
                        "Progress counts consecutive periods with a qualifying `{}` event; {} in a row are required.",
                        event, target
                    ),
                    vec!["The all_time period has no boundary, so the streak can never break.".to_string()],
                ),
            },
            MissionType::Cumulative => (
                format!(
                    "Progress accumulates the numeric amount carried by each qualifying `{}` event until the total reaches {}.",
                    event, target
                ),
                vec!["Progress grows by the event amount, not by 1 per event.".to_string()],
            ),
        };

        CycleStep::new(CycleStage::Track, description, details)
    }

    fn complete_step(mission: &MissionFormData) -> CycleStep {
        let description = format!(
            "The mission completes when progress reaches {}.",
            mission.effective_target()
        );

        let mut details = Vec::new();
        match mission.conditions.as_ref().filter(|c| !c.is_empty()) {
            Some(conditions) => {
                let group = conditions.normalize();
                details.push(format!("Only events matching: {}", group));
                collect_leaf_descriptions(&group, &mut details);
            }
            None => details.push("Every trigger event counts; no extra conditions.".to_string()),
        }

        CycleStep::new(CycleStage::Complete, description, details)
    }

    fn reward_step(mission: &MissionFormData) -> CycleStep {
        let description = format!(
            "Grants {} {}.",
            mission.reward_value,
            mission.reward_type.unit()
        );

        let expiration = match &mission.reward_expiration_config {
            Some(config) => format!("The granted reward {}.", config.describe()),
            None => "The granted reward never expires.".to_string(),
        };

        CycleStep::new(CycleStage::Reward, description, vec![expiration])
    }

    fn reset_step(mission: &MissionFormData) -> CycleStep {
        if mission.is_one_shot() {
            return CycleStep::new(
                CycleStage::Reset,
                "One-shot mission: once completed it never resets.".to_string(),
                vec!["maxCompletions is 1.".to_string()],
            );
        }

        let cap = match mission.max_completions {
            Some(n) => format!("Can be completed at most {} times in total.", n),
            None => "No overall completion cap.".to_string(),
        };

        match mission.mission_period.boundary() {
            Some(boundary) => CycleStep::new(
                CycleStage::Reset,
                format!("Progress and completion reset at {}.", boundary),
                vec![
                    format!(
                        "Completes at most once per {}.",
                        mission.mission_period.unit().unwrap_or("period")
                    ),
                    cap,
                ],
            ),
            None => CycleStep::new(
                CycleStage::Reset,
                "Progress never resets on a schedule; it starts over after each completion."
                    .to_string(),
                vec![cap],
            ),
        }
    }

    fn summary(mission: &MissionFormData) -> String {
        let event = mission.trigger_event;
        let target = mission.effective_target();

        let goal = match mission.mission_type {
            MissionType::Single => format!("trigger `{}` once", event),
            MissionType::Count => format!("trigger `{}` {} times", event, target),
            MissionType::Streak => format!(
                "trigger `{}` for {} consecutive {}s",
                event,
                target,
                mission.mission_period.unit().unwrap_or("period")
            ),
            MissionType::Cumulative => format!("accumulate {} from `{}` events", target, event),
        };

        let repeat = if mission.is_one_shot() {
            "one-time only".to_string()
        } else {
            let reset = match mission.mission_period {
                MissionPeriod::AllTime => "never resets".to_string(),
                period => format!("resets {}", period.as_str()),
            };
            match mission.max_completions {
                Some(n) => format!("{}, up to {} completions", reset, n),
                None => format!("{}, unlimited completions", reset),
            }
        };

        format!(
            "{}: {} to earn {} {} ({}).",
            mission.name,
            goal,
            mission.reward_value,
            mission.reward_type.unit(),
            repeat
        )
    }

    fn collect_warnings(&self, mission: &MissionFormData) -> Vec<CycleWarning> {
        let mut warnings = Vec::new();

        if mission.mission_type == MissionType::Single && mission.target_value != 1 {
            warnings.push(CycleWarning::new(
                WarningCode::SingleTargetMismatch,
                format!(
                    "Inconsistent target: single missions complete on one event, but targetValue is {}.",
                    mission.target_value
                ),
            ));
        }

        if mission.mission_period == MissionPeriod::AllTime && mission.max_completions.is_none() {
            warnings.push(CycleWarning::new(
                WarningCode::UnboundedCompletions,
                "Unbounded completions: all_time period with no maxCompletions means the mission can be completed again and again with no reset and no cap.",
            ));
        }

        if mission.mission_type == MissionType::Streak
            && mission.mission_period == MissionPeriod::AllTime
        {
            warnings.push(CycleWarning::new(
                WarningCode::StreakWithoutPeriod,
                "Streak mission with an all_time period has no period boundary to break the streak against.",
            ));
        }

        if mission.reward_type == RewardType::Score && mission.reward_value == 0 {
            warnings.push(CycleWarning::new(
                WarningCode::ZeroValueReward,
                "Zero-value reward: rewardValue is 0 score, likely a placeholder.",
            ));
        }

        if mission.allow_fe_trigger {
            let threshold = match mission.reward_type {
                RewardType::Turns => self.config.high_value_turns,
                RewardType::Score => self.config.high_value_score,
            };
            if mission.reward_value >= threshold {
                warnings.push(CycleWarning::new(
                    WarningCode::ClientTriggerHighValue,
                    format!(
                        "Trust boundary: client-reported completion directly grants {} {} (high-value threshold {}).",
                        mission.reward_value,
                        mission.reward_type.unit(),
                        threshold
                    ),
                ));
            }
        }

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
                    warnings.push(CycleWarning::new(
                        WarningCode::InvalidField,
                        format!("Invalid {}: {}", field, message),
                    ));
                }
            }
        }

        if let Some(conditions) = &mission.conditions {
            if let Err(e) = RuleCompiler::validate(conditions) {
                warnings.push(CycleWarning::new(
                    WarningCode::InvalidConditions,
                    format!("Invalid conditions: {}", e),
                ));
            }
        }

        if let Some(config) = &mission.reward_expiration_config {
            if let Err(e) = config.policy() {
                warnings.push(CycleWarning::new(
                    WarningCode::IncompleteExpiration,
                    format!("Incomplete reward expiration config: {}", e),
                ));
            }
        }

        warnings
    }
}

/// 深度优先列出叶子条件，与评估诊断的顺序一致
fn collect_leaf_descriptions(group: &ConditionGroup, out: &mut Vec<String>) {
    for node in &group.conditions {
        match node {
            ConditionNode::Condition(cond) => out.push(format!("- {}", cond)),
            ConditionNode::Group(nested) => collect_leaf_descriptions(nested, out),
        }
    }
}

/// 使用默认阈值分析任务
pub fn analyze(mission: &MissionFormData) -> CycleAnalysis {
    MissionCycleAnalyzer::default().analyze(mission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mission(overrides: serde_json::Value) -> MissionFormData {
        let mut base = json!({
            "code": "play-daily",
            "name": "Daily player",
            "triggerEvent": "game:play",
            "missionType": "count",
            "missionPeriod": "daily",
            "targetValue": 3,
            "maxCompletions": 10,
            "rewardType": "turns",
            "rewardValue": 1
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), overrides.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn test_five_steps_in_order() {
        let analysis = analyze(&mission(json!({})));
        let titles: Vec<&str> = analysis.steps.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Trigger", "Track", "Complete", "Reward", "Reset"]);
        assert!(analysis.warnings.is_empty(), "{:?}", analysis.warnings);
    }

    #[test]
    fn test_single_target_mismatch() {
        let analysis = analyze(&mission(json!({"missionType": "single", "targetValue": 3})));
        assert!(analysis.has_warning(WarningCode::SingleTargetMismatch));
        assert!(analysis.warnings[0].message.contains("Inconsistent"));

        let analysis = analyze(&mission(json!({"missionType": "single", "targetValue": 1})));
        assert!(!analysis.has_warning(WarningCode::SingleTargetMismatch));
    }

    #[test]
    fn test_streak_calls_out_reset_on_break() {
        let analysis = analyze(&mission(json!({"missionType": "streak", "targetValue": 7})));
        let track = analysis.step(CycleStage::Track).unwrap();
        assert!(track.description.contains("consecutive days"));
        assert!(track.details[0].contains("resets progress to 0"));
    }

    #[test]
    fn test_one_shot_reset() {
        let analysis = analyze(&mission(json!({"maxCompletions": 1})));
        let reset = analysis.step(CycleStage::Reset).unwrap();
        assert!(reset.description.contains("One-shot"));
        assert!(analysis.summary.contains("one-time only"));
    }

    #[test]
    fn test_client_trigger_threshold() {
        let analyzer = MissionCycleAnalyzer::new(MissionAnalysisConfig {
            high_value_turns: 3,
            high_value_score: 100,
        });

        let low = mission(json!({"allowFeTrigger": true, "rewardValue": 2}));
        assert!(!analyzer.analyze(&low).has_warning(WarningCode::ClientTriggerHighValue));

        let high = mission(json!({"allowFeTrigger": true, "rewardValue": 3}));
        assert!(analyzer.analyze(&high).has_warning(WarningCode::ClientTriggerHighValue));
    }

    #[test]
    fn test_invalid_fields_become_warnings() {
        let analysis = analyze(&mission(json!({"code": "Bad Code", "targetValue": 0})));
        assert!(analysis.has_warning(WarningCode::InvalidField));
        assert!(analysis.warnings.iter().any(|w| w.message.contains("code")));
        assert!(analysis.warnings.iter().any(|w| w.message.contains("target_value")));
    }

    #[test]
    fn test_conditions_rendered_in_complete_step() {
        let analysis = analyze(&mission(json!({
            "conditions": {
                "mode": "OR",
                "conditions": [
                    {"field": "score", "op": "gte", "value": 100},
                    {"field": "mode", "op": "in", "value": ["ranked", "event"]}
                ]
            }
        })));
        let complete = analysis.step(CycleStage::Complete).unwrap();
        assert!(complete.details[0].contains("score >= 100 OR mode in"));
        assert_eq!(complete.details.len(), 3);
    }

    #[test]
    fn test_invalid_conditions_warning() {
        let analysis = analyze(&mission(json!({
            "conditions": {"field": "score", "op": "approx", "value": 100}
        })));
        assert!(analysis.has_warning(WarningCode::InvalidConditions));
        assert_eq!(analysis.steps.len(), 5);
    }
}
