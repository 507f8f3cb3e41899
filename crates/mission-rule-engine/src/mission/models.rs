//! 任务领域模型

use crate::expiration::ExpirationConfig;
use crate::models::Conditions;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::LazyLock;
use uuid::Uuid;
use validator::Validate;

/// 任务编码：小写字母数字，以单个连字符分隔
static MISSION_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("mission code pattern"));

/// 平台事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerEvent {
    #[serde(rename = "game:play")]
    GamePlay,
    #[serde(rename = "game:win")]
    GameWin,
    #[serde(rename = "game:score")]
    GameScore,
    #[serde(rename = "game:share")]
    GameShare,
    #[serde(rename = "user:login")]
    UserLogin,
    #[serde(rename = "user:register")]
    UserRegister,
    #[serde(rename = "user:checkin")]
    UserCheckin,
    #[serde(rename = "user:invite")]
    UserInvite,
    #[serde(rename = "reward:claim")]
    RewardClaim,
    #[serde(rename = "mission:complete")]
    MissionComplete,
}

impl TriggerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GamePlay => "game:play",
            Self::GameWin => "game:win",
            Self::GameScore => "game:score",
            Self::GameShare => "game:share",
            Self::UserLogin => "user:login",
            Self::UserRegister => "user:register",
            Self::UserCheckin => "user:checkin",
            Self::UserInvite => "user:invite",
            Self::RewardClaim => "reward:claim",
            Self::MissionComplete => "mission:complete",
        }
    }

    /// 面向运营人员的事件说明
    pub fn label(&self) -> &'static str {
        match self {
            Self::GamePlay => "the player finishes a game round",
            Self::GameWin => "the player wins a game round",
            Self::GameScore => "the player submits a game score",
            Self::GameShare => "the player shares a game",
            Self::UserLogin => "the player logs in",
            Self::UserRegister => "the player registers an account",
            Self::UserCheckin => "the player checks in",
            Self::UserInvite => "an invited friend joins",
            Self::RewardClaim => "the player claims a reward",
            Self::MissionComplete => "the player completes another mission",
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionType {
    Single,
    Count,
    Streak,
    Cumulative,
}

impl MissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Count => "count",
            Self::Streak => "streak",
            Self::Cumulative => "cumulative",
        }
    }
}

/// 任务周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionPeriod {
    Daily,
    /// 周一开始的自然周
    #[serde(alias = "weekly")]
    WeeklyMon,
    /// 周日开始的自然周
    WeeklySun,
    Monthly,
    AllTime,
}

impl MissionPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::WeeklyMon => "weekly_mon",
            Self::WeeklySun => "weekly_sun",
            Self::Monthly => "monthly",
            Self::AllTime => "all_time",
        }
    }

    /// 周期单位名，all_time 没有周期边界
    pub fn unit(&self) -> Option<&'static str> {
        match self {
            Self::Daily => Some("day"),
            Self::WeeklyMon | Self::WeeklySun => Some("week"),
            Self::Monthly => Some("month"),
            Self::AllTime => None,
        }
    }

    /// 周期重置时刻的描述
    pub fn boundary(&self) -> Option<&'static str> {
        match self {
            Self::Daily => Some("the start of each day (00:00)"),
            Self::WeeklyMon => Some("the start of each week (Monday 00:00)"),
            Self::WeeklySun => Some("the start of each week (Sunday 00:00)"),
            Self::Monthly => Some("the start of each month (day 1, 00:00)"),
            Self::AllTime => None,
        }
    }
}

/// 任务奖励类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    Turns,
    Score,
}

impl RewardType {
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Turns => "turn(s)",
            Self::Score => "score point(s)",
        }
    }
}

fn default_true() -> bool {
    true
}

/// 任务表单数据（任务配置快照）
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MissionFormData {
    #[validate(regex(
        path = *MISSION_CODE_RE,
        message = "任务编码只能包含小写字母、数字和连字符"
    ))]
    pub code: String,
    #[validate(length(min = 1, max = 100, message = "任务名称长度必须在1-100个字符之间"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub trigger_event: TriggerEvent,
    pub mission_type: MissionType,
    pub mission_period: MissionPeriod,
    #[validate(range(min = 1, message = "目标值必须大于等于1"))]
    pub target_value: u32,
    /// 最大完成次数，None 表示不限
    #[validate(range(min = 1, message = "最大完成次数必须大于等于1"))]
    #[serde(default)]
    pub max_completions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,
    pub reward_type: RewardType,
    #[validate(range(min = 0, message = "奖励值不能为负数"))]
    pub reward_value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_expiration_config: Option<ExpirationConfig>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// 是否允许客户端自行上报进度
    #[serde(default)]
    pub allow_fe_trigger: bool,
}

impl MissionFormData {
    /// 完成一次所需的进度，single 类型恒为 1
    pub fn effective_target(&self) -> u32 {
        match self.mission_type {
            MissionType::Single => 1,
            _ => self.target_value,
        }
    }

    /// 是否为一次性任务
    pub fn is_one_shot(&self) -> bool {
        self.max_completions == Some(1)
    }

    pub fn has_conditions(&self) -> bool {
        self.conditions.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// 任务（后台持久化实体）
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub mission_id: Uuid,
    /// 所属游戏
    pub game_id: Uuid,
    #[serde(flatten)]
    #[validate(nested)]
    pub form: MissionFormData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form_json() -> serde_json::Value {
        json!({
            "code": "daily-play-5",
            "name": "Play 5 rounds",
            "triggerEvent": "game:play",
            "missionType": "count",
            "missionPeriod": "daily",
            "targetValue": 5,
            "maxCompletions": null,
            "rewardType": "turns",
            "rewardValue": 2
        })
    }

    #[test]
    fn test_form_deserialization_defaults() {
        let form: MissionFormData = serde_json::from_value(form_json()).unwrap();
        assert_eq!(form.trigger_event, TriggerEvent::GamePlay);
        assert_eq!(form.mission_period, MissionPeriod::Daily);
        assert!(form.is_active);
        assert!(!form.allow_fe_trigger);
        assert_eq!(form.max_completions, None);
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_weekly_alias() {
        let mut value = form_json();
        value["missionPeriod"] = json!("weekly");
        let form: MissionFormData = serde_json::from_value(value).unwrap();
        assert_eq!(form.mission_period, MissionPeriod::WeeklyMon);
    }

    #[test]
    fn test_code_validation() {
        let mut value = form_json();
        value["code"] = json!("Daily_Play");
        let form: MissionFormData = serde_json::from_value(value).unwrap();
        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("code"));
    }

    #[test]
    fn test_target_and_completion_validation() {
        let mut value = form_json();
        value["targetValue"] = json!(0);
        value["maxCompletions"] = json!(0);
        let form: MissionFormData = serde_json::from_value(value).unwrap();
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("target_value"));
        assert!(fields.contains_key("max_completions"));
    }

    #[test]
    fn test_single_effective_target() {
        let mut value = form_json();
        value["missionType"] = json!("single");
        let form: MissionFormData = serde_json::from_value(value).unwrap();
        assert_eq!(form.effective_target(), 1);
    }

    #[test]
    fn test_mission_entity_flattens_form() {
        let mut value = form_json();
        value["missionId"] = json!("0190a6f4-0000-7000-8000-000000000010");
        value["gameId"] = json!("0190a6f4-0000-7000-8000-000000000020");
        value["metadata"] = json!({"banner": "summer"});
        let mission: Mission = serde_json::from_value(value).unwrap();
        assert_eq!(mission.form.code, "daily-play-5");
        assert!(mission.metadata.unwrap().contains_key("banner"));
    }
}
