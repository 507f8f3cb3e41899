//! 奖励相关的数据模型
//!
//! 奖励的领取条件比任务条件更丰富：除通用比较外，还支持前置奖励、
//! 时间窗口、单用户上限、用户分群、排行榜分数等具名槽位。

use crate::expiration::ExpirationConfig;
use crate::operators::{LogicalOperator, Operator};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

/// 单个或多个（后台 JSON 两种写法都存在）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(item) => std::slice::from_ref(item),
            Self::Many(items) => items,
        }
    }
}

/// 前置奖励匹配方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequiresRewardsMode {
    #[default]
    All,
    Any,
}

/// 前置奖励条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiresRewardsCondition {
    pub reward_ids: Vec<String>,
    #[serde(default)]
    pub mode: RequiresRewardsMode,
    /// 从 reward_ids 中剔除的奖励
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_rewards: Vec<String>,
}

impl RequiresRewardsCondition {
    /// 剔除排除项后的有效奖励 ID
    pub fn effective_reward_ids(&self) -> Vec<&str> {
        self.reward_ids
            .iter()
            .filter(|id| !self.exclude_rewards.contains(id))
            .map(String::as_str)
            .collect()
    }
}

/// 时间窗口条件
///
/// 日期支持 RFC 3339 或 `YYYY-MM-DD`；`days_of_week` 以 0 表示周日；
/// `hours` 为左闭右开区间，不支持跨零点。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<(u32, u32)>,
}

/// 单用户领取上限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Uniqueness {
    pub max_per_user: u32,
}

/// 用户分群条件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSegment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_numbers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_user_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_phone_numbers: Option<Vec<String>>,
}

/// 排行榜周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardPeriod {
    Daily,
    Weekly,
    Monthly,
    AllTime,
}

/// 排行榜分数条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardScoreCondition {
    pub op: Operator,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaderboard_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<LeaderboardPeriod>,
}

/// 奖励领取条件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardConditions {
    /// 多个槽位之间的组合方式，缺省为 AND
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<LogicalOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_rewards: Option<OneOrMany<RequiresRewardsCondition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniqueness: Option<Uniqueness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_user_segment: Option<UserSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_leaderboard_score: Option<LeaderboardScoreCondition>,
    /// 由后端服务解释的条件，引擎只透传
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_client_input: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_user_attributes: Option<Map<String, Value>>,
}

impl RewardConditions {
    pub fn mode(&self) -> LogicalOperator {
        self.mode.unwrap_or_default()
    }

    /// 未在本引擎内求值的槽位名称
    pub fn deferred_slots(&self) -> Vec<&'static str> {
        let mut slots = Vec::new();
        if self.requires_client_input.is_some() {
            slots.push("requiresClientInput");
        }
        if self.requires_user_attributes.is_some() {
            slots.push("requiresUserAttributes");
        }
        slots
    }
}

/// 奖励条件的求值上下文
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardContext {
    pub user_id: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// 用户已获得的奖励 ID
    #[serde(default)]
    pub granted_reward_ids: HashSet<String>,
    /// 该用户已获得本奖励的次数
    #[serde(default)]
    pub prior_grants: u32,
    #[serde(default)]
    pub leaderboard_score: Option<f64>,
    #[serde(default)]
    pub has_shared: bool,
    /// 当前时间（带时区偏移，星期与小时按此偏移计算）
    pub now: DateTime<FixedOffset>,
}

impl RewardContext {
    pub fn new(user_id: impl Into<String>, now: DateTime<FixedOffset>) -> Self {
        Self {
            user_id: user_id.into(),
            phone_number: None,
            granted_reward_ids: HashSet::new(),
            prior_grants: 0,
            leaderboard_score: None,
            has_shared: false,
            now,
        }
    }
}

/// 奖励发放方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerType {
    Api,
    System,
    Turn,
    NoReward,
    Collection,
    Script,
    Journey,
}

/// 分享门槛配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareConfig {
    /// 是否必须先分享才能领取
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

fn default_true() -> bool {
    true
}

/// 奖励
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub reward_id: Uuid,
    pub game_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "奖励名称长度必须在1-100个字符之间"))]
    pub name: String,
    pub handler_type: HandlerType,
    /// 中奖概率（百分比）
    #[validate(range(min = 0.0, max = 100.0, message = "中奖概率必须在0-100之间"))]
    pub probability: f64,
    /// 总配额，None 表示不限
    #[serde(default)]
    pub quota: Option<u32>,
    #[serde(default)]
    pub quota_used: u32,
    #[serde(default)]
    pub conditions: Option<RewardConditions>,
    #[serde(default)]
    pub share_config: Option<ShareConfig>,
    #[serde(default)]
    pub expiration_config: Option<ExpirationConfig>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Reward {
    /// 剩余配额，None 表示不限
    pub fn quota_remaining(&self) -> Option<u32> {
        self.quota.map(|q| q.saturating_sub(self.quota_used))
    }

    pub fn is_quota_exhausted(&self) -> bool {
        self.quota_remaining() == Some(0)
    }

    pub fn requires_share(&self) -> bool {
        self.share_config.as_ref().is_some_and(|s| s.required)
    }
}
