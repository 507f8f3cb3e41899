//! 奖励过期策略
//!
//! 后台保存的是扁平结构，`mode` 决定哪些字段有意义，其余字段一律忽略。

use crate::error::{Result, RuleError};
use crate::time::{
    add_days, next_period_boundary, parse_instant, start_of_day, CalendarPeriod, ParsedInstant,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// 过期模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationMode {
    #[default]
    Permanent,
    Ttl,
    Fixed,
    Anchor,
}

/// 过期配置（后台原始结构）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirationConfig {
    #[serde(default)]
    pub mode: ExpirationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_period: Option<CalendarPeriod>,
    /// 相对周期结束的偏移天数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_offset: Option<i64>,
}

/// 解析后的过期策略，只保留当前模式需要的字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpirationPolicy {
    Permanent,
    Ttl { days: u32 },
    Fixed { date: String },
    Anchor { period: CalendarPeriod, offset_days: i64 },
}

impl ExpirationConfig {
    pub fn permanent() -> Self {
        Self::default()
    }

    pub fn ttl(days: u32) -> Self {
        Self {
            mode: ExpirationMode::Ttl,
            ttl_days: Some(days),
            ..Default::default()
        }
    }

    pub fn anchor(period: CalendarPeriod, offset_days: i64) -> Self {
        Self {
            mode: ExpirationMode::Anchor,
            anchor_period: Some(period),
            anchor_offset: Some(offset_days),
            ..Default::default()
        }
    }

    /// 按模式解析策略，当前模式所需字段缺失时返回错误
    pub fn policy(&self) -> Result<ExpirationPolicy> {
        match self.mode {
            ExpirationMode::Permanent => Ok(ExpirationPolicy::Permanent),
            ExpirationMode::Ttl => match self.ttl_days {
                Some(days) if days > 0 => Ok(ExpirationPolicy::Ttl { days }),
                Some(_) => Err(RuleError::InvalidValue {
                    field: "ttlDays".to_string(),
                    reason: "必须大于 0".to_string(),
                }),
                None => Err(missing("ttlDays", "ttl")),
            },
            ExpirationMode::Fixed => {
                let date = self
                    .fixed_date
                    .as_deref()
                    .filter(|d| !d.trim().is_empty())
                    .ok_or_else(|| missing("fixedDate", "fixed"))?;
                parse_instant(date, "fixedDate")?;
                Ok(ExpirationPolicy::Fixed {
                    date: date.to_string(),
                })
            }
            ExpirationMode::Anchor => {
                let period = self
                    .anchor_period
                    .ok_or_else(|| missing("anchorPeriod", "anchor"))?;
                Ok(ExpirationPolicy::Anchor {
                    period,
                    offset_days: self.anchor_offset.unwrap_or(0),
                })
            }
        }
    }

    /// 计算发放于 `granted_at` 的奖励何时过期，永久有效返回 None
    ///
    /// 纯日期的 fixedDate 覆盖当天全天；anchor 以所在周期结束时刻
    /// （下一日 / 下周一 / 下月一日零点）为基准再偏移若干天。
    pub fn expires_at(
        &self,
        granted_at: DateTime<FixedOffset>,
    ) -> Result<Option<DateTime<FixedOffset>>> {
        let expires = match self.policy()? {
            ExpirationPolicy::Permanent => return Ok(None),
            ExpirationPolicy::Ttl { days } => add_days(granted_at, i64::from(days), "ttlDays")?,
            ExpirationPolicy::Fixed { date } => match parse_instant(&date, "fixedDate")? {
                ParsedInstant::At(dt) => dt,
                ParsedInstant::Date(day) => {
                    let start = start_of_day(day, *granted_at.offset(), "fixedDate")?;
                    add_days(start, 1, "fixedDate")?
                }
            },
            ExpirationPolicy::Anchor {
                period,
                offset_days,
            } => {
                let boundary = next_period_boundary(&granted_at, period, "anchorPeriod")?;
                add_days(boundary, offset_days, "anchorOffset")?
            }
        };

        Ok(Some(expires))
    }

    /// 面向运营人员的描述，配置不完整时也不会失败
    pub fn describe(&self) -> String {
        match self.policy() {
            Ok(ExpirationPolicy::Permanent) => "never expires".to_string(),
            Ok(ExpirationPolicy::Ttl { days }) => {
                format!("expires {} day(s) after it is granted", days)
            }
            Ok(ExpirationPolicy::Fixed { date }) => format!("expires at {}", date),
            Ok(ExpirationPolicy::Anchor {
                period,
                offset_days,
            }) => match offset_days {
                0 => format!("expires at the end of the current {}", period.noun()),
                n if n > 0 => format!(
                    "expires {} day(s) after the end of the current {}",
                    n,
                    period.noun()
                ),
                n => format!(
                    "expires {} day(s) before the end of the current {}",
                    -n,
                    period.noun()
                ),
            },
            Err(e) => format!("incomplete expiration config ({})", e),
        }
    }
}

fn missing(field: &str, mode: &str) -> RuleError {
    RuleError::InvalidConfig(format!("{} 模式必须设置 {}", mode, field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_permanent_never_expires() {
        let config = ExpirationConfig::permanent();
        assert_eq!(config.expires_at(at("2024-01-15T10:00:00Z")).unwrap(), None);
        assert_eq!(config.describe(), "never expires");
    }

    #[test]
    fn test_ttl() {
        let config = ExpirationConfig::ttl(7);
        assert_eq!(
            config.expires_at(at("2024-01-15T10:00:00Z")).unwrap(),
            Some(at("2024-01-22T10:00:00Z"))
        );
        assert!(config.describe().contains("7 day(s)"));
    }

    #[test]
    fn test_mismatched_fields_are_ignored() {
        let config: ExpirationConfig = serde_json::from_value(json!({
            "mode": "ttl",
            "ttlDays": 3,
            "fixedDate": "2020-01-01",
            "anchorPeriod": "weekly"
        }))
        .unwrap();
        assert_eq!(config.policy().unwrap(), ExpirationPolicy::Ttl { days: 3 });

        let config: ExpirationConfig =
            serde_json::from_value(json!({"mode": "permanent", "ttlDays": 3})).unwrap();
        assert_eq!(config.policy().unwrap(), ExpirationPolicy::Permanent);
    }

    #[test]
    fn test_fixed_date() {
        let config: ExpirationConfig =
            serde_json::from_value(json!({"mode": "fixed", "fixedDate": "2024-02-01"})).unwrap();
        assert_eq!(
            config.expires_at(at("2024-01-15T10:00:00+07:00")).unwrap(),
            Some(at("2024-02-02T00:00:00+07:00"))
        );

        let config: ExpirationConfig = serde_json::from_value(
            json!({"mode": "fixed", "fixedDate": "2024-02-01T12:00:00Z"}),
        )
        .unwrap();
        assert_eq!(
            config.expires_at(at("2024-01-15T10:00:00Z")).unwrap(),
            Some(at("2024-02-01T12:00:00Z"))
        );
    }

    #[test]
    fn test_anchor_end_of_week_plus_two_days() {
        let config = ExpirationConfig::anchor(CalendarPeriod::Weekly, 2);
        // 周三发放 -> 下周一零点 + 2 天
        assert_eq!(
            config.expires_at(at("2024-01-17T15:00:00Z")).unwrap(),
            Some(at("2024-01-24T00:00:00Z"))
        );
        assert!(config.describe().contains("2 day(s) after the end of the current week"));
    }

    #[test]
    fn test_incomplete_config() {
        let config: ExpirationConfig = serde_json::from_value(json!({"mode": "ttl"})).unwrap();
        assert_eq!(config.policy().unwrap_err().code(), "INVALID_CONFIG");
        assert!(config.describe().starts_with("incomplete expiration config"));

        let config: ExpirationConfig = serde_json::from_value(json!({"mode": "anchor"})).unwrap();
        assert!(config.expires_at(at("2024-01-15T10:00:00Z")).is_err());
    }

    #[test]
    fn test_out_of_range_ttl_is_rejected() {
        let config: ExpirationConfig =
            serde_json::from_value(json!({"mode": "ttl", "ttlDays": 4_000_000_000_u32})).unwrap();
        let err = config.expires_at(at("2024-01-15T10:00:00Z")).unwrap_err();
        assert_eq!(err.code(), "INVALID_VALUE");
        assert!(err.to_string().contains("ttlDays"));
    }

    #[test]
    fn test_out_of_range_anchor_offset_is_rejected() {
        let granted_at = at("2024-01-15T10:00:00Z");
        for offset in [i64::MAX, i64::MIN, 200_000_000] {
            let config = ExpirationConfig::anchor(CalendarPeriod::Weekly, offset);
            let err = config.expires_at(granted_at).unwrap_err();
            assert_eq!(err.code(), "INVALID_VALUE");
            assert!(err.to_string().contains("anchorOffset"));
        }
    }

    #[test]
    fn test_fixed_date_at_calendar_limit_is_rejected() {
        let config: ExpirationConfig =
            serde_json::from_value(json!({"mode": "fixed", "fixedDate": "+262142-12-31"}))
                .unwrap();
        assert!(config.expires_at(at("2024-01-15T10:00:00Z")).is_err());
    }
}
