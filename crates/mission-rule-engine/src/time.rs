//! 时间解析与周期边界计算

use crate::error::{Result, RuleError};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

/// 自然周期（日 / ISO 周 / 月）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarPeriod {
    #[serde(alias = "day")]
    Daily,
    #[serde(alias = "week")]
    Weekly,
    #[serde(alias = "month")]
    Monthly,
}

impl CalendarPeriod {
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Daily => "day",
            Self::Weekly => "week",
            Self::Monthly => "month",
        }
    }
}

/// 解析后的时间点：带时区的时刻或纯日期
pub(crate) enum ParsedInstant {
    At(DateTime<FixedOffset>),
    Date(NaiveDate),
}

/// 解析 RFC 3339 或 `YYYY-MM-DD`
pub(crate) fn parse_instant(s: &str, field: &str) -> Result<ParsedInstant> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(ParsedInstant::At(dt));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(ParsedInstant::Date)
        .map_err(|_| RuleError::InvalidValue {
            field: field.to_string(),
            reason: format!("无法解析日期时间: '{}'", s),
        })
}

/// 指定日期在给定偏移下的零点
pub(crate) fn start_of_day(
    date: NaiveDate,
    offset: FixedOffset,
    field: &str,
) -> Result<DateTime<FixedOffset>> {
    date.and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(offset).single())
        .ok_or_else(|| RuleError::InvalidValue {
            field: field.to_string(),
            reason: format!("日期超出可表示范围: {}", date),
        })
}

/// `at` 偏移若干天，结果超出可表示范围时报错
pub(crate) fn add_days(
    at: DateTime<FixedOffset>,
    days: i64,
    field: &str,
) -> Result<DateTime<FixedOffset>> {
    TimeDelta::try_days(days)
        .and_then(|delta| at.checked_add_signed(delta))
        .ok_or_else(|| RuleError::InvalidValue {
            field: field.to_string(),
            reason: format!("{} 偏移 {} 天超出可表示范围", at, days),
        })
}

/// `at` 所在周期结束的时刻，即下一个周期的起点
pub(crate) fn next_period_boundary(
    at: &DateTime<FixedOffset>,
    period: CalendarPeriod,
    field: &str,
) -> Result<DateTime<FixedOffset>> {
    let today = at.date_naive();
    let next_start = match period {
        CalendarPeriod::Daily => today.succ_opt(),
        CalendarPeriod::Weekly => {
            let days_into_week = i64::from(today.weekday().num_days_from_monday());
            today.checked_add_signed(Duration::days(7 - days_into_week))
        }
        CalendarPeriod::Monthly => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            NaiveDate::from_ymd_opt(year, month, 1)
        }
    };

    let next_start = next_start.ok_or_else(|| RuleError::InvalidValue {
        field: field.to_string(),
        reason: format!("无法计算 {} 的周期边界", at),
    })?;

    start_of_day(next_start, *at.offset(), field)
}
