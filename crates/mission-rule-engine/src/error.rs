//! 规则引擎错误类型
//!
//! 缺失字段、类型不匹配属于正常的"未通过"，不会出现在这里；
//! 这里只承载配置层面的数据质量问题。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("规则解析失败: {0}")]
    ParseError(String),

    #[error("无效的操作符: {operator} ({reason})")]
    InvalidOperator { operator: String, reason: String },

    #[error("无效的条件值: {field} - {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("配置错误: {0}")]
    InvalidConfig(String),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RuleError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::ParseError(_) => "RULE_PARSE_FAILED",
            Self::InvalidOperator { .. } => "INVALID_OPERATOR",
            Self::InvalidValue { .. } => "INVALID_VALUE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::JsonError(_) => "JSON_ERROR",
        }
    }

    /// 是否为后台录入数据导致的配置错误（而非输入报文本身无法解析）
    pub fn is_config_error(&self) -> bool {
        !matches!(self, Self::JsonError(_))
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = RuleError::InvalidOperator {
            operator: "like".to_string(),
            reason: "不支持的操作符".to_string(),
        };
        assert_eq!(err.code(), "INVALID_OPERATOR");
        assert!(err.is_config_error());
        assert!(err.to_string().contains("like"));
    }

    #[test]
    fn test_json_error_is_not_config_error() {
        let err: RuleError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.code(), "JSON_ERROR");
        assert!(!err.is_config_error());
    }
}
