//! 条件评估器
//!
//! 实现各操作符对单个字段值的判定。缺失字段与类型不匹配都只是"未通过"，
//! 只有配置本身有问题（未知操作符、in 的期望值不是数组）才返回错误。

use crate::error::{Result, RuleError};
use crate::operators::Operator;
use serde_json::Value;

/// 叶子条件的判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafOutcome {
    Matched,
    NotMatched,
    /// 上下文中不存在该字段
    FieldMissing,
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

impl LeafOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Matched)
    }

    fn from_bool(matched: bool) -> Self {
        if matched {
            Self::Matched
        } else {
            Self::NotMatched
        }
    }

    /// 附加在诊断描述后的说明
    pub fn note(&self) -> Option<String> {
        match self {
            Self::Matched | Self::NotMatched => None,
            Self::FieldMissing => Some("field missing".to_string()),
            Self::TypeMismatch { expected, actual } => {
                Some(format!("type mismatch: expected {}, got {}", expected, actual))
            }
        }
    }
}

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件
    ///
    /// # Arguments
    /// * `field_value` - 从上下文中获取的字段值
    /// * `operator` - 操作符
    /// * `expected_value` - 规则中定义的期望值
    pub fn evaluate(
        field_value: Option<&Value>,
        operator: &Operator,
        expected_value: &Value,
    ) -> Result<LeafOutcome> {
        // 配置错误优先于缺失字段
        Self::check_operand(operator, expected_value)?;

        // 缺失字段对任何操作符都视为未通过
        let field_value = match field_value {
            Some(v) => v,
            None => return Ok(LeafOutcome::FieldMissing),
        };

        let outcome = match operator {
            Operator::Eq => LeafOutcome::from_bool(Self::eq(field_value, expected_value)),
            Operator::Ne => LeafOutcome::from_bool(!Self::eq(field_value, expected_value)),
            Operator::Gt => Self::compare(field_value, expected_value, |a, b| a > b),
            Operator::Gte => Self::compare(field_value, expected_value, |a, b| a >= b),
            Operator::Lt => Self::compare(field_value, expected_value, |a, b| a < b),
            Operator::Lte => Self::compare(field_value, expected_value, |a, b| a <= b),
            Operator::In => LeafOutcome::from_bool(Self::in_list(field_value, expected_value)),
            Operator::NotIn => LeafOutcome::from_bool(!Self::in_list(field_value, expected_value)),
            Operator::Unknown(name) => {
                return Err(RuleError::InvalidOperator {
                    operator: name.clone(),
                    reason: "不支持的操作符".to_string(),
                });
            }
        };

        Ok(outcome)
    }

    /// 校验操作符与期望值的组合是否合法
    pub fn check_operand(operator: &Operator, expected_value: &Value) -> Result<()> {
        match operator {
            Operator::Unknown(name) => Err(RuleError::InvalidOperator {
                operator: name.clone(),
                reason: "不支持的操作符".to_string(),
            }),
            op if op.requires_array() && !expected_value.is_array() => {
                Err(RuleError::InvalidOperator {
                    operator: op.to_string(),
                    reason: format!("需要数组值，实际为 {}", type_name(expected_value)),
                })
            }
            _ => Ok(()),
        }
    }

    /// 严格相等：类型和值都必须一致
    ///
    /// 两侧都是整数时精确比较；任一侧为浮点数时按浮点比较（100 == 100.0）。
    fn eq(field: &Value, expected: &Value) -> bool {
        match (field, expected) {
            (Value::Number(a), Value::Number(b)) if a.is_f64() || b.is_f64() => {
                match (a.as_f64(), b.as_f64()) {
                    (Some(f1), Some(f2)) => (f1 - f2).abs() < f64::EPSILON,
                    _ => false,
                }
            }
            _ => field == expected,
        }
    }

    /// 数值比较，任意一侧不是数值时判为类型不匹配
    fn compare<F>(field: &Value, expected: &Value, cmp: F) -> LeafOutcome
    where
        F: Fn(f64, f64) -> bool,
    {
        let Some(field_num) = field.as_f64() else {
            return LeafOutcome::TypeMismatch {
                expected: "number",
                actual: type_name(field),
            };
        };

        let Some(expected_num) = expected.as_f64() else {
            return LeafOutcome::TypeMismatch {
                expected: "number",
                actual: type_name(expected),
            };
        };

        LeafOutcome::from_bool(cmp(field_num, expected_num))
    }

    /// 列表包含检查 (in)
    fn in_list(field: &Value, expected: &Value) -> bool {
        expected
            .as_array()
            .is_some_and(|arr| arr.iter().any(|item| Self::eq(field, item)))
    }
}

/// 获取值的类型名称
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
