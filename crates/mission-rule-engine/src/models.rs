//! 条件模型
//!
//! 后台保存的 `conditions` 字段有三种形态：单个条件、条件数组、条件组。
//! 进入引擎后统一收敛为以 AND 为根的 [`ConditionGroup`]。

use crate::operators::{LogicalOperator, Operator};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// 条件节点（叶子条件）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op.symbol(), self.value)
    }
}

/// 条件树节点（条件或逻辑组）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionNode {
    Group(ConditionGroup),
    Condition(Condition),
}

impl From<Condition> for ConditionNode {
    fn from(cond: Condition) -> Self {
        Self::Condition(cond)
    }
}

impl From<ConditionGroup> for ConditionNode {
    fn from(group: ConditionGroup) -> Self {
        Self::Group(group)
    }
}

impl fmt::Display for ConditionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Condition(cond) => write!(f, "{}", cond),
            Self::Group(group) if group.conditions.len() > 1 => write!(f, "({})", group),
            Self::Group(group) => write!(f, "{}", group),
        }
    }
}

/// 逻辑组节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub mode: LogicalOperator,
    pub conditions: Vec<ConditionNode>,
}

impl ConditionGroup {
    pub fn new(mode: LogicalOperator, conditions: Vec<ConditionNode>) -> Self {
        Self { mode, conditions }
    }

    pub fn and(conditions: Vec<ConditionNode>) -> Self {
        Self::new(LogicalOperator::And, conditions)
    }

    pub fn or(conditions: Vec<ConditionNode>) -> Self {
        Self::new(LogicalOperator::Or, conditions)
    }

    /// 叶子条件总数（递归）
    pub fn leaf_count(&self) -> usize {
        self.conditions
            .iter()
            .map(|node| match node {
                ConditionNode::Condition(_) => 1,
                ConditionNode::Group(group) => group.leaf_count(),
            })
            .sum()
    }
}

impl fmt::Display for ConditionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conditions.is_empty() {
            // 空 AND 恒真，空 OR 恒假
            return match self.mode {
                LogicalOperator::And => write!(f, "always"),
                LogicalOperator::Or => write!(f, "never"),
            };
        }

        let separator = format!(" {} ", self.mode);
        let rendered: Vec<String> = self.conditions.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", rendered.join(&separator))
    }
}

/// 后台存储的条件字段：单个条件 / 条件数组（隐式 AND）/ 条件组
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Conditions {
    Group(ConditionGroup),
    List(Vec<Condition>),
    Single(Condition),
}

impl Conditions {
    /// 收敛为以 AND 为根的条件组
    pub fn normalize(&self) -> ConditionGroup {
        match self {
            Self::Group(group) => group.clone(),
            Self::List(list) => ConditionGroup::and(
                list.iter().cloned().map(ConditionNode::Condition).collect(),
            ),
            Self::Single(cond) => ConditionGroup::and(vec![ConditionNode::Condition(cond.clone())]),
        }
    }

    /// 是否不包含任何条件（空数组或空组）
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Group(group) => group.conditions.is_empty(),
            Self::List(list) => list.is_empty(),
            Self::Single(_) => false,
        }
    }
}

impl fmt::Display for Conditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalize())
    }
}

/// 评估上下文 - 调用方提供的事件 / 用户数据
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    data: Map<String, Value>,
}

impl EvaluationContext {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// 从 JSON 对象创建，非对象输入视为解析错误
    pub fn from_value(value: Value) -> crate::Result<Self> {
        match value {
            Value::Object(data) => Ok(Self { data }),
            other => Err(crate::RuleError::ParseError(format!(
                "评估上下文必须是 JSON 对象，实际为 {}",
                crate::evaluator::type_name(&other)
            ))),
        }
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(field.into(), value.into());
        self
    }

    /// 获取字段值
    ///
    /// 优先按完整键名查找（如 "game:score"），找不到时按点号路径
    /// 逐级下钻（如 "user.level" 或 "items.0.sku"）。
    pub fn get_field(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.data.get(path) {
            return Some(value);
        }

        let mut parts = path.split('.');
        let mut current = self.data.get(parts.next()?)?;

        for part in parts {
            match current {
                Value::Object(map) => {
                    current = map.get(part)?;
                }
                Value::Array(arr) => {
                    let index: usize = part.parse().ok()?;
                    current = arr.get(index)?;
                }
                _ => return None,
            }
        }

        Some(current)
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }
}

/// 单个叶子条件的诊断结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub description: String,
    pub passed: bool,
}

impl CheckResult {
    pub fn new(description: impl Into<String>, passed: bool) -> Self {
        Self {
            description: description.into(),
            passed,
        }
    }
}

/// 评估结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationOutcome {
    pub passed: bool,
    /// 深度优先、从左到右的叶子条件诊断
    pub checks: Vec<CheckResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evaluation_trace: Vec<String>,
}

impl EvaluationOutcome {
    /// 无条件门槛时的结果
    pub fn pass() -> Self {
        Self {
            passed: true,
            checks: Vec::new(),
            evaluation_trace: Vec::new(),
        }
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }
}
