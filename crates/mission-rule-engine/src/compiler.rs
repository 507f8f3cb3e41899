//! 条件编译器
//!
//! 将后台保存的条件收敛为单一的条件组，并在执行前完成结构校验，
//! 同时预提取条件中引用的字段。

use crate::error::{Result, RuleError};
use crate::evaluator::ConditionEvaluator;
use crate::models::{Condition, ConditionGroup, ConditionNode, Conditions};
use std::collections::BTreeSet;

/// 编译后的条件
#[derive(Debug, Clone)]
pub struct CompiledConditions {
    /// 收敛后的根节点（AND 或原始组）
    pub root: ConditionGroup,
    /// 条件中使用的所有字段路径
    pub required_fields: BTreeSet<String>,
}

impl CompiledConditions {
    pub fn root(&self) -> &ConditionGroup {
        &self.root
    }
}

/// 条件编译器（无状态）
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleCompiler;

impl RuleCompiler {
    pub fn new() -> Self {
        Self
    }

    /// 从 JSON 字符串编译条件
    pub fn compile_from_json(&self, json: &str) -> Result<CompiledConditions> {
        let conditions: Conditions = serde_json::from_str(json)?;
        self.compile(&conditions)
    }

    /// 编译条件
    pub fn compile(&self, conditions: &Conditions) -> Result<CompiledConditions> {
        let root = conditions.normalize();

        Self::validate_group(&root, "root")?;

        let mut required_fields = BTreeSet::new();
        Self::collect_fields(&root, &mut required_fields);

        Ok(CompiledConditions {
            root,
            required_fields,
        })
    }

    /// 仅做结构校验，不产生编译结果
    pub fn validate(conditions: &Conditions) -> Result<()> {
        Self::validate_group(&conditions.normalize(), "root")
    }

    fn validate_group(group: &ConditionGroup, path: &str) -> Result<()> {
        for (i, child) in group.conditions.iter().enumerate() {
            let child_path = format!("{}.conditions[{}]", path, i);
            match child {
                ConditionNode::Condition(cond) => Self::validate_condition(cond, &child_path)?,
                ConditionNode::Group(nested) => Self::validate_group(nested, &child_path)?,
            }
        }

        Ok(())
    }

    /// 验证条件
    fn validate_condition(cond: &Condition, path: &str) -> Result<()> {
        if cond.field.trim().is_empty() {
            return Err(RuleError::ParseError(format!(
                "条件 '{}' 的字段不能为空",
                path
            )));
        }

        // 验证操作符和值的兼容性
        ConditionEvaluator::check_operand(&cond.op, &cond.value).map_err(|e| match e {
            RuleError::InvalidOperator { operator, reason } => RuleError::InvalidOperator {
                operator,
                reason: format!("{} (位置 {}, 字段 {})", reason, path, cond.field),
            },
            other => other,
        })
    }

    fn collect_fields(group: &ConditionGroup, fields: &mut BTreeSet<String>) {
        for child in &group.conditions {
            match child {
                ConditionNode::Condition(cond) => {
                    fields.insert(cond.field.clone());
                }
                ConditionNode::Group(nested) => Self::collect_fields(nested, fields),
            }
        }
    }
}
