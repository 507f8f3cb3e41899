//! 条件执行器
//!
//! 对编译后的条件组做完整求值：不短路，每个叶子条件都会产生一条诊断，
//! 便于后台展示"哪些条件没满足"。

use crate::compiler::{CompiledConditions, RuleCompiler};
use crate::error::Result;
use crate::evaluator::{ConditionEvaluator, LeafOutcome};
use crate::models::{
    CheckResult, Condition, ConditionGroup, ConditionNode, Conditions, EvaluationContext,
    EvaluationOutcome,
};
use crate::operators::LogicalOperator;
use tracing::{debug, warn};

/// 条件执行器
#[derive(Debug, Clone, Default)]
pub struct RuleExecutor {
    /// 是否记录组级别的评估追踪
    trace_enabled: bool,
}

impl RuleExecutor {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 编译并评估后台保存的条件
    ///
    /// 未配置条件（None 或空数组 / 空 AND 组）视为无门槛，直接通过。
    pub fn evaluate(
        &self,
        conditions: Option<&Conditions>,
        context: &EvaluationContext,
    ) -> Result<EvaluationOutcome> {
        let Some(conditions) = conditions else {
            return Ok(EvaluationOutcome::pass());
        };

        let compiled = RuleCompiler::new().compile(conditions).inspect_err(|e| {
            warn!(code = e.code(), error = %e, "条件配置错误");
        })?;

        self.execute(&compiled, context)
    }

    /// 执行条件评估
    pub fn execute(
        &self,
        compiled: &CompiledConditions,
        context: &EvaluationContext,
    ) -> Result<EvaluationOutcome> {
        let mut outcome = EvaluationOutcome {
            passed: false,
            checks: Vec::with_capacity(compiled.root().leaf_count()),
            evaluation_trace: Vec::new(),
        };

        outcome.passed = self.evaluate_group(compiled.root(), context, &mut outcome, "root")?;

        debug!(
            passed = outcome.passed,
            checks = outcome.checks.len(),
            failed = outcome.failed_checks().count(),
            "条件评估完成"
        );

        Ok(outcome)
    }

    fn evaluate_node(
        &self,
        node: &ConditionNode,
        context: &EvaluationContext,
        outcome: &mut EvaluationOutcome,
        path: &str,
    ) -> Result<bool> {
        match node {
            ConditionNode::Condition(cond) => self.evaluate_condition(cond, context, outcome, path),
            ConditionNode::Group(group) => self.evaluate_group(group, context, outcome, path),
        }
    }

    /// 评估叶子条件并记录诊断
    fn evaluate_condition(
        &self,
        cond: &Condition,
        context: &EvaluationContext,
        outcome: &mut EvaluationOutcome,
        path: &str,
    ) -> Result<bool> {
        let field_value = context.get_field(&cond.field);

        let leaf = ConditionEvaluator::evaluate(field_value, &cond.op, &cond.value)?;
        let passed = leaf.passed();

        let description = match (leaf, field_value) {
            (LeafOutcome::Matched | LeafOutcome::NotMatched, Some(actual)) => {
                format!("{} (actual: {})", cond, actual)
            }
            _ => match leaf.note() {
                Some(note) => format!("{} ({})", cond, note),
                None => cond.to_string(),
            },
        };

        if self.trace_enabled {
            outcome.evaluation_trace.push(format!(
                "{}: {} => {}",
                path,
                description,
                if passed { "PASSED" } else { "FAILED" }
            ));
        }

        outcome.checks.push(CheckResult::new(description, passed));

        Ok(passed)
    }

    /// 评估逻辑组：所有子节点都会被求值，结果再按 AND / OR 汇总
    fn evaluate_group(
        &self,
        group: &ConditionGroup,
        context: &EvaluationContext,
        outcome: &mut EvaluationOutcome,
        path: &str,
    ) -> Result<bool> {
        if self.trace_enabled {
            outcome.evaluation_trace.push(format!(
                "{}: 开始评估 {} 组 (共 {} 个子节点)",
                path,
                group.mode,
                group.conditions.len()
            ));
        }

        let mut results = Vec::with_capacity(group.conditions.len());
        for (i, child) in group.conditions.iter().enumerate() {
            let child_path = format!("{}.conditions[{}]", path, i);
            results.push(self.evaluate_node(child, context, outcome, &child_path)?);
        }

        // 空 AND 恒真，空 OR 恒假
        let passed = match group.mode {
            LogicalOperator::And => results.iter().all(|r| *r),
            LogicalOperator::Or => results.iter().any(|r| *r),
        };

        if self.trace_enabled {
            outcome.evaluation_trace.push(format!(
                "{}: {} 组结果 {}",
                path,
                group.mode,
                if passed { "PASSED" } else { "FAILED" }
            ));
        }

        Ok(passed)
    }
}
