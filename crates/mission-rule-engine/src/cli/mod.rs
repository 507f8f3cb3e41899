//! CLI 模块
//!
//! 提供命令行接口，支持以下功能：
//!
//! - `evaluate` - 用事件上下文评估任务条件
//! - `check-reward` - 校验用户能否领取奖励
//! - `analyze` - 输出任务生命周期分析
//! - `validate` - 校验任务配置
//! - `expiry` - 计算奖励过期时间
//!
//! # 使用示例
//!
//! ```bash
//! mission-rule evaluate --conditions conditions.json --context event.json
//! mission-rule check-reward --reward reward.json --context user.json
//! mission-rule analyze --mission mission.json --json
//! mission-rule validate --mission mission.json
//! mission-rule expiry --config expiration.json --granted-at 2024-01-17T15:00:00+07:00
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::CommandRunner;
