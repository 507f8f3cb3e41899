//! CLI 命令定义
//!
//! 使用 clap derive 宏定义命令行接口结构。

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 任务规则命令行工具
#[derive(Parser, Debug)]
#[command(name = "mission-rule")]
#[command(version, about = "任务与奖励规则评估工具")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 子命令枚举
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 评估任务条件
    ///
    /// 条件文件可以是单个条件、条件数组、条件组或 null。
    Evaluate {
        /// 条件 JSON 文件
        #[arg(short, long)]
        conditions: PathBuf,

        /// 事件上下文 JSON 文件（对象）
        #[arg(short = 'x', long)]
        context: PathBuf,

        /// 输出逻辑组评估轨迹
        #[arg(long)]
        trace: bool,
    },

    /// 校验奖励领取资格
    ///
    /// 上下文缺少 `now` 时使用当前时间（按配置的时区偏移）。
    CheckReward {
        /// 奖励 JSON 文件
        #[arg(short, long)]
        reward: PathBuf,

        /// 用户上下文 JSON 文件
        #[arg(short = 'x', long)]
        context: PathBuf,
    },

    /// 分析任务生命周期
    Analyze {
        /// 任务 JSON 文件
        #[arg(short, long)]
        mission: PathBuf,

        /// 输出 JSON 而非文本
        #[arg(long)]
        json: bool,
    },

    /// 校验任务配置
    Validate {
        /// 任务 JSON 文件
        #[arg(short, long)]
        mission: PathBuf,
    },

    /// 计算奖励过期时间
    Expiry {
        /// 过期配置 JSON 文件
        #[arg(short, long)]
        config: PathBuf,

        /// 发放时间（RFC 3339），默认当前时间
        #[arg(short, long)]
        granted_at: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_evaluate() {
        let cli = Cli::parse_from([
            "mission-rule",
            "evaluate",
            "--conditions",
            "c.json",
            "-x",
            "ctx.json",
        ]);
        match cli.command {
            Commands::Evaluate {
                conditions,
                context,
                trace,
            } => {
                assert_eq!(conditions, PathBuf::from("c.json"));
                assert_eq!(context, PathBuf::from("ctx.json"));
                assert!(!trace);
            }
            _ => panic!("预期 Evaluate 命令"),
        }
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn test_cli_parse_analyze() {
        let cli = Cli::parse_from(["mission-rule", "analyze", "-m", "mission.json", "--json"]);
        match cli.command {
            Commands::Analyze { mission, json } => {
                assert_eq!(mission, PathBuf::from("mission.json"));
                assert!(json);
            }
            _ => panic!("预期 Analyze 命令"),
        }
    }

    #[test]
    fn test_cli_parse_expiry() {
        let cli = Cli::parse_from([
            "mission-rule",
            "--log-level",
            "debug",
            "expiry",
            "--config",
            "exp.json",
            "--granted-at",
            "2024-01-17T15:00:00Z",
        ]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Expiry { config, granted_at } => {
                assert_eq!(config, PathBuf::from("exp.json"));
                assert_eq!(granted_at.as_deref(), Some("2024-01-17T15:00:00Z"));
            }
            _ => panic!("预期 Expiry 命令"),
        }
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["mission-rule"]).is_err());
    }
}
