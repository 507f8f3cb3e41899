//! 任务规则 CLI
//!
//! 加载配置、初始化日志后分派到各子命令。

use clap::Parser;
use gamify_shared::{config::AppConfig, observability};
use rule_engine::cli::{Cli, CommandRunner, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load("mission-rule-engine")?;
    // 命令行参数优先于配置文件
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }
    observability::init(&config.observability)?;

    let runner = CommandRunner::new(&config)?;

    let output = match cli.command {
        Commands::Evaluate {
            conditions,
            context,
            trace,
        } => runner.run_evaluate(&conditions, &context, trace)?,
        Commands::CheckReward { reward, context } => runner.run_check_reward(&reward, &context)?,
        Commands::Analyze { mission, json } => runner.run_analyze(&mission, json)?,
        Commands::Validate { mission } => runner.run_validate(&mission)?,
        Commands::Expiry { config, granted_at } => {
            runner.run_expiry(&config, granted_at.as_deref())?
        }
    };

    println!("{}", output);
    Ok(())
}
