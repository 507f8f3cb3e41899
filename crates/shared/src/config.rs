//! 配置管理模块
//!
//! 支持多层配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// 日志级别（如 "info", "debug"），RUST_LOG 优先
    pub log_level: String,
    /// 是否启用 JSON 格式日志
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// 条件评估配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// 调用方未提供时间时使用的时区偏移（分钟）
    pub utc_offset_minutes: i32,
    /// 是否输出逻辑组级别的评估轨迹
    pub trace_enabled: bool,
}

/// 任务周期分析配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MissionAnalysisConfig {
    /// 允许客户端触发时，视为高价值的次数奖励阈值
    pub high_value_turns: i64,
    /// 允许客户端触发时，视为高价值的积分奖励阈值
    pub high_value_score: i64,
}

impl Default for MissionAnalysisConfig {
    fn default() -> Self {
        Self {
            high_value_turns: 5,
            high_value_score: 1000,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub observability: ObservabilityConfig,
    pub evaluation: EvaluationConfig,
    pub mission_analysis: MissionAnalysisConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. .env（如果存在，仅写入进程环境变量）
    /// 2. config/default.toml（默认配置）
    /// 3. config/{environment}.toml（环境特定配置）
    /// 4. config/{service_name}.toml（服务特定配置）
    /// 5. 环境变量（GAMIFY_ 前缀，如 GAMIFY_OBSERVABILITY__LOG_LEVEL -> observability.log_level）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("GAMIFY_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from(Path::new(&config_dir), &env, service_name)
    }

    fn load_from(config_dir: &Path, env: &str, service_name: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            // 字段名本身含下划线，层级分隔使用双下划线
            .add_source(
                Environment::with_prefix("GAMIFY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.mission_analysis.high_value_turns, 5);
        assert_eq!(config.mission_analysis.high_value_score, 1000);
        assert_eq!(config.evaluation.utc_offset_minutes, 0);
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = std::env::temp_dir().join("gamify-config-missing");
        let config = AppConfig::load_from(&dir, "test", "mission-rule-engine").unwrap();
        assert_eq!(config.service_name, "mission-rule-engine");
        assert_eq!(config.environment, "test");
        assert!(!config.observability.json_logs);
    }

    #[test]
    fn test_layered_files() {
        let dir = std::env::temp_dir().join(format!("gamify-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("default.toml"),
            "[mission_analysis]\nhigh_value_turns = 10\nhigh_value_score = 500\n",
        )
        .unwrap();
        fs::write(
            dir.join("staging.toml"),
            "[mission_analysis]\nhigh_value_turns = 3\n\n[evaluation]\nutc_offset_minutes = 420\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&dir, "staging", "mission-rule-engine").unwrap();
        assert_eq!(config.mission_analysis.high_value_turns, 3);
        assert_eq!(config.mission_analysis.high_value_score, 500);
        assert_eq!(config.evaluation.utc_offset_minutes, 420);

        fs::remove_dir_all(&dir).ok();
    }
}
