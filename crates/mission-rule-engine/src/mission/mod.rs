//! 任务配置模型与周期分析

pub mod cycle;
pub mod models;

pub use cycle::{
    CycleAnalysis, CycleStage, CycleStep, CycleWarning, MissionCycleAnalyzer, WarningCode,
};
pub use models::{Mission, MissionFormData, MissionPeriod, MissionType, RewardType, TriggerEvent};
