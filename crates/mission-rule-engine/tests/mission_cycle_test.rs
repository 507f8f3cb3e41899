//! 任务周期分析集成测试

use gamify_shared::config::MissionAnalysisConfig;
use rule_engine::mission::{
    CycleStage, MissionCycleAnalyzer, MissionFormData, MissionPeriod, MissionType, WarningCode,
};
use rule_engine::analyze;
use serde_json::{Value, json};

fn base_mission() -> Value {
    json!({
        "code": "win-streak",
        "name": "Win streak",
        "triggerEvent": "game:win",
        "missionType": "count",
        "missionPeriod": "daily",
        "targetValue": 5,
        "maxCompletions": 30,
        "rewardType": "turns",
        "rewardValue": 1
    })
}

fn mission_with(overrides: Value) -> MissionFormData {
    let mut value = base_mission();
    if let (Some(base), Some(extra)) = (value.as_object_mut(), overrides.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_always_five_steps_for_every_shape() {
    let types = ["single", "count", "streak", "cumulative"];
    let periods = ["daily", "weekly_mon", "weekly_sun", "monthly", "all_time"];

    for mission_type in types {
        for period in periods {
            let mission = mission_with(json!({
                "missionType": mission_type,
                "missionPeriod": period
            }));
            let analysis = analyze(&mission);
            let titles: Vec<&str> = analysis.steps.iter().map(|s| s.title.as_str()).collect();
            assert_eq!(
                titles,
                vec!["Trigger", "Track", "Complete", "Reward", "Reset"],
                "{} / {}",
                mission_type,
                period
            );
        }
    }
}

#[test]
fn test_single_with_target_three_warns() {
    let analysis = analyze(&mission_with(json!({"missionType": "single", "targetValue": 3})));
    let warning = analysis
        .warnings
        .iter()
        .find(|w| w.code == WarningCode::SingleTargetMismatch)
        .expect("inconsistency warning");
    assert!(warning.message.to_lowercase().contains("inconsistent"));

    let analysis = analyze(&mission_with(json!({"missionType": "single", "targetValue": 1})));
    assert!(!analysis.has_warning(WarningCode::SingleTargetMismatch));
}

#[test]
fn test_all_time_unbounded_completions() {
    let analysis = analyze(&mission_with(json!({
        "missionPeriod": "all_time",
        "maxCompletions": null
    })));
    assert!(analysis.has_warning(WarningCode::UnboundedCompletions));

    let analysis = analyze(&mission_with(json!({
        "missionPeriod": "all_time",
        "maxCompletions": 1
    })));
    assert!(!analysis.has_warning(WarningCode::UnboundedCompletions));
    let reset = analysis.step(CycleStage::Reset).unwrap();
    assert!(reset.description.contains("One-shot"));
}

#[test]
fn test_streak_all_time_warns() {
    let mission = mission_with(json!({"missionType": "streak", "missionPeriod": "all_time"}));
    assert_eq!(mission.mission_type, MissionType::Streak);
    assert_eq!(mission.mission_period, MissionPeriod::AllTime);
    assert!(analyze(&mission).has_warning(WarningCode::StreakWithoutPeriod));
}

#[test]
fn test_zero_score_reward_warns() {
    let analysis = analyze(&mission_with(json!({"rewardType": "score", "rewardValue": 0})));
    assert!(analysis.has_warning(WarningCode::ZeroValueReward));

    // 次数奖励为 0 不提示占位
    let analysis = analyze(&mission_with(json!({"rewardType": "turns", "rewardValue": 0})));
    assert!(!analysis.has_warning(WarningCode::ZeroValueReward));
}

#[test]
fn test_client_trigger_uses_configured_threshold() {
    let mission = mission_with(json!({
        "allowFeTrigger": true,
        "rewardType": "score",
        "rewardValue": 800
    }));

    assert!(!analyze(&mission).has_warning(WarningCode::ClientTriggerHighValue));

    let strict = MissionCycleAnalyzer::new(MissionAnalysisConfig {
        high_value_turns: 5,
        high_value_score: 500,
    });
    assert!(strict.analyze(&mission).has_warning(WarningCode::ClientTriggerHighValue));
}

#[test]
fn test_reward_step_describes_expiration() {
    let analysis = analyze(&mission_with(json!({
        "rewardExpirationConfig": {"mode": "ttl", "ttlDays": 3}
    })));
    let reward = analysis.step(CycleStage::Reward).unwrap();
    assert!(reward.description.contains("1 turn(s)"));
    assert!(reward.details[0].contains("3 day(s)"));

    let analysis = analyze(&mission_with(json!({
        "rewardExpirationConfig": {"mode": "fixed"}
    })));
    assert!(analysis.has_warning(WarningCode::IncompleteExpiration));
}

#[test]
fn test_negative_reward_is_reported() {
    let analysis = analyze(&mission_with(json!({"rewardValue": -5})));
    assert!(analysis.has_warning(WarningCode::InvalidField));
    assert_eq!(analysis.steps.len(), 5);
}

#[test]
fn test_summary_mentions_goal_and_reset() {
    let analysis = analyze(&mission_with(json!({})));
    assert!(analysis.summary.starts_with("Win streak:"));
    assert!(analysis.summary.contains("`game:win` 5 times"));
    assert!(analysis.summary.contains("resets daily, up to 30 completions"));
}
