use anyhow::Result;
use tracing::warn;

use crate::config::MissionConfig;
use crate::plan::ParsedPlan;

pub fn check_config(cfg: &MissionConfig) -> Result<()> {
    anyhow::ensure!(cfg.waypoint_threshold > 0.0, "mission.waypoint_threshold must be > 0");
    anyhow::ensure!(cfg.turn_radius > 0.0, "mission.turn_radius must be > 0");
    anyhow::ensure!(cfg.segment_length > 0.0, "mission.segment_length must be > 0");
    anyhow::ensure!(cfg.hover_minimum_distance >= 0.0, "mission.hover_minimum_distance must be >= 0");
    anyhow::ensure!(
        cfg.hover_maximum_distance >= cfg.hover_minimum_distance,
        "mission.hover_maximum_distance below hover_minimum_distance"
    );
    anyhow::ensure!(cfg.hover_maximum_speed > 0.0, "mission.hover_maximum_speed must be > 0");
    if let Some(speed) = cfg.default_speed {
        anyhow::ensure!(speed > 0.0, "mission.default_speed must be > 0");
    }
    anyhow::ensure!(cfg.planner_timeout_ms >= 100, "mission.planner_timeout_ms too small");
    anyhow::ensure!(cfg.tick_hz > 0.0 && cfg.tick_hz <= 100.0, "mission.tick_hz should be in (0, 100]");
    if cfg.segment_length > cfg.turn_radius {
        warn!("doctor: segment_length {} exceeds turn_radius {}, transits will be coarse", cfg.segment_length, cfg.turn_radius);
    }
    Ok(())
}

pub fn check_plan(plan: &ParsedPlan) -> Result<()> {
    anyhow::ensure!(!plan.objectives.is_empty(), "plan has no survey_line or area objectives");
    if let Some(speed) = plan.default_speed {
        anyhow::ensure!(speed > 0.0, "plan DEFAULT_PARAMETERS.defaultspeed_ms must be > 0");
    }
    Ok(())
}
