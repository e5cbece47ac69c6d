use asv_nav::planner::PlannerError;

use crate::goals::GoalError;

#[derive(Debug, thiserror::Error)]
pub enum MissionError {
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("objective index {index} out of range (mission has {count})")]
    IndexOutOfRange { index: usize, count: usize },

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    GoalUnavailable(#[from] GoalError),

    #[error("telemetry unavailable: no {0} received yet")]
    TelemetryUnavailable(&'static str),

    #[error("mission has no objectives")]
    EmptyMission,
}
