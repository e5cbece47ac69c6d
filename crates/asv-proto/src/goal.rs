use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalKind {
    PathFollow,
    Hover,
}

/// Identifies one dispatched goal. Ids are never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoalHandle {
    pub kind: GoalKind,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathFollowGoal {
    pub path: Vec<GeoPoint>,
    /// m/s; None leaves the follower at its own default.
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoverGoal {
    pub target: GeoPoint,
    pub minimum_distance: f64,
    pub maximum_distance: f64,
    pub maximum_speed: f64,
}

/// Terminal status reported by a motion subsystem for an accepted goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalOutcome {
    Succeeded,
    Aborted,
    Preempted,
}
