use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatusEvent {
    /// Emitted every tick.
    Heartbeat { state: String, ts_unix_ms: i64 },
    /// Emitted whenever the active objective changes.
    CurrentObjective { index: usize },
    /// Polygon of an area objective when area survey begins.
    SurveyArea { polygon: Vec<GeoPoint> },
    CurrentSpeed { speed: f64 },
}
