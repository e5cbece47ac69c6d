//! Mission plan documents.
//!
//! Plans arrive as JSON with a `NAVIGATION` list; only survey lines and
//! areas become objectives, everything else in the list is skipped.

use asv_proto::GeoPoint;
use serde::Deserialize;
use tracing::debug;

use crate::objective::{NavObjective, ObjectiveError, ObjectiveKind};

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("parse mission plan json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("navigation item {index}: {source}")]
    Objective {
        index: usize,
        #[source]
        source: ObjectiveError,
    },
}

/// What the mission core keeps from a plan document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPlan {
    pub objectives: Vec<NavObjective>,
    pub default_speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(rename = "DEFAULT_PARAMETERS", default)]
    defaults: Option<RawDefaults>,
    #[serde(rename = "NAVIGATION", default)]
    navigation: Vec<RawNavItem>,
}

#[derive(Debug, Deserialize)]
struct RawDefaults {
    defaultspeed_ms: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawNavItem {
    #[serde(rename = "type")]
    item_type: Option<String>,
    pathtype: Option<String>,
    #[serde(default)]
    nav: Vec<RawNavPoint>,
}

#[derive(Debug, Deserialize)]
struct RawNavPoint {
    position: RawPosition,
}

#[derive(Debug, Deserialize)]
struct RawPosition {
    latitude: f64,
    longitude: f64,
}

impl RawNavItem {
    fn kind(&self) -> Option<ObjectiveKind> {
        if self.pathtype.as_deref() == Some("area") {
            return Some(ObjectiveKind::Area);
        }
        if self.item_type.as_deref() == Some("survey_line") || self.pathtype.as_deref() == Some("survey_line") {
            return Some(ObjectiveKind::Line);
        }
        None
    }
}

pub fn parse_plan(doc: &str) -> Result<ParsedPlan, PlanError> {
    let raw: RawPlan = serde_json::from_str(doc)?;

    let mut objectives = Vec::new();
    for (index, item) in raw.navigation.iter().enumerate() {
        let Some(kind) = item.kind() else {
            debug!("plan: skipping navigation item {} (type={:?}, pathtype={:?})", index, item.item_type, item.pathtype);
            continue;
        };
        let waypoints = item
            .nav
            .iter()
            .map(|n| GeoPoint::new(n.position.latitude, n.position.longitude))
            .collect();
        let objective = NavObjective::new(kind, waypoints).map_err(|source| PlanError::Objective { index, source })?;
        objectives.push(objective);
    }

    Ok(ParsedPlan {
        objectives,
        default_speed: raw.defaults.and_then(|d| d.defaultspeed_ms),
    })
}
