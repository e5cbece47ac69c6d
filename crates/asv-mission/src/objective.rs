//! Navigation objectives and the store that sequences them.

use std::fmt;

use asv_proto::GeoPoint;

use crate::error::MissionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveKind {
    Line,
    Area,
}

impl ObjectiveKind {
    /// Fewest waypoints that make a usable objective of this kind.
    pub fn min_waypoints(self) -> usize {
        match self {
            ObjectiveKind::Line => 2,
            ObjectiveKind::Area => 3,
        }
    }
}

impl fmt::Display for ObjectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectiveKind::Line => f.write_str("line"),
            ObjectiveKind::Area => f.write_str("area"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ObjectiveError {
    #[error("{kind} needs at least {need} waypoints, got {got}")]
    TooFewWaypoints { kind: ObjectiveKind, need: usize, got: usize },

    #[error("waypoint {index} has invalid coordinates ({lat}, {lon})")]
    InvalidCoordinate { index: usize, lat: f64, lon: f64 },
}

/// One planned unit of work. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct NavObjective {
    kind: ObjectiveKind,
    waypoints: Vec<GeoPoint>,
}

impl NavObjective {
    pub fn new(kind: ObjectiveKind, waypoints: Vec<GeoPoint>) -> Result<Self, ObjectiveError> {
        let need = kind.min_waypoints();
        if waypoints.len() < need {
            return Err(ObjectiveError::TooFewWaypoints { kind, need, got: waypoints.len() });
        }
        if let Some((index, p)) = waypoints.iter().enumerate().find(|(_, p)| !p.is_valid()) {
            return Err(ObjectiveError::InvalidCoordinate { index, lat: p.lat, lon: p.lon });
        }
        Ok(Self { kind, waypoints })
    }

    pub fn line(waypoints: Vec<GeoPoint>) -> Result<Self, ObjectiveError> {
        Self::new(ObjectiveKind::Line, waypoints)
    }

    pub fn area(waypoints: Vec<GeoPoint>) -> Result<Self, ObjectiveError> {
        Self::new(ObjectiveKind::Area, waypoints)
    }

    pub fn kind(&self) -> ObjectiveKind {
        self.kind
    }

    pub fn waypoints(&self) -> &[GeoPoint] {
        &self.waypoints
    }

    pub fn start(&self) -> GeoPoint {
        self.waypoints[0]
    }

    /// Second waypoint; the approach heading aims from start towards it.
    pub fn aim(&self) -> GeoPoint {
        self.waypoints[1]
    }
}

/// Ordered objectives plus the cursor into them.
///
/// The list is only ever swapped whole; the cursor is `None` until an
/// objective has been selected and otherwise always indexes the list.
#[derive(Debug, Clone, Default)]
pub struct MissionStore {
    objectives: Vec<NavObjective>,
    cursor: Option<usize>,
}

impl MissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the objective list and forgets the cursor.
    pub fn set_mission(&mut self, objectives: Vec<NavObjective>) {
        self.objectives = objectives;
        self.cursor = None;
    }

    pub fn count(&self) -> usize {
        self.objectives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objectives.is_empty()
    }

    pub fn objective_at(&self, index: usize) -> Result<&NavObjective, MissionError> {
        self.objectives
            .get(index)
            .ok_or(MissionError::IndexOutOfRange { index, count: self.objectives.len() })
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current(&self) -> Option<(usize, &NavObjective)> {
        let i = self.cursor?;
        self.objectives.get(i).map(|o| (i, o))
    }

    pub fn set_cursor(&mut self, index: usize) -> Result<(), MissionError> {
        self.objective_at(index)?;
        self.cursor = Some(index);
        Ok(())
    }

    /// Index advancement would select: the one after the cursor, wrapping
    /// to 0 past the end, or 0 when nothing is selected yet.
    pub fn next_index(&self) -> Result<usize, MissionError> {
        let n = self.objectives.len();
        if n == 0 {
            return Err(MissionError::EmptyMission);
        }
        Ok(match self.cursor {
            Some(i) => (i + 1) % n,
            None => 0,
        })
    }
}
