use std::sync::{Arc, Mutex, PoisonError};

use asv_proto::GeoPoint;
use time::OffsetDateTime;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub point: GeoPoint,
    pub ts: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingSample {
    /// Compass bearing, degrees clockwise from north.
    pub bearing_deg: f64,
    pub ts: OffsetDateTime,
}

/// Last known vehicle telemetry. Every field is independent and absent
/// until its first sample arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleState {
    pub position: Option<PositionFix>,
    pub heading: Option<HeadingSample>,
    pub depth_m: Option<f64>,
}

impl VehicleState {
    pub fn point(&self) -> Option<GeoPoint> {
        self.position.map(|p| p.point)
    }

    pub fn bearing_deg(&self) -> Option<f64> {
        self.heading.map(|h| h.bearing_deg)
    }
}

/// Shared last-value-wins telemetry snapshot.
///
/// Writers only hold the lock for a copy, so publishers never wait on the
/// mission logic.
#[derive(Debug, Clone, Default)]
pub struct TelemetryCache {
    inner: Arc<Mutex<VehicleState>>,
}

impl TelemetryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a position fix unless it is older than the one held.
    pub fn update_position(&self, point: GeoPoint, ts: OffsetDateTime) -> bool {
        let mut st = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = st.position {
            if ts < prev.ts {
                debug!("telemetry: dropping stale position sample");
                return false;
            }
        }
        st.position = Some(PositionFix { point, ts });
        true
    }

    /// Stores a heading sample unless it is older than the one held.
    pub fn update_heading(&self, bearing_deg: f64, ts: OffsetDateTime) -> bool {
        let mut st = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = st.heading {
            if ts < prev.ts {
                debug!("telemetry: dropping stale heading sample");
                return false;
            }
        }
        st.heading = Some(HeadingSample { bearing_deg, ts });
        true
    }

    pub fn update_depth(&self, depth_m: f64) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).depth_m = Some(depth_m);
    }

    pub fn snapshot(&self) -> VehicleState {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
