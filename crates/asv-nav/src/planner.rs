//! Transit path requests.
//!
//! The planning service itself lives outside the mission core; this module
//! fixes the request/response contract, wraps blocking planners with a
//! timeout, and provides a straight-line sampler for setups without one.

use std::sync::Arc;
use std::time::Duration;

use asv_proto::GeoPoint;
use tracing::{debug, warn};

use crate::geodesy;
use crate::heading::heading_to_yaw;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlannerError {
    #[error("path planner unavailable: {0}")]
    Unavailable(String),

    #[error("path planner rejected request: {0}")]
    Rejected(String),

    #[error("path planner timed out after {0:?}")]
    Timeout(Duration),
}

/// Start and target poses for a transit. Headings are compass bearings.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitRequest {
    pub start: GeoPoint,
    pub start_heading_deg: f64,
    pub target: GeoPoint,
    pub target_heading_deg: f64,
    /// Minimum turn radius, metres.
    pub radius_m: f64,
    /// Spacing between returned samples, metres.
    pub sampling_interval_m: f64,
}

impl TransitRequest {
    pub fn start_yaw_deg(&self) -> f64 {
        heading_to_yaw(self.start_heading_deg)
    }

    pub fn target_yaw_deg(&self) -> f64 {
        heading_to_yaw(self.target_heading_deg)
    }
}

/// A synchronous planning service. Implementations may block.
///
/// Headings in [`TransitRequest`] are compass bearings. Planners that work
/// in yaw (0 = east, counter-clockwise) read
/// [`start_yaw_deg`](TransitRequest::start_yaw_deg) and
/// [`target_yaw_deg`](TransitRequest::target_yaw_deg) instead.
pub trait PathPlanner: Send + Sync {
    fn plan(&self, req: &TransitRequest) -> Result<Vec<GeoPoint>, PlannerError>;
}

/// Runs `planner` on the blocking pool and waits at most `limit`.
///
/// Paths shorter than two points are not drivable and come back as
/// `Rejected`.
pub async fn request_transit(
    planner: Arc<dyn PathPlanner>,
    req: TransitRequest,
    limit: Duration,
) -> Result<Vec<GeoPoint>, PlannerError> {
    debug!(
        "planner: request start=({:.6},{:.6}) yaw={:.1} target=({:.6},{:.6}) yaw={:.1}",
        req.start.lat,
        req.start.lon,
        req.start_yaw_deg(),
        req.target.lat,
        req.target.lon,
        req.target_yaw_deg()
    );

    let job = tokio::task::spawn_blocking(move || planner.plan(&req));
    let path = match tokio::time::timeout(limit, job).await {
        Err(_) => {
            warn!("planner: no answer within {:?}", limit);
            return Err(PlannerError::Timeout(limit));
        }
        Ok(Err(join)) => return Err(PlannerError::Unavailable(format!("planner task failed: {}", join))),
        Ok(Ok(res)) => res?,
    };

    if path.len() < 2 {
        return Err(PlannerError::Rejected(format!("path has {} point(s)", path.len())));
    }
    Ok(path)
}

/// Samples the straight leg from start to target every
/// `sampling_interval_m`. Ignores headings and the turn radius beyond
/// validating them.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLinePlanner;

impl PathPlanner for StraightLinePlanner {
    fn plan(&self, req: &TransitRequest) -> Result<Vec<GeoPoint>, PlannerError> {
        if !(req.radius_m > 0.0) {
            return Err(PlannerError::Rejected(format!("turn radius must be > 0 (got {})", req.radius_m)));
        }
        if !(req.sampling_interval_m > 0.0) {
            return Err(PlannerError::Rejected(format!(
                "sampling interval must be > 0 (got {})",
                req.sampling_interval_m
            )));
        }
        if !req.start.is_valid() || !req.target.is_valid() {
            return Err(PlannerError::Rejected("coordinates out of range".into()));
        }

        let dist = geodesy::distance_m(req.start, req.target);
        let steps = (dist / req.sampling_interval_m).ceil().max(1.0) as usize;
        let mut path = Vec::with_capacity(steps + 1);
        for i in 0..steps {
            path.push(geodesy::interpolate(req.start, req.target, i as f64 / steps as f64));
        }
        path.push(req.target);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(target: GeoPoint) -> TransitRequest {
        TransitRequest {
            start: GeoPoint::new(43.0, -70.0),
            start_heading_deg: 0.0,
            target,
            target_heading_deg: 90.0,
            radius_m: 20.0,
            sampling_interval_m: 5.0,
        }
    }

    struct Fixed(Result<Vec<GeoPoint>, PlannerError>);

    impl PathPlanner for Fixed {
        fn plan(&self, _req: &TransitRequest) -> Result<Vec<GeoPoint>, PlannerError> {
            self.0.clone()
        }
    }

    struct Stuck;

    impl PathPlanner for Stuck {
        fn plan(&self, _req: &TransitRequest) -> Result<Vec<GeoPoint>, PlannerError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0)])
        }
    }

    #[test]
    fn request_yaws_use_the_compass_conversion() {
        let r = req(GeoPoint::new(43.0, -70.0));
        assert_eq!(r.start_yaw_deg(), 90.0);
        assert_eq!(r.target_yaw_deg(), 0.0);
    }

    #[test]
    fn straight_line_samples_at_interval() {
        // ~111 m north
        let path = StraightLinePlanner.plan(&req(GeoPoint::new(43.001, -70.0))).unwrap();
        assert_eq!(path.len(), 24);
        assert_eq!(path[0], GeoPoint::new(43.0, -70.0));
        assert_eq!(*path.last().unwrap(), GeoPoint::new(43.001, -70.0));
        for w in path.windows(2) {
            assert!(geodesy::distance_m(w[0], w[1]) <= 5.0 + 1e-6);
        }
    }

    #[test]
    fn straight_line_always_has_two_points() {
        let path = StraightLinePlanner.plan(&req(GeoPoint::new(43.0, -70.0))).unwrap();
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn straight_line_rejects_bad_radius() {
        let mut r = req(GeoPoint::new(43.001, -70.0));
        r.radius_m = 0.0;
        assert!(matches!(StraightLinePlanner.plan(&r), Err(PlannerError::Rejected(_))));
    }

    #[tokio::test]
    async fn short_paths_are_rejected() {
        let planner: Arc<dyn PathPlanner> = Arc::new(Fixed(Ok(vec![GeoPoint::new(0.0, 0.0)])));
        let res = request_transit(planner, req(GeoPoint::new(43.001, -70.0)), Duration::from_secs(1)).await;
        assert!(matches!(res, Err(PlannerError::Rejected(_))));
    }

    #[tokio::test]
    async fn planner_errors_pass_through() {
        let planner: Arc<dyn PathPlanner> = Arc::new(Fixed(Err(PlannerError::Unavailable("down".into()))));
        let res = request_transit(planner, req(GeoPoint::new(43.001, -70.0)), Duration::from_secs(1)).await;
        assert_eq!(res, Err(PlannerError::Unavailable("down".into())));
    }

    /// Answers only when the north start and east target headings arrive as
    /// yaw 90 and 0.
    struct YawGated;

    impl PathPlanner for YawGated {
        fn plan(&self, req: &TransitRequest) -> Result<Vec<GeoPoint>, PlannerError> {
            if req.start_yaw_deg() != 90.0 || req.target_yaw_deg() != 0.0 {
                return Err(PlannerError::Rejected(format!(
                    "yaw {} -> {}",
                    req.start_yaw_deg(),
                    req.target_yaw_deg()
                )));
            }
            Ok(vec![req.start, req.target])
        }
    }

    #[tokio::test]
    async fn planners_see_headings_as_yaw() {
        let planner: Arc<dyn PathPlanner> = Arc::new(YawGated);
        let target = GeoPoint::new(43.001, -70.0);
        let res = request_transit(planner, req(target), Duration::from_secs(1)).await;
        assert_eq!(res, Ok(vec![GeoPoint::new(43.0, -70.0), target]));
    }

    #[tokio::test]
    async fn slow_planner_times_out() {
        let planner: Arc<dyn PathPlanner> = Arc::new(Stuck);
        let limit = Duration::from_millis(20);
        let res = request_transit(planner, req(GeoPoint::new(43.001, -70.0)), limit).await;
        assert_eq!(res, Err(PlannerError::Timeout(limit)));
    }
}
