//! Kinematic stand-in for the motion subsystems, used by `missionctl run`.
//!
//! The vehicle drives straight between consecutive path points at the goal
//! speed and station-keeps on hover goals. Finished and cancelled goals are
//! queued and handed back to the driver by [`SimVehicle::run`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use asv_mission::{DriverHandle, GoalClient, GoalError};
use asv_nav::geodesy;
use asv_nav::telemetry::TelemetryCache;
use asv_proto::goal::{GoalHandle, GoalOutcome, HoverGoal, PathFollowGoal};
use asv_proto::GeoPoint;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub start: GeoPoint,
    /// Compass degrees.
    pub heading: f64,
    /// m/s when a path goal carries no speed.
    pub speed: f64,
    pub step_hz: f64,
    /// Simulated seconds per wall-clock second.
    pub time_scale: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start: GeoPoint::new(43.0717, -70.7110),
            heading: 0.0,
            speed: 2.0,
            step_hz: 10.0,
            time_scale: 1.0,
        }
    }
}

#[derive(Debug)]
enum Active {
    Path { handle: GoalHandle, path: Vec<GeoPoint>, next: usize, speed: f64 },
    Hover { handle: GoalHandle, goal: HoverGoal },
}

impl Active {
    fn handle(&self) -> GoalHandle {
        match self {
            Active::Path { handle, .. } | Active::Hover { handle, .. } => *handle,
        }
    }
}

#[derive(Debug)]
struct SimState {
    position: GeoPoint,
    heading: f64,
    active: Option<Active>,
    finished: Vec<(GoalHandle, GoalOutcome)>,
}

impl SimState {
    /// Installs a new goal; whatever was running is preempted.
    fn replace(&mut self, next: Active) {
        if let Some(prev) = self.active.replace(next) {
            self.finished.push((prev.handle(), GoalOutcome::Preempted));
        }
    }
}

/// Goal-client side of the simulator. Cheap to clone; all clones drive the
/// same vehicle.
#[derive(Clone)]
pub struct SimVehicle {
    cfg: SimConfig,
    state: Arc<Mutex<SimState>>,
}

impl SimVehicle {
    pub fn new(cfg: SimConfig) -> Self {
        let state = SimState { position: cfg.start, heading: cfg.heading, active: None, finished: Vec::new() };
        Self { cfg, state: Arc::new(Mutex::new(state)) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn position(&self) -> GeoPoint {
        self.lock().position
    }

    /// Advances the vehicle by `dt` seconds of simulated time and returns the
    /// goal outcomes produced since the last call.
    pub fn step(&self, dt: f64) -> Vec<(GoalHandle, GoalOutcome)> {
        let mut st = self.lock();
        let mut done = None;
        let SimState { position, heading, active, .. } = &mut *st;

        match active {
            Some(Active::Path { handle, path, next, speed }) => {
                let mut budget = *speed * dt;
                while *next < path.len() && budget > 0.0 {
                    let target = path[*next];
                    let (bearing, dist) = geodesy::inverse(*position, target);
                    if dist <= budget {
                        *position = target;
                        budget -= dist;
                        *next += 1;
                    } else {
                        *position = geodesy::interpolate(*position, target, budget / dist);
                        budget = 0.0;
                    }
                    if dist > 0.0 {
                        *heading = bearing;
                    }
                }
                if *next >= path.len() {
                    done = Some(*handle);
                }
            }
            Some(Active::Hover { goal, .. }) => {
                let (bearing, dist) = geodesy::inverse(*position, goal.target);
                if dist > goal.minimum_distance {
                    let travel = (goal.maximum_speed * dt).min(dist - goal.minimum_distance);
                    *position = geodesy::interpolate(*position, goal.target, travel / dist);
                    *heading = bearing;
                }
            }
            None => {}
        }

        if let Some(handle) = done {
            info!("sim: path goal #{} reached its end", handle.id);
            st.active = None;
            st.finished.push((handle, GoalOutcome::Succeeded));
        }
        std::mem::take(&mut st.finished)
    }

    /// Steps the vehicle on a fixed period, feeding telemetry and goal
    /// outcomes back until `shutdown` flips.
    pub async fn run(self, telemetry: TelemetryCache, driver: DriverHandle, mut shutdown: watch::Receiver<bool>) {
        let period = Duration::from_secs_f64(1.0 / self.cfg.step_hz.max(0.1));
        let dt = period.as_secs_f64() * self.cfg.time_scale;
        let mut ticker = tokio::time::interval(period);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let outcomes = self.step(dt);
                    let (position, heading) = {
                        let st = self.lock();
                        (st.position, st.heading)
                    };
                    let now = time::OffsetDateTime::now_utc();
                    telemetry.update_position(position, now);
                    telemetry.update_heading(heading, now);
                    for (handle, outcome) in outcomes {
                        if !driver.goal_done(handle, outcome) {
                            return;
                        }
                    }
                }
            }
        }
        debug!("sim: stopped");
    }
}

impl GoalClient<PathFollowGoal> for SimVehicle {
    fn send(&mut self, handle: GoalHandle, goal: PathFollowGoal) -> Result<(), GoalError> {
        if goal.path.is_empty() {
            return Err(GoalError::new(handle.kind, "empty path"));
        }
        let speed = goal.speed.unwrap_or(self.cfg.speed);
        debug!("sim: path goal #{} with {} points at {} m/s", handle.id, goal.path.len(), speed);
        self.lock().replace(Active::Path { handle, path: goal.path, next: 0, speed });
        Ok(())
    }

    fn cancel(&mut self, handle: GoalHandle) -> Result<(), GoalError> {
        cancel(&mut self.lock(), handle);
        Ok(())
    }
}

impl GoalClient<HoverGoal> for SimVehicle {
    fn send(&mut self, handle: GoalHandle, goal: HoverGoal) -> Result<(), GoalError> {
        debug!("sim: hover goal #{} at ({:.6}, {:.6})", handle.id, goal.target.lat, goal.target.lon);
        self.lock().replace(Active::Hover { handle, goal });
        Ok(())
    }

    fn cancel(&mut self, handle: GoalHandle) -> Result<(), GoalError> {
        cancel(&mut self.lock(), handle);
        Ok(())
    }
}

fn cancel(st: &mut SimState, handle: GoalHandle) {
    if st.active.as_ref().map(Active::handle) == Some(handle) {
        st.active = None;
        st.finished.push((handle, GoalOutcome::Preempted));
    }
}
