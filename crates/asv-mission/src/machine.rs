//! Mission state machine.
//!
//! Owns the behaviour mode, the objective store and the bookkeeping of the
//! one goal that may be outstanding. Every input (tick, command, goal
//! outcome, new plan, helm mode, reconfiguration) arrives through a
//! `&mut self` method, so the driver serialises them by construction.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use asv_nav::geodesy;
use asv_nav::planner::{request_transit, PathPlanner, TransitRequest};
use asv_nav::telemetry::{TelemetryCache, VehicleState};
use asv_proto::goal::{GoalHandle, GoalKind, GoalOutcome, HoverGoal, PathFollowGoal};
use asv_proto::status::StatusEvent;
use asv_proto::GeoPoint;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::config::{ConfigUpdate, MissionConfig};
use crate::error::MissionError;
use crate::goals::{GoalClient, StatusSink};
use crate::objective::{MissionStore, NavObjective, ObjectiveKind};
use crate::plan::ParsedPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorMode {
    Idle,
    PreMission,
    Transit,
    LineFollowing,
    LineEnd,
    AreaSurvey,
    Hover,
}

impl BehaviorMode {
    /// Label carried by the heartbeat.
    pub fn as_str(self) -> &'static str {
        match self {
            BehaviorMode::Idle => "idle",
            BehaviorMode::PreMission => "pre-mission",
            BehaviorMode::Transit => "transit",
            BehaviorMode::LineFollowing => "line-following",
            BehaviorMode::LineEnd => "line-end",
            BehaviorMode::AreaSurvey => "area-survey",
            BehaviorMode::Hover => "hover",
        }
    }
}

impl fmt::Display for BehaviorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who holds control authority over the low-level helm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HelmMode {
    #[default]
    Standby,
    Manual,
    Autonomous,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown helm mode '{0}'")]
pub struct UnknownHelmMode(pub String);

impl FromStr for HelmMode {
    type Err = UnknownHelmMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standby" => Ok(HelmMode::Standby),
            "manual" => Ok(HelmMode::Manual),
            "autonomous" => Ok(HelmMode::Autonomous),
            _ => Err(UnknownHelmMode(s.to_string())),
        }
    }
}

pub struct MissionStateMachine {
    store: MissionStore,
    config: MissionConfig,
    mode: BehaviorMode,
    helm: HelmMode,

    /// The single outstanding goal, path-follow or hover.
    active_goal: Option<GoalHandle>,
    next_goal_id: u64,
    /// A transit finished but the follow-on dispatch failed; retried on tick.
    arrival_pending: bool,

    telemetry: TelemetryCache,
    planner: Arc<dyn PathPlanner>,
    path_follow: Box<dyn GoalClient<PathFollowGoal>>,
    hover: Box<dyn GoalClient<HoverGoal>>,
    status: Box<dyn StatusSink>,
}

impl MissionStateMachine {
    pub fn new(
        config: MissionConfig,
        telemetry: TelemetryCache,
        planner: Arc<dyn PathPlanner>,
        path_follow: Box<dyn GoalClient<PathFollowGoal>>,
        hover: Box<dyn GoalClient<HoverGoal>>,
        status: Box<dyn StatusSink>,
    ) -> Self {
        Self {
            store: MissionStore::new(),
            config: config.normalized(),
            mode: BehaviorMode::Idle,
            helm: HelmMode::default(),
            active_goal: None,
            next_goal_id: 1,
            arrival_pending: false,
            telemetry,
            planner,
            path_follow,
            hover,
            status,
        }
    }

    pub fn mode(&self) -> BehaviorMode {
        self.mode
    }

    pub fn helm_mode(&self) -> HelmMode {
        self.helm
    }

    pub fn cursor(&self) -> Option<usize> {
        self.store.cursor()
    }

    pub fn store(&self) -> &MissionStore {
        &self.store
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    pub fn active_goal(&self) -> Option<GoalHandle> {
        self.active_goal
    }

    pub fn set_helm_mode(&mut self, helm: HelmMode) {
        if helm != self.helm {
            info!("mission: helm mode {:?} -> {:?}", self.helm, helm);
            self.helm = helm;
        }
    }

    pub fn reconfigure(&mut self, update: ConfigUpdate) {
        self.config.apply(update);
        debug!("mission: config now {:?}", self.config);
    }

    pub fn load_plan(&mut self, plan: ParsedPlan) {
        self.set_mission(plan.objectives, plan.default_speed);
    }

    /// Swaps in a new objective list. Any outstanding goal is cancelled and
    /// the machine restarts from `PreMission`, or `Idle` when empty.
    pub fn set_mission(&mut self, objectives: Vec<NavObjective>, default_speed: Option<f64>) {
        self.cancel_active_goal();
        self.arrival_pending = false;
        if let Some(speed) = default_speed {
            self.config.default_speed = Some(speed);
        }
        let count = objectives.len();
        self.store.set_mission(objectives);
        info!("mission: {} nav objectives", count);
        self.set_mode(if count > 0 { BehaviorMode::PreMission } else { BehaviorMode::Idle });
    }

    pub fn clear_mission(&mut self) {
        self.set_mission(Vec::new(), None);
    }

    /// One periodic decision cycle. Never fails; problems are logged and the
    /// next tick tries again.
    pub async fn tick(&mut self) {
        if self.helm == HelmMode::Autonomous {
            if let Err(e) = self.step_autonomous().await {
                warn!("mission: {} (staying in {})", e, self.mode);
            }
        }

        if self.store.cursor().is_none() && !self.store.is_empty() {
            // lazy first selection, mode untouched
            if let Err(e) = self.select(0) {
                warn!("mission: initial selection failed: {}", e);
            }
        }

        self.status.publish(StatusEvent::Heartbeat {
            state: self.mode.as_str().to_string(),
            ts_unix_ms: (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64,
        });
    }

    pub async fn handle_command_line(&mut self, line: &str) -> Result<(), MissionError> {
        let cmd: Command = line.parse()?;
        self.execute(cmd).await
    }

    /// Runs an operator command.
    ///
    /// Parsing, index, telemetry and planner errors leave everything as it
    /// was. A command that dispatches a goal cancels the outstanding one
    /// first; if the new send then fails, the mode, cursor and mission are
    /// unchanged but no goal is outstanding. The next command (or, in
    /// `PreMission`/`LineEnd`/`Transit`, the next tick) dispatches again.
    pub async fn execute(&mut self, cmd: Command) -> Result<(), MissionError> {
        info!("mission: command {}", cmd.verb());
        match cmd {
            Command::GotoLine(index) => {
                let objective = self.store.objective_at(index)?.clone();
                self.dispatch_path(objective.waypoints().to_vec())?;
                self.arrival_pending = false;
                self.select(index)?;
                self.set_mode(BehaviorMode::LineFollowing);
            }
            Command::StartLine(index) => {
                let objective = self.store.objective_at(index)?.clone();
                let vehicle = self.telemetry.snapshot();
                let approach = geodesy::bearing_deg(objective.start(), objective.aim());
                let req = self.transit_request(&vehicle, objective.start(), approach)?;
                let path = request_transit(self.planner.clone(), req, self.config.planner_timeout()).await?;
                self.dispatch_path(path)?;
                self.arrival_pending = false;
                self.select(index)?;
                self.set_mode(BehaviorMode::Transit);
            }
            Command::Goto(target) => {
                let vehicle = self.telemetry.snapshot();
                let position = vehicle.point().ok_or(MissionError::TelemetryUnavailable("position"))?;
                let heading_to_point = geodesy::bearing_deg(position, target);
                let req = self.transit_request(&vehicle, target, heading_to_point)?;
                let path = request_transit(self.planner.clone(), req, self.config.planner_timeout()).await?;
                self.dispatch_path(path)?;
                self.arrival_pending = false;
                self.set_mode(BehaviorMode::Transit);
            }
            Command::Hover(target) => {
                self.dispatch_hover(target)?;
                self.arrival_pending = false;
                self.set_mode(BehaviorMode::Hover);
            }
            Command::ClearMission => self.clear_mission(),
        }
        Ok(())
    }

    /// Terminal outcome of a dispatched goal. Outcomes for goals that were
    /// superseded or cancelled are ignored.
    pub fn on_goal_done(&mut self, handle: GoalHandle, outcome: GoalOutcome) -> Result<(), MissionError> {
        if self.active_goal != Some(handle) {
            debug!("mission: ignoring {:?} for stale {:?} goal #{}", outcome, handle.kind, handle.id);
            return Ok(());
        }
        self.active_goal = None;

        match outcome {
            GoalOutcome::Preempted => {
                info!("mission: {:?} goal #{} preempted", handle.kind, handle.id);
                return Ok(());
            }
            GoalOutcome::Aborted => warn!("mission: {:?} goal #{} aborted, treating as done", handle.kind, handle.id),
            GoalOutcome::Succeeded => info!("mission: {:?} goal #{} done", handle.kind, handle.id),
        }

        match (handle.kind, self.mode) {
            (GoalKind::PathFollow, BehaviorMode::LineFollowing) => {
                self.set_mode(BehaviorMode::LineEnd);
                Ok(())
            }
            (GoalKind::PathFollow, BehaviorMode::Transit) => self.arrive(),
            (GoalKind::PathFollow, BehaviorMode::AreaSurvey) => {
                info!("mission: area outline driven, survey continues until commanded");
                Ok(())
            }
            (GoalKind::Hover, BehaviorMode::Hover) => {
                info!("mission: hover goal ended, holding hover until commanded");
                Ok(())
            }
            (kind, mode) => {
                debug!("mission: {:?} goal finished in {}, nothing to do", kind, mode);
                Ok(())
            }
        }
    }

    async fn step_autonomous(&mut self) -> Result<(), MissionError> {
        match self.mode {
            BehaviorMode::PreMission | BehaviorMode::LineEnd => self.begin_next_objective().await,
            BehaviorMode::Transit if self.arrival_pending && self.active_goal.is_none() => self.arrive(),
            _ => Ok(()),
        }
    }

    /// Picks the next objective and either transits to it or starts it.
    ///
    /// The cursor only moves once the transition has gone through, so a
    /// failed attempt is repeated on the next tick instead of skipping.
    async fn begin_next_objective(&mut self) -> Result<(), MissionError> {
        let vehicle = self.telemetry.snapshot();
        let Some(position) = vehicle.point() else {
            return Ok(());
        };

        let index = match (self.mode, self.store.cursor()) {
            // nothing run yet: start at the lazily selected objective
            (BehaviorMode::PreMission, Some(i)) => i,
            _ => self.store.next_index()?,
        };
        let objective = self.store.objective_at(index)?.clone();

        let distance = geodesy::distance_m(position, objective.start());
        if distance > self.config.waypoint_threshold {
            debug!("mission: objective {} start is {:.1} m away, planning transit", index, distance);
            let approach = geodesy::bearing_deg(objective.start(), objective.aim());
            let req = self.transit_request(&vehicle, objective.start(), approach)?;
            let path = request_transit(self.planner.clone(), req, self.config.planner_timeout()).await?;
            self.dispatch_path(path)?;
            self.select(index)?;
            self.set_mode(BehaviorMode::Transit);
        } else {
            self.run_objective(&objective, false)?;
            self.select(index)?;
        }
        Ok(())
    }

    /// Transit done: start the current objective, or fall back when there
    /// is none (a free `goto` with no mission loaded).
    fn arrive(&mut self) -> Result<(), MissionError> {
        let Some(objective) = self.store.current().map(|(_, o)| o.clone()) else {
            self.arrival_pending = false;
            let next = if self.store.is_empty() { BehaviorMode::Idle } else { BehaviorMode::PreMission };
            self.set_mode(next);
            return Ok(());
        };
        self.arrival_pending = true;
        self.run_objective(&objective, true)?;
        self.arrival_pending = false;
        Ok(())
    }

    /// Starts `objective` from where the vehicle is. An area reached by a
    /// transit also gets its outline sent as a path; one started in place is
    /// only announced.
    fn run_objective(&mut self, objective: &NavObjective, after_transit: bool) -> Result<(), MissionError> {
        match objective.kind() {
            ObjectiveKind::Line => {
                self.dispatch_path(objective.waypoints().to_vec())?;
                self.set_mode(BehaviorMode::LineFollowing);
            }
            ObjectiveKind::Area => {
                if after_transit {
                    self.dispatch_path(objective.waypoints().to_vec())?;
                }
                self.status.publish(StatusEvent::SurveyArea { polygon: objective.waypoints().to_vec() });
                if let Some(speed) = self.config.default_speed {
                    self.status.publish(StatusEvent::CurrentSpeed { speed });
                }
                self.set_mode(BehaviorMode::AreaSurvey);
            }
        }
        Ok(())
    }

    fn transit_request(
        &self,
        vehicle: &VehicleState,
        target: GeoPoint,
        target_heading_deg: f64,
    ) -> Result<TransitRequest, MissionError> {
        let start = vehicle.point().ok_or(MissionError::TelemetryUnavailable("position"))?;
        let start_heading_deg = vehicle.bearing_deg().ok_or(MissionError::TelemetryUnavailable("heading"))?;
        Ok(TransitRequest {
            start,
            start_heading_deg,
            target,
            target_heading_deg,
            radius_m: self.config.turn_radius,
            sampling_interval_m: self.config.segment_length,
        })
    }

    fn select(&mut self, index: usize) -> Result<(), MissionError> {
        self.store.set_cursor(index)?;
        info!("mission: nav objective index {}", index);
        self.status.publish(StatusEvent::CurrentObjective { index });
        Ok(())
    }

    fn set_mode(&mut self, next: BehaviorMode) {
        if next == self.mode {
            return;
        }
        if self.mode == BehaviorMode::Hover && self.active_kind() == Some(GoalKind::Hover) {
            self.cancel_active_goal();
        }
        info!("mission: {} -> {}", self.mode, next);
        self.mode = next;
    }

    /// Sends a path goal, cancelling whatever goal is outstanding first.
    fn dispatch_path(&mut self, path: Vec<GeoPoint>) -> Result<GoalHandle, MissionError> {
        self.cancel_active_goal();
        let handle = self.next_handle(GoalKind::PathFollow);
        let goal = PathFollowGoal { path, speed: self.config.default_speed };
        info!(
            "mission: path goal #{} ({} points, speed={:?})",
            handle.id,
            goal.path.len(),
            goal.speed
        );
        self.path_follow.send(handle, goal)?;
        self.active_goal = Some(handle);
        Ok(handle)
    }

    fn dispatch_hover(&mut self, target: GeoPoint) -> Result<GoalHandle, MissionError> {
        self.cancel_active_goal();
        let handle = self.next_handle(GoalKind::Hover);
        let goal = HoverGoal {
            target,
            minimum_distance: self.config.hover_minimum_distance,
            maximum_distance: self.config.hover_maximum_distance,
            maximum_speed: self.config.hover_maximum_speed,
        };
        info!("mission: hover goal #{} at ({:.6}, {:.6})", handle.id, target.lat, target.lon);
        self.hover.send(handle, goal)?;
        self.active_goal = Some(handle);
        Ok(handle)
    }

    fn cancel_active_goal(&mut self) {
        let Some(handle) = self.active_goal.take() else {
            return;
        };
        let res = match handle.kind {
            GoalKind::PathFollow => self.path_follow.cancel(handle),
            GoalKind::Hover => self.hover.cancel(handle),
        };
        match res {
            Ok(()) => debug!("mission: cancelled {:?} goal #{}", handle.kind, handle.id),
            Err(e) => warn!("mission: cancel of goal #{} failed: {}", handle.id, e),
        }
    }

    fn active_kind(&self) -> Option<GoalKind> {
        self.active_goal.map(|h| h.kind)
    }

    fn next_handle(&mut self, kind: GoalKind) -> GoalHandle {
        let id = self.next_goal_id;
        self.next_goal_id += 1;
        GoalHandle { kind, id }
    }
}
