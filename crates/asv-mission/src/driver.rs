//! Single-owner event loop around [`MissionStateMachine`].
//!
//! Ticks, commands, goal outcomes and plan updates all funnel into one
//! queue; the task that owns the machine handles them one at a time.

use std::time::Duration;

use asv_proto::goal::{GoalHandle, GoalOutcome};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ConfigUpdate;
use crate::machine::{HelmMode, MissionStateMachine};
use crate::plan::ParsedPlan;

#[derive(Debug, Clone)]
pub enum MissionEvent {
    Plan(ParsedPlan),
    ClearMission,
    /// Raw operator command line, parsed by the machine.
    Command(String),
    HelmMode(HelmMode),
    GoalDone { handle: GoalHandle, outcome: GoalOutcome },
    Reconfigure(ConfigUpdate),
}

/// Cloneable sender side. Posting after the driver stopped is a no-op that
/// returns `false`.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    tx: mpsc::UnboundedSender<MissionEvent>,
}

impl DriverHandle {
    pub fn post(&self, ev: MissionEvent) -> bool {
        self.tx.send(ev).is_ok()
    }

    pub fn command(&self, line: impl Into<String>) -> bool {
        self.post(MissionEvent::Command(line.into()))
    }

    pub fn goal_done(&self, handle: GoalHandle, outcome: GoalOutcome) -> bool {
        self.post(MissionEvent::GoalDone { handle, outcome })
    }

    pub fn helm_mode(&self, helm: HelmMode) -> bool {
        self.post(MissionEvent::HelmMode(helm))
    }
}

pub struct MissionDriver {
    machine: MissionStateMachine,
    rx: mpsc::UnboundedReceiver<MissionEvent>,
    tick_period: Duration,
}

impl MissionDriver {
    pub fn new(machine: MissionStateMachine) -> (Self, DriverHandle) {
        let tick_period = machine.config().tick_period();
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { machine, rx, tick_period }, DriverHandle { tx })
    }

    /// Runs until `shutdown` flips to true or every handle is dropped, then
    /// hands the machine back.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> MissionStateMachine {
        let mut ticker = interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("driver: running at {:?} per tick", self.tick_period);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("driver: shutting down");
                        break;
                    }
                }
                ev = self.rx.recv() => {
                    let Some(ev) = ev else {
                        info!("driver: all handles dropped, stopping");
                        break;
                    };
                    self.handle(ev).await;
                }
                _ = ticker.tick() => {
                    self.machine.tick().await;
                }
            }
        }
        self.machine
    }

    async fn handle(&mut self, ev: MissionEvent) {
        match ev {
            MissionEvent::Plan(plan) => self.machine.load_plan(plan),
            MissionEvent::ClearMission => self.machine.clear_mission(),
            MissionEvent::Command(line) => {
                if let Err(e) = self.machine.handle_command_line(&line).await {
                    warn!("driver: command '{}' rejected: {}", line.trim(), e);
                }
            }
            MissionEvent::HelmMode(helm) => self.machine.set_helm_mode(helm),
            MissionEvent::GoalDone { handle, outcome } => {
                debug!("driver: {:?} goal #{} -> {:?}", handle.kind, handle.id, outcome);
                if let Err(e) = self.machine.on_goal_done(handle, outcome) {
                    warn!("driver: follow-on after goal #{} failed: {}", handle.id, e);
                }
            }
            MissionEvent::Reconfigure(update) => self.machine.reconfigure(update),
        }
    }
}
