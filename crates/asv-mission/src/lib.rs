//! Mission execution core: objective sequencing, transit planning and goal
//! dispatch for an autonomous survey vehicle.

pub mod command;
pub mod config;
pub mod doctor;
pub mod driver;
pub mod goals;
pub mod machine;
pub mod objective;
pub mod plan;

mod error;

pub use command::Command;
pub use config::{ConfigUpdate, MissionConfig};
pub use driver::{DriverHandle, MissionDriver, MissionEvent};
pub use error::MissionError;
pub use goals::{GoalClient, GoalError, StatusSink};
pub use machine::{BehaviorMode, HelmMode, MissionStateMachine};
pub use objective::{MissionStore, NavObjective, ObjectiveKind};
