use std::time::Duration;

use serde::Deserialize;
use tracing::info;

/// Tunables read by the state machine at the start of every decision.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Metres; closer than this to an objective's start counts as arrived.
    pub waypoint_threshold: f64,
    /// Metres; planning constraint for transits.
    pub turn_radius: f64,
    /// Metres; sampling interval of planned transits.
    pub segment_length: f64,

    pub hover_minimum_distance: f64,
    /// Never below `hover_minimum_distance`; clamped on load and update.
    pub hover_maximum_distance: f64,
    /// m/s
    pub hover_maximum_speed: f64,

    /// m/s forwarded with every dispatched path. None leaves it to the follower.
    pub default_speed: Option<f64>,

    pub planner_timeout_ms: u64,
    pub tick_hz: f64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            waypoint_threshold: 10.0,
            turn_radius: 20.0,
            segment_length: 5.0,
            hover_minimum_distance: 5.0,
            hover_maximum_distance: 25.0,
            hover_maximum_speed: 3.0,
            default_speed: None,
            planner_timeout_ms: 5_000,
            tick_hz: 10.0,
        }
    }
}

/// A partial reconfiguration. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigUpdate {
    pub waypoint_threshold: Option<f64>,
    pub turn_radius: Option<f64>,
    pub segment_length: Option<f64>,
    pub hover_minimum_distance: Option<f64>,
    pub hover_maximum_distance: Option<f64>,
    pub hover_maximum_speed: Option<f64>,
    pub default_speed: Option<f64>,
    pub planner_timeout_ms: Option<u64>,
}

impl MissionConfig {
    /// Returns the config with the hover band made consistent.
    pub fn normalized(mut self) -> Self {
        self.clamp_hover_band();
        self
    }

    pub fn apply(&mut self, update: ConfigUpdate) {
        if let Some(v) = update.waypoint_threshold {
            self.waypoint_threshold = v;
        }
        if let Some(v) = update.turn_radius {
            self.turn_radius = v;
        }
        if let Some(v) = update.segment_length {
            self.segment_length = v;
        }
        if let Some(v) = update.hover_minimum_distance {
            self.hover_minimum_distance = v;
        }
        if let Some(v) = update.hover_maximum_distance {
            self.hover_maximum_distance = v;
        }
        if let Some(v) = update.hover_maximum_speed {
            self.hover_maximum_speed = v;
        }
        if let Some(v) = update.default_speed {
            self.default_speed = Some(v);
        }
        if let Some(v) = update.planner_timeout_ms {
            self.planner_timeout_ms = v;
        }
        self.clamp_hover_band();
    }

    pub fn planner_timeout(&self) -> Duration {
        Duration::from_millis(self.planner_timeout_ms)
    }

    /// Decision period for `tick_hz`, held to 0.1..=100 Hz. A rate that is
    /// not a number falls back to the default.
    pub fn tick_period(&self) -> Duration {
        let hz = if self.tick_hz.is_nan() {
            Self::default().tick_hz
        } else {
            self.tick_hz.clamp(0.1, 100.0)
        };
        Duration::from_secs_f64(1.0 / hz)
    }

    fn clamp_hover_band(&mut self) {
        if self.hover_maximum_distance < self.hover_minimum_distance {
            info!(
                "config: hover_maximum_distance {} below minimum, clamping to {}",
                self.hover_maximum_distance, self.hover_minimum_distance
            );
            self.hover_maximum_distance = self.hover_minimum_distance;
        }
    }
}
