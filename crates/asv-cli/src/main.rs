use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use asv_mission::plan::{parse_plan, ParsedPlan};
use asv_mission::{doctor as mission_doctor, DriverHandle, HelmMode, MissionConfig, MissionDriver, MissionEvent, MissionStateMachine};
use asv_nav::planner::StraightLinePlanner;
use asv_nav::telemetry::TelemetryCache;
use asv_proto::status::StatusEvent;

mod sim;

use sim::{SimConfig, SimVehicle};

#[derive(Debug, Parser)]
#[command(name = "missionctl", version, about = "Mission manager for autonomous survey boats")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate config and, optionally, a mission plan.
    Doctor {
        #[arg(long)]
        plan: Option<String>,
    },
    /// Run the mission against the simulated vehicle; operator commands on stdin.
    Run {
        #[arg(long)]
        plan: Option<String>,
        /// Start with the helm in autonomous mode.
        #[arg(long)]
        autonomous: bool,
    },
    Plan { #[command(subcommand)] cmd: PlanCmd },
}

#[derive(Debug, Subcommand)]
enum PlanCmd {
    /// Print the objectives a plan file resolves to.
    Inspect { path: String },
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Config {
    mission: MissionConfig,
    sim: SimConfig,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    let cfg: Config = toml::from_str(&s).context("parse config toml")?;
    Ok(Config { mission: cfg.mission.normalized(), ..cfg })
}

fn load_plan(path: impl AsRef<Path>) -> Result<ParsedPlan> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path).with_context(|| format!("read plan {}", path.display()))?;
    Ok(parse_plan(&s).with_context(|| format!("parse plan {}", path.display()))?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor { plan } => doctor(&cfg, plan.as_deref())?,
        Command::Run { plan, autonomous } => run(cfg, plan.as_deref(), autonomous).await?,
        Command::Plan { cmd } => plan_cmd(cmd)?,
    }
    Ok(())
}

fn doctor(cfg: &Config, plan: Option<&str>) -> Result<()> {
    info!("doctor: starting");
    mission_doctor::check_config(&cfg.mission)?;
    anyhow::ensure!(cfg.sim.start.is_valid(), "sim.start coordinates invalid");
    anyhow::ensure!(cfg.sim.speed > 0.0, "sim.speed must be > 0");

    if let Some(path) = plan {
        let plan = load_plan(path)?;
        mission_doctor::check_plan(&plan)?;
        info!("doctor: plan {} has {} objectives", path, plan.objectives.len());
    }

    info!("doctor: OK");
    Ok(())
}

fn plan_cmd(cmd: PlanCmd) -> Result<()> {
    match cmd {
        PlanCmd::Inspect { path } => {
            let plan = load_plan(&path)?;
            print!("{}", describe_plan(&plan));
            Ok(())
        }
    }
}

fn describe_plan(plan: &ParsedPlan) -> String {
    let mut out = String::new();
    match plan.default_speed {
        Some(v) => out.push_str(&format!("default_speed={} m/s\n", v)),
        None => out.push_str("default_speed=unset\n"),
    }
    for (i, o) in plan.objectives.iter().enumerate() {
        let start = o.start();
        out.push_str(&format!(
            "{} {} points={} start=({:.6}, {:.6})\n",
            i,
            o.kind(),
            o.waypoints().len(),
            start.lat,
            start.lon
        ));
    }
    out
}

/// Status sink for the binary: everything goes to the log, heartbeats at debug.
struct LogSink;

impl asv_mission::StatusSink for LogSink {
    fn publish(&mut self, event: StatusEvent) {
        match event {
            StatusEvent::Heartbeat { state, ts_unix_ms } => tracing::debug!("status: heartbeat {} @{}", state, ts_unix_ms),
            StatusEvent::CurrentObjective { index } => info!("status: current objective {}", index),
            StatusEvent::SurveyArea { polygon } => info!("status: survey area with {} vertices", polygon.len()),
            StatusEvent::CurrentSpeed { speed } => info!("status: speed {} m/s", speed),
        }
    }
}

async fn run(cfg: Config, plan: Option<&str>, autonomous: bool) -> Result<()> {
    info!("run: starting");
    mission_doctor::check_config(&cfg.mission).context("invalid [mission] config")?;

    let plan = plan.map(load_plan).transpose()?;
    let telemetry = TelemetryCache::new();
    let vehicle = SimVehicle::new(cfg.sim.clone());

    let machine = MissionStateMachine::new(
        cfg.mission.clone(),
        telemetry.clone(),
        Arc::new(StraightLinePlanner),
        Box::new(vehicle.clone()),
        Box::new(vehicle.clone()),
        Box::new(LogSink),
    );
    let (driver, handle) = MissionDriver::new(machine);
    let (stop_tx, stop_rx) = watch::channel(false);

    let sim_task = tokio::spawn(vehicle.run(telemetry, handle.clone(), stop_rx.clone()));
    let driver_task = tokio::spawn(driver.run(stop_rx));

    if let Some(plan) = plan {
        handle.post(MissionEvent::Plan(plan));
    }
    if autonomous {
        handle.helm_mode(HelmMode::Autonomous);
    }

    // plain thread: a pending stdin read must not hold up runtime shutdown
    let (line_tx, mut lines) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("run: interrupted");
                break;
            }
            line = lines.recv() => {
                let Some(line) = line else {
                    info!("run: stdin closed");
                    break;
                };
                if let Err(e) = operator_line(&handle, &line) {
                    warn!("run: {:#}", e);
                }
            }
        }
    }

    let _ = stop_tx.send(true);
    sim_task.await.context("sim task")?;
    let machine = driver_task.await.context("driver task")?;
    info!("run: stopped in {} (objective {:?})", machine.mode(), machine.cursor());
    Ok(())
}

/// Routes one stdin line. `helm <mode>`, `plan <file>` and
/// `config <key> = <value>` are handled here; anything else goes to the
/// mission command interpreter.
fn operator_line(handle: &DriverHandle, line: &str) -> Result<()> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }
    let ev = match line.split_once(char::is_whitespace) {
        Some(("helm", mode)) => MissionEvent::HelmMode(mode.parse()?),
        Some(("plan", path)) => MissionEvent::Plan(load_plan(path.trim())?),
        Some(("config", body)) => MissionEvent::Reconfigure(toml::from_str(body).context("parse config update")?),
        _ => MissionEvent::Command(line.to_string()),
    };
    anyhow::ensure!(handle.post(ev), "mission driver has stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use asv_mission::ObjectiveKind;

    use super::*;

    const PLAN: &str = r#"{
        "DEFAULT_PARAMETERS": { "defaultspeed_ms": 1.5 },
        "NAVIGATION": [
            { "type": "survey_line",
              "nav": [ { "position": { "latitude": 43.0, "longitude": -70.0 } },
                       { "position": { "latitude": 43.0, "longitude": -69.99 } } ] }
        ]
    }"#;

    #[test]
    fn config_sections_are_optional() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[mission]\nwaypoint_threshold = 4.0\nhover_minimum_distance = 30.0\n").unwrap();
        let cfg = load_config(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.mission.waypoint_threshold, 4.0);
        assert_eq!(cfg.mission.hover_maximum_distance, 30.0);
        assert_eq!(cfg.sim.speed, SimConfig::default().speed);
    }

    #[test]
    fn sim_section_is_read() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[sim]\nstart = {{ lat = 10.0, lon = 20.0 }}\nspeed = 4.0\n").unwrap();
        let cfg = load_config(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.sim.start, asv_proto::GeoPoint::new(10.0, 20.0));
        assert_eq!(cfg.sim.speed, 4.0);
        assert_eq!(cfg.mission, MissionConfig::default());
    }

    #[test]
    fn doctor_checks_plan_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("plan.json");
        std::fs::write(&good, PLAN).unwrap();
        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, r#"{ "NAVIGATION": [] }"#).unwrap();

        let cfg = Config::default();
        doctor(&cfg, good.to_str()).unwrap();
        assert!(doctor(&cfg, empty.to_str()).is_err());
        assert!(doctor(&cfg, Some("/nonexistent/plan.json")).is_err());
    }

    #[tokio::test]
    async fn run_refuses_an_out_of_range_tick_rate() {
        let cfg = Config { mission: MissionConfig { tick_hz: 1e12, ..Default::default() }, ..Default::default() };
        let err = run(cfg, None, false).await.unwrap_err();
        assert!(format!("{:#}", err).contains("tick_hz"));
    }

    #[test]
    fn inspect_lists_objectives() {
        let plan = parse_plan(PLAN).unwrap();
        assert_eq!(plan.objectives[0].kind(), ObjectiveKind::Line);
        let text = describe_plan(&plan);
        assert!(text.starts_with("default_speed=1.5 m/s\n"));
        assert!(text.contains("0 line points=2 start=(43.000000, -70.000000)"));
    }

    #[tokio::test]
    async fn operator_lines_become_events() {
        let machine = MissionStateMachine::new(
            MissionConfig::default(),
            TelemetryCache::new(),
            Arc::new(StraightLinePlanner),
            Box::new(SimVehicle::new(SimConfig::default())),
            Box::new(SimVehicle::new(SimConfig::default())),
            Box::new(LogSink),
        );
        let (driver, handle) = MissionDriver::new(machine);

        operator_line(&handle, "helm autonomous").unwrap();
        operator_line(&handle, "   ").unwrap();
        operator_line(&handle, "hover 43.0 -70.0").unwrap();
        assert!(operator_line(&handle, "helm sideways").is_err());
        assert!(operator_line(&handle, "plan /nonexistent.json").is_err());
        operator_line(&handle, "config hover_maximum_speed = 1.25").unwrap();
        assert!(operator_line(&handle, "config warp_factor = 9").is_err());
        drop(handle);

        let (_stop_tx, stop_rx) = watch::channel(false);
        let machine = driver.run(stop_rx).await;
        assert_eq!(machine.helm_mode(), HelmMode::Autonomous);
        assert_eq!(machine.mode(), asv_mission::BehaviorMode::Hover);
        assert_eq!(machine.config().hover_maximum_speed, 1.25);
    }
}
