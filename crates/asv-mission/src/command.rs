//! Operator command lines: `<verb> [args]`, space delimited.

use std::str::FromStr;

use asv_proto::GeoPoint;

use crate::error::MissionError;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Follow objective `index` from where the vehicle is, no transit.
    GotoLine(usize),
    /// Transit to the start of objective `index`, then run it.
    StartLine(usize),
    /// Transit to an arbitrary point. Leaves the objective cursor alone.
    Goto(GeoPoint),
    Hover(GeoPoint),
    ClearMission,
}

impl Command {
    pub fn verb(&self) -> &'static str {
        match self {
            Command::GotoLine(_) => "goto_line",
            Command::StartLine(_) => "start_line",
            Command::Goto(_) => "goto",
            Command::Hover(_) => "hover",
            Command::ClearMission => "clear_mission",
        }
    }
}

impl FromStr for Command {
    type Err = MissionError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or_else(|| invalid("empty command"))?;
        let args: Vec<&str> = parts.collect();

        match verb {
            "goto_line" => Ok(Command::GotoLine(index_arg(verb, &args)?)),
            "start_line" => Ok(Command::StartLine(index_arg(verb, &args)?)),
            "goto" => Ok(Command::Goto(point_args(verb, &args)?)),
            "hover" => Ok(Command::Hover(point_args(verb, &args)?)),
            "clear_mission" => {
                if !args.is_empty() {
                    return Err(invalid(format!("clear_mission takes no arguments, got {}", args.len())));
                }
                Ok(Command::ClearMission)
            }
            other => Err(invalid(format!("unknown verb '{}'", other))),
        }
    }
}

fn invalid(msg: impl Into<String>) -> MissionError {
    MissionError::InvalidCommand(msg.into())
}

fn index_arg(verb: &str, args: &[&str]) -> Result<usize, MissionError> {
    match args {
        [a] => a
            .parse::<usize>()
            .map_err(|_| invalid(format!("{} expects an objective index, got '{}'", verb, a))),
        _ => Err(invalid(format!("{} expects 1 argument, got {}", verb, args.len()))),
    }
}

fn point_args(verb: &str, args: &[&str]) -> Result<GeoPoint, MissionError> {
    let [lat, lon] = args else {
        return Err(invalid(format!("{} expects 2 arguments (lat lon), got {}", verb, args.len())));
    };
    let parse = |s: &str| {
        s.parse::<f64>()
            .map_err(|_| invalid(format!("{} expects numeric coordinates, got '{}'", verb, s)))
    };
    let p = GeoPoint::new(parse(lat)?, parse(lon)?);
    if !p.is_valid() {
        return Err(invalid(format!("{} coordinates out of range ({}, {})", verb, p.lat, p.lon)));
    }
    Ok(p)
}
