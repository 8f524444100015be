use crate::world::LaunchError;
use serde_json::Value;
use shared::Make;
use thiserror::Error;

/// User and protocol errors. The `Display` text is what the client sees
/// as the message of an `ERROR` response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Could not parse request")]
    Malformed,
    #[error("Unsupported command")]
    Unsupported(String),
    #[error("Invalid command arguments")]
    InvalidArguments,
    #[error("please enter '<forward/back> x' where x is steps to take.")]
    InvalidSteps,
    #[error("Invalid command, please enter 'turn <right/left>'.")]
    InvalidTurn,
    #[error("Cannot perform '{0}': No robot context active.")]
    NoRobot(&'static str),
    #[error("Robot is busy")]
    Busy,
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnSide {
    Left,
    Right,
}

/// A single parsed request. Built fresh for every line a client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Launch { make: Make },
    Forward { steps: i32 },
    Back { steps: i32 },
    Turn(TurnSide),
    Look,
    State,
    Help,
    Fire,
    Reload,
    Repair,
    Orientation,
}

impl Command {
    /// Parses a command name (case-insensitive) and its JSON arguments.
    pub fn parse(name: &str, arguments: &[Value]) -> Result<Self, CommandError> {
        let command = match name.trim().to_ascii_lowercase().as_str() {
            "launch" => Command::Launch {
                make: parse_make(arguments)?,
            },
            "forward" => Command::Forward {
                steps: parse_steps(arguments)?,
            },
            "back" | "backward" => Command::Back {
                steps: parse_steps(arguments)?,
            },
            "turn" => Command::Turn(parse_turn(arguments)?),
            "look" => Command::Look,
            "state" => Command::State,
            "help" => Command::Help,
            "fire" => Command::Fire,
            "reload" => Command::Reload,
            "repair" => Command::Repair,
            "orientation" => Command::Orientation,
            _ => return Err(CommandError::Unsupported(name.to_string())),
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Launch { .. } => "launch",
            Command::Forward { .. } => "forward",
            Command::Back { .. } => "back",
            Command::Turn(_) => "turn",
            Command::Look => "look",
            Command::State => "state",
            Command::Help => "help",
            Command::Fire => "fire",
            Command::Reload => "reload",
            Command::Repair => "repair",
            Command::Orientation => "orientation",
        }
    }

    /// Commands that act on an existing robot.
    pub fn requires_robot(&self) -> bool {
        !matches!(self, Command::Launch { .. } | Command::Help)
    }
}

fn parse_make(arguments: &[Value]) -> Result<Make, CommandError> {
    match arguments.first() {
        None => Ok(Make::Hitbot),
        Some(Value::String(make)) => Ok(Make::from_name(make)),
        Some(_) => Err(CommandError::InvalidArguments),
    }
}

fn parse_steps(arguments: &[Value]) -> Result<i32, CommandError> {
    let steps = match arguments.first() {
        Some(Value::Number(number)) => number.as_i64(),
        Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    steps
        .filter(|steps| *steps > 0)
        .and_then(|steps| i32::try_from(steps).ok())
        .ok_or(CommandError::InvalidSteps)
}

fn parse_turn(arguments: &[Value]) -> Result<TurnSide, CommandError> {
    let side = arguments
        .first()
        .and_then(Value::as_str)
        .map(|side| side.trim().to_ascii_lowercase());
    match side.as_deref() {
        Some("left") => Ok(TurnSide::Left),
        Some("right") => Ok(TurnSide::Right),
        _ => Err(CommandError::InvalidTurn),
    }
}
