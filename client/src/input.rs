//! Turns typed lines into protocol requests

use serde_json::Value;
use shared::Request;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Launch a robot first: launch <make> <name>")]
    NotLaunched,
    #[error("Usage: launch <make> <name>")]
    LaunchUsage,
}

/// What the user asked for
#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    /// Send this request to the server
    Send(Request),
    /// Leave the game
    Quit,
    /// Nothing to do (blank line)
    Nothing,
}

/// Keeps track of which robot the user controls and builds requests for it
#[derive(Debug, Default)]
pub struct InputManager {
    robot: Option<String>,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn robot(&self) -> Option<&str> {
        self.robot.as_deref()
    }

    pub fn set_robot(&mut self, name: impl Into<String>) {
        self.robot = Some(name.into());
    }

    pub fn clear_robot(&mut self) {
        self.robot = None;
    }

    /// Parses one line of user input.
    ///
    /// `launch <make> <name>` names the robot; every other command is sent
    /// for the robot launched earlier. `help` works before launching.
    pub fn parse(&self, line: &str) -> Result<ClientAction, InputError> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(ClientAction::Nothing);
        };
        let command = command.to_ascii_lowercase();
        let arguments: Vec<&str> = words.collect();

        match command.as_str() {
            "quit" | "exit" => Ok(ClientAction::Quit),
            "launch" => match arguments.as_slice() {
                [make, name] => Ok(ClientAction::Send(Request::new(
                    *name,
                    "launch",
                    vec![Value::from(*make)],
                ))),
                _ => Err(InputError::LaunchUsage),
            },
            "help" => Ok(ClientAction::Send(Request::new(
                self.robot.clone().unwrap_or_default(),
                "help",
                Vec::new(),
            ))),
            _ => {
                let robot = self.robot.as_ref().ok_or(InputError::NotLaunched)?;
                Ok(ClientAction::Send(Request::new(
                    robot.clone(),
                    command,
                    arguments.into_iter().map(argument).collect(),
                )))
            }
        }
    }
}

/// Numbers travel as JSON numbers, everything else as strings.
fn argument(word: &str) -> Value {
    word.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(word))
}
