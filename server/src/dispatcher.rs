//! Turns one client request into world changes and responses.
//!
//! A dispatch runs entirely under the caller's world write guard. It never
//! blocks: repair and reload only record a deadline and hand a
//! [`PendingAction`] back so the connection can wait outside the lock.

use crate::combat::{self, FireOutcome};
use crate::command::{Command, CommandError, TurnSide};
use crate::robot::TimedAction;
use crate::visibility;
use crate::world::{MoveOutcome, World};
use log::{debug, info};
use rand::Rng;
use shared::{Make, Request, Response, ResponseData, ResultKind};
use std::time::{Duration, Instant};

const HELP: &str = "I can understand these commands:\n\
    launch <make> - launch a robot (sniper, soldier or hitbot)\n\
    forward <n> - move forward by n steps\n\
    back <n> - move back by n steps\n\
    turn <left|right> - turn 90 degrees\n\
    look - report what the robot can see\n\
    state - report the robot's state\n\
    orientation - report which way the robot is facing\n\
    fire - shoot along the facing direction\n\
    reload - refill the magazine\n\
    repair - restore the shields\n\
    help - show this text";

/// A message for a robot other than the one that issued the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub robot: String,
    pub response: Response,
    /// Close the robot's connection after delivering.
    pub terminate: bool,
}

/// A repair or reload the connection has to wait out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub robot: String,
    pub action: TimedAction,
    pub duration: Duration,
}

/// Everything a connection needs to do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub response: Response,
    pub notices: Vec<Notice>,
    pub pending: Option<PendingAction>,
    /// Name of a robot launched by this command.
    pub launched: Option<String>,
}

impl Dispatch {
    fn reply(response: Response) -> Self {
        Self {
            response,
            notices: Vec::new(),
            pending: None,
            launched: None,
        }
    }
}

/// Runs `request` against the world. Errors become `ERROR` responses.
///
/// The caller prunes dead robots afterwards, once notices have been built.
pub fn dispatch<R: Rng>(world: &mut World, request: &Request, now: Instant, rng: &mut R) -> Dispatch {
    let result = Command::parse(&request.command, &request.arguments)
        .and_then(|command| execute(world, request.robot.trim(), command, now, rng));

    match result {
        Ok(dispatch) => dispatch,
        Err(error) => {
            debug!("Command '{}' for '{}' failed: {}", request.command, request.robot, error);
            Dispatch::reply(Response::error(error.to_string()))
        }
    }
}

/// Ends a repair or reload after its wait. Returns the completion notice,
/// or `None` when the robot is gone or died in the meantime.
pub fn complete_timed_action(world: &mut World, robot: &str) -> Option<Response> {
    let robot = world.robot_mut(robot)?;
    if !robot.finish_timed_action() {
        return None;
    }
    Some(Response::ok("Done").with_state(robot.state()))
}

fn execute<R: Rng>(
    world: &mut World,
    name: &str,
    command: Command,
    now: Instant,
    rng: &mut R,
) -> Result<Dispatch, CommandError> {
    let missing = || CommandError::NoRobot(command.name());
    if command.requires_robot() {
        let robot = world.robot(name).ok_or_else(missing)?;
        if robot.is_busy(now) {
            return Err(CommandError::Busy);
        }
    }

    let mut dispatch = match command {
        Command::Launch { make } => return launch(world, name, make, rng),
        Command::Help => return Ok(help(world, name)),
        Command::Forward { steps } => movement(world, name, steps).ok_or_else(missing)?,
        Command::Back { steps } => movement(world, name, -steps).ok_or_else(missing)?,
        Command::Turn(side) => {
            let robot = world.robot_mut(name).ok_or_else(missing)?;
            match side {
                TurnSide::Left => robot.turn_left(),
                TurnSide::Right => robot.turn_right(),
            }
            Dispatch::reply(Response::ok("Done"))
        }
        Command::Look => {
            let observer = world.robot(name).ok_or_else(missing)?.position();
            Dispatch::reply(Response::with_data(
                ResultKind::Ok,
                ResponseData {
                    message: "Done".to_string(),
                    objects: Some(visibility::scan(world, observer)),
                    ..ResponseData::default()
                },
            ))
        }
        Command::State => Dispatch::reply(Response::ok("Done")),
        Command::Orientation => {
            let facing = world.robot(name).ok_or_else(missing)?.direction();
            Dispatch::reply(Response::with_data(
                ResultKind::Ok,
                ResponseData {
                    message: "Done".to_string(),
                    orientation: Some(facing),
                    ..ResponseData::default()
                },
            ))
        }
        Command::Fire => fire(world, name).ok_or_else(missing)?,
        Command::Repair => timed(world, name, TimedAction::Repair, now).ok_or_else(missing)?,
        Command::Reload => timed(world, name, TimedAction::Reload, now).ok_or_else(missing)?,
    };

    let robot = world.robot_mut(name).ok_or_else(missing)?;
    if dispatch.pending.is_none() {
        robot.settle();
    }
    dispatch.response.state = Some(robot.state());
    Ok(dispatch)
}

fn help(world: &World, name: &str) -> Dispatch {
    let mut response = Response::ok(HELP);
    if let Some(robot) = world.robot(name) {
        response = response.with_state(robot.state());
    }
    Dispatch::reply(response)
}

fn launch<R: Rng>(world: &mut World, name: &str, make: Make, rng: &mut R) -> Result<Dispatch, CommandError> {
    if name.is_empty() {
        return Err(CommandError::InvalidArguments);
    }
    let robot = world.launch(name, make, rng)?;
    let response = Response::ok(format!("Robot '{}' of type '{}' launched.", name, make))
        .with_state(robot.state());

    Ok(Dispatch {
        launched: Some(name.to_string()),
        ..Dispatch::reply(response)
    })
}

fn movement(world: &mut World, name: &str, steps: i32) -> Option<Dispatch> {
    let message = match world.resolve_movement(name, steps)? {
        MoveOutcome::Success => "Done",
        MoveOutcome::Obstructed => "Obstructed",
        MoveOutcome::OutOfBounds => "DIED: fell out of bounds",
        MoveOutcome::FellInPit => "DIED: fell in a bottomless pit",
    };
    Some(Dispatch::reply(Response::ok(message)))
}

fn fire(world: &mut World, name: &str) -> Option<Dispatch> {
    let dispatch = match combat::fire(world, name)? {
        FireOutcome::OutOfAmmo => Dispatch::reply(Response::ok("Out of ammo")),
        FireOutcome::Absorbed | FireOutcome::Miss => Dispatch::reply(Response::ok("Miss")),
        FireOutcome::Hit {
            target,
            distance,
            killed,
            state,
        } => {
            let mut notices = Vec::new();
            if killed {
                info!("Robot '{}' destroyed by '{}'", target, name);
                notices.push(Notice {
                    robot: target.clone(),
                    response: Response::quit(),
                    terminate: true,
                });
            }
            let response = Response::with_data(
                ResultKind::Ok,
                ResponseData {
                    message: "Hit".to_string(),
                    robot: Some(target),
                    distance: Some(distance),
                    state: Some(state),
                    ..ResponseData::default()
                },
            );
            Dispatch {
                notices,
                ..Dispatch::reply(response)
            }
        }
    };
    Some(dispatch)
}

fn timed(world: &mut World, name: &str, action: TimedAction, now: Instant) -> Option<Dispatch> {
    let duration = match action {
        TimedAction::Repair => world.config().repair_time(),
        TimedAction::Reload => world.config().reload_time(),
    };
    world
        .robot_mut(name)?
        .begin_timed_action(action, now, duration);

    let message = match action {
        TimedAction::Repair => "Repairing",
        TimedAction::Reload => "Reloading",
    };
    Some(Dispatch {
        pending: Some(PendingAction {
            robot: name.to_string(),
            action,
            duration,
        }),
        ..Dispatch::reply(Response::ok(message))
    })
}
