use crate::config::WorldConfig;
use shared::{Direction, Make, OperationalStatus, Position, RobotState};
use std::time::{Duration, Instant};

/// Longest bullet range; each extra round in the magazine costs one tile.
const MAX_BULLET_RANGE: u32 = 6;

/// Actions that keep a robot busy for a while.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedAction {
    Repair,
    Reload,
}

impl TimedAction {
    pub fn status(self) -> OperationalStatus {
        match self {
            TimedAction::Repair => OperationalStatus::Repair,
            TimedAction::Reload => OperationalStatus::Reload,
        }
    }
}

/// Shield and magazine capacity of a make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loadout {
    pub max_shields: u32,
    pub max_shots: u32,
}

impl Loadout {
    pub fn for_make(make: Make, config: &WorldConfig) -> Self {
        match make {
            Make::Sniper => Loadout {
                max_shields: 1,
                max_shots: 1,
            },
            Make::Soldier => Loadout {
                max_shields: 3,
                max_shots: 3,
            },
            Make::Hitbot => Loadout {
                max_shields: config.max_shields,
                max_shots: config.max_shots,
            },
        }
    }
}

/// A robot in the world.
///
/// Shields and shots never exceed their maximum. While a repair or reload
/// is running `busy_until` holds its deadline.
#[derive(Debug, Clone)]
pub struct Robot {
    name: String,
    make: Make,
    position: Position,
    direction: Direction,
    shields: u32,
    shots: u32,
    loadout: Loadout,
    status: OperationalStatus,
    busy_until: Option<Instant>,
}

impl Robot {
    /// New robot at the origin facing north with full shields and magazine.
    pub fn new(name: impl Into<String>, make: Make, loadout: Loadout) -> Self {
        Self {
            name: name.into(),
            make,
            position: Position::default(),
            direction: Direction::North,
            shields: loadout.max_shields,
            shots: loadout.max_shots,
            loadout,
            status: OperationalStatus::Normal,
            busy_until: None,
        }
    }

    /// Robot with the loadout its make gets in this world.
    pub fn launch(name: impl Into<String>, make: Make, config: &WorldConfig) -> Self {
        Self::new(name, make, Loadout::for_make(make, config))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn make(&self) -> Make {
        self.make
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn turn_left(&mut self) {
        self.direction = self.direction.turn_left();
    }

    pub fn turn_right(&mut self) {
        self.direction = self.direction.turn_right();
    }

    pub fn shields(&self) -> u32 {
        self.shields
    }

    pub fn shots(&self) -> u32 {
        self.shots
    }

    pub fn loadout(&self) -> Loadout {
        self.loadout
    }

    pub fn status(&self) -> OperationalStatus {
        self.status
    }

    pub fn is_dead(&self) -> bool {
        self.status == OperationalStatus::Dead
    }

    /// Tiles a bullet travels. Bigger magazines shoot shorter.
    pub fn bullet_range(&self) -> u32 {
        MAX_BULLET_RANGE.saturating_sub(self.loadout.max_shots)
    }

    /// Spends one round. Returns whether there was one to spend.
    pub fn decrement_shot(&mut self) -> bool {
        if self.shots == 0 {
            return false;
        }
        self.shots -= 1;
        true
    }

    /// Absorbs a hit with the shield, or dies when none is left.
    /// Returns `true` when the hit destroyed the robot.
    pub fn take_hit(&mut self) -> bool {
        if self.shields > 0 {
            self.shields -= 1;
            false
        } else {
            self.kill();
            true
        }
    }

    pub fn kill(&mut self) {
        self.status = OperationalStatus::Dead;
        self.busy_until = None;
    }

    /// Refills shields (repair) or the magazine (reload) and keeps the
    /// robot in that status until `now + duration`.
    pub fn begin_timed_action(&mut self, action: TimedAction, now: Instant, duration: Duration) {
        if self.is_dead() {
            return;
        }
        match action {
            TimedAction::Repair => self.shields = self.loadout.max_shields,
            TimedAction::Reload => self.shots = self.loadout.max_shots,
        }
        self.status = action.status();
        self.busy_until = Some(now + duration);
    }

    pub fn is_busy(&self, now: Instant) -> bool {
        matches!(self.busy_until, Some(deadline) if now < deadline)
    }

    /// Ends a running repair or reload and goes back to NORMAL. Returns
    /// `false` when nothing was running or the robot died in the meantime.
    pub fn finish_timed_action(&mut self) -> bool {
        if self.is_dead() || self.busy_until.take().is_none() {
            return false;
        }
        self.status = OperationalStatus::Normal;
        true
    }

    /// Any ordinary command brings a live robot back to NORMAL.
    pub fn settle(&mut self) {
        if !self.is_dead() {
            self.status = OperationalStatus::Normal;
            self.busy_until = None;
        }
    }

    pub fn state(&self) -> RobotState {
        RobotState {
            position: [self.position.x, self.position.y],
            make: self.make,
            direction: self.direction,
            shields: self.shields,
            shots: self.shots,
            status: self.status,
        }
    }
}
