use crate::config::WorldConfig;
use crate::obstacle::{Obstacle, ObstacleKind};
use crate::robot::Robot;
use log::{debug, info};
use rand::Rng;
use shared::{Make, Position, RobotState};
use std::collections::HashMap;
use thiserror::Error;

/// Random tiles tried before falling back to a full sweep of the world.
const LAUNCH_ATTEMPTS: usize = 200;

/// Result of moving a robot along its facing axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Success,
    Obstructed,
    OutOfBounds,
    FellInPit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error("Too many of you in this world")]
    NameTaken,
    #[error("No more space in this world")]
    NoSpace,
}

/// Read-only copy of everything an observer may want to draw.
#[derive(Debug, Clone)]
pub struct WorldSnapshot {
    pub width: u32,
    pub height: u32,
    pub obstacles: Vec<Obstacle>,
    /// Sorted by name.
    pub robots: Vec<(String, RobotState)>,
}

/// The shared spatial model: bounds, terrain and the robot roster.
///
/// The world never tracks which robot a command is for; every operation
/// that acts on a robot takes its name.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    top_left: Position,
    bottom_right: Position,
    obstacles: Vec<Obstacle>,
    robots: HashMap<String, Robot>,
}

impl World {
    pub fn new(config: WorldConfig, obstacles: Vec<Obstacle>) -> Self {
        let bottom_right = config.bottom_right();
        Self {
            config,
            top_left: Position::new(0, 0),
            bottom_right,
            obstacles,
            robots: HashMap::new(),
        }
    }

    /// World whose terrain comes from the configured obstacle mode.
    pub fn generate<R: Rng>(config: WorldConfig, rng: &mut R) -> Self {
        let obstacles = config.obstacles.build(config.width, config.height, rng);
        info!(
            "Generated {}x{} world with {} obstacles",
            config.width,
            config.height,
            obstacles.len()
        );
        Self::new(config, obstacles)
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn top_left(&self) -> Position {
        self.top_left
    }

    pub fn bottom_right(&self) -> Position {
        self.bottom_right
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn robots(&self) -> impl Iterator<Item = &Robot> {
        self.robots.values()
    }

    pub fn robot(&self, name: &str) -> Option<&Robot> {
        self.robots.get(name)
    }

    pub fn robot_mut(&mut self, name: &str) -> Option<&mut Robot> {
        self.robots.get_mut(name)
    }

    pub fn contains_robot(&self, name: &str) -> bool {
        self.robots.contains_key(name)
    }

    pub fn robot_count(&self) -> usize {
        self.robots.len()
    }

    pub fn in_bounds(&self, position: Position) -> bool {
        position.is_in(self.top_left, self.bottom_right)
    }

    /// Puts a robot into the roster. Fails if the name is taken.
    pub fn add_robot(&mut self, robot: Robot) -> Result<(), LaunchError> {
        if self.robots.contains_key(robot.name()) {
            return Err(LaunchError::NameTaken);
        }
        self.robots.insert(robot.name().to_string(), robot);
        Ok(())
    }

    pub fn remove_robot(&mut self, name: &str) -> Option<Robot> {
        self.robots.remove(name)
    }

    /// Creates a robot of `make` on a random free tile.
    pub fn launch<R: Rng>(&mut self, name: &str, make: Make, rng: &mut R) -> Result<&Robot, LaunchError> {
        if self.robots.contains_key(name) {
            return Err(LaunchError::NameTaken);
        }
        let position = self.find_launch_position(rng).ok_or(LaunchError::NoSpace)?;

        let mut robot = Robot::launch(name, make, &self.config);
        robot.set_position(position);
        info!("Launched {} '{}' at {}", make, name, position);
        self.robots.insert(name.to_string(), robot);
        self.robots.get(name).ok_or(LaunchError::NoSpace)
    }

    fn find_launch_position<R: Rng>(&self, rng: &mut R) -> Option<Position> {
        let (max_x, max_y) = (self.bottom_right.x, self.bottom_right.y);
        if max_x < 0 || max_y < 0 {
            return None;
        }

        (0..LAUNCH_ATTEMPTS)
            .map(|_| Position::new(rng.gen_range(0..=max_x), rng.gen_range(0..=max_y)))
            .find(|position| self.is_launch_allowed(*position))
            .or_else(|| {
                debug!("Random launch placement failed, sweeping the world");
                (0..=max_y)
                    .flat_map(|y| (0..=max_x).map(move |x| Position::new(x, y)))
                    .find(|position| self.is_launch_allowed(*position))
            })
    }

    /// A tile can be launched onto when it is inside the world, free of
    /// robots and not covered by any obstacle, pits included.
    pub fn is_launch_allowed(&self, position: Position) -> bool {
        self.in_bounds(position)
            && !self.robots.values().any(|robot| robot.position() == position)
            && !self.obstacles.iter().any(|obstacle| obstacle.contains(position))
    }

    /// Whether `name` could move straight to `target`, ignoring the world
    /// boundary.
    ///
    /// Another robot blocks when it stands on the target, or on the line of
    /// travel ahead of the mover and short of the target. Robots behind the
    /// mover never block. Any non-pit obstacle on the target or across the
    /// path blocks.
    pub fn is_move_allowed(&self, name: &str, target: Position) -> bool {
        let Some(mover) = self.robots.get(name) else {
            return false;
        };
        let from = mover.position();
        let travel = from.direction_to(target);

        let blocked_by_robot = self
            .robots
            .values()
            .filter(|other| other.name() != name)
            .any(|other| {
                let at = other.position();
                if at == target {
                    return true;
                }
                match travel {
                    Some(direction) => {
                        from.direction_to(at) == Some(direction)
                            && from.distance_from(at, direction) < from.distance_from(target, direction)
                    }
                    None => false,
                }
            });
        if blocked_by_robot {
            return false;
        }

        !self.obstacles.iter().any(|obstacle| {
            obstacle.kind().blocks_movement()
                && (obstacle.contains(target) || obstacle.blocks_path(from, target))
        })
    }

    /// Moves `name` by `steps` along its facing axis. Negative steps move
    /// backwards. Returns `None` when there is no such robot.
    ///
    /// A move that is only stopped by the boundary kills the robot and
    /// leaves it where it was. A move onto or across a pit is committed and
    /// kills the robot.
    pub fn resolve_movement(&mut self, name: &str, steps: i32) -> Option<MoveOutcome> {
        let robot = self.robots.get(name)?;
        let from = robot.position();
        let target = from.translate(robot.direction(), steps);

        if !self.is_move_allowed(name, target) {
            return Some(MoveOutcome::Obstructed);
        }

        if !self.in_bounds(target) {
            self.robots.get_mut(name)?.kill();
            info!("Robot '{}' fell out of bounds at {}", name, from);
            return Some(MoveOutcome::OutOfBounds);
        }

        let fell = self.obstacles.iter().any(|obstacle| {
            obstacle.kind() == ObstacleKind::BottomlessPit
                && (obstacle.contains(target) || obstacle.blocks_path(from, target))
        });
        let robot = self.robots.get_mut(name)?;
        robot.set_position(target);
        if fell {
            robot.kill();
            info!("Robot '{}' fell in a bottomless pit near {}", name, target);
            Some(MoveOutcome::FellInPit)
        } else {
            Some(MoveOutcome::Success)
        }
    }

    /// Removes every DEAD robot and returns their names.
    pub fn prune_dead(&mut self) -> Vec<String> {
        let dead: Vec<String> = self
            .robots
            .values()
            .filter(|robot| robot.is_dead())
            .map(|robot| robot.name().to_string())
            .collect();
        for name in &dead {
            self.robots.remove(name);
        }
        dead
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let mut robots: Vec<(String, RobotState)> = self
            .robots
            .values()
            .map(|robot| (robot.name().to_string(), robot.state()))
            .collect();
        robots.sort_by(|a, b| a.0.cmp(&b.0));

        WorldSnapshot {
            width: self.config.width,
            height: self.config.height,
            obstacles: self.obstacles.clone(),
            robots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::{Direction, OperationalStatus};

    fn empty_world() -> World {
        World::new(WorldConfig::default(), Vec::new())
    }

    fn place(world: &mut World, name: &str, x: i32, y: i32, direction: Direction) {
        let mut robot = Robot::launch(name, Make::Soldier, world.config());
        robot.set_position(Position::new(x, y));
        robot.set_direction(direction);
        world.add_robot(robot).unwrap();
    }

    #[test]
    fn test_bounds() {
        let world = empty_world();
        assert_eq!(world.bottom_right(), Position::new(19, 19));
        assert!(world.in_bounds(Position::new(0, 0)));
        assert!(world.in_bounds(Position::new(19, 19)));
        assert!(!world.in_bounds(Position::new(20, 0)));
        assert!(!world.in_bounds(Position::new(0, -1)));

        let wide = World::new(
            WorldConfig {
                width: u32::MAX,
                ..WorldConfig::default()
            },
            Vec::new(),
        );
        assert_eq!(wide.bottom_right(), Position::new(i32::MAX - 1, 19));
    }

    #[test]
    fn test_forward_moves_along_facing() {
        let mut world = empty_world();
        place(&mut world, "HAL", 5, 5, Direction::North);

        assert_eq!(world.resolve_movement("HAL", 1), Some(MoveOutcome::Success));
        assert_eq!(world.robot("HAL").unwrap().position(), Position::new(5, 4));
    }

    #[test]
    fn test_forward_then_back_round_trip() {
        let mut world = empty_world();
        place(&mut world, "HAL", 10, 10, Direction::North);
        for direction in Direction::ALL {
            world.robot_mut("HAL").unwrap().set_direction(direction);
            for steps in 1..5 {
                assert_eq!(world.resolve_movement("HAL", steps), Some(MoveOutcome::Success));
                assert_eq!(world.resolve_movement("HAL", -steps), Some(MoveOutcome::Success));
                assert_eq!(world.robot("HAL").unwrap().position(), Position::new(10, 10));
            }
        }
    }

    #[test]
    fn test_out_of_bounds_kills_without_moving() {
        let mut world = empty_world();
        place(&mut world, "HAL", 0, 0, Direction::North);

        assert_eq!(world.resolve_movement("HAL", 1), Some(MoveOutcome::OutOfBounds));
        let robot = world.robot("HAL").unwrap();
        assert_eq!(robot.status(), OperationalStatus::Dead);
        assert_eq!(robot.position(), Position::new(0, 0));
    }

    #[test]
    fn test_out_of_bounds_on_every_edge() {
        for (x, y, direction) in [
            (5, 19, Direction::South),
            (19, 5, Direction::East),
            (0, 5, Direction::West),
        ] {
            let mut world = empty_world();
            place(&mut world, "HAL", x, y, direction);
            assert_eq!(world.resolve_movement("HAL", 3), Some(MoveOutcome::OutOfBounds));
            assert_eq!(world.robot("HAL").unwrap().position(), Position::new(x, y));
        }
    }

    #[test]
    fn test_mountain_obstructs() {
        let mountain = Obstacle::new(Position::new(4, 1), Position::new(6, 2), ObstacleKind::Mountain);
        let mut world = World::new(WorldConfig::default(), vec![mountain]);
        place(&mut world, "HAL", 5, 5, Direction::North);

        assert_eq!(world.resolve_movement("HAL", 2), Some(MoveOutcome::Success));
        assert_eq!(world.resolve_movement("HAL", 1), Some(MoveOutcome::Obstructed));
        assert_eq!(world.resolve_movement("HAL", 5), Some(MoveOutcome::Obstructed));
        assert_eq!(world.robot("HAL").unwrap().position(), Position::new(5, 3));
    }

    #[test]
    fn test_obstacle_beats_boundary() {
        let lake = Obstacle::new(Position::new(5, 0), Position::new(5, 1), ObstacleKind::Lake);
        let mut world = World::new(WorldConfig::default(), vec![lake]);
        place(&mut world, "HAL", 5, 3, Direction::North);

        assert_eq!(world.resolve_movement("HAL", 10), Some(MoveOutcome::Obstructed));
        assert!(!world.robot("HAL").unwrap().is_dead());
    }

    #[test]
    fn test_pit_on_destination_kills() {
        let pit = Obstacle::new(Position::new(5, 3), Position::new(5, 3), ObstacleKind::BottomlessPit);
        let mut world = World::new(WorldConfig::default(), vec![pit]);
        place(&mut world, "HAL", 5, 5, Direction::North);

        assert_eq!(world.resolve_movement("HAL", 2), Some(MoveOutcome::FellInPit));
        let robot = world.robot("HAL").unwrap();
        assert!(robot.is_dead());
        assert_eq!(robot.position(), Position::new(5, 3));
    }

    #[test]
    fn test_pit_crossed_on_path_kills() {
        let pit = Obstacle::new(Position::new(7, 5), Position::new(8, 5), ObstacleKind::BottomlessPit);
        let mut world = World::new(WorldConfig::default(), vec![pit]);
        place(&mut world, "HAL", 5, 5, Direction::East);

        assert_eq!(world.resolve_movement("HAL", 6), Some(MoveOutcome::FellInPit));
        assert!(world.robot("HAL").unwrap().is_dead());
    }

    #[test]
    fn test_robot_ahead_blocks() {
        let mut world = empty_world();
        place(&mut world, "HAL", 5, 10, Direction::North);
        place(&mut world, "R2", 5, 7, Direction::South);

        assert_eq!(world.resolve_movement("HAL", 3), Some(MoveOutcome::Obstructed));
        assert_eq!(world.resolve_movement("HAL", 5), Some(MoveOutcome::Obstructed));
        assert_eq!(world.resolve_movement("HAL", 2), Some(MoveOutcome::Success));
        assert_eq!(world.robot("HAL").unwrap().position(), Position::new(5, 8));
    }

    #[test]
    fn test_robot_behind_or_off_axis_does_not_block() {
        let mut world = empty_world();
        place(&mut world, "HAL", 5, 10, Direction::North);
        place(&mut world, "BEHIND", 5, 12, Direction::North);
        place(&mut world, "BESIDE", 6, 8, Direction::North);

        assert_eq!(world.resolve_movement("HAL", 4), Some(MoveOutcome::Success));
        assert_eq!(world.robot("HAL").unwrap().position(), Position::new(5, 6));
    }

    #[test]
    fn test_back_is_blocked_by_robot_in_travel_direction() {
        let mut world = empty_world();
        place(&mut world, "HAL", 5, 10, Direction::North);
        place(&mut world, "R2", 5, 12, Direction::North);

        assert_eq!(world.resolve_movement("HAL", -3), Some(MoveOutcome::Obstructed));
        assert_eq!(world.resolve_movement("HAL", -1), Some(MoveOutcome::Success));
    }

    #[test]
    fn test_robot_behind_does_not_save_from_edge() {
        let mut world = empty_world();
        place(&mut world, "HAL", 0, 5, Direction::West);
        place(&mut world, "R2", 3, 5, Direction::West);

        assert_eq!(world.resolve_movement("HAL", 1), Some(MoveOutcome::OutOfBounds));
    }

    #[test]
    fn test_launch_allowed_rules() {
        let pit = Obstacle::new(Position::new(2, 2), Position::new(3, 3), ObstacleKind::BottomlessPit);
        let mut world = World::new(WorldConfig::default(), vec![pit]);
        place(&mut world, "HAL", 0, 0, Direction::North);

        assert!(!world.is_launch_allowed(Position::new(0, 0)));
        assert!(!world.is_launch_allowed(Position::new(3, 2)));
        assert!(!world.is_launch_allowed(Position::new(20, 0)));
        assert!(world.is_launch_allowed(Position::new(1, 1)));
    }

    #[test]
    fn test_launch_rejects_duplicate_name() {
        let mut world = empty_world();
        let mut rng = StdRng::seed_from_u64(3);
        world.launch("HAL", Make::Sniper, &mut rng).unwrap();

        assert_eq!(
            world.launch("HAL", Make::Soldier, &mut rng).unwrap_err(),
            LaunchError::NameTaken
        );
        assert!(LaunchError::NameTaken
            .to_string()
            .to_lowercase()
            .contains("too many of you in this world"));
    }

    #[test]
    fn test_launch_fills_world_then_reports_no_space() {
        let config = WorldConfig {
            width: 2,
            height: 2,
            ..WorldConfig::default()
        };
        let mut world = World::new(config, Vec::new());
        let mut rng = StdRng::seed_from_u64(9);
        for name in ["a", "b", "c", "d"] {
            let robot = world.launch(name, Make::Hitbot, &mut rng).unwrap();
            assert_eq!(robot.direction(), Direction::North);
        }
        assert_eq!(
            world.launch("e", Make::Hitbot, &mut rng).unwrap_err(),
            LaunchError::NoSpace
        );

        let mut tiles: Vec<Position> = world.robots().map(Robot::position).collect();
        tiles.sort_by_key(|p| (p.y, p.x));
        tiles.dedup();
        assert_eq!(tiles.len(), 4);
    }

    #[test]
    fn test_prune_removes_only_dead() {
        let mut world = empty_world();
        place(&mut world, "alive", 1, 1, Direction::North);
        place(&mut world, "dead", 2, 2, Direction::North);
        world.robot_mut("dead").unwrap().kill();

        assert_eq!(world.prune_dead(), vec!["dead".to_string()]);
        assert!(world.contains_robot("alive"));
        assert!(!world.contains_robot("dead"));
        assert!(world.prune_dead().is_empty());
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let mut world = empty_world();
        place(&mut world, "zed", 1, 1, Direction::North);
        place(&mut world, "amy", 2, 2, Direction::East);

        let snapshot = world.snapshot();
        assert_eq!(snapshot.robots[0].0, "amy");
        assert_eq!(snapshot.robots[1].1.position, [1, 1]);
        assert_eq!(snapshot.width, 20);
    }
}
