use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;

/// Message carried by the out-of-band notice telling a client its robot is gone.
pub const QUIT_MESSAGE: &str = "QUIT";

/// One of the four cardinal directions. NORTH decreases `y`, EAST increases `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Clockwise order, which is also the order sightings are reported in.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn turn_right(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    pub fn turn_left(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    pub fn opposite(self) -> Self {
        self.turn_right().turn_right()
    }

    /// Unit offset of one step in this direction.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "NORTH",
            Direction::East => "EAST",
            Direction::South => "SOUTH",
            Direction::West => "WEST",
        };
        f.pad(name)
    }
}

/// Integer grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offsets this position along one axis. Negative steps move backwards.
    pub fn translate(self, direction: Direction, steps: i32) -> Position {
        let (dx, dy) = direction.delta();
        Position::new(
            self.x.saturating_add(dx.saturating_mul(steps)),
            self.y.saturating_add(dy.saturating_mul(steps)),
        )
    }

    /// Absolute difference along the axis implied by `direction`.
    pub fn distance_from(self, other: Position, direction: Direction) -> u32 {
        if direction.is_vertical() {
            self.y.abs_diff(other.y)
        } else {
            self.x.abs_diff(other.x)
        }
    }

    /// Inclusive containment in the rectangle spanned by two corners.
    pub fn is_in(self, top_left: Position, bottom_right: Position) -> bool {
        self.x >= top_left.x
            && self.x <= bottom_right.x
            && self.y >= top_left.y
            && self.y <= bottom_right.y
    }

    /// Cardinal direction towards `other` when both share a row or a column.
    pub fn direction_to(self, other: Position) -> Option<Direction> {
        if self == other {
            None
        } else if self.x == other.x {
            Some(if other.y > self.y {
                Direction::South
            } else {
                Direction::North
            })
        } else if self.y == other.y {
            Some(if other.x > self.x {
                Direction::East
            } else {
                Direction::West
            })
        } else {
            None
        }
    }

    /// Tiles visited when stepping outward, paired with their step count.
    /// The starting tile itself is not included.
    pub fn ray(self, direction: Direction, max_steps: u32) -> impl Iterator<Item = (u32, Position)> {
        (1..=max_steps).map(move |step| (step, self.translate(direction, step as i32)))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationalStatus {
    Normal,
    Repair,
    Reload,
    Dead,
}

impl fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationalStatus::Normal => "NORMAL",
            OperationalStatus::Repair => "REPAIR",
            OperationalStatus::Reload => "RELOAD",
            OperationalStatus::Dead => "DEAD",
        };
        f.pad(name)
    }
}

/// Robot archetype chosen at launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Make {
    Sniper,
    Soldier,
    Hitbot,
}

impl Make {
    /// Unknown names fall back to the configurable `hitbot`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "sniper" => Make::Sniper,
            "soldier" => Make::Soldier,
            _ => Make::Hitbot,
        }
    }
}

impl fmt::Display for Make {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Make::Sniper => "sniper",
            Make::Soldier => "soldier",
            Make::Hitbot => "hitbot",
        };
        f.pad(name)
    }
}

/// One JSON line sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub robot: String,
    pub command: String,
    #[serde(default)]
    pub arguments: Vec<Value>,
}

impl Request {
    pub fn new(robot: impl Into<String>, command: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            robot: robot.into(),
            command: command.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultKind {
    Ok,
    Error,
}

/// Snapshot of a robot as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotState {
    pub position: [i32; 2],
    pub make: Make,
    pub direction: Direction,
    pub shields: u32,
    pub shots: u32,
    pub status: OperationalStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SightingKind {
    Mountain,
    Lake,
    BottomlessPit,
    Robot,
    Edge,
}

impl fmt::Display for SightingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SightingKind::Mountain => "MOUNTAIN",
            SightingKind::Lake => "LAKE",
            SightingKind::BottomlessPit => "BOTTOMLESS_PIT",
            SightingKind::Robot => "ROBOT",
            SightingKind::Edge => "EDGE",
        };
        f.pad(name)
    }
}

/// A single thing reported by `look`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenObject {
    pub direction: Direction,
    #[serde(rename = "type")]
    pub kind: SightingKind,
    pub distance: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Command specific payload of a response. Only `message` is always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RobotState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<SeenObject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Direction>,
}

/// One JSON line sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub result: ResultKind,
    pub data: ResponseData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RobotState>,
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Self::with_data(
            ResultKind::Ok,
            ResponseData {
                message: message.into(),
                ..ResponseData::default()
            },
        )
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_data(
            ResultKind::Error,
            ResponseData {
                message: message.into(),
                ..ResponseData::default()
            },
        )
    }

    pub fn with_data(result: ResultKind, data: ResponseData) -> Self {
        Self {
            result,
            data,
            state: None,
        }
    }

    /// Notice pushed to a connection whose robot has been destroyed.
    pub fn quit() -> Self {
        Self::ok(QUIT_MESSAGE)
    }

    pub fn with_state(mut self, state: RobotState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.result == ResultKind::Ok
    }

    pub fn is_quit(&self) -> bool {
        self.is_ok() && self.data.message == QUIT_MESSAGE
    }

    pub fn message(&self) -> &str {
        &self.data.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_turning_cycles_through_all_directions() {
        let mut direction = Direction::North;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(direction);
            direction = direction.turn_right();
        }
        assert_eq!(direction, Direction::North);
        assert_eq!(seen, Direction::ALL.to_vec());

        for d in Direction::ALL {
            assert_eq!(d.turn_left().turn_right(), d);
            assert_eq!(d.opposite().opposite(), d);
        }
        assert_eq!(Direction::North.turn_left(), Direction::West);
    }

    #[test]
    fn test_translate_along_each_axis() {
        let origin = Position::new(5, 5);
        assert_eq!(origin.translate(Direction::North, 1), Position::new(5, 4));
        assert_eq!(origin.translate(Direction::South, 2), Position::new(5, 7));
        assert_eq!(origin.translate(Direction::East, 3), Position::new(8, 5));
        assert_eq!(origin.translate(Direction::West, -2), Position::new(7, 5));
    }

    #[test]
    fn test_forward_then_back_returns_to_start() {
        let start = Position::new(10, 3);
        for direction in Direction::ALL {
            for steps in 1..5 {
                let there = start.translate(direction, steps);
                assert_eq!(there.translate(direction, -steps), start);
            }
        }
    }

    #[test]
    fn test_distance_uses_single_axis() {
        let a = Position::new(2, 9);
        let b = Position::new(7, 1);
        assert_eq!(a.distance_from(b, Direction::East), 5);
        assert_eq!(a.distance_from(b, Direction::West), 5);
        assert_eq!(a.distance_from(b, Direction::North), 8);
    }

    #[test]
    fn test_is_in_is_inclusive() {
        let tl = Position::new(1, 1);
        let br = Position::new(3, 4);
        assert!(Position::new(1, 1).is_in(tl, br));
        assert!(Position::new(3, 4).is_in(tl, br));
        assert!(!Position::new(0, 2).is_in(tl, br));
        assert!(!Position::new(2, 5).is_in(tl, br));
    }

    #[test]
    fn test_direction_to_only_on_shared_axis() {
        let me = Position::new(5, 5);
        assert_eq!(me.direction_to(Position::new(5, 8)), Some(Direction::South));
        assert_eq!(me.direction_to(Position::new(5, 0)), Some(Direction::North));
        assert_eq!(me.direction_to(Position::new(9, 5)), Some(Direction::East));
        assert_eq!(me.direction_to(Position::new(1, 5)), Some(Direction::West));
        assert_eq!(me.direction_to(Position::new(6, 6)), None);
        assert_eq!(me.direction_to(me), None);
    }

    #[test]
    fn test_ray_excludes_origin() {
        let tiles: Vec<_> = Position::new(0, 0).ray(Direction::East, 3).collect();
        assert_eq!(
            tiles,
            vec![
                (1, Position::new(1, 0)),
                (2, Position::new(2, 0)),
                (3, Position::new(3, 0)),
            ]
        );
        assert_eq!(Position::new(0, 0).ray(Direction::North, 0).count(), 0);
    }

    #[test]
    fn test_make_from_name_defaults_to_hitbot() {
        assert_eq!(Make::from_name("Sniper"), Make::Sniper);
        assert_eq!(Make::from_name("soldier "), Make::Soldier);
        assert_eq!(Make::from_name("tank"), Make::Hitbot);
        assert_eq!(Make::from_name(""), Make::Hitbot);
    }

    #[test]
    fn test_request_arguments_default_to_empty() {
        let request: Request =
            serde_json::from_str(r#"{"robot":"HAL","command":"look"}"#).unwrap();
        assert_eq!(request.robot, "HAL");
        assert_eq!(request.command, "look");
        assert!(request.arguments.is_empty());
    }

    #[test]
    fn test_response_wire_format() {
        let state = RobotState {
            position: [3, 4],
            make: Make::Sniper,
            direction: Direction::North,
            shields: 1,
            shots: 0,
            status: OperationalStatus::Normal,
        };
        let response = Response::ok("Done").with_state(state);
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(
            value,
            json!({
                "result": "OK",
                "data": { "message": "Done" },
                "state": {
                    "position": [3, 4],
                    "make": "sniper",
                    "direction": "NORTH",
                    "shields": 1,
                    "shots": 0,
                    "status": "NORMAL"
                }
            })
        );
    }

    #[test]
    fn test_error_response_has_no_state() {
        let value = serde_json::to_value(Response::error("nope")).unwrap();
        assert_eq!(value, json!({ "result": "ERROR", "data": { "message": "nope" } }));
    }

    #[test]
    fn test_seen_object_uses_type_key() {
        let seen = SeenObject {
            direction: Direction::West,
            kind: SightingKind::BottomlessPit,
            distance: 2,
            name: None,
        };
        let value = serde_json::to_value(&seen).unwrap();
        assert_eq!(
            value,
            json!({ "direction": "WEST", "type": "BOTTOMLESS_PIT", "distance": 2 })
        );
    }

    #[test]
    fn test_quit_notice() {
        let quit = Response::quit();
        assert!(quit.is_quit());
        assert!(!Response::ok("Done").is_quit());
        assert!(!Response::error(QUIT_MESSAGE).is_quit());
    }
}
