//! Static rectangular terrain.
//!
//! Obstacles are axis-aligned rectangles with inclusive corners. Their kind
//! decides how they interact with movement, sight and gunfire:
//!
//! | kind             | blocks movement | occludes sight | stops bullets |
//! |------------------|-----------------|----------------|---------------|
//! | `Mountain`       | yes             | yes            | yes           |
//! | `Lake`           | yes             | no             | no            |
//! | `BottomlessPit`  | no (kills)      | no             | no            |

use shared::{Position, SightingKind};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleKind {
    Mountain,
    Lake,
    BottomlessPit,
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 3] = [
        ObstacleKind::Mountain,
        ObstacleKind::Lake,
        ObstacleKind::BottomlessPit,
    ];

    /// Pits can be walked into, everything else stops a robot.
    pub fn blocks_movement(self) -> bool {
        !matches!(self, ObstacleKind::BottomlessPit)
    }

    pub fn blocks_sight(self) -> bool {
        matches!(self, ObstacleKind::Mountain)
    }

    /// Short code used in obstacle lists, e.g. `M-1,1:3,3`.
    pub fn code(self) -> &'static str {
        match self {
            ObstacleKind::Mountain => "M",
            ObstacleKind::Lake => "L",
            ObstacleKind::BottomlessPit => "BP",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "M" => Some(ObstacleKind::Mountain),
            "L" => Some(ObstacleKind::Lake),
            "BP" => Some(ObstacleKind::BottomlessPit),
            _ => None,
        }
    }

    pub fn sighting(self) -> SightingKind {
        match self {
            ObstacleKind::Mountain => SightingKind::Mountain,
            ObstacleKind::Lake => SightingKind::Lake,
            ObstacleKind::BottomlessPit => SightingKind::BottomlessPit,
        }
    }
}

impl fmt::Display for ObstacleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.sighting(), f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObstacleParseError {
    #[error("obstacle '{0}' is not of the form TYPE-x1,y1:x2,y2")]
    Malformed(String),
    #[error("unknown obstacle type '{0}' (expected M, L or BP)")]
    UnknownKind(String),
    #[error("invalid coordinate '{0}'")]
    BadCoordinate(String),
}

/// Inclusive rectangle of a single terrain kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obstacle {
    top_left: Position,
    bottom_right: Position,
    kind: ObstacleKind,
}

impl Obstacle {
    /// Corners may be given in any order; they are normalised so that
    /// `top_left <= bottom_right` holds component-wise.
    pub fn new(a: Position, b: Position, kind: ObstacleKind) -> Self {
        Self {
            top_left: Position::new(a.x.min(b.x), a.y.min(b.y)),
            bottom_right: Position::new(a.x.max(b.x), a.y.max(b.y)),
            kind,
        }
    }

    /// Square spanning `size + 1` tiles per side from `top_left`.
    pub fn square(top_left: Position, size: i32, kind: ObstacleKind) -> Self {
        Self::new(
            top_left,
            Position::new(top_left.x + size, top_left.y + size),
            kind,
        )
    }

    pub fn top_left(&self) -> Position {
        self.top_left
    }

    pub fn bottom_right(&self) -> Position {
        self.bottom_right
    }

    pub fn kind(&self) -> ObstacleKind {
        self.kind
    }

    pub fn contains(&self, position: Position) -> bool {
        position.is_in(self.top_left, self.bottom_right)
    }

    /// Whether the straight segment from `a` to `b` touches this rectangle.
    ///
    /// Only horizontal and vertical segments are supported; a diagonal
    /// segment never blocks.
    pub fn blocks_path(&self, a: Position, b: Position) -> bool {
        if a.x == b.x {
            let (low, high) = (a.y.min(b.y), a.y.max(b.y));
            a.x >= self.top_left.x
                && a.x <= self.bottom_right.x
                && low <= self.bottom_right.y
                && high >= self.top_left.y
        } else if a.y == b.y {
            let (low, high) = (a.x.min(b.x), a.x.max(b.x));
            a.y >= self.top_left.y
                && a.y <= self.bottom_right.y
                && low <= self.bottom_right.x
                && high >= self.top_left.x
        } else {
            false
        }
    }

    pub fn overlaps(&self, other: &Obstacle) -> bool {
        self.top_left.x <= other.bottom_right.x
            && other.top_left.x <= self.bottom_right.x
            && self.top_left.y <= other.bottom_right.y
            && other.top_left.y <= self.bottom_right.y
    }
}

impl fmt::Display for Obstacle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{},{}:{},{}",
            self.kind.code(),
            self.top_left.x,
            self.top_left.y,
            self.bottom_right.x,
            self.bottom_right.y
        )
    }
}

impl FromStr for Obstacle {
    type Err = ObstacleParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        let (code, corners) = token
            .split_once('-')
            .ok_or_else(|| ObstacleParseError::Malformed(token.to_string()))?;
        let kind = ObstacleKind::from_code(code)
            .ok_or_else(|| ObstacleParseError::UnknownKind(code.to_string()))?;
        let (first, second) = corners
            .split_once(':')
            .ok_or_else(|| ObstacleParseError::Malformed(token.to_string()))?;

        Ok(Obstacle::new(parse_corner(first)?, parse_corner(second)?, kind))
    }
}

fn parse_corner(text: &str) -> Result<Position, ObstacleParseError> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| ObstacleParseError::BadCoordinate(text.to_string()))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<i32>()
            .map_err(|_| ObstacleParseError::BadCoordinate(text.to_string()))
    };
    Ok(Position::new(parse(x)?, parse(y)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mountain(x1: i32, y1: i32, x2: i32, y2: i32) -> Obstacle {
        Obstacle::new(
            Position::new(x1, y1),
            Position::new(x2, y2),
            ObstacleKind::Mountain,
        )
    }

    #[test]
    fn test_corners_are_normalised() {
        let obstacle = mountain(5, 1, 2, 4);
        assert_eq!(obstacle.top_left(), Position::new(2, 1));
        assert_eq!(obstacle.bottom_right(), Position::new(5, 4));
    }

    #[test]
    fn test_square_size() {
        let obstacle = Obstacle::square(Position::new(1, 1), 2, ObstacleKind::Lake);
        assert_eq!(obstacle.bottom_right(), Position::new(3, 3));
        assert_eq!(obstacle.kind(), ObstacleKind::Lake);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let obstacle = mountain(1, 1, 3, 3);
        assert!(obstacle.contains(Position::new(1, 1)));
        assert!(obstacle.contains(Position::new(3, 3)));
        assert!(obstacle.contains(Position::new(2, 3)));
        assert!(!obstacle.contains(Position::new(4, 3)));
        assert!(!obstacle.contains(Position::new(0, 0)));
    }

    #[test]
    fn test_vertical_path_through_obstacle() {
        let obstacle = mountain(4, 4, 6, 6);
        assert!(obstacle.blocks_path(Position::new(5, 0), Position::new(5, 10)));
        assert!(obstacle.blocks_path(Position::new(5, 10), Position::new(5, 0)));
        assert!(obstacle.blocks_path(Position::new(5, 0), Position::new(5, 4)));
        assert!(!obstacle.blocks_path(Position::new(5, 0), Position::new(5, 3)));
        assert!(!obstacle.blocks_path(Position::new(7, 0), Position::new(7, 10)));
    }

    #[test]
    fn test_horizontal_path_through_obstacle() {
        let obstacle = mountain(4, 4, 6, 6);
        assert!(obstacle.blocks_path(Position::new(0, 5), Position::new(10, 5)));
        assert!(obstacle.blocks_path(Position::new(10, 5), Position::new(6, 5)));
        assert!(!obstacle.blocks_path(Position::new(10, 5), Position::new(7, 5)));
        assert!(!obstacle.blocks_path(Position::new(0, 3), Position::new(10, 3)));
    }

    #[test]
    fn test_diagonal_path_never_blocks() {
        let obstacle = mountain(0, 0, 10, 10);
        assert!(!obstacle.blocks_path(Position::new(1, 1), Position::new(5, 5)));
    }

    #[test]
    fn test_overlap() {
        let a = mountain(0, 0, 3, 3);
        assert!(a.overlaps(&mountain(3, 3, 5, 5)));
        assert!(a.overlaps(&mountain(1, 1, 2, 2)));
        assert!(!a.overlaps(&mountain(4, 0, 6, 3)));
        assert!(!a.overlaps(&mountain(0, 4, 3, 6)));
    }

    #[test]
    fn test_kind_rules() {
        assert!(ObstacleKind::Mountain.blocks_movement());
        assert!(ObstacleKind::Lake.blocks_movement());
        assert!(!ObstacleKind::BottomlessPit.blocks_movement());
        assert!(ObstacleKind::Mountain.blocks_sight());
        assert!(!ObstacleKind::Lake.blocks_sight());
    }

    #[test]
    fn test_parse_obstacle_token() {
        let pit: Obstacle = "BP-1,2:3,4".parse().unwrap();
        assert_eq!(pit.kind(), ObstacleKind::BottomlessPit);
        assert_eq!(pit.top_left(), Position::new(1, 2));
        assert_eq!(pit.bottom_right(), Position::new(3, 4));
        assert_eq!(pit.to_string(), "BP-1,2:3,4");

        let lake: Obstacle = " l-0,0:0,0 ".parse().unwrap();
        assert_eq!(lake.kind(), ObstacleKind::Lake);
    }

    #[test]
    fn test_parse_rejects_bad_tokens() {
        assert_eq!(
            "X-1,2:3,4".parse::<Obstacle>(),
            Err(ObstacleParseError::UnknownKind("X".to_string()))
        );
        assert!(matches!(
            "M1,2:3,4".parse::<Obstacle>(),
            Err(ObstacleParseError::Malformed(_))
        ));
        assert!(matches!(
            "M-1,2".parse::<Obstacle>(),
            Err(ObstacleParseError::Malformed(_))
        ));
        assert!(matches!(
            "M-1,a:3,4".parse::<Obstacle>(),
            Err(ObstacleParseError::BadCoordinate(_))
        ));
    }
}
