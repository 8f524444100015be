//! Obstacle layouts: how a world's terrain is chosen at startup.

use crate::config::last_index;
use crate::obstacle::{Obstacle, ObstacleKind, ObstacleParseError};
use log::{debug, warn};
use rand::Rng;
use serde::Deserialize;
use shared::Position;
use std::fmt;
use std::str::FromStr;

/// Obstacles placed by `Random` when no count is given.
const RANDOM_MIN_OBSTACLES: usize = 2;
const RANDOM_MAX_OBSTACLES: usize = 5;
/// Side length range (exclusive upper bound) of generated squares.
const MIN_OBSTACLE_SIZE: i32 = 2;
const MAX_OBSTACLE_SIZE: i32 = 10;
/// Placement retries per obstacle before it is skipped.
const PLACEMENT_ATTEMPTS: usize = 50;

/// How the world's obstacles are produced.
///
/// Parsed from a single string so that the same value works in the TOML
/// file and on the command line:
///
/// - `""` or `none` for an empty world
/// - `random` for a small random layout
/// - a number `n` for `n` random obstacles
/// - a whitespace separated list like `M-2,2:4,4 BP-8,1:9,1`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ObstacleMode {
    None,
    Random,
    Count(usize),
    Fixed(Vec<Obstacle>),
}

impl Default for ObstacleMode {
    fn default() -> Self {
        ObstacleMode::Random
    }
}

impl FromStr for ObstacleMode {
    type Err = ObstacleParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("none") {
            return Ok(ObstacleMode::None);
        }
        if text.eq_ignore_ascii_case("random") {
            return Ok(ObstacleMode::Random);
        }
        if let Ok(count) = text.parse::<usize>() {
            return Ok(ObstacleMode::Count(count));
        }

        text.split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<Obstacle>, _>>()
            .map(ObstacleMode::Fixed)
    }
}

impl TryFrom<String> for ObstacleMode {
    type Error = ObstacleParseError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

impl fmt::Display for ObstacleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObstacleMode::None => f.write_str("none"),
            ObstacleMode::Random => f.write_str("random"),
            ObstacleMode::Count(count) => write!(f, "{}", count),
            ObstacleMode::Fixed(obstacles) => {
                let tokens: Vec<String> = obstacles.iter().map(ToString::to_string).collect();
                f.write_str(&tokens.join(" "))
            }
        }
    }
}

impl ObstacleMode {
    /// Materialises the layout for a world of the given size.
    pub fn build<R: Rng>(&self, width: u32, height: u32, rng: &mut R) -> Vec<Obstacle> {
        match self {
            ObstacleMode::None => Vec::new(),
            ObstacleMode::Fixed(obstacles) => obstacles.clone(),
            ObstacleMode::Count(count) => randomize(*count, width, height, rng),
            ObstacleMode::Random => {
                let count = rng.gen_range(RANDOM_MIN_OBSTACLES..=RANDOM_MAX_OBSTACLES);
                randomize(count, width, height, rng)
            }
        }
    }
}

/// Places up to `count` non-overlapping squares of random kind.
///
/// Squares start away from the outer rows and columns and are clipped to
/// the world. An obstacle that cannot be placed after a bounded number of
/// attempts is skipped.
pub fn randomize<R: Rng>(count: usize, width: u32, height: u32, rng: &mut R) -> Vec<Obstacle> {
    let mut obstacles: Vec<Obstacle> = Vec::with_capacity(count);
    if count == 0 {
        return obstacles;
    }
    let (max_x, max_y) = (last_index(width), last_index(height));
    if max_x < 2 || max_y < 2 {
        warn!("World {}x{} is too small for random obstacles", width, height);
        return obstacles;
    }

    for _ in 0..count {
        let placed = (0..PLACEMENT_ATTEMPTS).find_map(|_| {
            let top_left = Position::new(rng.gen_range(1..max_x), rng.gen_range(1..max_y));
            let size = rng.gen_range(MIN_OBSTACLE_SIZE..MAX_OBSTACLE_SIZE);
            let bottom_right = Position::new(
                top_left.x.saturating_add(size).min(max_x),
                top_left.y.saturating_add(size).min(max_y),
            );
            let kind = ObstacleKind::ALL[rng.gen_range(0..ObstacleKind::ALL.len())];
            let candidate = Obstacle::new(top_left, bottom_right, kind);
            (!obstacles.iter().any(|other| other.overlaps(&candidate))).then_some(candidate)
        });

        match placed {
            Some(obstacle) => {
                debug!("Placed obstacle {}", obstacle);
                obstacles.push(obstacle);
            }
            None => warn!(
                "Could not place obstacle {} of {} without overlap, skipping",
                obstacles.len() + 1,
                count
            ),
        }
    }

    obstacles
}
