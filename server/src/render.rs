//! Text views of a world snapshot for the server console.
//!
//! Rendering works on a [`WorldSnapshot`] copied out under the lock, so
//! drawing never holds up command processing and never feeds back into
//! the world.

use crate::obstacle::ObstacleKind;
use crate::world::WorldSnapshot;
use shared::Direction;
use std::fmt::Write;

const EMPTY: char = '.';

fn obstacle_glyph(kind: ObstacleKind) -> char {
    match kind {
        ObstacleKind::Mountain => 'M',
        ObstacleKind::Lake => '~',
        ObstacleKind::BottomlessPit => 'O',
    }
}

fn robot_glyph(direction: Direction) -> char {
    match direction {
        Direction::North => '^',
        Direction::East => '>',
        Direction::South => 'v',
        Direction::West => '<',
    }
}

/// Draws the world as a grid, one character per tile. Robots are drawn on
/// top of terrain as an arrow pointing the way they face.
pub fn render_grid(snapshot: &WorldSnapshot) -> String {
    let (width, height) = (snapshot.width as usize, snapshot.height as usize);
    let mut grid = vec![vec![EMPTY; width]; height];

    let mut put = |x: i32, y: i32, glyph: char| {
        if let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) {
            if let Some(cell) = grid.get_mut(y).and_then(|row| row.get_mut(x)) {
                *cell = glyph;
            }
        }
    };

    for obstacle in &snapshot.obstacles {
        let (top_left, bottom_right) = (obstacle.top_left(), obstacle.bottom_right());
        for y in top_left.y..=bottom_right.y {
            for x in top_left.x..=bottom_right.x {
                put(x, y, obstacle_glyph(obstacle.kind()));
            }
        }
    }
    for (_, state) in &snapshot.robots {
        put(state.position[0], state.position[1], robot_glyph(state.direction));
    }

    let mut out = String::with_capacity((width + 1) * height);
    for row in grid {
        out.extend(row);
        out.push('\n');
    }
    out
}

/// One line per robot with its full state.
pub fn describe_robots(snapshot: &WorldSnapshot) -> String {
    if snapshot.robots.is_empty() {
        return "No robots in the world.\n".to_string();
    }
    let mut out = String::new();
    for (name, state) in &snapshot.robots {
        let _ = writeln!(
            out,
            "{:<12} {:<8} ({}, {}) {:<5} shields={} shots={} {}",
            name,
            state.make,
            state.position[0],
            state.position[1],
            state.direction,
            state.shields,
            state.shots,
            state.status
        );
    }
    out
}

pub fn describe_obstacles(snapshot: &WorldSnapshot) -> String {
    if snapshot.obstacles.is_empty() {
        return "No obstacles.\n".to_string();
    }
    let mut out = String::new();
    for obstacle in &snapshot.obstacles {
        let _ = writeln!(
            out,
            "{:<15} {} to {}",
            obstacle.kind(),
            obstacle.top_left(),
            obstacle.bottom_right()
        );
    }
    out
}

/// Everything the console's `dump` command prints.
pub fn dump(snapshot: &WorldSnapshot) -> String {
    format!(
        "World {}x{}\n\nRobots:\n{}\nObstacles:\n{}\n{}",
        snapshot.width,
        snapshot.height,
        describe_robots(snapshot),
        describe_obstacles(snapshot),
        render_grid(snapshot)
    )
}
