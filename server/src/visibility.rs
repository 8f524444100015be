//! Line-of-sight scan used by `look`.
//!
//! Each cardinal direction is scanned on its own. Obstacles are seen by
//! their near edge when the observer's row or column runs into them,
//! robots only when they share the observer's row or column, and the world
//! edge when it is strictly closer than the visibility radius. The nearest
//! mountain hides everything behind it.

use crate::obstacle::{Obstacle, ObstacleKind};
use crate::world::World;
use shared::{Direction, Position, SeenObject, SightingKind};

/// Everything `observer` can see, grouped by direction in clockwise order
/// starting north, each group sorted by distance.
pub fn scan(world: &World, observer: Position) -> Vec<SeenObject> {
    Direction::ALL
        .into_iter()
        .flat_map(|direction| scan_direction(world, observer, direction))
        .collect()
}

fn scan_direction(world: &World, observer: Position, direction: Direction) -> Vec<SeenObject> {
    let radius = world.config().visibility;

    let mut sightings: Vec<SeenObject> = world
        .obstacles()
        .iter()
        .filter_map(|obstacle| {
            obstacle_distance(observer, obstacle, direction, radius).map(|distance| SeenObject {
                direction,
                kind: obstacle.kind().sighting(),
                distance,
                name: None,
            })
        })
        .collect();
    sightings.sort_by_key(|seen| seen.distance);

    let nearest_mountain = world
        .obstacles()
        .iter()
        .filter(|obstacle| obstacle.kind() == ObstacleKind::Mountain)
        .filter_map(|obstacle| obstacle_distance(observer, obstacle, direction, radius))
        .min();
    let hidden = |distance: u32| nearest_mountain.is_some_and(|mountain| mountain < distance);

    if let Some(distance) = edge_distance(world, observer, direction, radius) {
        if !hidden(distance) {
            sightings.push(SeenObject {
                direction,
                kind: SightingKind::Edge,
                distance,
                name: None,
            });
        }
    }

    for robot in world.robots() {
        let at = robot.position();
        if observer.direction_to(at) != Some(direction) {
            continue;
        }
        let distance = observer.distance_from(at, direction);
        if distance <= radius && !hidden(distance) {
            sightings.push(SeenObject {
                direction,
                kind: SightingKind::Robot,
                distance,
                name: Some(robot.name().to_string()),
            });
        }
    }

    sightings.sort_by_key(|seen| seen.distance);
    if let Some(mountain) = sightings
        .iter()
        .position(|seen| seen.kind == SightingKind::Mountain)
    {
        sightings.truncate(mountain + 1);
    }
    sightings
}

/// Distance to the near edge of `obstacle` when the observer's line of
/// sight in `direction` runs into it within `radius`.
fn obstacle_distance(
    observer: Position,
    obstacle: &Obstacle,
    direction: Direction,
    radius: u32,
) -> Option<u32> {
    let (top_left, bottom_right) = (obstacle.top_left(), obstacle.bottom_right());
    let (gap, across, low, high) = match direction {
        Direction::North => (observer.y.saturating_sub(bottom_right.y), observer.x, top_left.x, bottom_right.x),
        Direction::South => (top_left.y.saturating_sub(observer.y), observer.x, top_left.x, bottom_right.x),
        Direction::East => (top_left.x.saturating_sub(observer.x), observer.y, top_left.y, bottom_right.y),
        Direction::West => (observer.x.saturating_sub(bottom_right.x), observer.y, top_left.y, bottom_right.y),
    };
    if gap <= 0 || across < low || across > high {
        return None;
    }
    let distance = gap.unsigned_abs();
    (distance <= radius).then_some(distance)
}

/// Distance to the world boundary, reported only when strictly inside the
/// visibility radius.
fn edge_distance(world: &World, observer: Position, direction: Direction, radius: u32) -> Option<u32> {
    let (top_left, bottom_right) = (world.top_left(), world.bottom_right());
    let gap = match direction {
        Direction::North => observer.y.saturating_sub(top_left.y),
        Direction::South => bottom_right.y.saturating_sub(observer.y),
        Direction::East => bottom_right.x.saturating_sub(observer.x),
        Direction::West => observer.x.saturating_sub(top_left.x),
    };
    if gap < 0 {
        return None;
    }
    let distance = gap.unsigned_abs();
    (distance < radius).then_some(distance)
}
