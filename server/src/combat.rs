use crate::obstacle::{Obstacle, ObstacleKind};
use crate::world::World;
use shared::{Direction, Position, RobotState};

/// What happened when a robot pulled the trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    OutOfAmmo,
    /// A mountain in the line of fire took the bullet.
    Absorbed,
    Miss,
    Hit {
        target: String,
        distance: u32,
        /// The hit used up the target's last shield.
        killed: bool,
        state: RobotState,
    },
}

/// Fires one round from `shooter` along its facing direction.
///
/// The round is spent whatever happens. Terrain is checked before robots.
/// The nearest live robot ahead on the same row or column and within
/// bullet range takes the hit. Returns `None` when there is no such
/// shooter.
pub fn fire(world: &mut World, shooter: &str) -> Option<FireOutcome> {
    let robot = world.robot_mut(shooter)?;
    let origin = robot.position();
    let facing = robot.direction();
    let range = robot.bullet_range();
    if !robot.decrement_shot() {
        return Some(FireOutcome::OutOfAmmo);
    }

    if terrain_blocks(world.obstacles(), origin, facing, range) {
        return Some(FireOutcome::Absorbed);
    }

    let target = world
        .robots()
        .filter(|other| other.name() != shooter && !other.is_dead())
        .filter(|other| origin.direction_to(other.position()) == Some(facing))
        .map(|other| (origin.distance_from(other.position(), facing), other.name().to_string()))
        .filter(|(distance, _)| *distance <= range)
        .min();

    let Some((distance, target)) = target else {
        return Some(FireOutcome::Miss);
    };
    let victim = world.robot_mut(&target)?;
    let killed = victim.take_hit();
    let state = victim.state();
    Some(FireOutcome::Hit {
        target,
        distance,
        killed,
        state,
    })
}

/// Whether a mountain sits on the first `range - 1` tiles of the line of
/// fire.
fn terrain_blocks(obstacles: &[Obstacle], origin: Position, facing: Direction, range: u32) -> bool {
    origin
        .ray(facing, range.saturating_sub(1))
        .any(|(_, tile)| {
            obstacles
                .iter()
                .any(|obstacle| obstacle.kind() == ObstacleKind::Mountain && obstacle.contains(tile))
        })
}
