//! Formats server responses for the terminal

use shared::{OperationalStatus, Response, RobotState, SeenObject};
use std::fmt::Write;

/// One line summary of a robot.
pub fn format_state(state: &RobotState) -> String {
    format!(
        "[{}, {}] facing {} | shields: {} | shots: {} | {}",
        state.position[0],
        state.position[1],
        state.direction,
        state.shields,
        state.shots,
        state.status
    )
}

fn format_sighting(seen: &SeenObject) -> String {
    match &seen.name {
        Some(name) => format!("  {:<5} {} '{}' at {}", seen.direction, seen.kind, name, seen.distance),
        None => format!("  {:<5} {} at {}", seen.direction, seen.kind, seen.distance),
    }
}

/// Everything worth showing about a response, one item per line.
pub fn format_response(response: &Response) -> String {
    if !response.is_ok() {
        return format!("Error: {}", response.message());
    }
    if response.is_quit() {
        return "Your robot has been destroyed or the server closed the game.".to_string();
    }

    let data = &response.data;
    let mut out = String::new();
    match (&data.robot, data.distance, &data.state) {
        (Some(target), Some(distance), Some(target_state)) => {
            let _ = writeln!(
                out,
                "{}: '{}' at distance {} now has {} shields ({})",
                data.message, target, distance, target_state.shields, target_state.status
            );
        }
        _ => {
            let _ = writeln!(out, "{}", data.message);
        }
    }

    if let Some(objects) = &data.objects {
        if objects.is_empty() {
            let _ = writeln!(out, "  Nothing in sight.");
        }
        for seen in objects {
            let _ = writeln!(out, "{}", format_sighting(seen));
        }
    }
    if let Some(direction) = data.orientation {
        let _ = writeln!(out, "Facing {}", direction);
    }
    if let Some(state) = &response.state {
        let _ = writeln!(out, "{}", format_state(state));
    }

    out.trim_end().to_string()
}

/// Whether the game is over for this client.
pub fn is_fatal(response: &Response) -> bool {
    response.is_quit()
        || response
            .state
            .as_ref()
            .is_some_and(|state| state.status == OperationalStatus::Dead)
}
