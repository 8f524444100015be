//! # Robot Worlds Server Library
//!
//! This library provides the authoritative server for a multiplayer robot
//! world. Clients each control a robot that moves, turns, looks around,
//! fires, repairs and reloads inside a shared, bounded grid full of
//! obstacles. The server owns the one true copy of that world.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Every rule is decided here: whether a move is blocked, whether a robot
//! fell off the edge or into a pit, what a robot can see and whether a shot
//! hits. Clients only ever receive the outcome.
//!
//! ### Client Management
//! Handles the lifecycle of client connections including:
//! - Connection acceptance and capacity limits
//! - Binding each launched robot to the connection that launched it
//! - Out-of-band notices (destroyed robots, finished repairs and reloads)
//! - Removing a connection's robot when the connection goes away
//!
//! ## Architecture Design
//!
//! ### One Lock Around The World
//! Connections are served concurrently, but every command runs its
//! validate, apply and prune steps under a single write guard on the world.
//! The robot a command acts on is always passed explicitly by name, so two
//! connections can never confuse whose robot is being moved.
//!
//! ### Line-Based JSON Over TCP
//! A request is one JSON object per line:
//! `{"robot": "HAL", "command": "forward", "arguments": [3]}`. Every request
//! gets exactly one response line; notices are extra lines pushed to the
//! affected connection.
//!
//! ### Timed Actions Without Holding The Lock
//! Repair and reload record a deadline on the robot and reply at once. The
//! connection then waits out the duration on its own task and sends the
//! completion notice, while other connections keep playing.
//!
//! ## Module Organization
//!
//! ### Domain
//! - `obstacle`: rectangular terrain and its parser
//! - `maze`: how a world's obstacles are chosen
//! - `robot`: a single robot and its lifecycle
//! - `world`: bounds, terrain, the roster, movement and launching
//! - `visibility`: the `look` scan
//! - `combat`: the `fire` resolution
//!
//! ### Commands
//! - `command`: parsing requests into commands and the user-facing errors
//! - `dispatcher`: running a command and building responses and notices
//!
//! ### Infrastructure
//! - `config`: defaults, TOML file and command-line flags
//! - `client_manager`: connection bookkeeping
//! - `network`: TCP listener and per-connection tasks
//! - `render`: console views of a world snapshot

pub mod client_manager;
pub mod combat;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod maze;
pub mod network;
pub mod obstacle;
pub mod render;
pub mod robot;
pub mod visibility;
pub mod world;

pub use config::{CliArgs, ServerConfig, WorldConfig};
pub use network::Server;
pub use world::World;

/// Error type used at the network and binary boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
