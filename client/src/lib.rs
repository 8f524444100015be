//! # Robot Worlds Client Library
//!
//! A terminal client for the robot world server. The user types commands
//! such as `launch sniper HAL` or `forward 3`; the client turns them into
//! JSON requests, sends them over TCP and prints every response and notice
//! the server pushes back.
//!
//! ## Architecture Overview
//!
//! ### Server Authority
//! The client keeps no copy of the world. Every rule is decided by the
//! server and the client only shows the outcome, so there is nothing to
//! predict or reconcile.
//!
//! ### One Loop, Two Sources
//! Typed input and server lines are watched in the same loop. Notices such
//! as "your robot was destroyed" or "repair done" are printed as soon as
//! they arrive, even while the user has not typed anything.
//!
//! ## Module Organization
//!
//! ### Input Module (`input`)
//! - Splitting a typed line into a command and its arguments
//! - Remembering which robot this client launched
//! - Sending numbers as JSON numbers and everything else as strings
//!
//! ### Network Module (`network`)
//! - TCP connection and line framing
//! - Tracking the answer to a pending launch
//! - Ending the session when the robot dies or the server leaves
//!
//! ### Rendering Module (`rendering`)
//! - Robot state, look results and shot results as readable text
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::network::Client;
//!
//! # async fn example() -> Result<(), client::BoxError> {
//! let mut client = Client::connect("127.0.0.1:5000").await?;
//! let exit = client.run().await?;
//! println!("Session ended: {:?}", exit);
//! # Ok(())
//! # }
//! ```

pub mod input;
pub mod network;
pub mod rendering;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
