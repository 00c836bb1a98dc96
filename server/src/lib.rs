//! # Chess Pong Server Library
//!
//! This library provides the authoritative server for chess pong: two players
//! defend rows of chess pieces with paddles while a ball bounces around the
//! board, chipping hit points off whatever it touches. Destroying the
//! opposing king wins the match.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server runs the only copy of the game physics. Clients send intents
//! (paddle direction, launch trajectory, control requests) and render the
//! state snapshots they receive; they never simulate anything themselves.
//!
//! ### Player Management
//! Exactly two TCP connections are accepted. The first becomes player 1 and
//! drives the top paddle, the second becomes player 2 on the bottom. Only
//! player 1 may choose the launch trajectory. A dropped connection is
//! removed on its own; the match keeps running for the remaining player.
//!
//! ### State Broadcasting
//! After every tick the full state snapshot is written to each connection as
//! one JSON line.
//!
//! ## Architecture Design
//!
//! ### Single Owner Tick Loop
//! One task owns the [`session::Session`] and is the only place simulation
//! state changes. Reader tasks never touch the game; they write the latest
//! command, control requests and pause flag into the shared
//! [`client_manager::ClientManager`], which the tick loop drains once per
//! tick.
//!
//! ### Deterministic Engine
//! [`game::GameState::update`] takes a fixed `dt` and keeps its own
//! simulation clock, so hit cooldowns and the piercing power behave the same
//! in tests as they do live. The engine performs no I/O; hit points arrive as
//! an [`board::HpSnapshot`] at reset time.
//!
//! ## Module Organization
//!
//! ### Board (`board`)
//! Grid geometry for 2, 4, 6 or 8 active columns and the starting layout.
//!
//! ### Physics (`physics`) and Entities (`entity`)
//! Vector and rectangle helpers, the ball and the paddles.
//!
//! ### Power (`power`)
//! The charge, ready and piercing state machine behind the special shot.
//!
//! ### Game (`game`)
//! The simulation step: launch, walls, piece damage and bounce, king
//! destruction, paddle deflection and the speed cap.
//!
//! ### Session (`session`)
//! Resets, board width changes, power tuning, pause and snapshots.
//!
//! ### Providers (`providers`)
//! HP templates, the power tunables file and the game record sink.
//!
//! ### Network (`network`) and Client Manager (`client_manager`)
//! TCP accept, line framing, the tick loop and the shared inbox.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::bind("127.0.0.1:9999", ServerConfig::default()).await?;
//!
//!     // Waits for two players, then ticks at 30 Hz until a king falls
//!     // or both players leave.
//!     if let Some(result) = server.run().await? {
//!         println!("side {} wins", result.winner);
//!     }
//!     Ok(())
//! }
//! ```

pub mod board;
pub mod client_manager;
pub mod entity;
pub mod game;
pub mod network;
pub mod physics;
pub mod power;
pub mod providers;
pub mod session;
pub mod utils;
