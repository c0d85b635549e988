//! # ML Tower Tetris
//!
//! Decision engine for a competitive falling-block tower game. Agents receive
//! a snapshot of the game each tick and answer with one action, chosen by a
//! heuristic, a learned network, a DQN agent, or a blend of the first two.
//! Networks are trained with the Burn ML framework from labelled data or
//! self-play.
//!
//! ## Modules
//!
//! - [`game`] : Snapshot model, legal actions and the fast simulator
//! - [`ai`] : Feature extraction, strategies, networks and shared model slots
//! - [`training`] : Supervised and DQN trainers, replay buffer, reward shaping
//! - [`checkpoint`] : Model persistence and versioning
//! - [`engine`] : Agent registry, decision scheduler and facade
//! - [`config`] : TOML configuration loading and validation
//! - [`error`] : Structured error types

#![recursion_limit = "256"]

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod training;
