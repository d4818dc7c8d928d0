//! Domofon - Telegram bot that keeps a building's apartment-to-resident directory
//!
//! This library provides all the functionality for the Domofon bot:
//! the resident store, per-user dialogue state, input validation and
//! the Telegram handler tree.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, input validation
//! - `storage`: SQLite resident store behind a connection pool
//! - `telegram`: bot setup, dialogue state machine and handlers

pub mod cli;
pub mod core;
pub mod storage;
pub mod telegram;
