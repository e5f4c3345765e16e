//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and schema migration
//! - SQLite pragma configuration
//! - Repository (pool reads) and Store (per-event transaction) layers

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{Repository, Store};
