//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: In-memory and file key-value stores
//! - Database: SQLite key-value store
//! - Auth: Session holding the signed-in user
//! - Adapters: Notice sinks (console, in-memory)

pub mod config;
pub mod storage;
pub mod database;
pub mod auth;
pub mod adapters;
