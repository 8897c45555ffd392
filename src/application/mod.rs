//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: Favorites store and the like controller built on it
//! - Errors: Domain-specific errors

pub mod errors;
pub mod services;
