//! Domain traits - Abstractions for infrastructure implementations

pub mod auth;
pub mod notifier;
pub mod store;

pub use auth::AuthContext;
pub use notifier::{Notice, Notifier};
pub use store::Store;
