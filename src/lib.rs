//! Per-user favorites for a community business directory: products,
//! services and businesses saved into typed buckets over a key-value store.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use application::errors::{ConfigError, FavoritesError, StorageError};
pub use application::services::{FavoritesService, LikeController};
pub use domain::entities::{FavoriteRecord, FavoritesCollection, ItemKind, User};
