//! Application services - Business logic orchestration

pub mod favorites_service;
pub mod like_controller;

pub use favorites_service::{FavoritesService, DEFAULT_KEY_PREFIX};
pub use like_controller::{ChangeListener, LikeController};
