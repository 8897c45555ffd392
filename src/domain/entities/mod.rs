//! Domain entities - Core business objects with no external dependencies

pub mod user;
pub mod favorite;

pub use user::User;
pub use favorite::{FavoriteRecord, FavoritesCollection, Inconsistency, ItemDetails, ItemKind};
