//! Domain layer - Core business logic with no infrastructure dependencies
//! 
//! This layer contains:
//! - Entities: Core business objects (User, FavoriteRecord, FavoritesCollection)
//! - Traits: Ports for infrastructure (Store, AuthContext, Notifier)

pub mod entities;
pub mod traits;
