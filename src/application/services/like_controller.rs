use std::sync::Arc;

use crate::application::errors::FavoritesError;
use crate::application::services::FavoritesService;
use crate::domain::entities::FavoriteRecord;
use crate::domain::traits::{AuthContext, Notice, Notifier};

/// Called with `(item_id, liked)` whenever the displayed state changes
pub type ChangeListener = Box<dyn Fn(&str, bool) + Send + Sync>;

/// Like button state for one displayed listing.
///
/// The displayed state follows a toggle even when persisting it failed;
/// `load` re-derives it from the store.
pub struct LikeController<A: AuthContext, N: Notifier> {
    service: Arc<FavoritesService>,
    auth: A,
    notifier: N,
    record: FavoriteRecord,
    liked: bool,
    like_count: u32,
    listeners: Vec<ChangeListener>,
}

impl<A: AuthContext, N: Notifier> LikeController<A, N> {
    pub fn new(service: Arc<FavoritesService>, auth: A, notifier: N, record: FavoriteRecord) -> Self {
        Self {
            service,
            auth,
            notifier,
            record,
            liked: false,
            like_count: 0,
            listeners: Vec::new(),
        }
    }

    pub fn with_like_count(mut self, count: u32) -> Self {
        self.like_count = count;
        self
    }

    pub fn on_change<F>(&mut self, listener: F)
    where
        F: Fn(&str, bool) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn record(&self) -> &FavoriteRecord {
        &self.record
    }

    pub fn is_liked(&self) -> bool {
        self.liked
    }

    pub fn like_count(&self) -> u32 {
        self.like_count
    }

    /// Re-reads the liked state from the store
    pub async fn load(&mut self) -> bool {
        let user = self.auth.current_user();
        self.liked = self
            .service
            .is_favorited(user.as_ref().map(|u| u.id.as_str()), &self.record.id, Some(self.record.kind()))
            .await;
        self.liked
    }

    pub async fn toggle(&mut self) -> Result<bool, FavoritesError> {
        let Some(user) = self.auth.current_user() else {
            tracing::debug!(item_id = %self.record.id, "Favorite toggle without a signed-in user");
            self.notifier.notify(Notice::SignInRequired).await;
            return Err(FavoritesError::AuthRequired);
        };

        match self.service.toggle_favorite(Some(&user.id), self.record.clone()).await {
            Ok(liked) => {
                self.apply(liked);
                let name = self.record.name.clone();
                let notice = if liked {
                    Notice::Added { name }
                } else {
                    Notice::Removed { name }
                };
                self.notifier.notify(notice).await;
                Ok(liked)
            }
            Err(e) => {
                tracing::error!(user_id = %user.id, item_id = %self.record.id, error = %e, "Failed to save favorite");
                self.notifier
                    .notify(Notice::Failed("please try again".to_string()))
                    .await;
                self.apply(!self.liked);
                Err(e)
            }
        }
    }

    fn apply(&mut self, liked: bool) {
        if liked != self.liked {
            self.like_count = if liked {
                self.like_count.saturating_add(1)
            } else {
                self.like_count.saturating_sub(1)
            };
        }
        self.liked = liked;

        for listener in &self.listeners {
            listener(&self.record.id, liked);
        }
    }
}
