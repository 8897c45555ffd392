use async_trait::async_trait;
use std::fmt;

/// User-facing notices raised by favorite actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    SignInRequired,
    Added { name: String },
    Removed { name: String },
    Failed(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::SignInRequired => write!(f, "Please sign in to save favorites"),
            Notice::Added { name } => write!(f, "Added {} to favorites", name),
            Notice::Removed { name } => write!(f, "Removed {} from favorites", name),
            Notice::Failed(reason) => write!(f, "Failed to update favorites: {}", reason),
        }
    }
}

/// Notifier trait - abstraction for toast/console style notices
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: Notice);
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    async fn notify(&self, notice: Notice) {
        (**self).notify(notice).await
    }
}
