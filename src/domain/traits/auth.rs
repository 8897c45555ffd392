use crate::domain::entities::User;

/// Supplies whoever is signed in right now
pub trait AuthContext: Send + Sync {
    fn current_user(&self) -> Option<User>;

    fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }
}

impl<T: AuthContext + ?Sized> AuthContext for std::sync::Arc<T> {
    fn current_user(&self) -> Option<User> {
        (**self).current_user()
    }
}
