//! Session-backed authentication context

use std::sync::RwLock;

use crate::domain::entities::User;
use crate::domain::traits::AuthContext;

/// Holds the signed-in user, if any. OTP verification happens elsewhere;
/// this only records its outcome.
#[derive(Default)]
pub struct Session {
    user: RwLock<Option<User>>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user: User) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub fn sign_in(&self, user: User) {
        tracing::info!(user_id = %user.id, "Signed in");
        match self.user.write() {
            Ok(mut guard) => *guard = Some(user),
            Err(poisoned) => *poisoned.into_inner() = Some(user),
        }
    }

    pub fn sign_out(&self) {
        match self.user.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

impl AuthContext for Session {
    fn current_user(&self) -> Option<User> {
        match self.user.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_and_out() {
        let session = Session::anonymous();
        assert!(!session.is_authenticated());

        session.sign_in(User::new("u1"));
        assert_eq!(session.current_user().map(|u| u.id), Some("u1".to_string()));

        session.sign_out();
        assert!(session.current_user().is_none());
    }
}
