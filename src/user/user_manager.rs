use super::auth::{AuthToken, AuthTokenValue, PasswordCredentials};
use super::user_models::{User, UserRole};
use super::user_store::FullUserStore;
use crate::error::{AppError, AppResult};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 50;

pub struct UserManager {
    store: Arc<dyn FullUserStore>,
}

impl UserManager {
    pub fn new(store: Arc<dyn FullUserStore>) -> Self {
        UserManager { store }
    }

    pub fn register(&self, username: &str, email: &str, password: &str) -> AppResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::validation("Username must not be empty"));
        }
        if username.len() > MAX_USERNAME_LEN {
            return Err(AppError::validation("Username is too long"));
        }
        if !EMAIL_REGEX.is_match(email) {
            return Err(AppError::validation("Invalid email address"));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.store.get_user_by_username(username)?.is_some() {
            return Err(AppError::validation("Username already taken"));
        }
        if self.store.get_user_by_email(email)?.is_some() {
            return Err(AppError::validation("Email already registered"));
        }

        let user = self.store.create_user(username, email)?;
        let credentials = PasswordCredentials::from_plain(user.id, password)?;
        self.store.set_password_credentials(&credentials)?;
        self.store.add_user_role(user.id, UserRole::User)?;
        Ok(user)
    }

    /// Returns Ok(None) on unknown username or wrong password. The two cases
    /// are not distinguished to the caller.
    pub fn login(&self, username: &str, password: &str) -> AppResult<Option<(User, AuthToken)>> {
        let user = match self.store.get_user_by_username(username.trim())? {
            Some(user) => user,
            None => return Ok(None),
        };
        let credentials = match self.store.get_password_credentials(user.id)? {
            Some(credentials) => credentials,
            None => return Ok(None),
        };
        if !credentials.verify(password)? {
            return Ok(None);
        }

        let token = AuthToken {
            user_id: user.id,
            value: AuthTokenValue::generate(),
            created: 0,
            last_used: None,
        };
        self.store.add_auth_token(&token)?;
        Ok(Some((user, token)))
    }

    /// Resolves a session token to its user, marking the token as used.
    pub fn authenticate(&self, value: &AuthTokenValue) -> AppResult<Option<User>> {
        let token = match self.store.get_auth_token(value)? {
            Some(token) => token,
            None => return Ok(None),
        };
        self.store.touch_auth_token(value)?;
        Ok(self.store.get_user(token.user_id)?)
    }

    pub fn logout(&self, user_id: i64, value: &AuthTokenValue) -> AppResult<()> {
        match self.store.get_auth_token(value)? {
            None => Ok(()),
            Some(token) if token.user_id != user_id => {
                Err(AppError::forbidden("Not the token owner"))
            }
            Some(_) => {
                self.store.delete_auth_token(value)?;
                Ok(())
            }
        }
    }

    pub fn get_user(&self, user_id: i64) -> AppResult<User> {
        self.store
            .get_user(user_id)?
            .ok_or_else(|| AppError::not_found("User", user_id))
    }

    pub fn is_admin(&self, user_id: i64) -> AppResult<bool> {
        Ok(self.store.get_user_roles(user_id)?.contains(&UserRole::Admin))
    }

    pub fn add_role(&self, user_id: i64, role: UserRole) -> AppResult<()> {
        self.get_user(user_id)?;
        Ok(self.store.add_user_role(user_id, role)?)
    }

    pub fn count_users(&self) -> AppResult<usize> {
        Ok(self.store.count_users()?)
    }

    pub fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> AppResult<usize> {
        Ok(self.store.prune_unused_auth_tokens(unused_for_days)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::sqlite_user_store::SqliteUserStore;

    fn manager() -> UserManager {
        UserManager::new(Arc::new(SqliteUserStore::in_memory().unwrap()))
    }

    #[test]
    fn register_validates_inputs() {
        let manager = manager();
        assert!(matches!(
            manager.register("", "a@b.com", "longenough"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            manager.register("ada", "not-an-email", "longenough"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            manager.register("ada", "a@b.com", "short"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn register_rejects_duplicates() {
        let manager = manager();
        manager.register("ada", "ada@example.com", "password1").unwrap();
        assert!(matches!(
            manager.register("ada", "other@example.com", "password1"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            manager.register("grace", "ada@example.com", "password1"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn login_and_authenticate() {
        let manager = manager();
        let user = manager.register("ada", "ada@example.com", "password1").unwrap();

        assert!(manager.login("ada", "wrong password").unwrap().is_none());
        assert!(manager.login("nobody", "password1").unwrap().is_none());

        let (logged_in, token) = manager.login("ada", "password1").unwrap().unwrap();
        assert_eq!(logged_in.id, user.id);

        let authenticated = manager.authenticate(&token.value).unwrap().unwrap();
        assert_eq!(authenticated.id, user.id);
    }

    #[test]
    fn logout_invalidates_the_token() {
        let manager = manager();
        let user = manager.register("ada", "ada@example.com", "password1").unwrap();
        let (_, token) = manager.login("ada", "password1").unwrap().unwrap();

        manager.logout(user.id, &token.value).unwrap();
        assert!(manager.authenticate(&token.value).unwrap().is_none());
        // Logging out an already-deleted token is fine.
        manager.logout(user.id, &token.value).unwrap();
    }

    #[test]
    fn logout_with_foreign_token_is_forbidden_and_keeps_it() {
        use crate::user::user_store::UserAuthStore;

        let store = Arc::new(SqliteUserStore::in_memory().unwrap());
        let manager = UserManager::new(store.clone());
        manager.register("ada", "ada@example.com", "password1").unwrap();
        let other = manager.register("grace", "g@example.com", "password2").unwrap();
        let (_, token) = manager.login("ada", "password1").unwrap().unwrap();
        let before = store.get_auth_token(&token.value).unwrap().unwrap();

        assert!(matches!(
            manager.logout(other.id, &token.value),
            Err(AppError::Forbidden(_))
        ));

        // The stored row must survive untouched, timestamps included.
        let after = store.get_auth_token(&token.value).unwrap().unwrap();
        assert_eq!(after.user_id, before.user_id);
        assert_eq!(after.created, before.created);
        assert_eq!(after.last_used, before.last_used);
        assert!(manager.authenticate(&token.value).unwrap().is_some());
    }

    #[test]
    fn admin_role_is_granted_explicitly() {
        let manager = manager();
        let user = manager.register("ada", "ada@example.com", "password1").unwrap();
        assert!(!manager.is_admin(user.id).unwrap());
        manager.add_role(user.id, UserRole::Admin).unwrap();
        assert!(manager.is_admin(user.id).unwrap());
    }
}
