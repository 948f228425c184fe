use super::auth::{AuthToken, AuthTokenValue, PasswordCredentials};
use super::user_models::{User, UserRole};
use anyhow::Result;

pub trait UserStore: Send + Sync {
    /// Creates a new user and returns it. Fails on duplicate username or
    /// email (unique constraints).
    fn create_user(&self, username: &str, email: &str) -> Result<User>;

    fn get_user(&self, user_id: i64) -> Result<Option<User>>;

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    fn count_users(&self) -> Result<usize>;

    fn get_user_roles(&self, user_id: i64) -> Result<Vec<UserRole>>;

    fn add_user_role(&self, user_id: i64, role: UserRole) -> Result<()>;

    fn remove_user_role(&self, user_id: i64, role: UserRole) -> Result<()>;
}

pub trait UserAuthStore: Send + Sync {
    /// Returns Ok(None) if the user has no password credentials.
    fn get_password_credentials(&self, user_id: i64) -> Result<Option<PasswordCredentials>>;

    /// Inserts or replaces the user's password credentials.
    fn set_password_credentials(&self, credentials: &PasswordCredentials) -> Result<()>;

    fn add_auth_token(&self, token: &AuthToken) -> Result<()>;

    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>>;

    fn touch_auth_token(&self, value: &AuthTokenValue) -> Result<()>;

    /// Returns the deleted token, Ok(None) if it did not exist.
    fn delete_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Deletes tokens not used for the given number of days. Returns how many
    /// were deleted.
    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize>;
}

pub trait FullUserStore: UserStore + UserAuthStore {}

impl<T: UserStore + UserAuthStore> FullUserStore for T {}
