use super::auth::{AuthToken, AuthTokenValue, CredentialHasher, PasswordCredentials};
use super::user_models::{User, UserRole};
use super::user_store::{UserAuthStore, UserStore};
use crate::db_column;
use crate::sqlite_persistence::{
    open_in_memory, open_versioned, SqlType, Table, VersionedSchema, UNIX_NOW,
};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// V 0
const USERS_TABLE_V0: Table = Table {
    name: "users",
    columns: &[
        db_column!("id", SqlType::Integer, primary_key = true),
        db_column!("username", SqlType::Text, not_null = true),
        db_column!("email", SqlType::Text, not_null = true),
        db_column!("created", SqlType::Integer, not_null = true, default = Some(UNIX_NOW)),
    ],
    indices: &[("idx_users_username", "username")],
    unique: &[&["username"], &["email"]],
};

const PASSWORD_CREDENTIALS_TABLE_V0: Table = Table {
    name: "password_credentials",
    columns: &[
        db_column!(
            "user_id",
            SqlType::Integer,
            not_null = true,
            references = Some(("users", "id"))
        ),
        db_column!("salt", SqlType::Text, not_null = true),
        db_column!("hash", SqlType::Text, not_null = true),
        db_column!("hasher", SqlType::Text, not_null = true),
        db_column!("created", SqlType::Integer, not_null = true, default = Some(UNIX_NOW)),
    ],
    indices: &[],
    unique: &[&["user_id"]],
};

const AUTH_TOKENS_TABLE_V0: Table = Table {
    name: "auth_tokens",
    columns: &[
        db_column!(
            "user_id",
            SqlType::Integer,
            not_null = true,
            references = Some(("users", "id"))
        ),
        db_column!("value", SqlType::Text, not_null = true),
        db_column!("created", SqlType::Integer, not_null = true, default = Some(UNIX_NOW)),
        db_column!("last_used", SqlType::Integer),
    ],
    indices: &[("idx_auth_tokens_value", "value")],
    unique: &[&["value"]],
};

const USER_ROLES_TABLE_V0: Table = Table {
    name: "user_roles",
    columns: &[
        db_column!(
            "user_id",
            SqlType::Integer,
            not_null = true,
            references = Some(("users", "id"))
        ),
        db_column!("role", SqlType::Text, not_null = true),
    ],
    indices: &[],
    unique: &[&["user_id", "role"]],
};

pub const USER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USERS_TABLE_V0,
        PASSWORD_CREDENTIALS_TABLE_V0,
        AUTH_TOKENS_TABLE_V0,
        USER_ROLES_TABLE_V0,
    ],
    migration: None,
}];

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, USER_VERSIONED_SCHEMAS)?;
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = open_in_memory(USER_VERSIONED_SCHEMAS)?;
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn read_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn get_user_by(conn: &Connection, column: &str, value: &str) -> Result<Option<User>> {
        Ok(conn
            .query_row(
                &format!(
                    "SELECT id, username, email, created FROM users WHERE {} = ?1",
                    column
                ),
                params![value],
                Self::read_user,
            )
            .optional()?)
    }

    fn read_token(row: &rusqlite::Row) -> rusqlite::Result<AuthToken> {
        Ok(AuthToken {
            user_id: row.get(0)?,
            value: AuthTokenValue(row.get(1)?),
            created: row.get(2)?,
            last_used: row.get(3)?,
        })
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, username: &str, email: &str) -> Result<User> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (username, email) VALUES (?1, ?2)",
            params![username, email],
        )
        .with_context(|| format!("Failed to create user {}", username))?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, username, email, created FROM users WHERE id = ?1",
            params![id],
            Self::read_user,
        )
        .context("User row missing right after insert")
    }

    fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT id, username, email, created FROM users WHERE id = ?1",
                params![user_id],
                Self::read_user,
            )
            .optional()?)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        Self::get_user_by(&conn, "username", username)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        Self::get_user_by(&conn, "email", email)
    }

    fn count_users(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn get_user_roles(&self, user_id: i64) -> Result<Vec<UserRole>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT role FROM user_roles WHERE user_id = ?1")?;
        let names = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        names
            .into_iter()
            .map(|name| {
                UserRole::parse(&name).with_context(|| format!("Unknown role in database: {}", name))
            })
            .collect()
    }

    fn add_user_role(&self, user_id: i64, role: UserRole) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)",
            params![user_id, role.as_str()],
        )?;
        Ok(())
    }

    fn remove_user_role(&self, user_id: i64, role: UserRole) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM user_roles WHERE user_id = ?1 AND role = ?2",
            params![user_id, role.as_str()],
        )?;
        Ok(())
    }
}

impl UserAuthStore for SqliteUserStore {
    fn get_password_credentials(&self, user_id: i64) -> Result<Option<PasswordCredentials>> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                "SELECT user_id, salt, hash, hasher, created
                 FROM password_credentials WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;
        raw.map(|(user_id, salt, hash, hasher, created)| {
            Ok(PasswordCredentials {
                user_id,
                salt,
                hash,
                hasher: CredentialHasher::from_str(&hasher)?,
                created,
            })
        })
        .transpose()
    }

    fn set_password_credentials(&self, credentials: &PasswordCredentials) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO password_credentials (user_id, salt, hash, hasher)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id) DO UPDATE SET salt = ?2, hash = ?3, hasher = ?4",
            params![
                credentials.user_id,
                credentials.salt,
                credentials.hash,
                credentials.hasher.as_str()
            ],
        )?;
        Ok(())
    }

    fn add_auth_token(&self, token: &AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_tokens (user_id, value, last_used) VALUES (?1, ?2, ?3)",
            params![token.user_id, token.value.0, token.last_used],
        )?;
        Ok(())
    }

    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_tokens WHERE value = ?1",
                params![value.0],
                Self::read_token,
            )
            .optional()?)
    }

    fn touch_auth_token(&self, value: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE auth_tokens SET last_used = cast(strftime('%s','now') as int)
             WHERE value = ?1",
            params![value.0],
        )?;
        Ok(())
    }

    fn delete_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let token = conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_tokens WHERE value = ?1",
                params![value.0],
                Self::read_token,
            )
            .optional()?;
        if token.is_some() {
            conn.execute("DELETE FROM auth_tokens WHERE value = ?1", params![value.0])?;
        }
        Ok(token)
    }

    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let cutoff_secs = (unused_for_days * 24 * 60 * 60) as i64;
        let deleted = conn.execute(
            "DELETE FROM auth_tokens
             WHERE COALESCE(last_used, created) < cast(strftime('%s','now') as int) - ?1",
            params![cutoff_secs],
        )?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_username_or_email_is_rejected() {
        let store = SqliteUserStore::in_memory().unwrap();
        store.create_user("ada", "ada@example.com").unwrap();
        assert!(store.create_user("ada", "other@example.com").is_err());
        assert!(store.create_user("grace", "ada@example.com").is_err());
        assert_eq!(store.count_users().unwrap(), 1);
    }

    #[test]
    fn credentials_round_trip_and_replace() {
        let store = SqliteUserStore::in_memory().unwrap();
        let user = store.create_user("ada", "ada@example.com").unwrap();

        assert!(store.get_password_credentials(user.id).unwrap().is_none());

        let credentials = PasswordCredentials::from_plain(user.id, "correct horse").unwrap();
        store.set_password_credentials(&credentials).unwrap();
        let stored = store.get_password_credentials(user.id).unwrap().unwrap();
        assert!(stored.verify("correct horse").unwrap());
        assert!(!stored.verify("wrong").unwrap());

        let replaced = PasswordCredentials::from_plain(user.id, "new password").unwrap();
        store.set_password_credentials(&replaced).unwrap();
        let stored = store.get_password_credentials(user.id).unwrap().unwrap();
        assert!(stored.verify("new password").unwrap());
        assert!(!stored.verify("correct horse").unwrap());
    }

    #[test]
    fn auth_token_lifecycle() {
        let store = SqliteUserStore::in_memory().unwrap();
        let user = store.create_user("ada", "ada@example.com").unwrap();

        let token = AuthToken {
            user_id: user.id,
            value: AuthTokenValue::generate(),
            created: 0,
            last_used: None,
        };
        store.add_auth_token(&token).unwrap();

        let found = store.get_auth_token(&token.value).unwrap().unwrap();
        assert_eq!(found.user_id, user.id);
        assert!(found.last_used.is_none());

        store.touch_auth_token(&token.value).unwrap();
        let touched = store.get_auth_token(&token.value).unwrap().unwrap();
        assert!(touched.last_used.is_some());

        let deleted = store.delete_auth_token(&token.value).unwrap();
        assert!(deleted.is_some());
        assert!(store.get_auth_token(&token.value).unwrap().is_none());
        assert!(store.delete_auth_token(&token.value).unwrap().is_none());
    }

    #[test]
    fn roles_are_set_valued_and_idempotent() {
        let store = SqliteUserStore::in_memory().unwrap();
        let user = store.create_user("ada", "ada@example.com").unwrap();

        assert!(store.get_user_roles(user.id).unwrap().is_empty());
        store.add_user_role(user.id, UserRole::User).unwrap();
        store.add_user_role(user.id, UserRole::Admin).unwrap();
        store.add_user_role(user.id, UserRole::Admin).unwrap();
        let roles = store.get_user_roles(user.id).unwrap();
        assert_eq!(roles.len(), 2);
        assert!(roles.contains(&UserRole::Admin));

        store.remove_user_role(user.id, UserRole::Admin).unwrap();
        assert_eq!(store.get_user_roles(user.id).unwrap(), vec![UserRole::User]);
    }
}
