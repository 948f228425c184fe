//! Test fixture creation for the per-test SQLite databases.

use super::constants::*;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use vinylkeeper_server::library::SqliteLibraryStore;
use vinylkeeper_server::places::SqlitePlaceStore;
use vinylkeeper_server::user::{SqliteUserStore, UserManager, UserRole};

pub struct TestStores {
    pub library: Arc<SqliteLibraryStore>,
    pub users: Arc<SqliteUserStore>,
    pub places: Arc<SqlitePlaceStore>,
}

/// Creates a temp db directory with the three stores and the standard test
/// users registered: a regular user, a second user, and an admin.
pub fn create_test_stores() -> Result<(TempDir, TestStores)> {
    let dir = TempDir::new()?;
    let stores = TestStores {
        library: Arc::new(SqliteLibraryStore::new(dir.path().join("library.db"))?),
        users: Arc::new(SqliteUserStore::new(dir.path().join("user.db"))?),
        places: Arc::new(SqlitePlaceStore::new(dir.path().join("places.db"))?),
    };

    let user_manager = UserManager::new(stores.users.clone());
    user_manager
        .register(TEST_USER, TEST_EMAIL, TEST_PASS)
        .expect("Failed to register test user");
    user_manager
        .register(OTHER_USER, OTHER_EMAIL, OTHER_PASS)
        .expect("Failed to register other user");
    let admin = user_manager
        .register(ADMIN_USER, ADMIN_EMAIL, ADMIN_PASS)
        .expect("Failed to register admin user");
    user_manager
        .add_role(admin.id, UserRole::Admin)
        .expect("Failed to grant admin role");

    Ok((dir, stores))
}

#[allow(dead_code)]
pub fn db_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}
