//! VinylKeeper Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod library;
pub mod metadata;
pub mod places;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use error::{AppError, AppResult};
pub use library::{LibraryManager, LibraryStore, SqliteLibraryStore};
pub use places::{PlaceStore, SqlitePlaceStore};
pub use server::{run_server, RequestsLoggingLevel};
pub use user::{FullUserStore, SqliteUserStore, UserManager, UserRole};
