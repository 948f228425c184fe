mod manager;
mod models;
mod store;

pub use manager::PlaceManager;
pub use models::*;
pub use store::{PlaceStore, SqlitePlaceStore};
