pub mod config;
mod collection_routes;
mod dashboard_routes;
mod http_layers;
mod metadata_routes;
mod place_routes;
pub mod server;
mod session;
pub mod state;
mod wishlist_routes;

pub use config::ServerConfig;
pub use http_layers::*;
#[allow(unused_imports)] // Used by main.rs
pub use server::run_server;
