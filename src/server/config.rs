use super::RequestsLoggingLevel;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub frontend_dir_path: Option<String>,
    /// Sent to the metadata providers as the User-Agent header.
    pub metadata_user_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            frontend_dir_path: None,
            metadata_user_agent: format!(
                "vinylkeeper-server/{}",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}
