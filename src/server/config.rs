use super::RequestsLoggingLevel;
use crate::matching::DEFAULT_TOP_K;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub frontend_dir_path: Option<String>,
    /// Matches returned by the matches route when `top_k` is not given.
    pub default_top_k: usize,
    /// Upper bound applied to a requested `top_k`.
    pub max_top_k: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            frontend_dir_path: None,
            default_top_k: DEFAULT_TOP_K,
            max_top_k: 50,
        }
    }
}
