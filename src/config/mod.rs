mod file_config;

pub use file_config::{FileConfig, MatchingConfig};

use crate::matching::DEFAULT_TOP_K;
use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

const DEFAULT_MAX_TOP_K: usize = 50;

/// Command line values, before the config file is applied on top.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub matching: MatchingSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchingSettings {
    pub default_top_k: usize,
    pub max_top_k: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_top_k: DEFAULT_TOP_K,
            max_top_k: DEFAULT_MAX_TOP_K,
        }
    }
}

impl AppConfig {
    /// Merges the command line with the optional config file; file values win.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = match file.logging_level {
            Some(s) => match parse_logging_level(&s) {
                Some(level) => level,
                None => bail!("Invalid logging_level in config file: {}", s),
            },
            None => cli.logging_level.clone(),
        };

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let matching_file = file.matching.unwrap_or_default();
        let defaults = MatchingSettings::default();
        let matching = MatchingSettings {
            default_top_k: matching_file
                .default_top_k
                .unwrap_or(defaults.default_top_k),
            max_top_k: matching_file.max_top_k.unwrap_or(defaults.max_top_k),
        };
        if matching.max_top_k == 0 {
            bail!("matching.max_top_k must be at least 1");
        }
        if matching.default_top_k > matching.max_top_k {
            bail!(
                "matching.default_top_k ({}) cannot exceed matching.max_top_k ({})",
                matching.default_top_k,
                matching.max_top_k
            );
        }

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            matching,
        })
    }

    pub fn music_db_path(&self) -> PathBuf {
        self.db_dir.join("moodmatch.db")
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            frontend_dir_path: self.frontend_dir_path.clone(),
            default_top_k: self.matching.default_top_k,
            max_top_k: self.matching.max_top_k,
        }
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_temp_db_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    #[test]
    fn parses_logging_level_case_insensitively() {
        let cases = [
            ("none", RequestsLoggingLevel::None),
            ("Path", RequestsLoggingLevel::Path),
            ("headers", RequestsLoggingLevel::Headers),
            ("BODY", RequestsLoggingLevel::Body),
        ];
        for (raw, expected) in cases {
            assert_eq!(parse_logging_level(raw), Some(expected), "{}", raw);
        }
        assert_eq!(parse_logging_level("verbose"), None);
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Headers,
            frontend_dir_path: Some("/frontend".to_string()),
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 3001);
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
        assert_eq!(config.frontend_dir_path, Some("/frontend".to_string()));
        assert_eq!(config.matching, MatchingSettings::default());
        assert_eq!(config.matching.default_top_k, 3);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/should/be/overridden")),
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            ..Default::default()
        };

        let file_config = FileConfig {
            db_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            port: Some(4000),
            metrics_port: Some(9999),
            logging_level: Some("body".to_string()),
            frontend_dir_path: None,
            matching: Some(MatchingConfig {
                default_top_k: Some(5),
                max_top_k: Some(20),
            }),
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 4000);
        assert_eq!(config.metrics_port, 9999);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Body);
        assert_eq!(
            config.matching,
            MatchingSettings {
                default_top_k: 5,
                max_top_k: 20
            }
        );

        let server_config = config.server_config();
        assert_eq!(server_config.port, 4000);
        assert_eq!(server_config.default_top_k, 5);
        assert_eq!(server_config.max_top_k, 20);
    }

    #[test]
    fn test_resolve_invalid_logging_level_error() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let file_config = FileConfig {
            logging_level: Some("verbose".to_string()),
            ..Default::default()
        };

        let result = AppConfig::resolve(&cli, Some(file_config));
        assert!(result.unwrap_err().to_string().contains("logging_level"));
    }

    #[test]
    fn test_resolve_inconsistent_top_k_error() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let file_config = FileConfig {
            matching: Some(MatchingConfig {
                default_top_k: Some(10),
                max_top_k: Some(5),
            }),
            ..Default::default()
        };

        let result = AppConfig::resolve(&cli, Some(file_config));
        assert!(result.unwrap_err().to_string().contains("cannot exceed"));
    }

    #[test]
    fn test_resolve_rejects_unusable_db_dir() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cases = [
            (None, "db_dir must be specified"),
            (Some(PathBuf::from("/no/such/moodmatch/dir")), "does not exist"),
            (Some(temp_file.path().to_path_buf()), "not a directory"),
        ];

        for (db_dir, expected) in cases {
            let cli = CliConfig {
                db_dir,
                ..Default::default()
            };
            let message = AppConfig::resolve(&cli, None).unwrap_err().to_string();
            assert!(message.contains(expected), "{}", message);
        }
    }

    #[test]
    fn test_music_db_path() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.music_db_path(), temp_dir.path().join("moodmatch.db"));
    }
}
