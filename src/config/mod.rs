// Configuration module entry point
// Loads layered configuration and holds the shared application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, StaticFilesConfig};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Precedence, lowest first: built-in defaults, the file (optional),
    /// `ARTICLES_*` environment variables (`ARTICLES_SERVER__PORT=4000`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::load_with_env(config_path, None)
    }

    /// `env` replaces the process environment when given
    fn load_with_env(
        config_path: &str,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let settings = Self::defaults()?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("ARTICLES")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let mut cfg: Self = settings.try_deserialize()?;
        // An empty path is how a file or env var selects stdout
        if cfg.logging.change_log_file.as_deref() == Some("") {
            cfg.logging.change_log_file = None;
        }
        Ok(cfg)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError>
    {
        config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("storage.articles_path", "articles.json")?
            .set_default("static_files.root", "client")?
            .set_default("static_files.index_file", "index.html")?
            .set_default("logging.access_log", true)?
            .set_default("logging.change_log_file", "logs/changes.log")?
            .set_default("http.server_name", "article-server")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("performance.keep_alive", true)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let cfg = Config::load_from(missing.to_str().unwrap()).unwrap();

        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.server.workers, None);
        assert_eq!(cfg.storage.articles_path, "articles.json");
        assert_eq!(cfg.static_files.root, "client");
        assert_eq!(cfg.static_files.index_file, "index.html");
        assert_eq!(
            cfg.logging.change_log_file.as_deref(),
            Some("logs/changes.log")
        );
        assert_eq!(cfg.http.max_body_size, 1_048_576);
        assert!(cfg.performance.keep_alive);
        assert_eq!(cfg.performance.max_connections, None);
        assert_eq!(
            cfg.get_socket_addr().unwrap(),
            "127.0.0.1:3000".parse().unwrap()
        );
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 8088
workers = 2

[storage]
articles_path = "data/articles.json"

[performance]
max_connections = 64
"#,
        )
        .unwrap();

        let cfg = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 8088);
        assert_eq!(cfg.server.workers, Some(2));
        assert_eq!(cfg.storage.articles_path, "data/articles.json");
        assert_eq!(cfg.performance.max_connections, Some(64));
        // untouched keys keep their defaults
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.static_files.root, "client");
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "[server]\nport = 8088\n").unwrap();

        let env = config::Map::from([
            ("ARTICLES_SERVER__PORT".to_string(), "4000".to_string()),
            ("ARTICLES_HTTP__ENABLE_CORS".to_string(), "true".to_string()),
            (
                "ARTICLES_STORAGE__ARTICLES_PATH".to_string(),
                "/srv/articles.json".to_string(),
            ),
        ]);
        let cfg = Config::load_with_env(path.to_str().unwrap(), Some(env)).unwrap();
        assert_eq!(cfg.server.port, 4000);
        assert!(cfg.http.enable_cors);
        assert_eq!(cfg.storage.articles_path, "/srv/articles.json");
    }

    #[test]
    fn test_empty_change_log_file_means_stdout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "[logging]\nchange_log_file = \"\"\n").unwrap();
        let cfg = Config::load_with_env(path.to_str().unwrap(), Some(config::Map::new())).unwrap();
        assert_eq!(cfg.logging.change_log_file, None);

        let env = config::Map::from([(
            "ARTICLES_LOGGING__CHANGE_LOG_FILE".to_string(),
            String::new(),
        )]);
        let missing = dir.path().join("none");
        let cfg = Config::load_with_env(missing.to_str().unwrap(), Some(env)).unwrap();
        assert_eq!(cfg.logging.change_log_file, None);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        assert!(Config::load_from(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_invalid_host_address() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("host.toml");
        std::fs::write(&path, "[server]\nhost = \"not a host\"\n").unwrap();

        let cfg = Config::load_from(path.to_str().unwrap()).unwrap();
        assert!(cfg.get_socket_addr().is_err());
    }
}
