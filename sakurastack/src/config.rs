//! Configuration management

use anyhow::{bail, Context};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Default config file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "sakurastack";

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    /// URL path prefix the API is mounted under
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_prefix() -> String {
    "/api/cloud/1.1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values given on the command line or through the environment
#[derive(Debug, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub prefix: Option<String>,
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from an optional file.
    ///
    /// An explicit `path` must exist; the default `sakurastack.toml` may be
    /// absent.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let source = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let config = config::Config::builder()
            .add_source(source)
            .build()
            .context("failed to read configuration")?;

        Ok(config.try_deserialize::<Config>()?)
    }

    /// Apply command-line and environment values over the file values
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(prefix) = overrides.prefix {
            self.api.prefix = prefix;
        }
        if let Some(level) = overrides.log_level {
            self.log.level = level;
        }
    }

    /// Validate and normalize values that can't be checked while parsing
    pub fn finalize(mut self) -> anyhow::Result<Self> {
        let prefix = self.api.prefix.trim_end_matches('/');
        if !prefix.is_empty() && !prefix.starts_with('/') {
            bail!("API prefix must start with '/': {:?}", self.api.prefix);
        }
        if prefix.contains([':', '*']) {
            bail!(
                "API prefix must not contain ':' or '*': {:?}",
                self.api.prefix
            );
        }
        self.api.prefix = prefix.to_string();
        Ok(self)
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .with_context(|| format!("invalid listen address {addr:?}"))
    }

    /// Root URL a client should use to reach the API
    pub fn api_root_url(&self) -> String {
        let host = match self.server.host.as_str() {
            "" | "0.0.0.0" | "::" | "[::]" => "localhost",
            host => host,
        };
        format!("http://{}:{}{}", host, self.server.port, self.api.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(text: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default().finalize().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.api.prefix, "/api/cloud/1.1");
        assert_eq!(config.log.level, "info");
        assert_eq!(
            config.api_root_url(),
            "http://localhost:8080/api/cloud/1.1"
        );
    }

    #[test]
    fn test_from_toml_partial() {
        let config = from_toml(
            r#"
            [server]
            port = 9090

            [api]
            prefix = "/custom/"
            "#,
        )
        .finalize()
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.api.prefix, "/custom");
    }

    #[test]
    fn test_overrides_win() {
        let mut config = from_toml("[server]\nport = 9090\n");
        config.apply(Overrides {
            host: Some("127.0.0.1".to_string()),
            port: Some(7000),
            prefix: None,
            log_level: Some("debug".to_string()),
        });
        let config = config.finalize().unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.api.prefix, "/api/cloud/1.1");
        assert_eq!(
            config.listen_addr().unwrap(),
            "127.0.0.1:7000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.api_root_url(), "http://127.0.0.1:7000/api/cloud/1.1");
    }

    #[test]
    fn test_empty_prefix_allowed() {
        let mut config = Config::default();
        config.apply(Overrides {
            prefix: Some("/".to_string()),
            ..Overrides::default()
        });
        assert_eq!(config.finalize().unwrap().api.prefix, "");
    }

    #[test]
    fn test_relative_prefix_rejected() {
        let mut config = Config::default();
        config.apply(Overrides {
            prefix: Some("api/cloud".to_string()),
            ..Overrides::default()
        });
        assert!(config.finalize().is_err());
    }

    #[test]
    fn test_route_syntax_in_prefix_rejected() {
        for prefix in ["/api/:version", "/api/*rest", "/a*b/"] {
            let mut config = Config::default();
            config.apply(Overrides {
                prefix: Some(prefix.to_string()),
                ..Overrides::default()
            });
            let err = config.finalize().unwrap_err();
            assert!(err.to_string().contains("must not contain"), "prefix {prefix}");
        }
    }

    #[test]
    fn test_invalid_host_rejected() {
        let mut config = Config::default();
        config.apply(Overrides {
            host: Some("not a host".to_string()),
            ..Overrides::default()
        });
        assert!(config.listen_addr().is_err());
    }
}
