use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable that overrides `auth.secret_key`.
pub const SECRET_KEY_ENV: &str = "CONFAB_SECRET_KEY";

#[derive(Debug, Deserialize)]
pub struct ConfabConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Explicit database file; defaults to `data_dir/confab.sqlite`.
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub agents: AgentsConfig,
}

impl Default for ConfabConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database: None,
            server: ServerConfig::default(),
            auth: AuthSettings::default(),
            agents: AgentsConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: i64,
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            cookie_name: default_cookie_name(),
            token_ttl_minutes: default_token_ttl(),
            secure_cookies: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AgentsConfig {
    /// Agent for new sessions when the caller names none.
    #[serde(default = "default_agent")]
    pub default: String,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            default: default_agent(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_secret_key() -> String {
    "secret".to_string()
}
fn default_cookie_name() -> String {
    "access-token".to_string()
}
fn default_token_ttl() -> i64 {
    30_000
}
fn default_agent() -> String {
    "echo".to_string()
}

impl ConfabConfig {
    /// Read `path`, falling back to defaults when the file does not exist,
    /// then apply environment overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
            })?;
            Self::parse(&raw)?
        } else {
            warn!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(SECRET_KEY_ENV).filter(|s| !s.is_empty()) {
            self.auth.secret_key = secret;
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir.join("confab.sqlite"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ConfabConfig::parse("").unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.cookie_name, "access-token");
        assert_eq!(config.auth.token_ttl_minutes, 30_000);
        assert_eq!(config.agents.default, "echo");
        assert_eq!(config.database_path(), PathBuf::from("./data/confab.sqlite"));
    }

    #[test]
    fn test_partial_sections() {
        let config = ConfabConfig::parse(
            r#"
            data_dir = "/var/lib/confab"

            [server]
            port = 9100

            [auth]
            secret_key = "s3cr3t"
            secure_cookies = true
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.auth.secret_key, "s3cr3t");
        assert!(config.auth.secure_cookies);
        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/lib/confab/confab.sqlite")
        );
    }

    #[test]
    fn test_explicit_database() {
        let config = ConfabConfig::parse(r#"database = "chat.db""#).unwrap();
        assert_eq!(config.database_path(), PathBuf::from("chat.db"));
    }

    #[test]
    fn test_env_overrides_secret() {
        let mut config = ConfabConfig::default();
        config.apply_env(|key| (key == SECRET_KEY_ENV).then(|| "from-env".to_string()));
        assert_eq!(config.auth.secret_key, "from-env");

        config.apply_env(|_| Some(String::new()));
        assert_eq!(config.auth.secret_key, "from-env");
    }

    #[test]
    fn test_missing_file_falls_back() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ConfabConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("confab.toml");
        std::fs::write(&path, "[server\nport = 1").unwrap();
        assert!(ConfabConfig::load(&path).is_err());
    }
}
