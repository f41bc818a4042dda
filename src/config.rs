use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Tracing filter, e.g. "info" or "cardgate=debug,sea_orm=warn".
    pub log_level: String,

    /// SQLite database URL.
    pub database_path: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            database_path: "sqlite:data/cardgate.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret used to sign login tokens. Must be overridden in any real
    /// deployment; `validate` refuses the placeholder.
    pub jwt_secret: String,

    /// Login token lifetime in minutes.
    pub token_expire_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me".to_string(),
            token_expire_minutes: 7 * 24 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB.
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations).
    pub argon2_time_cost: u32,

    /// Argon2 parallelism.
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        for path in Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(&path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        if let Ok(path) = std::env::var("CARDGATE_CONFIG") {
            paths.push(PathBuf::from(path));
        }

        paths.push(PathBuf::from("config.toml"));
        paths.push(PathBuf::from("/etc/cardgate/config.toml"));

        paths
    }

    pub fn create_default_if_missing() -> Result<PathBuf> {
        let path = PathBuf::from("config.toml");
        if !path.exists() {
            Self::default().save_to_path(&path)?;
        }
        Ok(path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("server.port must be non-zero");
        }

        if self.auth.jwt_secret.is_empty() || self.auth.jwt_secret == "change-me" {
            bail!("auth.jwt_secret must be set to a real secret");
        }

        if self.auth.token_expire_minutes < 1 {
            bail!("auth.token_expire_minutes must be at least 1");
        }

        if !self.general.database_path.starts_with("sqlite:") {
            bail!("general.database_path must be a sqlite: URL");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_from_empty_toml() {
        let config: Config = toml::from_str("").expect("empty config should parse");
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.auth.token_expire_minutes, 7 * 24 * 60);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [auth]
            jwt_secret = "s3cret"
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.general.database_path, "sqlite:data/cardgate.db");
    }

    #[test]
    fn validate_rejects_placeholder_secret() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.auth.jwt_secret = "real-secret".to_string();
        assert!(config.validate().is_ok());
    }
}
