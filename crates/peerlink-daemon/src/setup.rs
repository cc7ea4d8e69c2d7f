//! Config loading and default paths.

use std::path::PathBuf;

use tracing::info;

use crate::config::Config;
use crate::error::LinkError;

/// Load configuration from the given path, or the default location.
pub fn load_config(path: Option<&str>) -> Result<Config, LinkError> {
    let config_path = match path {
        Some(p) => PathBuf::from(p),
        None => default_config_path(),
    };

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| LinkError::Config(format!("failed to read config: {e}")))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| LinkError::Config(format!("failed to parse config: {e}")))?;
        info!(path = %config_path.display(), "loaded config");
        Ok(config)
    } else if path.is_some() {
        Err(LinkError::Config(format!(
            "config file {} does not exist",
            config_path.display()
        )))
    } else {
        info!("no config file found, using defaults");
        Ok(Config::default())
    }
}

/// Get the default config directory path.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("peerlink")
}

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = load_config(Some("/nonexistent/peerlink/config.toml")).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn explicit_path_is_parsed() {
        let path = std::env::temp_dir().join(format!("peerlink-test-{}.toml", std::process::id()));
        std::fs::write(&path, "[link]\nport = 9123\n").unwrap();
        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.link.port, 9123);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn default_path_ends_in_config_toml() {
        assert!(default_config_path().ends_with("peerlink/config.toml"));
    }
}
