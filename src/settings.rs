use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CaixaError, Result};

pub const DB_FILE: &str = "caixa.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_rows() -> usize {
    10_000
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            max_file_bytes: default_max_file_bytes(),
            max_rows: default_max_rows(),
            log_level: default_log_level(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("caixa")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("caixa")
}

/// Settings from `~/.config/caixa/settings.json`, defaults for anything
/// missing. A corrupt file is an error rather than silently reset.
pub fn load_settings() -> Result<Settings> {
    let path = settings_path();
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(&path)?;
    parse_settings(&content)
}

fn parse_settings(content: &str) -> Result<Settings> {
    let settings: Settings = serde_json::from_str(content)
        .map_err(|e| CaixaError::Settings(format!("{}: {e}", settings_path().display())))?;
    if settings.max_rows == 0 || settings.max_file_bytes == 0 {
        return Err(CaixaError::Settings(
            "max_rows and max_file_bytes must be greater than zero".to_string(),
        ));
    }
    Ok(settings)
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| CaixaError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

impl Settings {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join(DB_FILE)
    }
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(s.max_rows, 10_000);
        assert_eq!(s.log_level, "warn");
        assert!(s.data_dir.ends_with("caixa"));
        assert!(s.db_path().ends_with("caixa.db"));
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let s = parse_settings(r#"{"data_dir": "/tmp/caixa-test", "max_rows": 50}"#).unwrap();
        assert_eq!(s.data_dir, "/tmp/caixa-test");
        assert_eq!(s.max_rows, 50);
        assert_eq!(s.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(s.log_level, "warn");
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(matches!(parse_settings("{not json"), Err(CaixaError::Settings(_))));
        assert!(matches!(
            parse_settings(r#"{"data_dir": "/tmp/x", "max_rows": 0}"#),
            Err(CaixaError::Settings(_))
        ));
    }

    #[test]
    fn test_roundtrip_through_json() {
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            max_file_bytes: 1024,
            max_rows: 10,
            log_level: "debug".to_string(),
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        let loaded = parse_settings(&json).unwrap();
        assert_eq!(loaded.max_file_bytes, 1024);
        assert_eq!(loaded.log_level, "debug");
    }
}
