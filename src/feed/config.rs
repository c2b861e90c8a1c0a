// src/feed/config.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

const ENV_PATH: &str = "QUAKE_FEEDS_CONFIG_PATH";

/// Endpoints and tuning for the feed daemon. Supports TOML or JSON files;
/// missing fields fall back to the built-in defaults.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub usgs_url: String,
    pub emsc_url: String,
    pub min_magnitude: f64,
    pub limit: u32,
    pub store_path: PathBuf,
    pub refresh_interval_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            usgs_url: "https://earthquake.usgs.gov/fdsnws/event/1/query".to_string(),
            emsc_url: "https://www.seismicportal.eu/fdsnws/event/1/query".to_string(),
            min_magnitude: 3.0,
            limit: 500,
            store_path: PathBuf::from("widget_state.json"),
            refresh_interval_secs: 30 * 60,
        }
    }
}

impl FeedConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Load from an explicit path. Format is hinted by the extension but both
    /// parsers are tried.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feed config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_config(&content, ext.as_str())
    }

    /// Load using env var + fallbacks:
    /// 1) $QUAKE_FEEDS_CONFIG_PATH
    /// 2) config/feeds.toml
    /// 3) config/feeds.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("QUAKE_FEEDS_CONFIG_PATH points to non-existent path"));
        }
        let toml_p = PathBuf::from("config/feeds.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/feeds.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<FeedConfig> {
    if hint_ext == "json" {
        if let Ok(v) = serde_json::from_str(s) {
            return Ok(v);
        }
        if let Ok(v) = toml::from_str(s) {
            return Ok(v);
        }
    } else {
        if let Ok(v) = toml::from_str(s) {
            return Ok(v);
        }
        if let Ok(v) = serde_json::from_str(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported feed config format"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn partial_toml_keeps_defaults_for_the_rest() {
        let cfg = parse_config(r#"min_magnitude = 4.5"#, "toml").unwrap();
        assert_eq!(cfg.min_magnitude, 4.5);
        assert_eq!(cfg.limit, 500);
        assert!(cfg.usgs_url.contains("earthquake.usgs.gov"));
    }

    #[test]
    fn json_form_parses_too() {
        let cfg = parse_config(r#"{"limit": 100, "refresh_interval_secs": 600}"#, "json").unwrap();
        assert_eq!(cfg.limit, 100);
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(600));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_config("][ not a config", "toml").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD in a temp dir so a real config/ in the repo does not
        // interfere.
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_PATH);

        // No files in the temp CWD: built-in defaults.
        let cfg = FeedConfig::load_default().unwrap();
        assert_eq!(cfg, FeedConfig::default());

        // Env var takes precedence.
        let p_json = tmp.path().join("feeds.json");
        fs::write(&p_json, r#"{"min_magnitude": 2.5}"#).unwrap();
        env::set_var(ENV_PATH, p_json.display().to_string());
        let cfg2 = FeedConfig::load_default().unwrap();
        assert_eq!(cfg2.min_magnitude, 2.5);
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
