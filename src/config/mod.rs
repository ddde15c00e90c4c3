use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::state::DEFAULT_CROP_FRACTION;
use crate::submission::{DEFAULT_FIELD_NAME, DEFAULT_FILE_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "answerlens";
const APP_CONFIG_FILE: &str = "config.json";
const ENDPOINT_ENV: &str = "ANSWERLENS_ENDPOINT";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Application settings from `config.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint_url: Option<String>,
    pub request_timeout_secs: u64,
    pub upload_field_name: String,
    pub upload_file_name: String,
    pub default_crop_percent: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            upload_field_name: DEFAULT_FIELD_NAME.to_string(),
            upload_file_name: DEFAULT_FILE_NAME.to_string(),
            default_crop_percent: (DEFAULT_CROP_FRACTION * 100.0) as u8,
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn default_crop_fraction(&self) -> f64 {
        f64::from(self.default_crop_percent.clamp(1, 100)) / 100.0
    }
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    let mut config = load_app_config_with(xdg_config_home.as_deref(), home.as_deref());
    apply_endpoint_override(&mut config, std::env::var(ENDPOINT_ENV).ok());
    config
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        tracing::debug!(?path, "no config.json; using defaults");
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

fn apply_endpoint_override(config: &mut AppConfig, value: Option<String>) {
    if let Some(endpoint) = value.filter(|value| !value.trim().is_empty()) {
        tracing::debug!(env = ENDPOINT_ENV, "endpoint overridden from environment");
        config.endpoint_url = Some(endpoint.trim().to_string());
    }
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(root: &Path, contents: &str) {
        let dir = root.join(APP_DIR);
        std::fs::create_dir_all(&dir).expect("config dir");
        std::fs::write(dir.join(APP_CONFIG_FILE), contents).expect("config file");
    }

    #[test]
    fn app_config_path_prefers_xdg_config_home() {
        let path = app_config_path(
            "answerlens",
            "config.json",
            Some(Path::new("/tmp/config-root")),
            Some(Path::new("/tmp/home")),
        )
        .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/config-root/answerlens/config.json"));
    }

    #[test]
    fn app_config_path_falls_back_to_home_dot_config() {
        let path = app_config_path("answerlens", "config.json", None, Some(Path::new("/tmp/home")))
            .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/home/.config/answerlens/config.json"));
    }

    #[test]
    fn app_config_path_errors_when_home_missing_and_xdg_unset() {
        let error = app_config_path("answerlens", "config.json", None, None).unwrap_err();
        assert_eq!(error, ConfigPathError::MissingHomeDirectory);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = load_app_config_with(Some(dir.path()), None);

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.upload_field_name, "image");
        assert_eq!(config.upload_file_name, "capture.jpg");
        assert_eq!(config.default_crop_fraction(), 0.8);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_config(
            dir.path(),
            r#"{ "endpoint_url": "https://example.test/hook", "request_timeout_secs": 15 }"#,
        );

        let config = load_app_config_with(Some(dir.path()), None);
        assert_eq!(config.endpoint_url.as_deref(), Some("https://example.test/hook"));
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.upload_field_name, "image");
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_config(dir.path(), "{ not json");

        assert_eq!(load_app_config_with(Some(dir.path()), None), AppConfig::default());
    }

    #[test]
    fn environment_endpoint_overrides_file_value() {
        let mut config = AppConfig {
            endpoint_url: Some("https://file.test".to_string()),
            ..AppConfig::default()
        };

        apply_endpoint_override(&mut config, Some("   ".to_string()));
        assert_eq!(config.endpoint_url.as_deref(), Some("https://file.test"));

        apply_endpoint_override(&mut config, Some(" https://env.test/hook ".to_string()));
        assert_eq!(config.endpoint_url.as_deref(), Some("https://env.test/hook"));
    }

    #[test]
    fn crop_percent_is_clamped_into_valid_fraction() {
        let config = AppConfig {
            default_crop_percent: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.default_crop_fraction(), 0.01);

        let config = AppConfig {
            default_crop_percent: 250,
            ..AppConfig::default()
        };
        assert_eq!(config.default_crop_fraction(), 1.0);
    }
}
