use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

/// Runtime configuration for the capture client.
///
/// Read from an optional JSON file; a malformed file falls back to the
/// defaults rather than aborting the station. The recognition endpoint can
/// additionally be overridden with `ATTENDANCE_ENDPOINT`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the recognition service, without trailing slash.
    pub endpoint: String,
    /// Identifies this capture station in recognition requests.
    pub station_id: String,
    pub camera_index: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Seconds between recognition attempts.
    pub tick_interval_secs: u64,
    /// Upper bound on a single recognition request.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080".into(),
            station_id: "station-1".into(),
            camera_index: 0,
            frame_width: 640,
            frame_height: 480,
            tick_interval_secs: 3,
            request_timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            Self::default()
        };

        if let Ok(endpoint) = std::env::var("ATTENDANCE_ENDPOINT") {
            if !endpoint.is_empty() {
                config.endpoint = endpoint;
            }
        }

        Ok(config)
    }

    pub fn default_path() -> &'static str {
        "attendance-capture.json"
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("attendance-capture-{}-{}", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Path::new("/definitely/not/here.json")).unwrap();
        assert_eq!(config.tick_interval_secs, 3);
        assert_eq!(config.camera_index, 0);
    }

    #[test]
    fn partial_file_keeps_defaults_for_omitted_fields() {
        let path = scratch_file("partial");
        fs::write(&path, r#"{"endpoint":"http://hr.example.net","tick_interval_secs":5}"#).unwrap();
        let config = Config::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.endpoint, "http://hr.example.net");
        assert_eq!(config.tick_interval_secs, 5);
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = scratch_file("malformed");
        fs::write(&path, "not json at all").unwrap();
        let config = Config::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.endpoint, Config::default().endpoint);
    }

    #[test]
    fn intervals_never_collapse_to_zero() {
        let config = Config {
            tick_interval_secs: 0,
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }
}
