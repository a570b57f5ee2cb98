use std::{env, path::PathBuf, time::Duration};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/state.json";
const DEFAULT_ANALYSIS_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REPORT_DIR: &str = "data/reports";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub data_path: PathBuf,
    pub analysis_base_url: String,
    pub analysis_timeout: Duration,
    pub report_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            analysis_base_url: DEFAULT_ANALYSIS_BASE_URL.to_string(),
            analysis_timeout: Duration::from_secs(DEFAULT_ANALYSIS_TIMEOUT_SECS),
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
        }
    }
}

impl AppConfig {
    /// Reads `PORT`, `APP_DATA_PATH`, `ANALYSIS_BASE_URL`,
    /// `ANALYSIS_TIMEOUT_SECS` and `REPORT_DIR`. A `.env` file is honoured
    /// when present; unparsable numbers fall back to the defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: lookup("PORT")
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(defaults.port),
            data_path: lookup("APP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            analysis_base_url: lookup("ANALYSIS_BASE_URL").unwrap_or(defaults.analysis_base_url),
            analysis_timeout: lookup("ANALYSIS_TIMEOUT_SECS")
                .and_then(|value| value.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.analysis_timeout),
            report_dir: lookup("REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_environment_uses_defaults() {
        assert_eq!(AppConfig::from_lookup(|_| None), AppConfig::default());
    }

    #[test]
    fn values_override_defaults() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PORT", "9090"),
            ("APP_DATA_PATH", "/tmp/moods.json"),
            ("ANALYSIS_BASE_URL", "http://analysis:5000"),
            ("ANALYSIS_TIMEOUT_SECS", "5"),
        ]);
        let config = AppConfig::from_lookup(|key| vars.get(key).map(|value| value.to_string()));
        assert_eq!(config.port, 9090);
        assert_eq!(config.data_path, PathBuf::from("/tmp/moods.json"));
        assert_eq!(config.analysis_base_url, "http://analysis:5000");
        assert_eq!(config.analysis_timeout, Duration::from_secs(5));
        assert_eq!(config.report_dir, PathBuf::from(DEFAULT_REPORT_DIR));
    }

    #[test]
    fn bad_numbers_fall_back() {
        let config = AppConfig::from_lookup(|key| match key {
            "PORT" => Some("not-a-port".to_string()),
            "ANALYSIS_TIMEOUT_SECS" => Some("-1".to_string()),
            _ => None,
        });
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.analysis_timeout, Duration::from_secs(DEFAULT_ANALYSIS_TIMEOUT_SECS));
    }
}
