//! TOML configuration for costanomaly.
//!
//! Sources, in order: an explicit path (`--config` or `COSTANOMALY_CONFIG`),
//! `/etc/costanomaly/costanomaly.toml`, compiled-in defaults.
//! Secrets can be supplied through the environment instead of the file.

use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const CLIENT_SECRET_ENV: &str = "COSTANOMALY_CLIENT_SECRET";
pub const SCORING_KEY_ENV: &str = "COSTANOMALY_SCORING_KEY";
const SYSTEM_CONFIG_PATH: &str = "/etc/costanomaly/costanomaly.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub azure: AzureConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve the configuration file and apply environment overrides.
    ///
    /// An explicit `path` must load. The system location falls through to
    /// defaults when unreadable.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::load_or_default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_or_default() -> Self {
        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var(CLIENT_SECRET_ENV) {
            self.azure.client_secret = secret;
        }
        if let Ok(key) = std::env::var(SCORING_KEY_ENV) {
            self.scoring.key = key;
        }
    }

    /// Reject settings a run cannot start with.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("azure.tenant_id", &self.azure.tenant_id),
            ("azure.subscription_id", &self.azure.subscription_id),
            ("azure.client_id", &self.azure.client_id),
            ("azure.client_secret", &self.azure.client_secret),
            ("scoring.endpoint", &self.scoring.endpoint),
            ("scoring.key", &self.scoring.key),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            bail!("missing required settings: {}", missing.join(", "));
        }

        let threshold = self.detection.cost_alert_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            bail!(
                "detection.cost_alert_threshold must be a non-negative number, got {}",
                threshold
            );
        }
        if self.detection.sensitivity > 100 {
            bail!(
                "detection.sensitivity must be within 0-100, got {}",
                self.detection.sensitivity
            );
        }
        cron::Schedule::from_str(&self.schedule.cron).map_err(|e| {
            anyhow::anyhow!("invalid schedule.cron '{}': {}", self.schedule.cron, e)
        })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Lookback period, e.g. `"3 months"`, `"90 days"`, `"1 year"`.
    pub period: String,
    /// Days before today (UTC) of the day being checked.
    pub days_back: i64,
    /// Latest-day costs at or below this amount never raise an alert.
    pub cost_alert_threshold: f64,
    /// Report drops in cost in addition to spikes.
    pub report_drops: bool,
    /// Scoring sensitivity, 0-100.
    pub sensitivity: u8,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            period: "3 months".to_string(),
            days_back: 1,
            cost_alert_threshold: 0.5,
            report_drops: false,
            sensitivity: crate::scoring::DEFAULT_SENSITIVITY,
        }
    }
}

// ---------------------------------------------------------------------------
// Azure
// ---------------------------------------------------------------------------

/// Subscription and app registration used for billing queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    pub tenant_id: String,
    pub subscription_id: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub management_endpoint: String,
    pub login_endpoint: String,
    pub api_version: String,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            subscription_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            management_endpoint: "https://management.azure.com".to_string(),
            login_endpoint: "https://login.microsoftonline.com".to_string(),
            api_version: "2019-11-01".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Anomaly Detector resource endpoint.
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub key: String,
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Six-field cron expression (with seconds), evaluated in UTC.
    pub cron: String,
    /// Run once immediately when the daemon starts.
    pub run_on_startup: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: "0 0 17-23 * * *".to_string(),
            run_on_startup: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Status API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub listen_address: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_address: "127.0.0.1:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level, overridden by `RUST_LOG`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> AppConfig {
        toml::from_str(
            r#"
[azure]
tenant_id = "tenant"
subscription_id = "sub"
client_id = "client"
client_secret = "secret"

[scoring]
endpoint = "https://ad.example.com"
key = "key"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.detection.period, "3 months");
        assert_eq!(cfg.detection.days_back, 1);
        assert_eq!(cfg.detection.sensitivity, 65);
        assert!(!cfg.detection.report_drops);
        assert_eq!(cfg.azure.management_endpoint, "https://management.azure.com");
        assert_eq!(cfg.azure.api_version, "2019-11-01");
        assert_eq!(cfg.schedule.cron, "0 0 17-23 * * *");
        assert!(!cfg.schedule.run_on_startup);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_parse_example_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
[detection]
period = "90 days"
days_back = 2
cost_alert_threshold = 25.0
report_drops = true

[azure]
tenant_id = "t"
subscription_id = "s"

[schedule]
cron = "0 30 6 * * *"
run_on_startup = true

[api]
enabled = false

[logging]
level = "debug"
json = true
"#,
        )
        .unwrap();

        assert_eq!(cfg.detection.period, "90 days");
        assert_eq!(cfg.detection.days_back, 2);
        assert_eq!(cfg.detection.cost_alert_threshold, 25.0);
        assert!(cfg.detection.report_drops);
        assert_eq!(cfg.detection.sensitivity, 65);
        assert_eq!(cfg.azure.tenant_id, "t");
        assert_eq!(cfg.azure.login_endpoint, "https://login.microsoftonline.com");
        assert_eq!(cfg.schedule.cron, "0 30 6 * * *");
        assert!(cfg.schedule.run_on_startup);
        assert!(!cfg.api.enabled);
        assert!(cfg.logging.json);
    }

    #[test]
    fn test_validate_complete_config() {
        complete().validate().unwrap();
    }

    #[test]
    fn test_validate_reports_missing_settings() {
        let err = AppConfig::default().validate().unwrap_err().to_string();
        assert!(err.contains("azure.tenant_id"));
        assert!(err.contains("scoring.key"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = complete();
        cfg.detection.cost_alert_threshold = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = complete();
        cfg.detection.sensitivity = 101;
        assert!(cfg.validate().is_err());

        let mut cfg = complete();
        cfg.schedule.cron = "every day".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_secrets_not_serialized() {
        let out = toml::to_string_pretty(&complete()).unwrap();
        assert!(!out.contains("secret"));
        assert!(!out.contains("key = "));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("costanomaly.toml");
        std::fs::write(&path, "[detection]\nperiod = \"2 weeks\"\n").unwrap();

        let cfg = AppConfig::load(&path).unwrap();
        assert_eq!(cfg.detection.period, "2 weeks");
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(AppConfig::resolve(Some(Path::new("/nonexistent/costanomaly.toml"))).is_err());
    }
}
