use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::milestone::FinalMilestoneRule;

/// Main configuration structure for stars-grants
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GrantsConfig {
    /// Public and admin site roots used to build links
    pub site: SiteConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Notification delivery settings
    pub notifications: NotificationConfig,
    /// History ledger text settings
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SiteConfig {
    pub site_url: String,
    pub admin_site_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost:3000".to_string(),
            admin_site_url: "http://localhost:3500".to_string(),
        }
    }
}

impl SiteConfig {
    pub fn public_url(&self, path: &str) -> String {
        format!("{}{}", self.site_url, path)
    }

    pub fn admin_url(&self, path: &str) -> String {
        format!("{}{}", self.admin_site_url, path)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level directive (e.g. "info", "stars_grants=debug")
    pub log_level: String,
    /// Emit JSON log lines instead of the human-readable format
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// Deliver notifications at all (transitions still succeed when off)
    pub enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// How the "final milestone" wording is chosen for payout history
    pub final_milestone_rule: FinalMilestoneRule,
}

impl GrantsConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (stars-grants.toml)
    /// 3. Environment variables (prefixed with STARS_GRANTS, `__` between sections)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("stars-grants.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = Config::try_from(&GrantsConfig::default())
            .context("Failed to serialize default configuration")?;
        let mut builder = Config::builder().add_source(defaults);

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("STARS_GRANTS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;
        let grants_config: GrantsConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(grants_config)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

static CONFIG: std::sync::LazyLock<Result<GrantsConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = GrantsConfig::load_env_file();
        GrantsConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static GrantsConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
