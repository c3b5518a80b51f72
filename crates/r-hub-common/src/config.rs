//! ---
//! hub_section: "01-core-functionality"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Configuration model and loader for portal, hub and provisioning settings."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use strum::{AsRefStr, Display, EnumString};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

fn default_portal_url() -> String {
    "https://www.arcgis.com".to_owned()
}

fn default_token_env() -> String {
    "R_HUB_TOKEN".to_owned()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_on_failure() -> FailurePolicy {
    FailurePolicy::Leave
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("target/provisioning")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the hub client and its tooling.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "R_HUB_CONFIG";

    /// Load configuration from disk, respecting the `R_HUB_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Fill in values derived from other settings. The hub environment is
    /// inferred from the portal URL exactly once, here.
    fn resolve(mut self) -> Self {
        if self.hub.environment.is_none() {
            self.hub.environment = Some(HubEnvironment::infer(&self.portal.url));
        }
        self
    }

    /// Effective hub environment.
    pub fn environment(&self) -> HubEnvironment {
        self.hub
            .environment
            .unwrap_or_else(|| HubEnvironment::infer(&self.portal.url))
    }

    /// Parsed portal URL.
    pub fn portal_url(&self) -> Result<Url> {
        Url::parse(&self.portal.url)
            .with_context(|| format!("portal url '{}' is not a valid url", self.portal.url))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        let url = self.portal_url()?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(anyhow!(
                "portal url must use http or https, found '{}'",
                url.scheme()
            ));
        }
        if self.portal.token_env.trim().is_empty() {
            return Err(anyhow!("portal.token_env must name an environment variable"));
        }
        if self.portal.timeout.is_zero() {
            return Err(anyhow!("portal.timeout must be greater than zero"));
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config.resolve())
    }
}

/// Connection settings for the owning portal.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default = "default_portal_url")]
    pub url: String,
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default)]
    pub referer: Option<String>,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_request_timeout")]
    pub timeout: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: default_portal_url(),
            token_env: default_token_env(),
            referer: None,
            timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HubConfig {
    #[serde(default)]
    pub environment: Option<HubEnvironment>,
    /// Overrides the tier reported by the portal subscription.
    #[serde(default)]
    pub tier: Option<HubTier>,
}

/// Hub deployment tier. Each maps to one fixed host.
#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default, Display, EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HubEnvironment {
    Dev,
    Qa,
    #[default]
    Prod,
}

impl HubEnvironment {
    /// Derive the environment from a portal URL.
    pub fn infer(portal_url: &str) -> Self {
        if portal_url.contains("devext") {
            HubEnvironment::Dev
        } else if portal_url.contains("qaext") {
            HubEnvironment::Qa
        } else {
            HubEnvironment::Prod
        }
    }

    pub fn host(&self) -> &'static str {
        match self {
            HubEnvironment::Dev => "hubdev.arcgis.com",
            HubEnvironment::Qa => "hubqa.arcgis.com",
            HubEnvironment::Prod => "hub.arcgis.com",
        }
    }
}

/// Licensing tier of the organisation's hub.
#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HubTier {
    Premium,
    #[default]
    Basic,
}

impl HubTier {
    pub fn is_premium(&self) -> bool {
        matches!(self, HubTier::Premium)
    }
}

/// What the initiative workflow does with resources created before a failed step.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FailurePolicy {
    /// Keep everything created so far; the caller may resume or roll back later.
    #[default]
    Leave,
    /// Delete everything created so far before reporting the failure.
    Compensate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    #[serde(default = "default_on_failure")]
    pub on_failure: FailurePolicy,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            on_failure: default_on_failure(),
            state_dir: default_state_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
