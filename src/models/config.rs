// src/models/config.rs

//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Course portal endpoints and HTTP behavior
    #[serde(default)]
    pub portal: PortalConfig,

    /// Selectors used to read course pages
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Polling cadence and per-step bounds
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Outbound notification settings
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Optional description enrichment
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.portal.user_agent.trim().is_empty() {
            return Err(AppError::validation("portal.user_agent is empty"));
        }
        if self.portal.timeout_secs == 0 {
            return Err(AppError::validation("portal.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.portal.course_list_url)?;
        if !self.portal.course_page_url.contains("{id}") {
            return Err(AppError::validation(
                "portal.course_page_url must contain an {id} placeholder",
            ));
        }
        if self.monitor.interval_secs == 0 {
            return Err(AppError::validation("monitor.interval_secs must be > 0"));
        }
        if self.monitor.step_timeout_secs == 0 {
            return Err(AppError::validation(
                "monitor.step_timeout_secs must be > 0",
            ));
        }
        if self.monitor.max_concurrent == 0 {
            return Err(AppError::validation("monitor.max_concurrent must be > 0"));
        }
        for selector in [
            &self.extract.description_selector,
            &self.extract.file_selector,
            &self.extract.file_name_selector,
            &self.extract.file_link_selector,
            &self.extract.page_marker_selector,
        ] {
            scraper::Selector::parse(selector)
                .map_err(|e| AppError::selector(selector.as_str(), format!("{e:?}")))?;
        }
        if self.notifications.enabled && self.notifications.endpoint.trim().is_empty() {
            return Err(AppError::validation(
                "notifications.endpoint is required when notifications are enabled",
            ));
        }
        if self.enrichment.enabled {
            if self.enrichment.endpoint.trim().is_empty() {
                return Err(AppError::validation(
                    "enrichment.endpoint is required when enrichment is enabled",
                ));
            }
            if self.enrichment.model.trim().is_empty() {
                return Err(AppError::validation("enrichment.model is empty"));
            }
        }
        Ok(())
    }
}

/// Course portal endpoints and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Page listing every course of the current user
    #[serde(default = "defaults::course_list_url")]
    pub course_list_url: String,

    /// Course page template (`{id}`, `{season}`, `{code}`)
    #[serde(default = "defaults::course_page_url")]
    pub course_page_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Environment variable holding the portal username
    #[serde(default = "defaults::username_env")]
    pub username_env: String,

    /// Environment variable holding the portal password
    #[serde(default = "defaults::password_env")]
    pub password_env: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            course_list_url: defaults::course_list_url(),
            course_page_url: defaults::course_page_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            username_env: defaults::username_env(),
            password_env: defaults::password_env(),
        }
    }
}

/// CSS selectors for course page extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(default = "defaults::description_selector")]
    pub description_selector: String,

    /// One match per listed file
    #[serde(default = "defaults::file_selector")]
    pub file_selector: String,

    /// File name element, relative to a file match
    #[serde(default = "defaults::file_name_selector")]
    pub file_name_selector: String,

    /// Download link element, relative to a file match
    #[serde(default = "defaults::file_link_selector")]
    pub file_link_selector: String,

    /// A real course page matches this; anything else is an extraction failure
    #[serde(default = "defaults::page_marker_selector")]
    pub page_marker_selector: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            description_selector: defaults::description_selector(),
            file_selector: defaults::file_selector(),
            file_name_selector: defaults::file_name_selector(),
            file_link_selector: defaults::file_link_selector(),
            page_marker_selector: defaults::page_marker_selector(),
        }
    }
}

/// Sweep cadence and cycle bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Wait between the end of one sweep and the start of the next
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,

    /// Bound on each fetch, enrich and deliver call
    #[serde(default = "defaults::step_timeout")]
    pub step_timeout_secs: u64,

    /// Courses processed concurrently within a sweep
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
            step_timeout_secs: defaults::step_timeout(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Push notification endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// When false, notifications are only logged (and still count as delivered)
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub endpoint: String,

    /// Environment variable holding the bearer token
    #[serde(default = "defaults::notifications_key_env")]
    pub api_key_env: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            endpoint: String::new(),
            api_key_env: defaults::notifications_key_env(),
        }
    }
}

/// Chat-completion enrichment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "defaults::enrichment_endpoint")]
    pub endpoint: String,

    #[serde(default = "defaults::enrichment_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "defaults::enrichment_key_env")]
    pub api_key_env: String,

    #[serde(default = "defaults::max_tokens")]
    pub max_tokens: u32,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: defaults::enrichment_endpoint(),
            model: defaults::enrichment_model(),
            api_key_env: defaults::enrichment_key_env(),
            max_tokens: defaults::max_tokens(),
        }
    }
}

mod defaults {
    // Portal defaults
    pub fn course_list_url() -> String {
        "https://cms.guc.edu.eg/apps/student/ViewAllCourseStn".into()
    }
    pub fn course_page_url() -> String {
        "https://cms.guc.edu.eg/apps/student/CourseViewStn.aspx?id={id}&sid={season}".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn username_env() -> String {
        "GUC_USERNAME".into()
    }
    pub fn password_env() -> String {
        "GUC_PASSWORD".into()
    }

    // Extraction defaults
    pub fn description_selector() -> String {
        "#ContentPlaceHolderright_ContentPlaceHoldercontent_desc".into()
    }
    pub fn file_selector() -> String {
        ".weeksdata .card-body > div:nth-child(1)".into()
    }
    pub fn file_name_selector() -> String {
        "strong".into()
    }
    pub fn file_link_selector() -> String {
        "a[href]".into()
    }
    pub fn page_marker_selector() -> String {
        ".weeksdata, #ContentPlaceHolderright_ContentPlaceHoldercontent_desc".into()
    }

    // Monitor defaults
    pub fn interval() -> u64 {
        3600
    }
    pub fn step_timeout() -> u64 {
        60
    }
    pub fn max_concurrent() -> usize {
        1
    }

    // Notification defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn notifications_key_env() -> String {
        "NOTIFICATIONS_API_KEY".into()
    }

    // Enrichment defaults
    pub fn enrichment_endpoint() -> String {
        "https://api.openai.com/v1/chat/completions".into()
    }
    pub fn enrichment_model() -> String {
        "gpt-3.5-turbo".into()
    }
    pub fn enrichment_key_env() -> String {
        "OPENAI_API_KEY".into()
    }
    pub fn max_tokens() -> u32 {
        200
    }
}
