// src/config.rs

//! Runtime secret resolution.
//!
//! Credentials never live in `config.toml`; the config only names the
//! environment variables that hold them.

use crate::error::{AppError, Result};
use crate::models::Config;

/// Portal login.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Secrets resolved for one run.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// Portal login, if both variables are set
    pub portal: Option<Credentials>,

    /// Bearer token for the notification endpoint
    pub notifications_api_key: Option<String>,

    /// API key for the enrichment endpoint
    pub enrichment_api_key: Option<String>,
}

impl Secrets {
    /// Resolve secrets from the process environment.
    pub fn from_env(config: &Config) -> Result<Self> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve secrets through `lookup`, failing on secrets required by
    /// enabled features.
    pub fn resolve(config: &Config, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let portal = match (
            get(&config.portal.username_env),
            get(&config.portal.password_env),
        ) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (None, None) => {
                log::warn!(
                    "{} / {} not set, requesting the portal without credentials",
                    config.portal.username_env,
                    config.portal.password_env
                );
                None
            }
            _ => {
                return Err(AppError::config(format!(
                    "{} and {} must be set together",
                    config.portal.username_env, config.portal.password_env
                )));
            }
        };

        let notifications_api_key = get(&config.notifications.api_key_env);
        if config.notifications.enabled && notifications_api_key.is_none() {
            return Err(AppError::config(format!(
                "Environment variable {} must be set when notifications are enabled",
                config.notifications.api_key_env
            )));
        }

        let enrichment_api_key = get(&config.enrichment.api_key_env);
        if config.enrichment.enabled && enrichment_api_key.is_none() {
            return Err(AppError::config(format!(
                "Environment variable {} must be set when enrichment is enabled",
                config.enrichment.api_key_env
            )));
        }

        Ok(Self {
            portal,
            notifications_api_key,
            enrichment_api_key,
        })
    }
}
