//! Configuration for the inventory collector

use domain_inventory::{AccessToken, AccountContext};
use std::env;
use thiserror::Error;

/// Default Compute Engine REST endpoint
pub const DEFAULT_COMPUTE_API: &str = "https://compute.googleapis.com/compute/v1";

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Application environment
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Helper to load environment variable with a default value
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Helper to load environment variable or return error
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub gcp: GcpConfig,
    /// Pricing snapshot location, a file path or an http(s) URL
    pub pricing_source: String,
}

#[derive(Debug, Clone)]
pub struct GcpConfig {
    pub project_id: String,
    /// Display name stamped on resources; defaults to the project id
    pub account_name: String,
    /// Already-acquired OAuth bearer token
    pub access_token: AccessToken,
    pub compute_api: String,
    /// `maxResults` per aggregated page
    pub page_size: u32,
}

impl GcpConfig {
    pub fn account_context(&self) -> AccountContext {
        AccountContext::new(&self.account_name, &self.project_id, self.access_token.clone())
    }
}

impl FromEnv for GcpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let project_id = env_required("GCP_PROJECT_ID")?;
        let page_size_raw = env_or_default("GCP_PAGE_SIZE", "500");
        let page_size = page_size_raw
            .parse::<u32>()
            .ok()
            .filter(|size| (1..=500).contains(size))
            .ok_or_else(|| ConfigError::ParseError {
                key: "GCP_PAGE_SIZE".to_string(),
                details: format!("expected an integer between 1 and 500, got '{}'", page_size_raw),
            })?;

        Ok(Self {
            account_name: env_or_default("GCP_ACCOUNT_NAME", &project_id),
            project_id,
            access_token: AccessToken::new(env_required("GCP_ACCESS_TOKEN")?),
            compute_api: env_or_default("GCP_COMPUTE_API", DEFAULT_COMPUTE_API)
                .trim_end_matches('/')
                .to_string(),
            page_size,
        })
    }
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            environment: Environment::from_env(),
            gcp: GcpConfig::from_env()?,
            pricing_source: env_required("PRICING_SOURCE")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [(&str, Option<&str>); 3] = [
        ("GCP_PROJECT_ID", Some("demo-project")),
        ("GCP_ACCESS_TOKEN", Some("ya29.token")),
        ("PRICING_SOURCE", Some("/etc/pricing.json")),
    ];

    const OPTIONAL: [&str; 4] = ["GCP_ACCOUNT_NAME", "GCP_COMPUTE_API", "GCP_PAGE_SIZE", "APP_ENV"];

    fn with_required_vars<F: FnOnce()>(extra: &[(&str, Option<&str>)], f: F) {
        let mut vars: Vec<(&str, Option<&str>)> = REQUIRED.to_vec();
        vars.extend(OPTIONAL.iter().map(|key| (*key, None)));
        for (key, value) in extra {
            vars.retain(|(k, _)| k != key);
            vars.push((*key, *value));
        }
        temp_env::with_vars(vars, f);
    }

    #[test]
    fn test_config_defaults() {
        with_required_vars(&[], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.environment, Environment::Development);
            assert_eq!(config.gcp.project_id, "demo-project");
            assert_eq!(config.gcp.account_name, "demo-project");
            assert_eq!(config.gcp.compute_api, DEFAULT_COMPUTE_API);
            assert_eq!(config.gcp.page_size, 500);
            assert_eq!(config.pricing_source, "/etc/pricing.json");
        });
    }

    #[test]
    fn test_config_overrides() {
        with_required_vars(
            &[
                ("GCP_ACCOUNT_NAME", Some("production")),
                ("GCP_COMPUTE_API", Some("http://localhost:8080/compute/v1/")),
                ("GCP_PAGE_SIZE", Some("50")),
                ("APP_ENV", Some("PRODUCTION")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert!(config.environment.is_production());
                assert_eq!(config.gcp.account_name, "production");
                assert_eq!(config.gcp.compute_api, "http://localhost:8080/compute/v1");
                assert_eq!(config.gcp.page_size, 50);

                let account = config.gcp.account_context();
                assert_eq!(account.account, "production");
                assert_eq!(account.project, "demo-project");
                assert_eq!(account.token.secret(), "ya29.token");
            },
        );
    }

    #[test]
    fn test_missing_token_is_reported() {
        with_required_vars(&[("GCP_ACCESS_TOKEN", None)], || {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::MissingEnvVar(ref key) if key == "GCP_ACCESS_TOKEN"
            ));
        });
    }

    #[test]
    fn test_blank_required_var_counts_as_missing() {
        with_required_vars(&[("PRICING_SOURCE", Some("  "))], || {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "PRICING_SOURCE"));
        });
    }

    #[test]
    fn test_invalid_page_size() {
        for bad in ["zero", "0", "1000"] {
            with_required_vars(&[("GCP_PAGE_SIZE", Some(bad))], || {
                let err = Config::from_env().unwrap_err();
                assert!(matches!(
                    err,
                    ConfigError::ParseError { ref key, .. } if key == "GCP_PAGE_SIZE"
                ));
            });
        }
    }

    #[test]
    fn test_environment_unknown_defaults_to_development() {
        temp_env::with_var("APP_ENV", Some("staging"), || {
            assert_eq!(Environment::from_env(), Environment::Development);
        });
    }
}
