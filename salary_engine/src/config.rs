//! Runtime configuration.
//!
//! Settings come from the environment, optionally seeded from a
//! `.env` file.  Organisation-wide payroll switches live in
//! [`OrganizationSettings`] and are handed explicitly to whatever
//! needs them.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_WORKING_DAYS: f64 = 26.0;

/// Organisation-wide payroll settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationSettings {
    /// Working days assumed when a request carries no attendance.
    pub default_working_days: f64,
    /// Withhold tax on generated payslips.
    pub enable_tax_management: bool,
    /// Flat tax rate in percent, used when tax management is on.
    pub tax_rate: f64,
}

impl Default for OrganizationSettings {
    fn default() -> Self {
        Self {
            default_working_days: DEFAULT_WORKING_DAYS,
            enable_tax_management: false,
            tax_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub log_level: String,
    /// JSON file used to seed the component catalog at start-up.
    pub catalog_file: Option<PathBuf>,
    pub settings: OrganizationSettings,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative number, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be true or false, got '{value}'")]
    InvalidFlag { var: &'static str, value: String },
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let bind_addr =
            env::var("SALARY_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let log_level =
            env::var("SALARY_LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
        let catalog_file = env::var("SALARY_CATALOG_FILE")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let settings = OrganizationSettings {
            default_working_days: number_var("SALARY_DEFAULT_WORKING_DAYS", DEFAULT_WORKING_DAYS)?,
            enable_tax_management: flag_var("SALARY_ENABLE_TAX", false)?,
            tax_rate: number_var("SALARY_TAX_RATE", 0.0)?,
        };

        Ok(Self {
            bind_addr,
            log_level,
            catalog_file,
            settings,
        })
    }
}

fn number_var(var: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(var) {
        Err(_) => Ok(default),
        Ok(value) => value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite() && *number >= 0.0)
            .ok_or(ConfigError::InvalidNumber { var, value }),
    }
}

fn flag_var(var: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(var) {
        Err(_) => Ok(default),
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { var, value }),
        },
    }
}
