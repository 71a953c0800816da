use std::path::Path;

use tracing::{info, warn};

use crate::error::AppError;

const DEFAULT_DATABASE_URL: &str = "sqlite://gym-tracker.db?mode=rwc";
const DEFAULT_SESSION_TTL_HOURS: i64 = 12;

pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}

/// Process settings that Rocket's own figment does not cover.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub session_ttl_hours: i64,
    pub deployment_environment: String,
    pub otlp_endpoint: Option<String>,
    pub otlp_headers: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = non_empty_var("DATABASE_URL")
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let session_ttl_hours = match non_empty_var("SESSION_TTL_HOURS") {
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                AppError::Validation(format!("SESSION_TTL_HOURS must be an integer, got {}", raw))
            })?,
            None => DEFAULT_SESSION_TTL_HOURS,
        };

        if session_ttl_hours <= 0 {
            return Err(AppError::Validation(
                "SESSION_TTL_HOURS must be positive".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            session_ttl_hours,
            deployment_environment: non_empty_var("DEPLOYMENT_ENVIRONMENT")
                .unwrap_or_else(|| "develop".to_string()),
            otlp_endpoint: non_empty_var("OTEL_EXPORTER_OTLP_ENDPOINT"),
            otlp_headers: non_empty_var("OTEL_EXPORTER_OTLP_HEADERS"),
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            deployment_environment: "develop".to_string(),
            otlp_endpoint: None,
            otlp_headers: None,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    dotenvy::var(key).ok().filter(|value| !value.trim().is_empty())
}
