use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::timezone::{parse_timezone, DEFAULT_TIMEZONE};

#[derive(Debug, Clone)]
pub struct Config {
    // Input tables, ingested once at startup
    pub store_status_csv: PathBuf,
    pub menu_hours_csv: PathBuf,
    pub timezones_csv: PathBuf,

    // Generated report artifacts land here
    pub report_output_dir: PathBuf,

    // Zone for stores without a timezone row
    pub default_timezone: String,

    // Request surface port
    pub http_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env if present, ignore if missing
        Self::from_getter(|key| env::var(key).ok())
    }

    /// Parse config from a custom getter function (for testing)
    pub fn from_getter<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str, default: &str| {
            PathBuf::from(get(key).filter(|s| !s.trim().is_empty()).unwrap_or_else(|| default.to_string()))
        };

        Ok(Config {
            store_status_csv: path("STORE_STATUS_CSV", "store_status.csv"),
            menu_hours_csv: path("MENU_HOURS_CSV", "menu_hours.csv"),
            timezones_csv: path("TIMEZONES_CSV", "timezones.csv"),
            report_output_dir: path("REPORT_OUTPUT_DIR", "reports"),

            default_timezone: get("DEFAULT_TIMEZONE")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),

            http_port: get("HTTP_PORT")
                .unwrap_or_else(|| "8000".to_string())
                .parse()
                .context("HTTP_PORT must be a valid port number")?,
        })
    }

    /// Create config from a HashMap (convenience for testing)
    pub fn from_map(map: &HashMap<&str, &str>) -> Result<Self> {
        Self::from_getter(|key| map.get(key).map(|v| v.to_string()))
    }

    /// Validate configuration values at startup.
    /// Returns Ok(()) if all validations pass, or Err with details of what failed.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        for (key, path) in [
            ("STORE_STATUS_CSV", &self.store_status_csv),
            ("MENU_HOURS_CSV", &self.menu_hours_csv),
            ("TIMEZONES_CSV", &self.timezones_csv),
        ] {
            if !Path::new(path).is_file() {
                errors.push(format!("{} '{}' not found.", key, path.display()));
            }
        }

        if parse_timezone(&self.default_timezone).is_err() {
            errors.push(format!(
                "DEFAULT_TIMEZONE '{}' is not a known IANA timezone.",
                self.default_timezone
            ));
        }

        if self.report_output_dir.is_file() {
            errors.push(format!(
                "REPORT_OUTPUT_DIR '{}' is a file, not a directory.",
                self.report_output_dir.display()
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )
        }
    }
}
