use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

const DEFAULT_CONFIG: &str = include_str!("default.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub display: DisplayConfig,
    pub io: IoConfig,
}

impl AppConfig {
    /// Loads the configuration from the embedded defaults merged with
    /// `SKIFF__`-prefixed environment variables
    /// (e.g. `SKIFF__DISPLAY__TRUNCATE=40`).
    pub fn load() -> CommonResult<Self> {
        Figment::from(Toml::string(DEFAULT_CONFIG))
            .admerge(Env::prefixed("SKIFF__").map(|p| p.as_str().replace("__", ".").into()))
            .extract()
            .map_err(|e| CommonError::InvalidArgument(e.to_string()))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            display: DisplayConfig {
                truncate: 20,
                default_show_rows: 20,
            },
            io: IoConfig {
                schema_infer_max_records: 1000,
                write_part_digits: 5,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayConfig {
    /// Maximum rendered width of a cell before truncation.
    pub truncate: usize,
    /// Number of rows shown when no explicit row count is given.
    pub default_show_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IoConfig {
    /// Upper bound on the number of records sampled for schema inference.
    pub schema_infer_max_records: usize,
    /// Zero-padding width of the numeric suffix in output part file names.
    pub write_part_digits: usize,
}
