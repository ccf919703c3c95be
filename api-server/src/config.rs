//! Environment-driven configuration

use std::path::PathBuf;
use std::time::Duration;

use todo_core::import::DEFAULT_IMPORT_URL;

pub const ENV_DATA_DIR: &str = "TODO_DATA_DIR";
pub const ENV_IMPORT_ENABLED: &str = "TODO_IMPORT_ENABLED";
pub const ENV_IMPORT_URL: &str = "TODO_IMPORT_URL";
pub const ENV_IMPORT_TIMEOUT_SECS: &str = "TODO_IMPORT_TIMEOUT_SECS";
pub const ENV_HTTP_PORT: &str = "TODO_HTTP_PORT";

const DEFAULT_DATA_DIR: &str = ".todo-data";
const DEFAULT_IMPORT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HTTP_PORT: u16 = 8081;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub import_enabled: bool,
    pub import_url: String,
    pub import_timeout: Duration,
    pub http_port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config reading values through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let import_url = lookup(ENV_IMPORT_URL)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .unwrap_or_else(|| DEFAULT_IMPORT_URL.to_string());

        Self {
            data_dir: lookup(ENV_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            import_enabled: flag(lookup(ENV_IMPORT_ENABLED), true),
            import_url,
            import_timeout: Duration::from_secs(number(
                ENV_IMPORT_TIMEOUT_SECS,
                lookup(ENV_IMPORT_TIMEOUT_SECS),
                DEFAULT_IMPORT_TIMEOUT_SECS,
            )),
            http_port: number(ENV_HTTP_PORT, lookup(ENV_HTTP_PORT), DEFAULT_HTTP_PORT),
        }
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir.join("tasks.json")
    }
}

fn flag(raw: Option<String>, default: bool) -> bool {
    match raw {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        None => default,
    }
}

fn number<T: std::str::FromStr + Copy + std::fmt::Display>(
    name: &str,
    raw: Option<String>,
    default: T,
) -> T {
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {}", name, raw, default);
            default
        }),
        None => default,
    }
}
