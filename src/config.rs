use std::path::PathBuf;

use crate::authz::Registry;
use crate::errors::{AppError, AppResult};

const DEFAULT_REGISTRY_PATH: &str = "config/registry.json";
const DEFAULT_PORT: u16 = 8000;

/// Where decision events go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionLog {
    /// Structured `tracing` output inline with the request
    Tracing,
    /// Published on the event bus and logged by a background listener
    Broadcast,
    Off,
}

impl DecisionLog {
    fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_lowercase().as_str() {
            "" | "tracing" => Ok(DecisionLog::Tracing),
            "broadcast" => Ok(DecisionLog::Broadcast),
            "off" => Ok(DecisionLog::Off),
            other => Err(AppError::configuration(format!(
                "DECISION_LOG must be one of tracing, broadcast, off (got '{}')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub registry_path: PathBuf,
    pub port: u16,
    pub decision_log: DecisionLog,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let registry_path = lookup("REGISTRY_PATH")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY_PATH));

        let port = lookup("APP_PORT")
            .map(|value| value.parse::<u16>())
            .unwrap_or(Ok(DEFAULT_PORT))
            .map_err(|_| AppError::configuration("APP_PORT must be a valid port number"))?;

        let decision_log = DecisionLog::parse(&lookup("DECISION_LOG").unwrap_or_default())?;

        Ok(Self {
            registry_path,
            port,
            decision_log,
        })
    }

    /// Load and validate the registry at `registry_path`.
    pub fn load_registry(&self) -> AppResult<Registry> {
        Ok(Registry::load(&self.registry_path)?)
    }
}
