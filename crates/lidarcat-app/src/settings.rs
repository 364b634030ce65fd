use anyhow::{Context, Result};
use lidarcat_core::{CombineMode, ReportFormat, SerialConfig};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::cli::Cli;

/// Persisted defaults, stored as JSON. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub format: Option<ReportFormat>,
    pub combine: Option<CombineMode>,
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lidarcat").join("settings.json"))
    }

    /// Load from `explicit` if given (must exist), otherwise from the default
    /// location (may be absent).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) => match Self::read(&path) {
                    Err(e) if is_not_found(&e) => Ok(Self::default()),
                    other => other,
                },
                None => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let settings = serde_json::from_str(&text)
            .with_context(|| format!("parsing settings in {}", path.display()))?;
        log::debug!("loaded settings from {}", path.display());
        Ok(settings)
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == ErrorKind::NotFound)
}

/// Effective options after layering CLI flags over settings over defaults.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub serial: SerialConfig,
    pub format: ReportFormat,
    pub combine: CombineMode,
    pub count: Option<u64>,
}

impl RunOptions {
    pub fn resolve(cli: &Cli, settings: &Settings) -> Self {
        let mut serial = SerialConfig::default();
        if let Some(port) = cli.port.clone().or_else(|| settings.port.clone()) {
            serial.port_name = port;
        }
        if let Some(baud) = cli.baud.or(settings.baud_rate) {
            serial.baud_rate = baud;
        }
        Self {
            serial,
            format: cli.format.or(settings.format).unwrap_or_default(),
            combine: cli.combine.or(settings.combine).unwrap_or_default(),
            count: cli.count,
        }
    }
}
