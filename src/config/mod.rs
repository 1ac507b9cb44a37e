#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::utils::error::{FlasherError, Result};
use crate::utils::validation::{self, Validate};
use std::path::PathBuf;
use toml_config::TomlConfig;

/// Effective settings after merging the TOML file and command-line overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlasherSettings {
    pub executable: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub search_paths: Vec<PathBuf>,
    pub hex_file: Option<PathBuf>,
    pub port: Option<String>,
    pub log_level: Option<String>,
}

impl FlasherSettings {
    pub fn from_toml(config: &TomlConfig) -> Self {
        let toolchain = config.toolchain.clone().unwrap_or_default();
        let flash = config.flash.clone().unwrap_or_default();

        Self {
            executable: toolchain.executable.map(PathBuf::from),
            config: toolchain.config.map(PathBuf::from),
            search_paths: toolchain
                .search_paths
                .unwrap_or_default()
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            hex_file: flash.hex_file.map(PathBuf::from),
            port: flash.port,
            log_level: config.log_level().map(str::to_string),
        }
    }

    /// Explicit toolchain paths, if configured. Both must be given together.
    pub fn toolchain_override(&self) -> Result<Option<(PathBuf, PathBuf)>> {
        match (&self.executable, &self.config) {
            (Some(executable), Some(config)) => Ok(Some((executable.clone(), config.clone()))),
            (None, None) => Ok(None),
            (Some(executable), None) => Err(FlasherError::InvalidConfigValueError {
                field: "toolchain.config".to_string(),
                value: executable.display().to_string(),
                reason: "an avrdude executable override also needs its config file".to_string(),
            }),
            (None, Some(config)) => Err(FlasherError::InvalidConfigValueError {
                field: "toolchain.executable".to_string(),
                value: config.display().to_string(),
                reason: "an avrdude config override also needs the executable".to_string(),
            }),
        }
    }
}

impl Validate for FlasherSettings {
    fn validate(&self) -> Result<()> {
        self.toolchain_override()?;
        if let Some(port) = &self.port {
            validation::validate_non_empty_string("port", port)?;
        }
        if let Some(level) = &self.log_level {
            validation::validate_log_level("logging.level", level)?;
        }
        Ok(())
    }
}
