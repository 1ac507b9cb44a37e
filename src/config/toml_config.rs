use crate::utils::error::{FlasherError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub toolchain: Option<ToolchainSection>,
    pub flash: Option<FlashSection>,
    pub logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolchainSection {
    pub executable: Option<String>,
    pub config: Option<String>,
    pub search_paths: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlashSection {
    pub hex_file: Option<String>,
    pub port: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    pub level: Option<String>,
}

impl TomlConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FlasherError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from a TOML string, then expands `${VAR}` in its string values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).map_err(|e| FlasherError::ConfigParseError {
                message: format!("TOML parsing error: {}", e),
            })?;

        config.substitute_env_vars()?;
        Ok(config)
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(&mut self) -> Result<()> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| FlasherError::ConfigParseError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let expand = |value: &mut String| {
            let expanded = re.replace_all(value.as_str(), |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            });
            *value = expanded.into_owned();
        };

        if let Some(toolchain) = &mut self.toolchain {
            toolchain
                .executable
                .iter_mut()
                .chain(toolchain.config.iter_mut())
                .chain(toolchain.search_paths.iter_mut().flatten())
                .for_each(expand);
        }
        if let Some(flash) = &mut self.flash {
            flash
                .hex_file
                .iter_mut()
                .chain(flash.port.iter_mut())
                .for_each(expand);
        }
        if let Some(logging) = &mut self.logging {
            logging.level.iter_mut().for_each(expand);
        }

        Ok(())
    }

    pub fn validate_config(&self) -> Result<()> {
        if let Some(toolchain) = &self.toolchain {
            if let Some(executable) = &toolchain.executable {
                validation::validate_path("toolchain.executable", executable)?;
            }
            if let Some(config) = &toolchain.config {
                validation::validate_path("toolchain.config", config)?;
            }
            for dir in toolchain.search_paths.iter().flatten() {
                validation::validate_path("toolchain.search_paths", dir)?;
            }
        }

        if let Some(flash) = &self.flash {
            if let Some(hex_file) = &flash.hex_file {
                validation::validate_path("flash.hex_file", hex_file)?;
            }
            if let Some(port) = &flash.port {
                validation::validate_non_empty_string("flash.port", port)?;
            }
        }

        if let Some(level) = self.log_level() {
            validation::validate_log_level("logging.level", level)?;
        }

        Ok(())
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
