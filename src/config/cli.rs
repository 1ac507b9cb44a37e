use crate::config::toml_config::TomlConfig;
use crate::config::FlasherSettings;
use crate::utils::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "attiny-flasher")]
#[command(about = "Flash the Digispark bootloader to an ATtiny85 using an Arduino as ISP")]
pub struct CliConfig {
    /// Path to an optional TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit diagnostics as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Locate avrdude and the bootloader image
    Detect {
        #[arg(long)]
        json: bool,
    },
    /// List candidate serial ports
    Ports {
        #[arg(long)]
        json: bool,
    },
    /// Write the bootloader and fuses to the ATtiny85
    Flash(FlashArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct FlashArgs {
    /// Serial port of the Arduino running ArduinoISP (defaults to the first one found)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Bootloader image to write
    #[arg(long)]
    pub hex: Option<PathBuf>,

    /// avrdude executable, bypassing detection
    #[arg(long, requires = "avrdude_conf")]
    pub avrdude: Option<PathBuf>,

    /// avrdude configuration file, bypassing detection
    #[arg(long, requires = "avrdude")]
    pub avrdude_conf: Option<PathBuf>,

    /// Validate and print the avrdude command without running it
    #[arg(long)]
    pub dry_run: bool,
}

impl CliConfig {
    pub fn load_toml(&self) -> Result<TomlConfig> {
        match &self.config {
            Some(path) => TomlConfig::from_file(path),
            None => Ok(TomlConfig::default()),
        }
    }

    /// Merges the TOML file (if any) with the command-line flags; flags win.
    pub fn settings(&self, toml: &TomlConfig) -> FlasherSettings {
        let mut settings = FlasherSettings::from_toml(toml);
        if let Command::Flash(args) = &self.command {
            args.apply(&mut settings);
        }
        settings
    }
}

impl FlashArgs {
    pub fn apply(&self, settings: &mut FlasherSettings) {
        if let Some(port) = &self.port {
            settings.port = Some(port.clone());
        }
        if let Some(hex) = &self.hex {
            settings.hex_file = Some(hex.clone());
        }
        if self.avrdude.is_some() || self.avrdude_conf.is_some() {
            settings.executable = self.avrdude.clone();
            settings.config = self.avrdude_conf.clone();
        }
    }
}
