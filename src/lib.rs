pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;
pub use config::FlasherSettings;

pub use adapters::SystemProcessRunner;
pub use core::flasher::{build_command, preflight, validate, FlashSession, Flasher, PreflightError};
pub use core::platform::{AppContext, Platform};
pub use domain::model::{
    FlashCommand, FlashEvent, FlashRequest, FlashResult, OsKind, PortList, ToolchainInfo,
    NO_PORTS_SENTINEL,
};
pub use utils::error::{FlasherError, Result};
