pub mod flasher;
pub mod platform;

pub use crate::domain::model::{
    FlashCommand, FlashEvent, FlashRequest, FlashResult, OsKind, PortList, ToolchainInfo,
};
pub use crate::domain::ports::{PortEnumerator, ProcessRunner, ToolchainLocator};
pub use crate::utils::error::Result;
