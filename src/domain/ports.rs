use crate::domain::model::{FlashCommand, PortList, ToolchainInfo};
use crate::utils::error::Result;

pub trait ToolchainLocator: Send + Sync {
    fn locate(&self) -> ToolchainInfo;
}

pub trait PortEnumerator: Send + Sync {
    fn list_ports(&self) -> PortList;
}

/// Runs an external command to completion on the calling thread.
///
/// Every line of combined stdout/stderr is passed to `on_line` as soon as it
/// is read. Returns the exit code.
pub trait ProcessRunner: Send + Sync + 'static {
    fn run(&self, command: &FlashCommand, on_line: &mut dyn FnMut(String)) -> Result<i32>;
}
