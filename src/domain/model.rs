use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Placeholder entry shown when no serial device could be found.
pub const NO_PORTS_SENTINEL: &str = "No ports found";

/// Exit code reported when the tool never produced one (spawn failure, signal).
pub const FAULT_EXIT_CODE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsKind {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl OsKind {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => OsKind::Linux,
            "macos" => OsKind::MacOs,
            "windows" => OsKind::Windows,
            _ => OsKind::Other,
        }
    }

    pub fn avrdude_executable_name(self) -> &'static str {
        match self {
            OsKind::Windows => "avrdude.exe",
            _ => "avrdude",
        }
    }
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OsKind::Linux => "Linux",
            OsKind::MacOs => "macOS",
            OsKind::Windows => "Windows",
            OsKind::Other => "unsupported OS",
        };
        f.write_str(name)
    }
}

/// Location of the avrdude binary and its configuration file.
///
/// Either both paths are known or neither is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainInfo {
    pub executable: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl ToolchainInfo {
    pub fn new(executable: impl Into<PathBuf>, config: impl Into<PathBuf>) -> Self {
        Self {
            executable: Some(executable.into()),
            config: Some(config.into()),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.executable.is_some() && self.config.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PortList(Vec<String>);

impl PortList {
    /// Sorts and deduplicates `ports`, substituting the sentinel when empty.
    pub fn from_ports(mut ports: Vec<String>) -> Self {
        ports.sort();
        ports.dedup();
        if ports.is_empty() {
            ports.push(NO_PORTS_SENTINEL.to_string());
        }
        Self(ports)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_sentinel(&self) -> bool {
        self.0.len() == 1 && self.0[0] == NO_PORTS_SENTINEL
    }

    pub fn first_selectable(&self) -> Option<&str> {
        self.0
            .iter()
            .map(String::as_str)
            .find(|port| is_selectable_port(port))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a PortList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

pub fn is_selectable_port(port: &str) -> bool {
    !port.trim().is_empty() && port != NO_PORTS_SENTINEL
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashRequest {
    pub hex_file: PathBuf,
    pub port: String,
    pub toolchain: ToolchainInfo,
}

impl FlashRequest {
    pub fn new(hex_file: impl Into<PathBuf>, port: impl Into<String>, toolchain: ToolchainInfo) -> Self {
        Self {
            hex_file: hex_file.into(),
            port: port.into(),
            toolchain,
        }
    }
}

/// Argument vector handed to the process runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl fmt::Display for FlashCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlashResult {
    pub exit_code: i32,
    pub succeeded: bool,
}

impl FlashResult {
    pub fn from_exit_code(exit_code: i32) -> Self {
        Self {
            exit_code,
            succeeded: exit_code == 0,
        }
    }

    pub fn fault() -> Self {
        Self::from_exit_code(FAULT_EXIT_CODE)
    }
}

/// Progress of a running flash, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlashEvent {
    Line(String),
    Done(FlashResult),
}
