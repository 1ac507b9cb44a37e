use crate::domain::model::PortList;
use crate::domain::ports::PortEnumerator;

/// Lists device nodes matching a set of glob patterns.
#[derive(Debug, Clone)]
pub struct GlobPortEnumerator {
    patterns: Vec<String>,
}

impl GlobPortEnumerator {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn linux() -> Self {
        Self::new(["/dev/ttyUSB*", "/dev/ttyACM*"])
    }

    pub fn macos() -> Self {
        Self::new(["/dev/cu.usb*", "/dev/cu.wchusbserial*"])
    }
}

impl PortEnumerator for GlobPortEnumerator {
    fn list_ports(&self) -> PortList {
        let mut ports = Vec::new();
        for pattern in &self.patterns {
            match glob::glob(pattern) {
                Ok(paths) => {
                    ports.extend(
                        paths
                            .filter_map(|entry| entry.ok())
                            .map(|path| path.to_string_lossy().into_owned()),
                    );
                }
                Err(e) => tracing::warn!("Invalid port pattern '{}': {}", pattern, e),
            }
        }
        tracing::debug!("Glob enumeration found {} port(s)", ports.len());
        PortList::from_ports(ports)
    }
}

/// Asks the OS through `serialport`; falls back to a fixed list of names.
#[derive(Debug, Clone)]
pub struct SerialLibraryEnumerator {
    fallback: Vec<String>,
}

impl SerialLibraryEnumerator {
    pub fn new(fallback: Vec<String>) -> Self {
        Self { fallback }
    }

    pub fn windows() -> Self {
        Self::new((1..=20).map(|i| format!("COM{}", i)).collect())
    }

    fn with_fallback(&self, ports: Vec<String>) -> Vec<String> {
        if ports.is_empty() {
            tracing::warn!("No serial ports reported, listing common port names instead");
            self.fallback.clone()
        } else {
            ports
        }
    }
}

impl PortEnumerator for SerialLibraryEnumerator {
    fn list_ports(&self) -> PortList {
        let ports = match serialport::available_ports() {
            Ok(found) => found.into_iter().map(|p| p.port_name).collect(),
            Err(e) => {
                tracing::warn!("Serial port enumeration failed: {}", e);
                Vec::new()
            }
        };
        PortList::from_ports(self.with_fallback(ports))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoPortEnumerator;

impl PortEnumerator for NoPortEnumerator {
    fn list_ports(&self) -> PortList {
        PortList::from_ports(Vec::new())
    }
}
