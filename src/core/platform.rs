use crate::adapters::{
    GlobPortEnumerator, NoPortEnumerator, NullLocator, SearchPathLocator, SerialLibraryEnumerator,
};
use crate::config::FlasherSettings;
use crate::domain::model::{OsKind, PortList, ToolchainInfo};
use crate::domain::ports::{PortEnumerator, ToolchainLocator};
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

pub const HEX_FILE_NAME: &str = "ATtiny85.hex";

/// Locator and port strategies for one OS, chosen once at startup.
pub struct Platform {
    os: OsKind,
    locator: Box<dyn ToolchainLocator>,
    ports: Box<dyn PortEnumerator>,
}

impl Platform {
    pub fn new(
        os: OsKind,
        locator: Box<dyn ToolchainLocator>,
        ports: Box<dyn PortEnumerator>,
    ) -> Self {
        Self { os, locator, ports }
    }

    pub fn for_os(os: OsKind) -> Self {
        Self::with_search_paths(os, &[])
    }

    /// Like [`Platform::for_os`], searching `extra_dirs` before the built-in
    /// flat directories.
    pub fn with_search_paths(os: OsKind, extra_dirs: &[PathBuf]) -> Self {
        Self::new(os, locator_for(os, extra_dirs), enumerator_for(os))
    }

    pub fn os(&self) -> OsKind {
        self.os
    }

    pub fn locate_toolchain(&self) -> ToolchainInfo {
        self.locator.locate()
    }

    pub fn list_ports(&self) -> PortList {
        self.ports.list_ports()
    }
}

fn locator_for(os: OsKind, extra_dirs: &[PathBuf]) -> Box<dyn ToolchainLocator> {
    match search_locator(os, extra_dirs) {
        Some(locator) => Box::new(locator),
        None => Box::new(NullLocator),
    }
}

fn search_locator(os: OsKind, extra_dirs: &[PathBuf]) -> Option<SearchPathLocator> {
    let extra = extra_dirs.iter().cloned();
    match os {
        OsKind::Linux => {
            Some(SearchPathLocator::linux(dirs::home_dir().as_deref()).with_extra_flat_dirs(extra))
        }
        OsKind::MacOs => {
            Some(SearchPathLocator::macos(dirs::home_dir().as_deref()).with_extra_flat_dirs(extra))
        }
        OsKind::Windows => {
            // Flat directories pair with /etc/avrdude.conf, which Windows never has.
            if !extra_dirs.is_empty() {
                tracing::warn!(
                    "Ignoring toolchain.search_paths on Windows; set toolchain.executable and toolchain.config instead"
                );
            }
            Some(SearchPathLocator::windows(dirs::data_local_dir().as_deref()))
        }
        OsKind::Other => None,
    }
}

fn enumerator_for(os: OsKind) -> Box<dyn PortEnumerator> {
    match os {
        OsKind::Linux => Box::new(GlobPortEnumerator::linux()),
        OsKind::MacOs => Box::new(GlobPortEnumerator::macos()),
        OsKind::Windows => Box::new(SerialLibraryEnumerator::windows()),
        OsKind::Other => Box::new(NoPortEnumerator),
    }
}

/// Everything resolved at startup that the commands need.
pub struct AppContext {
    pub platform: Platform,
    pub toolchain: ToolchainInfo,
    pub hex_file: PathBuf,
    pub port: Option<String>,
}

impl AppContext {
    /// Resolves the toolchain (override or detection) and the hex image path.
    pub fn new(platform: Platform, settings: &FlasherSettings) -> Result<Self> {
        let toolchain = match settings.toolchain_override()? {
            Some((executable, config)) => {
                tracing::info!("Using configured avrdude: {}", executable.display());
                ToolchainInfo::new(executable, config)
            }
            None => {
                tracing::info!("Detecting avrdude installation on {}...", platform.os());
                let found = platform.locate_toolchain();
                match (&found.executable, &found.config) {
                    (Some(executable), Some(config)) => {
                        tracing::info!("Found avrdude: {}", executable.display());
                        tracing::info!("Config file: {}", config.display());
                    }
                    _ => tracing::warn!("Avrdude not found, please install Arduino IDE or avrdude"),
                }
                found
            }
        };

        let hex_file = settings.hex_file.clone().unwrap_or_else(default_hex_file);

        Ok(Self {
            platform,
            toolchain,
            hex_file,
            port: settings.port.clone(),
        })
    }

    /// The configured port, else the first real port the platform reports.
    pub fn resolve_port(&self) -> Option<String> {
        if let Some(port) = &self.port {
            return Some(port.clone());
        }
        let ports = self.platform.list_ports();
        tracing::info!("Found {} serial port(s)", ports.len());
        ports.first_selectable().map(str::to_string)
    }
}

/// `ATtiny85.hex` next to the running executable.
pub fn default_hex_file() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default()
        .join(HEX_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SearchDir;
    use crate::domain::model::NO_PORTS_SENTINEL;

    struct FixedPorts(Vec<String>);

    impl PortEnumerator for FixedPorts {
        fn list_ports(&self) -> PortList {
            PortList::from_ports(self.0.clone())
        }
    }

    fn platform(ports: Vec<&str>) -> Platform {
        Platform::new(
            OsKind::Linux,
            Box::new(NullLocator),
            Box::new(FixedPorts(ports.into_iter().map(String::from).collect())),
        )
    }

    #[test]
    fn test_other_os_has_no_toolchain_and_sentinel_ports() {
        let platform = Platform::for_os(OsKind::Other);
        assert_eq!(platform.locate_toolchain(), ToolchainInfo::default());
        assert_eq!(platform.list_ports().as_slice(), &[NO_PORTS_SENTINEL.to_string()]);
    }

    #[test]
    fn test_search_paths_are_flat_candidates_on_linux() {
        let extra = [PathBuf::from("/opt/avr/bin")];
        let locator = search_locator(OsKind::Linux, &extra).unwrap();
        assert!(locator
            .candidates()
            .contains(&SearchDir::Flat(PathBuf::from("/opt/avr/bin"))));
    }

    #[test]
    fn test_search_paths_are_ignored_on_windows() {
        let extra = [PathBuf::from(r"C:\avr\bin")];
        let locator = search_locator(OsKind::Windows, &extra).unwrap();
        assert!(locator
            .candidates()
            .iter()
            .all(|candidate| matches!(candidate, SearchDir::Versioned(_))));
        assert!(search_locator(OsKind::Other, &extra).is_none());
    }

    #[test]
    fn test_override_bypasses_detection() {
        let settings = FlasherSettings {
            executable: Some(PathBuf::from("/opt/avrdude")),
            config: Some(PathBuf::from("/opt/avrdude.conf")),
            hex_file: Some(PathBuf::from("/srv/boot.hex")),
            ..Default::default()
        };

        let ctx = AppContext::new(platform(vec![]), &settings).unwrap();
        assert_eq!(ctx.toolchain, ToolchainInfo::new("/opt/avrdude", "/opt/avrdude.conf"));
        assert_eq!(ctx.hex_file, PathBuf::from("/srv/boot.hex"));
    }

    #[test]
    fn test_resolve_port_prefers_configured_port() {
        let settings = FlasherSettings {
            port: Some("COM9".to_string()),
            ..Default::default()
        };
        let ctx = AppContext::new(platform(vec!["COM3"]), &settings).unwrap();
        assert_eq!(ctx.resolve_port().as_deref(), Some("COM9"));
    }

    #[test]
    fn test_resolve_port_picks_first_sorted_port() {
        let ctx = AppContext::new(
            platform(vec!["/dev/ttyUSB0", "/dev/ttyACM1"]),
            &FlasherSettings::default(),
        )
        .unwrap();
        assert_eq!(ctx.resolve_port().as_deref(), Some("/dev/ttyACM1"));
    }

    #[test]
    fn test_resolve_port_none_when_only_sentinel() {
        let ctx = AppContext::new(platform(vec![]), &FlasherSettings::default()).unwrap();
        assert_eq!(ctx.resolve_port(), None);
    }

    #[test]
    fn test_default_hex_file_name() {
        assert!(default_hex_file().ends_with(HEX_FILE_NAME));
    }
}
