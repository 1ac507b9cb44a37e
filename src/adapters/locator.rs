use crate::domain::model::{OsKind, ToolchainInfo};
use crate::domain::ports::ToolchainLocator;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_AVRDUDE_CONF: &str = "/etc/avrdude.conf";

const ARDUINO_AVRDUDE_PACKAGE: [&str; 4] = ["packages", "arduino", "tools", "avrdude"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchDir {
    /// Package cache holding one subdirectory per installed version, each
    /// with `bin/<exe>` and `etc/avrdude.conf`.
    Versioned(PathBuf),
    /// Directory holding the executable directly; paired with the default config.
    Flat(PathBuf),
}

#[derive(Debug, Clone)]
pub struct SearchPathLocator {
    candidates: Vec<SearchDir>,
    executable_name: String,
    default_config: PathBuf,
    path_fallback: Option<OsString>,
}

impl SearchPathLocator {
    pub fn new(executable_name: impl Into<String>, default_config: impl Into<PathBuf>) -> Self {
        Self {
            candidates: Vec::new(),
            executable_name: executable_name.into(),
            default_config: default_config.into(),
            path_fallback: None,
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<SearchDir>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Searches the entries of `path` (a `PATH`-style list) after all candidates fail.
    pub fn with_path_fallback(mut self, path: Option<OsString>) -> Self {
        self.path_fallback = path;
        self
    }

    /// Inserts extra flat directories after the versioned caches and
    /// before the built-in flat directories.
    pub fn with_extra_flat_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let insert_at = self
            .candidates
            .iter()
            .position(|c| matches!(c, SearchDir::Flat(_)))
            .unwrap_or(self.candidates.len());
        let tail = self.candidates.split_off(insert_at);
        self.candidates
            .extend(dirs.into_iter().map(|d| SearchDir::Flat(d.into())));
        self.candidates.extend(tail);
        self
    }

    pub fn candidates(&self) -> &[SearchDir] {
        &self.candidates
    }

    pub fn linux(home: Option<&Path>) -> Self {
        let mut candidates = Vec::new();
        if let Some(home) = home {
            candidates.push(SearchDir::Versioned(arduino_package_dir(&home.join(".arduino15"))));
        }
        candidates.extend([
            SearchDir::Flat(PathBuf::from("/usr/share/arduino/hardware/tools/avr/bin")),
            SearchDir::Flat(PathBuf::from("/usr/bin")),
            SearchDir::Flat(PathBuf::from("/usr/local/bin")),
        ]);

        Self::new(OsKind::Linux.avrdude_executable_name(), DEFAULT_AVRDUDE_CONF)
            .with_candidates(candidates)
            .with_path_fallback(std::env::var_os("PATH"))
    }

    pub fn macos(home: Option<&Path>) -> Self {
        let mut candidates = Vec::new();
        if let Some(home) = home {
            candidates.push(SearchDir::Versioned(arduino_package_dir(
                &home.join("Library").join("Arduino15"),
            )));
        }
        candidates.extend([
            SearchDir::Flat(PathBuf::from(
                "/Applications/Arduino.app/Contents/Java/hardware/tools/avr/bin",
            )),
            SearchDir::Flat(PathBuf::from("/usr/local/bin")),
            SearchDir::Flat(PathBuf::from("/opt/homebrew/bin")),
        ]);

        Self::new(OsKind::MacOs.avrdude_executable_name(), DEFAULT_AVRDUDE_CONF)
            .with_candidates(candidates)
            .with_path_fallback(std::env::var_os("PATH"))
    }

    /// Only the per-user Arduino15 cache under `%LOCALAPPDATA%` is searched.
    pub fn windows(local_app_data: Option<&Path>) -> Self {
        let candidates = local_app_data
            .map(|dir| vec![SearchDir::Versioned(arduino_package_dir(&dir.join("Arduino15")))])
            .unwrap_or_default();

        Self::new(OsKind::Windows.avrdude_executable_name(), DEFAULT_AVRDUDE_CONF)
            .with_candidates(candidates)
    }

    fn search_candidate(&self, candidate: &SearchDir) -> Option<ToolchainInfo> {
        match candidate {
            SearchDir::Versioned(base) => {
                let latest = latest_version_dir(base)?;
                let version_dir = base.join(&latest);
                let executable = version_dir.join("bin").join(&self.executable_name);
                let config = version_dir.join("etc").join("avrdude.conf");
                tracing::debug!("Checking Arduino package version {} in {}", latest, base.display());
                accept(executable, config)
            }
            SearchDir::Flat(dir) => {
                tracing::debug!("Checking {}", dir.display());
                let executable = dir.join(&self.executable_name);
                if !executable.is_file() {
                    return None;
                }
                self.with_default_config(executable)
            }
        }
    }

    /// Pairs an executable found outside a package cache with the default config.
    fn with_default_config(&self, executable: PathBuf) -> Option<ToolchainInfo> {
        let found = accept(executable.clone(), self.default_config.clone());
        if found.is_none() {
            tracing::warn!(
                "Found {} but {} does not exist",
                executable.display(),
                self.default_config.display()
            );
        }
        found
    }

    fn search_path_var(&self) -> Option<ToolchainInfo> {
        let path = self.path_fallback.as_ref()?;
        let executable = std::env::split_paths(path)
            .map(|dir| dir.join(&self.executable_name))
            .find(|candidate| candidate.is_file())?;

        tracing::debug!("Found {} on PATH", executable.display());
        self.with_default_config(executable)
    }
}

impl ToolchainLocator for SearchPathLocator {
    fn locate(&self) -> ToolchainInfo {
        self.candidates
            .iter()
            .find_map(|candidate| self.search_candidate(candidate))
            .or_else(|| self.search_path_var())
            .unwrap_or_default()
    }
}

/// Locator for platforms with no known avrdude layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLocator;

impl ToolchainLocator for NullLocator {
    fn locate(&self) -> ToolchainInfo {
        ToolchainInfo::default()
    }
}

fn arduino_package_dir(arduino15: &Path) -> PathBuf {
    ARDUINO_AVRDUDE_PACKAGE
        .iter()
        .fold(arduino15.to_path_buf(), |path, part| path.join(part))
}

/// Returns the greatest subdirectory name by plain string comparison.
///
/// This is not version-aware: `1.9` sorts after `1.10`.
pub fn latest_version_dir(base: &Path) -> Option<String> {
    let entries = fs::read_dir(base).ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .max()
}

fn accept(executable: PathBuf, config: PathBuf) -> Option<ToolchainInfo> {
    if executable.is_file() && config.is_file() {
        Some(ToolchainInfo::new(executable, config))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn locate_with_logs(locator: &SearchPathLocator) -> (ToolchainInfo, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let found = tracing::subscriber::with_default(subscriber, || locator.locate());
        (found, logs.contents())
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_latest_version_dir_is_lexicographic() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("1.9")).unwrap();
        fs::create_dir(temp.path().join("1.10")).unwrap();
        assert_eq!(latest_version_dir(temp.path()).as_deref(), Some("1.9"));
    }

    #[test]
    fn test_latest_version_dir_ignores_files() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("6.3.0")).unwrap();
        fs::write(temp.path().join("zz-readme"), b"").unwrap();
        assert_eq!(latest_version_dir(temp.path()).as_deref(), Some("6.3.0"));
    }

    #[test]
    fn test_latest_version_dir_missing_base() {
        let temp = TempDir::new().unwrap();
        assert_eq!(latest_version_dir(&temp.path().join("nope")), None);
    }

    #[test]
    fn test_extra_flat_dirs_go_before_builtin_flat_dirs() {
        let home = PathBuf::from("/home/maker");
        let locator = SearchPathLocator::linux(Some(&home)).with_extra_flat_dirs(["/opt/avr/bin"]);

        assert!(matches!(locator.candidates()[0], SearchDir::Versioned(_)));
        assert_eq!(
            locator.candidates()[1],
            SearchDir::Flat(PathBuf::from("/opt/avr/bin"))
        );
    }

    #[test]
    fn test_flat_dir_requires_config() {
        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("bin");
        touch(&bin.join("avrdude"));

        let locator = SearchPathLocator::new("avrdude", temp.path().join("missing.conf"))
            .with_candidates(vec![SearchDir::Flat(bin)]);
        let (found, logs) = locate_with_logs(&locator);

        assert_eq!(found, ToolchainInfo::default());
        assert!(logs.contains("WARN"));
        assert!(logs.contains("missing.conf does not exist"));
    }

    #[test]
    fn test_empty_flat_dir_is_skipped_quietly() {
        let temp = TempDir::new().unwrap();
        let locator = SearchPathLocator::new("avrdude", temp.path().join("missing.conf"))
            .with_candidates(vec![SearchDir::Flat(temp.path().join("bin"))]);
        let (found, logs) = locate_with_logs(&locator);

        assert_eq!(found, ToolchainInfo::default());
        assert!(!logs.contains("WARN"));
    }
}
