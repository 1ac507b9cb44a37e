use attiny_flasher::adapters::{NullLocator, SearchDir, SearchPathLocator};
use attiny_flasher::domain::ports::ToolchainLocator;
use attiny_flasher::ToolchainInfo;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
}

/// Lays out `<base>/<version>/bin/<exe>` and `<base>/<version>/etc/avrdude.conf`.
fn install_version(base: &Path, version: &str, exe: &str) -> (PathBuf, PathBuf) {
    let executable = base.join(version).join("bin").join(exe);
    let config = base.join(version).join("etc").join("avrdude.conf");
    touch(&executable);
    touch(&config);
    (executable, config)
}

fn versioned_locator(base: &Path) -> SearchPathLocator {
    SearchPathLocator::new("avrdude", base.join("no-default.conf"))
        .with_candidates(vec![SearchDir::Versioned(base.to_path_buf())])
}

#[test]
fn test_selects_lexicographically_greatest_version() {
    let temp = TempDir::new().unwrap();
    install_version(temp.path(), "1.0.0", "avrdude");
    let (executable, config) = install_version(temp.path(), "1.0.1", "avrdude");

    let found = versioned_locator(temp.path()).locate();
    assert_eq!(found, ToolchainInfo::new(executable, config));
}

#[test]
fn test_version_selection_is_not_semver_aware() {
    let temp = TempDir::new().unwrap();
    let (executable, config) = install_version(temp.path(), "1.9", "avrdude");
    install_version(temp.path(), "1.10", "avrdude");

    let found = versioned_locator(temp.path()).locate();
    assert_eq!(found, ToolchainInfo::new(executable, config));
}

#[test]
fn test_incomplete_latest_version_is_not_accepted() {
    let temp = TempDir::new().unwrap();
    install_version(temp.path(), "6.3.0", "avrdude");
    // Newest version ships the binary but no config.
    touch(&temp.path().join("7.0.0").join("bin").join("avrdude"));

    let found = versioned_locator(temp.path()).locate();
    assert_eq!(found, ToolchainInfo::default());
    assert!(found.executable.is_none() && found.config.is_none());
}

#[test]
fn test_falls_through_to_next_complete_candidate() {
    let temp = TempDir::new().unwrap();
    let cache = temp.path().join("Arduino15");
    touch(&cache.join("7.0.0").join("bin").join("avrdude"));

    let flat = temp.path().join("usr-bin");
    let default_conf = temp.path().join("avrdude.conf");
    touch(&flat.join("avrdude"));
    touch(&default_conf);

    let locator = SearchPathLocator::new("avrdude", &default_conf).with_candidates(vec![
        SearchDir::Versioned(cache),
        SearchDir::Flat(flat.clone()),
    ]);

    assert_eq!(
        locator.locate(),
        ToolchainInfo::new(flat.join("avrdude"), default_conf)
    );
}

#[test]
fn test_path_fallback_pairs_with_default_config() {
    let temp = TempDir::new().unwrap();
    let bin = temp.path().join("bin");
    let default_conf = temp.path().join("etc").join("avrdude.conf");
    touch(&bin.join("avrdude"));
    touch(&default_conf);

    let path_var = std::env::join_paths([temp.path().join("empty"), bin.clone()]).unwrap();
    let locator =
        SearchPathLocator::new("avrdude", &default_conf).with_path_fallback(Some(path_var));

    assert_eq!(
        locator.locate(),
        ToolchainInfo::new(bin.join("avrdude"), default_conf)
    );
}

#[test]
fn test_path_fallback_without_default_config_is_empty() {
    let temp = TempDir::new().unwrap();
    let bin = temp.path().join("bin");
    touch(&bin.join("avrdude"));

    let path_var = std::env::join_paths([bin]).unwrap();
    let locator = SearchPathLocator::new("avrdude", temp.path().join("missing.conf"))
        .with_path_fallback(Some(path_var));

    assert_eq!(locator.locate(), ToolchainInfo::default());
}

fn avrdude_package(arduino15: &Path) -> PathBuf {
    arduino15
        .join("packages")
        .join("arduino")
        .join("tools")
        .join("avrdude")
}

#[test]
fn test_linux_layout_under_home() {
    let home = TempDir::new().unwrap();
    let cache = avrdude_package(&home.path().join(".arduino15"));
    install_version(&cache, "6.3.0-arduino17", "avrdude");
    let (executable, config) = install_version(&cache, "7.1-arduino.1", "avrdude");

    let found = SearchPathLocator::linux(Some(home.path())).locate();
    assert_eq!(found, ToolchainInfo::new(executable, config));
}

#[test]
fn test_macos_layout_under_home() {
    let home = TempDir::new().unwrap();
    let cache = avrdude_package(&home.path().join("Library").join("Arduino15"));
    let (executable, config) = install_version(&cache, "6.3.0-arduino17", "avrdude");

    let found = SearchPathLocator::macos(Some(home.path())).locate();
    assert_eq!(found, ToolchainInfo::new(executable, config));
}

#[test]
fn test_windows_layout_under_local_app_data() {
    let temp = TempDir::new().unwrap();
    let cache = avrdude_package(&temp.path().join("Arduino15"));
    let (executable, config) = install_version(&cache, "6.3.0-arduino17", "avrdude.exe");

    let found = SearchPathLocator::windows(Some(temp.path())).locate();
    assert_eq!(found, ToolchainInfo::new(executable, config));
}

#[test]
fn test_no_installation_yields_empty_state() {
    let temp = TempDir::new().unwrap();

    assert_eq!(
        SearchPathLocator::windows(Some(temp.path())).locate(),
        ToolchainInfo::default()
    );
    assert_eq!(SearchPathLocator::windows(None).locate(), ToolchainInfo::default());
    assert_eq!(
        versioned_locator(&temp.path().join("missing")).locate(),
        ToolchainInfo::default()
    );
    assert_eq!(NullLocator.locate(), ToolchainInfo::default());
}
