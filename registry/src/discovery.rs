//! Filesystem discovery of installed plugins.
//!
//! The plugin tree has the shape `<root>/<name>/<version>/<binary>`. This
//! module only reads; mutation is the job of [`crate::install`],
//! [`crate::update`], and [`crate::remove`].

use crate::version;
use std::fs;
use std::path::{Path, PathBuf};

/// A single discovered plugin: its name, version, and resolved binary path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub binary_path: PathBuf,
}

fn preferred_names(name: &str, legacy_plugin_names: bool) -> Vec<String> {
    let mut names = vec![
        name.to_string(),
        format!("{name}.exe"),
        format!("costforge-plugin-{name}"),
        format!("costforge-plugin-{name}.exe"),
    ];
    if legacy_plugin_names {
        names.push(format!("cost-plugin-{name}"));
        names.push(format!("cost-plugin-{name}.exe"));
    }
    names
}

fn is_executable(path: &Path) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    if cfg!(target_os = "windows") {
        path.extension()
            .map(|ext| ext.eq_ignore_ascii_case("exe"))
            .unwrap_or(false)
    } else {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            meta.permissions().mode() & 0o111 != 0
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}

/// Resolve the binary inside a `<root>/<name>/<version>` directory.
fn resolve_binary(version_dir: &Path, name: &str, legacy_plugin_names: bool) -> Option<PathBuf> {
    for candidate in preferred_names(name, legacy_plugin_names) {
        let path = version_dir.join(&candidate);
        if is_executable(&path) {
            return Some(path);
        }
    }

    let entries = fs::read_dir(version_dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if is_executable(&path) {
            return Some(path);
        }
    }
    None
}

/// Discover every installed `(name, version, binary)` triple under `root`.
///
/// A missing root returns an empty list, not an error. Non-directory
/// top-level entries and version directories with no resolvable binary are
/// silently skipped. Set `legacy_plugin_names` (from
/// [`RegistryConfig::legacy_plugin_names`](crate)) to also match the
/// deprecated `cost-plugin-<name>` binary naming scheme.
pub fn list_all(root: &Path, legacy_plugin_names: bool) -> Vec<PluginInfo> {
    let Ok(plugin_dirs) = fs::read_dir(root) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for plugin_entry in plugin_dirs.flatten() {
        let plugin_path = plugin_entry.path();
        if !plugin_path.is_dir() {
            continue;
        }
        let Some(name) = plugin_path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let Ok(version_dirs) = fs::read_dir(&plugin_path) else {
            continue;
        };
        for version_entry in version_dirs.flatten() {
            let version_path = version_entry.path();
            if !version_path.is_dir() {
                continue;
            }
            let Some(raw_version) = version_path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(binary_path) = resolve_binary(&version_path, name, legacy_plugin_names) {
                found.push(PluginInfo {
                    name: name.to_string(),
                    version: raw_version.to_string(),
                    binary_path,
                });
            }
        }
    }
    found
}

/// Select the latest version of each discovered plugin.
///
/// Returns the selected plugins alongside human-readable warnings for any
/// version directory whose name failed to parse as semver.
pub fn list_latest(root: &Path, legacy_plugin_names: bool) -> (Vec<PluginInfo>, Vec<String>) {
    let all = list_all(root, legacy_plugin_names);

    let mut by_name: std::collections::BTreeMap<&str, Vec<&PluginInfo>> =
        std::collections::BTreeMap::new();
    for info in &all {
        by_name.entry(info.name.as_str()).or_default().push(info);
    }

    let mut selected = Vec::new();
    let mut warnings = Vec::new();

    for (name, infos) in by_name {
        let versions: Vec<&str> = infos.iter().map(|i| i.version.as_str()).collect();
        let (best, skipped) = version::pick_latest(versions);
        for bad in skipped {
            warnings.push(format!("plugin '{name}' has unparseable version directory '{bad}'"));
        }
        if let Some(best_version) = best {
            if let Some(info) = infos.iter().find(|i| i.version == best_version) {
                selected.push((*info).clone());
            }
        }
    }

    (selected, warnings)
}

/// Find the latest installed version of a single named plugin.
pub fn get_latest(root: &Path, name: &str, legacy_plugin_names: bool) -> Option<PluginInfo> {
    let (latest, _warnings) = list_latest(root, legacy_plugin_names);
    latest.into_iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_plugin(root: &Path, name: &str, version: &str) {
        let dir = root.join(name).join(version);
        fs::create_dir_all(&dir).unwrap();
        let bin = dir.join(name);
        fs::write(&bin, b"#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    #[test]
    fn empty_tree_returns_empty() {
        let dir = TempDir::new().unwrap();
        let (latest, warnings) = list_latest(dir.path(), false);
        assert!(latest.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn missing_root_returns_empty() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let (latest, warnings) = list_latest(&missing, false);
        assert!(latest.is_empty());
        assert!(warnings.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn single_version_discovered() {
        let dir = TempDir::new().unwrap();
        make_plugin(dir.path(), "demo", "1.0.0");
        let (latest, _) = list_latest(dir.path(), false);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].name, "demo");
        assert_eq!(latest[0].version, "1.0.0");
    }

    #[cfg(unix)]
    #[test]
    fn picks_highest_of_multiple_versions() {
        let dir = TempDir::new().unwrap();
        for v in ["1.0.0", "1.1.0", "2.0.0"] {
            make_plugin(dir.path(), "demo", v);
        }
        let (latest, _) = list_latest(dir.path(), false);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].version, "2.0.0");
    }

    #[cfg(unix)]
    #[test]
    fn stable_beats_prerelease() {
        let dir = TempDir::new().unwrap();
        make_plugin(dir.path(), "p", "1.0.0-alpha");
        make_plugin(dir.path(), "p", "1.0.0");
        let (latest, _) = list_latest(dir.path(), false);
        assert_eq!(latest[0].version, "1.0.0");
    }

    #[cfg(unix)]
    #[test]
    fn invalid_version_dir_warns_but_does_not_fail() {
        let dir = TempDir::new().unwrap();
        make_plugin(dir.path(), "p", "not-a-version");
        make_plugin(dir.path(), "p", "1.0.0");
        let (latest, warnings) = list_latest(dir.path(), false);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].version, "1.0.0");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains('p'));
        assert!(warnings[0].contains("not-a-version"));
    }

    #[test]
    fn non_directory_top_level_entry_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("corrupt"), b"oops").unwrap();
        let (latest, warnings) = list_latest(dir.path(), false);
        assert!(latest.is_empty());
        assert!(warnings.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn version_dir_without_binary_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("demo/1.0.0")).unwrap();
        let all = list_all(dir.path(), false);
        assert!(all.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn get_latest_finds_named_plugin() {
        let dir = TempDir::new().unwrap();
        make_plugin(dir.path(), "demo", "1.0.0");
        make_plugin(dir.path(), "other", "1.0.0");
        let found = get_latest(dir.path(), "demo", false).unwrap();
        assert_eq!(found.name, "demo");
        assert!(get_latest(dir.path(), "missing", false).is_none());
    }

    #[test]
    fn legacy_flag_adds_deprecated_candidate_names() {
        assert!(!preferred_names("demo", false).contains(&"cost-plugin-demo".to_string()));
        assert!(preferred_names("demo", true).contains(&"cost-plugin-demo".to_string()));
        assert!(preferred_names("demo", true).contains(&"cost-plugin-demo.exe".to_string()));
    }
}
