//! Remove pipeline: delete an installed plugin's version directory and
//! drop its manifest record.

use crate::error::{RegistryError, Result};
use crate::lock;
use crate::manifest::PluginManifest;
use std::path::Path;

/// Options controlling a remove call.
#[derive(Debug, Clone, Default)]
pub struct RemoveOptions {
    /// Leave the manifest record in place (useful for a reinstall-in-place flow).
    pub keep_config: bool,
}

/// Remove `name`'s installed version directory and, unless `keep_config`,
/// its manifest record.
pub fn remove(root: &Path, manifest: &PluginManifest, name: &str, options: &RemoveOptions) -> Result<()> {
    let token = lock::acquire(root, name)?;
    let result = remove_locked(root, manifest, name, options);
    token.release();
    result
}

fn remove_locked(root: &Path, manifest: &PluginManifest, name: &str, options: &RemoveOptions) -> Result<()> {
    let record = manifest
        .get(name)?
        .ok_or_else(|| RegistryError::NotInstalled {
            name: name.to_string(),
        })?;

    let version_dir = root.join(name).join(&record.version);
    if version_dir.exists() {
        std::fs::remove_dir_all(&version_dir).map_err(|e| RegistryError::io(&version_dir, e))?;
    }

    let plugin_dir = root.join(name);
    if plugin_dir.exists() {
        match std::fs::read_dir(&plugin_dir) {
            Ok(mut entries) => {
                if entries.next().is_none() {
                    if let Err(e) = std::fs::remove_dir(&plugin_dir) {
                        tracing::warn!(plugin = %name, error = %e, "failed to remove now-empty plugin directory");
                    }
                }
            }
            Err(e) => tracing::warn!(plugin = %name, error = %e, "failed to inspect plugin directory after removal"),
        }
    }

    if !options.keep_config {
        manifest.remove(name)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::InstalledPluginRecord;
    use tempfile::TempDir;

    fn seeded(root: &Path, manifest: &PluginManifest, name: &str, version: &str) {
        std::fs::create_dir_all(root.join(name).join(version)).unwrap();
        manifest
            .add(InstalledPluginRecord {
                name: name.to_string(),
                source_url: "github.com/acme/demo".to_string(),
                version: version.to_string(),
            })
            .unwrap();
    }

    #[test]
    fn remove_deletes_directory_and_record() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let manifest = PluginManifest::at_path(root.join("plugins.toml"));
        seeded(root, &manifest, "demo", "1.0.0");

        remove(root, &manifest, "demo", &RemoveOptions::default()).unwrap();

        assert!(!root.join("demo/1.0.0").exists());
        assert!(!root.join("demo").exists());
        assert!(manifest.get("demo").unwrap().is_none());
    }

    #[test]
    fn remove_missing_plugin_fails() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let manifest = PluginManifest::at_path(root.join("plugins.toml"));
        let err = remove(root, &manifest, "ghost", &RemoveOptions::default()).unwrap_err();
        assert!(matches!(err, RegistryError::NotInstalled { .. }));
    }

    #[test]
    fn keep_config_preserves_manifest_record() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let manifest = PluginManifest::at_path(root.join("plugins.toml"));
        seeded(root, &manifest, "demo", "1.0.0");

        remove(
            root,
            &manifest,
            "demo",
            &RemoveOptions { keep_config: true },
        )
        .unwrap();

        assert!(manifest.get("demo").unwrap().is_some());
    }
}
