//! The narrow slice of user configuration the registry owns: the persisted
//! list of installed plugins, written on install and removed on uninstall.
//!
//! Everything else in the application's configuration belongs to `core`;
//! this facade only ever touches `plugins.toml`.

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const MANIFEST_FILE_NAME: &str = "plugins.toml";
const CONFIG_DIR_NAME: &str = "costforge";

/// One installed-plugin record as persisted to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPluginRecord {
    pub name: String,
    pub source_url: String,
    pub version: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    #[serde(default)]
    plugins: HashMap<String, InstalledPluginRecord>,
}

/// Reads and writes the installed-plugins manifest at a given path.
pub struct PluginManifest {
    path: PathBuf,
}

impl PluginManifest {
    /// Open the manifest at the default location (`~/.config/costforge/plugins.toml`).
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir()
            .map(|d| d.join(CONFIG_DIR_NAME))
            .ok_or_else(|| {
                RegistryError::io(
                    PathBuf::from(CONFIG_DIR_NAME),
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "could not determine config directory",
                    ),
                )
            })?;
        Ok(Self::at_path(dir.join(MANIFEST_FILE_NAME)))
    }

    /// Open (or create on first write) the manifest at an explicit path.
    /// Intended for tests and for overriding the config root.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Manifest> {
        if !self.path.exists() {
            return Ok(Manifest::default());
        }
        let text = std::fs::read_to_string(&self.path).map_err(|e| RegistryError::io(&self.path, e))?;
        toml::from_str(&text).map_err(|e| {
            RegistryError::io(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    fn save(&self, manifest: &Manifest) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RegistryError::io(parent, e))?;
        }
        let text = toml::to_string_pretty(manifest).map_err(|e| {
            RegistryError::io(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        // Write-then-rename keeps a reader from ever observing a half-written file.
        let tmp_path = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, text).map_err(|e| RegistryError::io(&tmp_path, e))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| RegistryError::io(&self.path, e))
    }

    /// Fetch the record for `name`, if installed.
    pub fn get(&self, name: &str) -> Result<Option<InstalledPluginRecord>> {
        Ok(self.load()?.plugins.get(name).cloned())
    }

    /// Add or overwrite the record for a plugin.
    pub fn add(&self, record: InstalledPluginRecord) -> Result<()> {
        let mut manifest = self.load()?;
        manifest.plugins.insert(record.name.clone(), record);
        self.save(&manifest)
    }

    /// Update only the version field of an existing record.
    pub fn update_version(&self, name: &str, version: &str) -> Result<()> {
        let mut manifest = self.load()?;
        if let Some(record) = manifest.plugins.get_mut(name) {
            record.version = version.to_string();
        }
        self.save(&manifest)
    }

    /// Remove the record for a plugin, if present.
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut manifest = self.load()?;
        manifest.plugins.remove(name);
        self.save(&manifest)
    }

    /// The path this manifest reads from and writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manifest_in(dir: &TempDir) -> PluginManifest {
        PluginManifest::at_path(dir.path().join("plugins.toml"))
    }

    #[test]
    fn missing_manifest_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let m = manifest_in(&dir);
        assert!(m.get("demo").unwrap().is_none());
    }

    #[test]
    fn add_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let m = manifest_in(&dir);
        m.add(InstalledPluginRecord {
            name: "demo".to_string(),
            source_url: "github.com/acme/demo".to_string(),
            version: "1.0.0".to_string(),
        })
        .unwrap();

        let fetched = m.get("demo").unwrap().unwrap();
        assert_eq!(fetched.version, "1.0.0");
    }

    #[test]
    fn update_version_changes_only_version() {
        let dir = TempDir::new().unwrap();
        let m = manifest_in(&dir);
        m.add(InstalledPluginRecord {
            name: "demo".to_string(),
            source_url: "github.com/acme/demo".to_string(),
            version: "1.0.0".to_string(),
        })
        .unwrap();
        m.update_version("demo", "2.0.0").unwrap();

        let fetched = m.get("demo").unwrap().unwrap();
        assert_eq!(fetched.version, "2.0.0");
        assert_eq!(fetched.source_url, "github.com/acme/demo");
    }

    #[test]
    fn remove_deletes_record() {
        let dir = TempDir::new().unwrap();
        let m = manifest_in(&dir);
        m.add(InstalledPluginRecord {
            name: "demo".to_string(),
            source_url: "github.com/acme/demo".to_string(),
            version: "1.0.0".to_string(),
        })
        .unwrap();
        m.remove("demo").unwrap();
        assert!(m.get("demo").unwrap().is_none());
    }
}
