//! Install pipeline: resolve a specifier to a release, download the
//! matching platform asset, extract it, and record it as installed.

use crate::archive::{extract_archive, validate_binary};
use crate::catalog::{self, AssetHints};
use crate::error::{RegistryError, Result};
use crate::lock;
use crate::manifest::{InstalledPluginRecord, PluginManifest};
use crate::release::{ReleaseClient, ReleaseDescriptor};
use crate::specifier::{self, PluginSpecifier};
use std::path::{Path, PathBuf};

/// Options controlling a single install call.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Overwrite an existing install of the same name/version.
    pub force: bool,
    /// Skip writing an installed-plugin record to the manifest.
    pub no_save: bool,
}

/// The result of a successful install.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
    pub from_url: bool,
}

struct ResolvedSource {
    owner: String,
    repo: String,
    hints: Option<AssetHints>,
}

fn resolve_source(spec: &PluginSpecifier) -> Result<ResolvedSource> {
    if spec.is_url {
        return Ok(ResolvedSource {
            owner: spec.owner.clone().unwrap_or_default(),
            repo: spec.repo.clone().unwrap_or_default(),
            hints: None,
        });
    }

    let entry = catalog::get(&spec.name)?;
    catalog::validate_entry(entry)?;
    let (owner, repo) = entry
        .repository
        .split_once('/')
        .ok_or_else(|| RegistryError::InvalidCatalogEntry {
            name: entry.name.clone(),
            reason: format!("repository '{}' must match owner/repo", entry.repository),
        })?;
    Ok(ResolvedSource {
        owner: owner.to_string(),
        repo: repo.to_string(),
        hints: entry.asset_hints.clone(),
    })
}

/// Run the install pipeline for `input` (a specifier string).
pub async fn install(
    root: &Path,
    manifest: &PluginManifest,
    client: &ReleaseClient,
    input: &str,
    options: &InstallOptions,
) -> Result<InstallOutcome> {
    let spec = specifier::parse(input)?;
    let token = lock::acquire(root, &spec.name)?;
    let result = install_locked(root, manifest, client, &spec, options).await;
    token.release();
    result
}

pub(crate) async fn install_locked(
    root: &Path,
    manifest: &PluginManifest,
    client: &ReleaseClient,
    spec: &PluginSpecifier,
    options: &InstallOptions,
) -> Result<InstallOutcome> {
    let source = resolve_source(spec)?;
    let tag = if spec.version.is_empty() {
        None
    } else {
        Some(spec.version.as_str())
    };
    let release: ReleaseDescriptor = client.fetch_release(&source.owner, &source.repo, tag).await?;

    let install_dir = root.join(&spec.name).join(&release.tag);
    if install_dir.exists() && !options.force {
        return Err(RegistryError::AlreadyInstalled {
            name: spec.name.clone(),
            version: release.tag.clone(),
        });
    }

    let asset = crate::release::select_asset(&release, &spec.name, source.hints.as_ref())?;

    let tmp_dir = tempfile::tempdir().map_err(|e| RegistryError::io(root, e))?;
    let ext = if asset.name.ends_with(".zip") { "zip" } else { "tar.gz" };
    let archive_path = tmp_dir.path().join(format!("download.{ext}"));
    client.download(asset, &archive_path, None).await?;

    std::fs::create_dir_all(&install_dir).map_err(|e| RegistryError::io(&install_dir, e))?;
    if let Err(e) = extract_archive(&archive_path, &install_dir) {
        let _ = std::fs::remove_dir_all(&install_dir);
        return Err(e);
    }

    let binary_path = match find_binary(&install_dir, &spec.name) {
        Some(path) => path,
        None => {
            let _ = std::fs::remove_dir_all(&install_dir);
            return Err(RegistryError::BinaryNotFound {
                name: spec.name.clone(),
                dir: install_dir,
            });
        }
    };

    if let Err(e) = validate_binary(&binary_path) {
        let _ = std::fs::remove_dir_all(&install_dir);
        return Err(e);
    }

    if !options.no_save {
        let source_url = format!("github.com/{}/{}", source.owner, source.repo);
        if let Err(e) = manifest.add(InstalledPluginRecord {
            name: spec.name.clone(),
            source_url,
            version: release.tag.clone(),
        }) {
            tracing::warn!(plugin = %spec.name, error = %e, "failed to record installed plugin");
        }
    }

    Ok(InstallOutcome {
        name: spec.name.clone(),
        version: release.tag,
        path: binary_path,
        from_url: spec.is_url,
    })
}

/// Find the executable inside a freshly extracted install directory,
/// searching any nesting depth the archive's layout might have introduced.
fn find_binary(install_dir: &Path, name: &str) -> Option<PathBuf> {
    fn walk(dir: &Path, name: &str) -> Option<PathBuf> {
        let entries = std::fs::read_dir(dir).ok()?;
        let mut subdirs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                subdirs.push(path);
                continue;
            }
            let filename = path.file_name()?.to_str()?;
            let candidates = [
                name.to_string(),
                format!("{name}.exe"),
                format!("costforge-plugin-{name}"),
                format!("costforge-plugin-{name}.exe"),
            ];
            if candidates.iter().any(|c| c == filename) && crate::archive::validate_binary(&path).is_ok() {
                return Some(path);
            }
        }
        for sub in subdirs {
            if let Some(found) = walk(&sub, name) {
                return Some(found);
            }
        }
        None
    }
    fn first_executable(dir: &Path) -> Option<PathBuf> {
        let entries = std::fs::read_dir(dir).ok()?;
        let mut subdirs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                subdirs.push(path);
            } else if crate::archive::validate_binary(&path).is_ok() {
                return Some(path);
            }
        }
        subdirs.into_iter().find_map(|sub| first_executable(&sub))
    }

    walk(install_dir, name).or_else(|| first_executable(install_dir))
}

/// Remove every installed version of `name` except `keep_version`.
///
/// Returns the versions that were removed and the total bytes freed. A
/// missing plugin directory is not an error; it simply frees nothing.
pub fn remove_other_versions(root: &Path, name: &str, keep_version: &str) -> Result<(Vec<String>, u64)> {
    let plugin_dir = root.join(name);
    if !plugin_dir.exists() {
        return Ok((Vec::new(), 0));
    }

    let mut removed = Vec::new();
    let mut freed = 0u64;

    for entry in std::fs::read_dir(&plugin_dir).map_err(|e| RegistryError::io(&plugin_dir, e))? {
        let entry = entry.map_err(|e| RegistryError::io(&plugin_dir, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(version) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if version == keep_version {
            continue;
        }
        freed += dir_size(&path);
        if std::fs::remove_dir_all(&path).is_ok() {
            removed.push(version.to_string());
        }
    }

    Ok((removed, freed))
}

fn dir_size(path: &Path) -> u64 {
    let mut total = 0u64;
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            let p = entry.path();
            if p.is_dir() {
                total += dir_size(&p);
            } else if let Ok(meta) = entry.metadata() {
                total += meta.len();
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn remove_other_versions_keeps_requested_one() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for v in ["1.0.0", "1.1.0", "2.0.0"] {
            std::fs::create_dir_all(root.join("demo").join(v)).unwrap();
            std::fs::write(root.join("demo").join(v).join("f"), b"x").unwrap();
        }
        let (removed, freed) = remove_other_versions(root, "demo", "2.0.0").unwrap();
        assert_eq!(removed.len(), 2);
        assert!(freed > 0);
        assert!(root.join("demo/2.0.0").exists());
        assert!(!root.join("demo/1.0.0").exists());
        assert!(!root.join("demo/1.1.0").exists());
    }

    #[test]
    fn remove_other_versions_missing_plugin_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let (removed, freed) = remove_other_versions(dir.path(), "ghost", "1.0.0").unwrap();
        assert!(removed.is_empty());
        assert_eq!(freed, 0);
    }
}
