//! Update pipeline: compare the installed version against the latest
//! release and reinstall only when newer.

use crate::catalog;
use crate::error::{RegistryError, Result};
use crate::install::{self, InstallOptions};
use crate::lock;
use crate::manifest::PluginManifest;
use crate::release::ReleaseClient;
use crate::specifier::PluginSpecifier;
use crate::version;
use std::path::Path;

/// The outcome of an update attempt.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub name: String,
    pub old_version: String,
    pub new_version: String,
    pub was_up_to_date: bool,
    pub path: Option<std::path::PathBuf>,
}

fn source_url_parts(source_url: &str) -> Option<(String, String)> {
    let mut parts = source_url.splitn(3, '/');
    let _host = parts.next()?;
    let owner = parts.next()?;
    let repo = parts.next()?;
    Some((owner.to_string(), repo.to_string()))
}

/// Update `name` to its latest release, or to an explicit version when
/// `requested_version` is set.
///
/// Set `dry_run` to report the would-be transition without touching disk.
pub async fn update(
    root: &Path,
    manifest: &PluginManifest,
    client: &ReleaseClient,
    name: &str,
    requested_version: Option<&str>,
    dry_run: bool,
) -> Result<UpdateOutcome> {
    let token = lock::acquire(root, name)?;
    let result = update_locked(root, manifest, client, name, requested_version, dry_run).await;
    token.release();
    result
}

async fn update_locked(
    root: &Path,
    manifest: &PluginManifest,
    client: &ReleaseClient,
    name: &str,
    requested_version: Option<&str>,
    dry_run: bool,
) -> Result<UpdateOutcome> {
    let record = manifest
        .get(name)?
        .ok_or_else(|| RegistryError::NotInstalled {
            name: name.to_string(),
        })?;

    let (owner, repo) = if let Ok(entry) = catalog::get(name) {
        entry
            .repository
            .split_once('/')
            .map(|(o, r)| (o.to_string(), r.to_string()))
            .ok_or_else(|| RegistryError::InvalidCatalogEntry {
                name: name.to_string(),
                reason: "repository must match owner/repo".to_string(),
            })?
    } else {
        source_url_parts(&record.source_url).ok_or_else(|| RegistryError::InvalidSpecifier {
            input: record.source_url.clone(),
            reason: "stored source_url is not host/owner/repo".to_string(),
        })?
    };

    let release = client.fetch_release(&owner, &repo, requested_version).await?;

    let explicit_version = requested_version.is_some();
    let comparison = version::compare(&release.tag, &record.version)?;
    if comparison == 0 || (comparison < 0 && !explicit_version) {
        return Ok(UpdateOutcome {
            name: name.to_string(),
            old_version: record.version.clone(),
            new_version: release.tag,
            was_up_to_date: true,
            path: None,
        });
    }

    if dry_run {
        return Ok(UpdateOutcome {
            name: name.to_string(),
            old_version: record.version.clone(),
            new_version: release.tag,
            was_up_to_date: false,
            path: None,
        });
    }

    let is_catalog_entry = catalog::get(name).is_ok();
    let spec = PluginSpecifier {
        name: name.to_string(),
        version: release.tag.clone(),
        is_url: !is_catalog_entry,
        owner: Some(owner.clone()),
        repo: Some(repo.clone()),
    };

    let options = InstallOptions {
        force: true,
        no_save: true,
    };
    // The outer lock above already guards this plugin; call the lock-free
    // body directly to avoid re-acquiring a lock this process already holds.
    let outcome = install::install_locked(root, manifest, client, &spec, &options).await?;

    if outcome.version != record.version {
        let old_dir = root.join(name).join(&record.version);
        if old_dir.exists() {
            let _ = std::fs::remove_dir_all(&old_dir);
        }
    }
    manifest.update_version(name, &outcome.version)?;

    Ok(UpdateOutcome {
        name: name.to_string(),
        old_version: record.version,
        new_version: outcome.version,
        was_up_to_date: false,
        path: Some(outcome.path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::InstalledPluginRecord;
    use crate::release::{archive_ext, arch_tokens, os_tokens};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn source_url_parts_splits_host_owner_repo() {
        let (owner, repo) = source_url_parts("github.com/acme/demo").unwrap();
        assert_eq!(owner, "acme");
        assert_eq!(repo, "demo");
    }

    #[test]
    fn source_url_parts_rejects_short_input() {
        assert!(source_url_parts("github.com/acme").is_none());
    }

    fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
        let file = fs::File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    /// Regression test for the self-lock deadlock: `update()` holds the
    /// per-plugin lock for the whole call, and the happy path (a real,
    /// available upgrade) used to re-enter `install::install`, which tried
    /// to acquire the same lock again and failed with `Locked`. If the lock
    /// is not released, or the nested acquire is not removed, this test
    /// hangs or returns `RegistryError::Locked` instead of completing.
    #[tokio::test]
    async fn update_upgrades_without_self_lock_deadlock() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let manifest = crate::manifest::PluginManifest::at_path(root.join("plugins.toml"));

        manifest
            .add(InstalledPluginRecord {
                name: "demo".to_string(),
                source_url: "github.com/acme/demo".to_string(),
                version: "v1.0.0".to_string(),
            })
            .unwrap();
        fs::create_dir_all(root.join("demo").join("v1.0.0")).unwrap();
        fs::write(root.join("demo").join("v1.0.0").join("demo"), b"old binary").unwrap();

        let server = MockServer::start().await;

        let asset_name = format!(
            "demo_2.0.0_{}_{}.{}",
            os_tokens()[0],
            arch_tokens()[0],
            archive_ext()
        );
        let archive_path = dir.path().join(&asset_name);
        write_tar_gz(&archive_path, &[("demo", b"new binary")]);
        let archive_bytes = fs::read(&archive_path).unwrap();

        Mock::given(method("GET"))
            .and(path_regex(r"^/repos/acme/demo/releases/latest$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tag_name": "v2.0.0",
                "name": "v2.0.0",
                "draft": false,
                "prerelease": false,
                "assets": [{
                    "name": asset_name,
                    "size": archive_bytes.len(),
                    "browser_download_url": format!("{}/download/{asset_name}", server.uri()),
                    "content_type": "application/gzip",
                }],
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/download/.*$"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive_bytes))
            .mount(&server)
            .await;

        let client = crate::release::ReleaseClient::with_base_url(server.uri(), 5, 1).unwrap();

        let outcome = update(root, &manifest, &client, "demo", None, false).await.unwrap();

        assert!(!outcome.was_up_to_date);
        assert_eq!(outcome.old_version, "v1.0.0");
        assert_eq!(outcome.new_version, "v2.0.0");
        assert!(!root.join("demo").join("v1.0.0").exists());
        assert!(root.join("demo").join("v2.0.0").join("demo").exists());
        assert_eq!(manifest.get("demo").unwrap().unwrap().version, "v2.0.0");

        // The lock must have been released by the end of the call, not left
        // held by a nested (and aborted) acquire attempt.
        assert!(lock::acquire(root, "demo").is_ok());
    }
}
