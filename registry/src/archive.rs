//! Archive extraction with zip-slip protection and a per-entry size cap.
//!
//! Supports `.tar.gz`/`.tgz` (via `flate2` + `tar`) and `.zip` (via the `zip`
//! crate). Both formats funnel through the same path-sanitization and size
//! check so the two code paths can't silently drift apart.

use crate::error::{RegistryError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Every extracted file is capped at this size. Chosen well above the
/// minimal reference's 100 MiB: native plugin binaries that statically link
/// a cloud provider SDK routinely exceed that.
pub const MAX_ENTRY_SIZE: u64 = 500 * 1024 * 1024;

#[cfg(unix)]
const DEFAULT_MODE: u32 = 0o750;

fn check_entry_size(entry_name: &str, size: u64) -> Result<()> {
    if size > MAX_ENTRY_SIZE {
        return Err(RegistryError::ArchiveEntryTooLarge {
            entry: entry_name.to_string(),
            limit_mb: MAX_ENTRY_SIZE / (1024 * 1024),
        });
    }
    Ok(())
}

/// Resolve `entry_name` against `dest` and verify the result cannot escape
/// `dest` via `..` components or an absolute path embedded in the archive.
fn sanitized_join(dest: &Path, entry_name: &str) -> Result<PathBuf> {
    let candidate = dest.join(entry_name);
    let mut resolved = PathBuf::from(dest);
    for component in candidate
        .strip_prefix(dest)
        .unwrap_or(&candidate)
        .components()
    {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(RegistryError::ZipSlip {
                    entry: entry_name.to_string(),
                });
            }
        }
    }
    if resolved != dest && !resolved.starts_with(dest) {
        return Err(RegistryError::ZipSlip {
            entry: entry_name.to_string(),
        });
    }
    Ok(resolved)
}

fn set_executable(#[allow(unused_variables)] path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(DEFAULT_MODE))?;
    }
    Ok(())
}

/// Extract a `.tar.gz`/`.tgz` archive into `dest`, creating it if needed.
pub fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive_path).map_err(|e| RegistryError::io(archive_path, e))?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);

    fs::create_dir_all(dest).map_err(|e| RegistryError::io(dest, e))?;

    let entries = archive
        .entries()
        .map_err(|e| RegistryError::io(archive_path, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| RegistryError::io(archive_path, e))?;
        let entry_name = entry.path().map_err(|e| RegistryError::io(archive_path, e))?.to_string_lossy().into_owned();
        let size = entry.header().size().unwrap_or(0);
        check_entry_size(&entry_name, size)?;

        let target = sanitized_join(dest, &entry_name)?;
        let is_dir = entry.header().entry_type().is_dir();
        let is_exec = entry.header().mode().map(|m| m & 0o111 != 0).unwrap_or(false);

        if is_dir {
            fs::create_dir_all(&target).map_err(|e| RegistryError::io(&target, e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| RegistryError::io(parent, e))?;
        }
        entry.unpack(&target).map_err(|e| RegistryError::io(&target, e))?;
        if is_exec {
            set_executable(&target).map_err(|e| RegistryError::io(&target, e))?;
        }
    }
    Ok(())
}

/// Extract a `.zip` archive into `dest`, creating it if needed.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive_path).map_err(|e| RegistryError::io(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| RegistryError::io(archive_path, std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

    fs::create_dir_all(dest).map_err(|e| RegistryError::io(dest, e))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| RegistryError::io(archive_path, std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        let entry_name = entry.name().to_string();

        check_entry_size(&entry_name, entry.size())?;

        let target = sanitized_join(dest, &entry_name)?;

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| RegistryError::io(&target, e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| RegistryError::io(parent, e))?;
        }
        let mut out = fs::File::create(&target).map_err(|e| RegistryError::io(&target, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| RegistryError::io(&target, e))?;

        let is_exec = entry
            .unix_mode()
            .map(|mode| mode & 0o111 != 0)
            .unwrap_or(false);
        if is_exec {
            set_executable(&target).map_err(|e| RegistryError::io(&target, e))?;
        }
    }
    Ok(())
}

/// Extract `archive_path` into `dest`, dispatching on file extension.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    let name = archive_path.to_string_lossy();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        extract_tar_gz(archive_path, dest)
    } else if name.ends_with(".zip") {
        extract_zip(archive_path, dest)
    } else {
        Err(RegistryError::UnsupportedArchive {
            path: archive_path.to_path_buf(),
        })
    }
}

/// Validate that `path` is a plugin binary this platform can execute.
///
/// On Windows the filename must end in `.exe` (case-insensitive); on other
/// platforms at least one exec mode bit must be set. Script extensions
/// (`.bat`, `.cmd`, `.ps1`) are never accepted.
pub fn validate_binary(path: &Path) -> Result<()> {
    let meta = fs::metadata(path).map_err(|e| RegistryError::io(path, e))?;
    if meta.is_dir() {
        return Err(RegistryError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path is a directory"),
        ));
    }

    if cfg!(target_os = "windows") {
        let ok = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("exe"))
            .unwrap_or(false);
        if !ok {
            return Err(RegistryError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a .exe binary"),
            ));
        }
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            return Err(RegistryError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "file is not executable"),
            ));
        }
    }
    Ok(())
}
