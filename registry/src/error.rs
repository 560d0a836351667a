//! Error types for the plugin registry.
//!
//! Errors are grouped by the layer that raised them so callers can decide
//! whether a failure is worth surfacing to a human (a bad specifier), worth
//! retrying (a transient HTTP error), or a sign of a build-time mistake in
//! the embedded catalog.

use std::path::PathBuf;
use thiserror::Error;

/// All errors the registry can return.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The user-supplied specifier could not be parsed.
    #[error("invalid plugin specifier '{input}': {reason}")]
    InvalidSpecifier { input: String, reason: String },

    /// A plugin name was not found in the embedded catalog.
    #[error("plugin '{name}' is not in the catalog")]
    NotInCatalog { name: String },

    /// The embedded catalog itself failed validation (a packaging bug).
    #[error("catalog entry '{name}' is invalid: {reason}")]
    InvalidCatalogEntry { name: String, reason: String },

    /// A version string did not parse as semver.
    #[error("'{version}' is not a valid semantic version")]
    InvalidVersion { version: String },

    /// A version constraint string was malformed or empty.
    #[error("invalid version constraint '{constraint}': {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    /// Requested plugin+version is already installed.
    #[error("plugin '{name}' version '{version}' is already installed; pass force to reinstall")]
    AlreadyInstalled { name: String, version: String },

    /// Plugin has no installed record to update or remove.
    #[error("plugin '{name}' is not installed")]
    NotInstalled { name: String },

    /// No release could be resolved for a plugin (bad tag, no releases at all).
    #[error("no release found for '{owner}/{repo}'{tag}")]
    ReleaseNotFound {
        owner: String,
        repo: String,
        tag: String,
    },

    /// The release API rejected the request with a rate limit response.
    #[error("rate limit exceeded talking to the release host; set COSTFORGE_GITHUB_TOKEN")]
    RateLimited,

    /// No asset in the release matched the running platform.
    #[error("no release asset matches this platform; available assets: {available}")]
    NoMatchingAsset { available: String },

    /// The archive contained a path that would escape the destination directory.
    #[error("invalid file path in archive: '{entry}' escapes the destination")]
    ZipSlip { entry: String },

    /// An archive entry exceeded the configured size cap.
    #[error("archive entry '{entry}' exceeds the {limit_mb} MiB size cap")]
    ArchiveEntryTooLarge { entry: String, limit_mb: u64 },

    /// The archive format is not recognized.
    #[error("unsupported archive format for '{path}'")]
    UnsupportedArchive { path: PathBuf },

    /// No executable binary could be located for a plugin.
    #[error("no executable binary found for plugin '{name}' under {dir}")]
    BinaryNotFound { name: String, dir: PathBuf },

    /// A plugin is currently locked by another install/update/remove operation.
    #[error("plugin '{name}' is being modified by another process")]
    Locked { name: String },

    /// A filesystem operation failed.
    #[error("filesystem error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An HTTP request to the release host failed.
    #[error("request to release host failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Launching a plugin process failed.
    #[error("failed to launch plugin '{name}': {reason}")]
    LaunchFailed { name: String, reason: String },
}

impl RegistryError {
    /// Wrap a filesystem error with the path that caused it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// A short, user-facing remedy for errors that have one.
    ///
    /// Returns `None` for errors that are self-explanatory or where no
    /// concrete action helps (e.g. a transient lock contention the caller
    /// should simply retry).
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::RateLimited => {
                Some("export COSTFORGE_GITHUB_TOKEN=<token> to raise the rate limit".to_string())
            }
            Self::AlreadyInstalled { name, .. } => {
                Some(format!("run with --force to reinstall '{name}'"))
            }
            Self::NotInstalled { name } => {
                Some(format!("run 'costforge plugin install {name}' first"))
            }
            Self::InvalidSpecifier { .. } => {
                Some("expected 'name[@version]' or 'host/owner/repo[@version]'".to_string())
            }
            _ => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RegistryError>;
