//! Plugin process lifecycle: spawn discovered binaries, obtain an RPC
//! channel to each, and provide a single cleanup closure that tears every
//! launched child down.

use crate::discovery::{self, PluginInfo};
use crate::error::{RegistryError, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tonic::transport::Channel;

/// A live connection to one running plugin.
pub struct ClientHandle {
    pub plugin_name: String,
    pub channel: Channel,
    child: Option<Child>,
}

impl ClientHandle {
    /// Terminate the child process and drop the channel. Safe to call more
    /// than once; a handle with no child (as produced by a test stub) is a
    /// no-op on the process side.
    pub async fn close(mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}

/// The seam production and test code implement differently: spawning a real
/// child process and dialing its handshake port, versus synthesizing a
/// canned success or failure without touching the OS.
#[async_trait]
pub trait PluginLauncher: Send + Sync {
    async fn start(&self, binary_path: &Path) -> Result<ClientHandle>;
}

/// Spawns the plugin binary and reads a single handshake line of the form
/// `<protocol-version>|<port>|<network>` from its stdout, following the
/// handshake convention plugin hosts in this ecosystem already use, then
/// dials the reported port with a gRPC channel.
pub struct ProcessLauncher {
    pub handshake_timeout: std::time::Duration,
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self {
            handshake_timeout: std::time::Duration::from_secs(10),
        }
    }
}

#[async_trait]
impl PluginLauncher for ProcessLauncher {
    async fn start(&self, binary_path: &Path) -> Result<ClientHandle> {
        let name = binary_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| binary_path.to_string_lossy().into_owned());

        let mut child = Command::new(binary_path)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RegistryError::LaunchFailed {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| RegistryError::LaunchFailed {
            name: name.clone(),
            reason: "child produced no stdout pipe".to_string(),
        })?;
        let mut lines = BufReader::new(stdout).lines();

        let handshake = tokio::time::timeout(self.handshake_timeout, lines.next_line())
            .await
            .map_err(|_| RegistryError::LaunchFailed {
                name: name.clone(),
                reason: "timed out waiting for handshake".to_string(),
            })?
            .map_err(|e| RegistryError::LaunchFailed {
                name: name.clone(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| RegistryError::LaunchFailed {
                name: name.clone(),
                reason: "child exited before printing a handshake line".to_string(),
            })?;

        let port = parse_handshake(&handshake).ok_or_else(|| RegistryError::LaunchFailed {
            name: name.clone(),
            reason: format!("malformed handshake line: '{handshake}'"),
        })?;

        let endpoint = format!("http://127.0.0.1:{port}");
        let channel = Channel::from_shared(endpoint)
            .map_err(|e| RegistryError::LaunchFailed {
                name: name.clone(),
                reason: e.to_string(),
            })?
            .connect()
            .await
            .map_err(|e| RegistryError::LaunchFailed {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        Ok(ClientHandle {
            plugin_name: name,
            channel,
            child: Some(child),
        })
    }
}

fn parse_handshake(line: &str) -> Option<u16> {
    let mut parts = line.trim().split('|');
    let _protocol_version = parts.next()?;
    let port = parts.next()?.parse::<u16>().ok()?;
    let _network = parts.next()?;
    Some(port)
}

/// Launch every plugin `discovery::list_latest` finds (optionally filtered
/// to a single name), logging and skipping any that fail to start.
///
/// Returns the successful handles and a cleanup closure that must be
/// invoked on every exit path.
pub async fn open(
    root: &Path,
    launcher: &dyn PluginLauncher,
    name_filter: Option<&str>,
    legacy_plugin_names: bool,
) -> (Vec<ClientHandle>, impl FnOnce(Vec<ClientHandle>) -> futures_util::future::BoxFuture<'static, ()>) {
    let (plugins, warnings): (Vec<PluginInfo>, Vec<String>) = discovery::list_latest(root, legacy_plugin_names);
    for warning in &warnings {
        tracing::warn!(warning = %warning, "plugin discovery warning");
    }

    let selected: Vec<PluginInfo> = plugins
        .into_iter()
        .filter(|p| name_filter.map(|f| f == p.name).unwrap_or(true))
        .collect();

    let mut handles = Vec::new();
    for plugin in selected {
        match launcher.start(&plugin.binary_path).await {
            Ok(handle) => handles.push(handle),
            Err(error) => {
                tracing::warn!(
                    plugin_name = %plugin.name,
                    plugin_path = %plugin.binary_path.display(),
                    error = %error,
                    "failed to launch plugin"
                );
            }
        }
    }

    (handles, cleanup)
}

fn cleanup(handles: Vec<ClientHandle>) -> futures_util::future::BoxFuture<'static, ()> {
    Box::pin(async move {
        for handle in handles {
            handle.close().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct AlwaysFailLauncher {
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PluginLauncher for AlwaysFailLauncher {
        async fn start(&self, _binary_path: &Path) -> Result<ClientHandle> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(RegistryError::LaunchFailed {
                name: "stub".to_string(),
                reason: "synthetic failure".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn open_skips_failed_launches_without_aborting_batch() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        for plugin in ["a", "b"] {
            let version_dir = root.join(plugin).join("1.0.0");
            std::fs::create_dir_all(&version_dir).unwrap();
            let bin = version_dir.join(plugin);
            std::fs::write(&bin, b"x").unwrap();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
            }
        }

        let attempts = Arc::new(AtomicUsize::new(0));
        let launcher = AlwaysFailLauncher {
            attempts: attempts.clone(),
        };

        let (handles, cleanup_fn) = open(root, &launcher, None, false).await;
        assert!(handles.is_empty());
        cleanup_fn(handles).await;

        #[cfg(unix)]
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn parses_well_formed_handshake() {
        assert_eq!(parse_handshake("1|54321|tcp"), Some(54321));
    }

    #[test]
    fn rejects_malformed_handshake() {
        assert_eq!(parse_handshake("garbage"), None);
        assert_eq!(parse_handshake("1|not-a-port|tcp"), None);
    }
}
