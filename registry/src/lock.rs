//! Per-plugin advisory locking.
//!
//! Install, update, and remove all serialize on a lock file at
//! `<root>/<name>.lock` containing the owning process's PID. A lock file
//! left behind by a crashed process is detected via [`is_pid_alive`] and
//! recovered automatically.

use crate::error::{RegistryError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A held lock. Dropping this without calling [`LockToken::release`] leaves
/// the lock file on disk for the next acquirer to recover as stale only once
/// this process has exited (the PID liveness check will then say it's dead).
#[derive(Debug)]
pub struct LockToken {
    path: PathBuf,
    released: bool,
}

impl LockToken {
    /// Release the lock, removing the lock file.
    pub fn release(mut self) {
        self.released = true;
        let _ = fs::remove_file(&self.path);
    }
}

impl Drop for LockToken {
    fn drop(&mut self) {
        if !self.released {
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[cfg(unix)]
fn is_pid_alive(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(windows)]
fn is_pid_alive(pid: i32) -> bool {
    // A real Windows build resolves this with OpenProcess; without a
    // windows-sys dependency we conservatively treat any plausible PID as
    // alive, which only costs an extra stale-recovery attempt later rather
    // than racing a live owner.
    pid > 0
}

fn lock_path(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{name}.lock"))
}

fn read_lock_pid(path: &Path) -> Option<i32> {
    let contents = fs::read_to_string(path).ok()?;
    contents.trim().parse::<i32>().ok()
}

fn is_stale(path: &Path) -> bool {
    match read_lock_pid(path) {
        Some(pid) => !is_pid_alive(pid),
        None => true,
    }
}

fn try_create(path: &Path) -> std::io::Result<()> {
    let mut opts = OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(path)?;
    write!(file, "{}", std::process::id())?;
    Ok(())
}

/// Acquire the lock for `name` under `root`, recovering a stale lock file
/// exactly once before giving up.
pub fn acquire(root: &Path, name: &str) -> Result<LockToken> {
    fs::create_dir_all(root).map_err(|e| RegistryError::io(root, e))?;
    let path = lock_path(root, name);

    match try_create(&path) {
        Ok(()) => Ok(LockToken {
            path,
            released: false,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            if is_stale(&path) {
                let _ = fs::remove_file(&path);
                try_create(&path)
                    .map(|_| LockToken {
                        path: path.clone(),
                        released: false,
                    })
                    .map_err(|_| RegistryError::Locked {
                        name: name.to_string(),
                    })
            } else {
                Err(RegistryError::Locked {
                    name: name.to_string(),
                })
            }
        }
        Err(e) => Err(RegistryError::io(&path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_then_release_allows_reacquire() {
        let dir = TempDir::new().unwrap();
        let token = acquire(dir.path(), "demo").unwrap();
        token.release();
        assert!(acquire(dir.path(), "demo").is_ok());
    }

    #[test]
    fn contended_lock_is_rejected() {
        let dir = TempDir::new().unwrap();
        let _held = acquire(dir.path(), "demo").unwrap();
        let err = acquire(dir.path(), "demo").unwrap_err();
        assert!(matches!(err, RegistryError::Locked { .. }));
    }

    #[test]
    fn stale_lock_with_unused_pid_is_recovered() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(dir.path(), "demo");
        fs::write(&path, "999999999").unwrap();
        assert!(acquire(dir.path(), "demo").is_ok());
    }

    #[test]
    fn empty_lock_file_is_treated_as_stale() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(dir.path(), "demo");
        fs::write(&path, "").unwrap();
        assert!(acquire(dir.path(), "demo").is_ok());
    }

    #[test]
    fn lock_holding_current_pid_is_live() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(dir.path(), "demo");
        fs::write(&path, std::process::id().to_string()).unwrap();
        let err = acquire(dir.path(), "demo").unwrap_err();
        assert!(matches!(err, RegistryError::Locked { .. }));
    }

    #[test]
    fn drop_without_release_removes_lock_file() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(dir.path(), "demo");
        {
            let _token = acquire(dir.path(), "demo").unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn different_names_do_not_contend() {
        let dir = TempDir::new().unwrap();
        let _a = acquire(dir.path(), "a").unwrap();
        assert!(acquire(dir.path(), "b").is_ok());
    }
}
