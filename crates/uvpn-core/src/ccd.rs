// ── CCD file manager ──
//
// One client-config-dir file per account: a single address assignment
// line written at creation, then route directives appended over time.
// Appends hold an exclusive advisory lock on the file for the duration
// of the write; the lock is a guard, so it is released on every path out.
//
// All filesystem work runs on the blocking pool.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::error::CcdError;
use crate::route::{self, RouteClause};

/// Assignment line used when none is configured.
pub const DEFAULT_ASSIGNMENT_TEMPLATE: &str = "ifconfig-push {address} {netmask}";

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct CcdManager {
    dir: PathBuf,
    template: String,
    netmask: Ipv4Addr,
}

impl CcdManager {
    /// `template` may use `{address}` and `{netmask}`; `netmask` is the pool's.
    pub fn new(dir: impl Into<PathBuf>, template: impl Into<String>, netmask: Ipv4Addr) -> Self {
        Self {
            dir: dir.into(),
            template: template.into(),
            netmask,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of an account's file. Names that would escape the directory
    /// are refused.
    pub fn path_for(&self, account: &str) -> Result<PathBuf, CcdError> {
        let valid = !account.is_empty()
            && account != "."
            && account != ".."
            && !account.starts_with('.')
            && !account.contains(['/', '\\', '\0']);
        if !valid {
            return Err(CcdError::InvalidAccountName {
                account: account.to_owned(),
            });
        }
        Ok(self.dir.join(account))
    }

    /// The assignment line for `address`, without a trailing newline.
    pub fn assignment_line(&self, address: Ipv4Addr) -> String {
        self.template
            .replace("{address}", &address.to_string())
            .replace("{netmask}", &self.netmask.to_string())
    }

    pub async fn exists(&self, path: &Path) -> bool {
        match tokio::fs::symlink_metadata(path).await {
            Ok(_) => true,
            Err(e) => e.kind() != io::ErrorKind::NotFound,
        }
    }

    /// Write a new file holding only the assignment line.
    ///
    /// Callers check [`exists`](Self::exists) first. The content is staged
    /// in a hidden temp file and linked into place, so the file never
    /// appears empty and an existing file is never replaced.
    pub async fn create_with_assignment(
        &self,
        path: &Path,
        address: Ipv4Addr,
    ) -> Result<(), CcdError> {
        let line = self.assignment_line(address);
        let target = path.to_path_buf();
        let staging = self.staging_path(path);

        blocking(move || {
            let result = write_new(&staging, &target, &line);
            if staging.exists() {
                if let Err(e) = fs::remove_file(&staging) {
                    warn!(path = %staging.display(), error = %e, "failed to remove staging file");
                }
            }
            result.map_err(|source| CcdError::CreateError {
                path: target,
                source,
            })
        })
        .await
        .unwrap_or_else(|source| {
            Err(CcdError::CreateError {
                path: path.to_path_buf(),
                source,
            })
        })?;

        debug!(path = %path.display(), %address, "created CCD file");
        Ok(())
    }

    /// Append clauses followed by a blank line, under an exclusive lock.
    pub async fn append_clauses(
        &self,
        path: &Path,
        clauses: &[RouteClause],
    ) -> Result<(), CcdError> {
        let text = route::render(clauses);
        append_locked(path.to_path_buf(), text).await
    }

    /// Delete a file created by this manager. Used to undo an allocation.
    pub async fn remove(&self, path: &Path) -> Result<(), CcdError> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|source| CcdError::RemoveError {
                path: path.to_path_buf(),
                source,
            })
    }

    /// The address on the file's assignment line, if it has one.
    ///
    /// The line is recognised by the template's leading directive
    /// (`ifconfig-push` by default); its first argument is the address.
    pub async fn read_assignment(&self, path: &Path) -> Result<Option<Ipv4Addr>, CcdError> {
        let directive = self
            .template
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_owned();
        let target = path.to_path_buf();

        blocking(move || {
            let read_err = |source| CcdError::ReadError {
                path: target.clone(),
                source,
            };
            let file = File::open(&target).map_err(read_err)?;
            for line in BufReader::new(file).lines() {
                let line = line.map_err(read_err)?;
                let mut words = line.split_whitespace();
                if words.next() == Some(directive.as_str()) {
                    return Ok(words.next().and_then(|w| w.parse().ok()));
                }
            }
            Ok(None)
        })
        .await
        .unwrap_or_else(|source| {
            Err(CcdError::ReadError {
                path: path.to_path_buf(),
                source,
            })
        })
    }

    /// Account names with a file in the directory, sorted.
    pub async fn list(&self) -> Result<Vec<String>, CcdError> {
        let read_err = |source| CcdError::ReadError {
            path: self.dir.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(read_err)?;

        let mut accounts = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            if !entry.file_type().await.map_err(read_err)?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    accounts.push(name.to_owned());
                }
            }
        }
        accounts.sort();
        Ok(accounts)
    }

    fn staging_path(&self, path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        path.with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
    }
}

/// Append `text` plus a trailing blank line to an existing file while
/// holding an exclusive lock on it.
pub(crate) async fn append_locked(path: PathBuf, text: String) -> Result<(), CcdError> {
    let target = path.clone();
    blocking(move || {
        write_locked(&target, &text).map_err(|source| CcdError::WriteError {
            path: target.clone(),
            source,
        })
    })
    .await
    .unwrap_or_else(|source| Err(CcdError::WriteError { path, source }))
}

fn write_locked(path: &Path, text: &str) -> io::Result<()> {
    let file = OpenOptions::new().append(true).open(path)?;
    let lock = ExclusiveLock::acquire(&file)?;

    let mut writer = BufWriter::new(lock.file());
    writer.write_all(text.as_bytes())?;
    writer.write_all(b"\n\n")?;
    writer.flush()?;
    Ok(())
}

fn write_new(staging: &Path, target: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(staging)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    drop(file);

    // hard_link fails if the target exists
    fs::hard_link(staging, target)
}

/// Run blocking file work off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, io::Error>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(io::Error::other)
}

/// Exclusive `flock`-style lock held for the guard's lifetime.
pub(crate) struct ExclusiveLock<'a> {
    file: &'a File,
}

impl<'a> ExclusiveLock<'a> {
    /// Blocks until the lock is granted.
    pub(crate) fn acquire(file: &'a File) -> io::Result<Self> {
        file.lock()?;
        Ok(Self { file })
    }

    pub(crate) fn file(&self) -> &'a File {
        self.file
    }
}

impl Drop for ExclusiveLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(error = %e, "failed to release CCD file lock");
        }
    }
}
