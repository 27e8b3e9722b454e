//! Shared scratch directory for in-flight requests.
//!
//! Requests are isolated only by file-name prefix: every file a request
//! creates starts with its token. Tokens are random UUIDs in simple form
//! (32 hex chars), so no token is a prefix of another.

use fs_err as fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug)]
pub struct TemporaryStore {
    dir: PathBuf,
}

impl TemporaryStore {
    /// Create the scratch directory if it does not exist yet.
    pub fn init(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        log::info!("Scratch directory ready: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fresh correlation token for one request.
    pub fn mint_token(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// `<dir>/<token>.<ext>`
    pub fn path_for(&self, token: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", token, ext))
    }

    /// Start owning every file that will carry `token`.
    pub fn claim(self: &Arc<Self>, token: &str) -> TokenGuard {
        TokenGuard {
            store: Arc::clone(self),
            token: token.to_string(),
            armed: true,
        }
    }

    /// Files directly under the scratch directory whose name starts with
    /// `prefix`, sorted by name.
    pub async fn files_with_prefix(&self, prefix: &str) -> io::Result<Vec<PathBuf>> {
        let mut entries = fs::tokio::read_dir(&self.dir).await?;
        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with(prefix) {
                found.push(entry.path());
            }
        }
        found.sort();
        Ok(found)
    }

    /// Delete every file sharing `token`. Each deletion is attempted
    /// independently; failures are logged and skipped.
    pub async fn sweep(&self, token: &str) -> usize {
        let files = match self.files_with_prefix(token).await {
            Ok(files) => files,
            Err(e) => {
                log::error!("[Cleanup Error] Cannot list {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        for path in files {
            match fs::tokio::remove_file(&path).await {
                Ok(()) => {
                    log::info!("[Cleanup] Deleted: {}", file_label(&path));
                    removed += 1;
                }
                Err(e) => log::error!("[Cleanup Error] {}: {}", file_label(&path), e),
            }
        }
        removed
    }

    /// Synchronous [`sweep`](Self::sweep) for drop paths.
    pub fn sweep_blocking(&self, token: &str) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("[Cleanup Error] Cannot list {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            if !entry.file_name().to_string_lossy().starts_with(token) {
                continue;
            }
            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => {
                    log::info!("[Cleanup] Deleted: {}", file_label(&path));
                    removed += 1;
                }
                Err(e) => log::error!("[Cleanup Error] {}: {}", file_label(&path), e),
            }
        }
        removed
    }

    /// Delete every file in the scratch directory. Used at shutdown.
    pub async fn flush(&self) -> usize {
        let files = match self.files_with_prefix("").await {
            Ok(files) => files,
            Err(e) => {
                log::error!("[Shutdown Error] Cannot list {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        for path in files {
            if !path.is_file() {
                continue;
            }
            match fs::tokio::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => log::error!("[Shutdown] Failed to delete {}: {}", file_label(&path), e),
            }
        }
        removed
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Owns the files of one request.
///
/// Dropped while armed, it sweeps the token. That covers early returns,
/// errors, and the request future being dropped on client disconnect.
#[derive(Debug)]
pub struct TokenGuard {
    store: Arc<TemporaryStore>,
    token: String,
    armed: bool,
}

impl TokenGuard {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn store(&self) -> &TemporaryStore {
        &self.store
    }

    /// The files were disposed of elsewhere; nothing left to sweep.
    pub fn release(mut self) {
        self.armed = false;
    }

    /// Sweep now (async) instead of at drop.
    pub async fn sweep(mut self) -> usize {
        self.armed = false;
        self.store.sweep(&self.token).await
    }
}

impl Drop for TokenGuard {
    fn drop(&mut self) {
        if self.armed {
            let removed = self.store.sweep_blocking(&self.token);
            if removed > 0 {
                log::warn!("[Cleanup] Swept {} leftover file(s) for {}", removed, self.token);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_init_creates_missing_dir() {
        let root = tempdir().unwrap();
        let dir = root.path().join("nested").join("tmp");
        let store = TemporaryStore::init(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.dir(), dir.as_path());
    }

    #[test]
    fn test_tokens_are_unique_and_fixed_width() {
        let root = tempdir().unwrap();
        let store = TemporaryStore::init(root.path()).unwrap();
        let a = store.mint_token();
        let b = store.mint_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(!a.starts_with(&b) && !b.starts_with(&a));
    }

    #[tokio::test]
    async fn test_sweep_only_touches_own_token() {
        let root = tempdir().unwrap();
        let store = TemporaryStore::init(root.path()).unwrap();
        touch(root.path(), "aaaa.f137.mp4");
        touch(root.path(), "aaaa.mp4");
        let other = touch(root.path(), "bbbb.mp4");

        assert_eq!(store.sweep("aaaa").await, 2);
        assert_eq!(store.files_with_prefix("aaaa").await.unwrap().len(), 0);
        assert!(other.exists());
    }

    #[tokio::test]
    async fn test_guard_sweeps_on_drop() {
        let root = tempdir().unwrap();
        let store = Arc::new(TemporaryStore::init(root.path()).unwrap());
        let token = store.mint_token();
        let file = touch(root.path(), &format!("{}.f140.m4a", token));

        {
            let _guard = store.claim(&token);
        }
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_released_guard_leaves_files() {
        let root = tempdir().unwrap();
        let store = Arc::new(TemporaryStore::init(root.path()).unwrap());
        let token = store.mint_token();
        let file = touch(root.path(), &format!("{}.mp3", token));

        store.claim(&token).release();
        assert!(file.exists());
    }

    #[tokio::test]
    async fn test_flush_removes_everything() {
        let root = tempdir().unwrap();
        let store = TemporaryStore::init(root.path()).unwrap();
        touch(root.path(), "a.mp4");
        touch(root.path(), "b.f140.m4a");
        assert_eq!(store.flush().await, 2);
        assert!(store.files_with_prefix("").await.unwrap().is_empty());
    }
}
