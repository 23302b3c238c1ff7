//! In-memory filesystem used by the unit and integration tests.

use super::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// In-memory filesystem.
///
/// Cloning shares the underlying tree, so a test can keep a handle and
/// add or remove files between collection rounds.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    inner: Arc<RwLock<Tree>>,
}

#[derive(Debug, Default)]
struct Tree {
    files: HashMap<PathBuf, String>,
    directories: HashSet<PathBuf>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content. Parent directories are created.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        let mut tree = self.write();

        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                tree.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }

        tree.files.insert(path, content.into());
    }

    /// Removes a file, simulating a container whose cgroup went away.
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.write().files.remove(path.as_ref());
    }

    /// Adds the cgroup v1 memory and cpu files of a container under `sys_root`,
    /// using the plain `docker/<id>` layout.
    pub fn add_container_cgroup(
        &self,
        sys_root: impl AsRef<Path>,
        id: &str,
        memory_stat: &str,
        cpuacct_usage: &str,
    ) {
        let root = sys_root.as_ref();
        self.add_file(
            root.join(format!("fs/cgroup/memory/docker/{id}/memory.stat")),
            memory_stat,
        );
        self.add_file(
            root.join(format!("fs/cgroup/cpuacct/docker/{id}/cpuacct.usage")),
            cpuacct_usage,
        );
    }

    /// Adds `<proc_root>/<pid>/net/dev`.
    pub fn add_net_dev(&self, proc_root: impl AsRef<Path>, pid: i64, content: &str) {
        self.add_file(proc_root.as_ref().join(format!("{pid}/net/dev")), content);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tree> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tree> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.read().files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        let tree = self.read();
        tree.files.contains_key(path) || tree.directories.contains(path)
    }
}
