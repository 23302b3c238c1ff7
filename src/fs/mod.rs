//! Filesystem access for the stat engine.
//!
//! Every cgroup and procfs read goes through the `FileSystem` trait so the
//! locator and the collection round can run against an in-memory tree in
//! tests.

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

use std::io;
use std::path::Path;

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockFs;

/// Read-only view of the pseudo-filesystems the collector inspects.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks whether a path exists. No readability check is made.
    fn exists(&self, path: &Path) -> bool;
}

/// `FileSystem` backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
