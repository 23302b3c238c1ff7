//! Resolution of a container's accounting file across cgroup layouts.

use std::path::{Path, PathBuf};

use crate::core::MetricFamily;
use crate::errors::CollectError;
use crate::fs::FileSystem;

/// Substitution slot for the container id in a path template.
pub const ID_PLACEHOLDER: &str = "{id}";

/// `memory.stat` under the docker hierarchy, then under systemd's slice.
pub const MEMORY_STAT_CANDIDATES: &[&str] = &[
    "fs/cgroup/memory/docker/{id}/memory.stat",
    "fs/cgroup/memory/system.slice/docker-{id}.scope/memory.stat",
];

/// `cpuacct.usage` under the docker hierarchy, then under systemd's slice.
pub const CPU_USAGE_CANDIDATES: &[&str] = &[
    "fs/cgroup/cpuacct/docker/{id}/cpuacct.usage",
    "fs/cgroup/cpuacct/system.slice/docker-{id}.scope/cpuacct.usage",
];

/// Returns the first candidate under `root` that exists for container `id`.
///
/// Candidates are tried in order and the first hit wins; later candidates
/// are not consulted. Only existence is checked.
pub fn locate<F>(
    fs: &F,
    root: &Path,
    family: MetricFamily,
    id: &str,
    templates: &[&str],
) -> Result<PathBuf, CollectError>
where
    F: FileSystem + ?Sized,
{
    templates
        .iter()
        .map(|template| root.join(template.replace(ID_PLACEHOLDER, id)))
        .find(|path| fs.exists(path))
        .ok_or_else(|| CollectError::NotFound {
            family,
            id: id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{MockFs, RealFs};

    const ID: &str = "4f66ad9a0b2e";

    #[test]
    fn test_locates_docker_hierarchy() {
        let fs = MockFs::new();
        fs.add_file(format!("/sys/fs/cgroup/memory/docker/{ID}/memory.stat"), "");

        let path = locate(&fs, Path::new("/sys"), MetricFamily::Memory, ID, MEMORY_STAT_CANDIDATES)
            .unwrap();
        assert_eq!(
            path,
            PathBuf::from(format!("/sys/fs/cgroup/memory/docker/{ID}/memory.stat"))
        );
    }

    #[test]
    fn test_locates_systemd_slice() {
        let fs = MockFs::new();
        fs.add_file(
            format!("/host/sys/fs/cgroup/cpuacct/system.slice/docker-{ID}.scope/cpuacct.usage"),
            "1",
        );

        let path = locate(&fs, Path::new("/host/sys"), MetricFamily::Cpu, ID, CPU_USAGE_CANDIDATES)
            .unwrap();
        assert!(path.ends_with(format!("docker-{ID}.scope/cpuacct.usage")));
    }

    #[test]
    fn test_first_candidate_wins() {
        let fs = MockFs::new();
        fs.add_file(format!("/sys/fs/cgroup/memory/docker/{ID}/memory.stat"), "");
        fs.add_file(
            format!("/sys/fs/cgroup/memory/system.slice/docker-{ID}.scope/memory.stat"),
            "",
        );

        let path = locate(&fs, Path::new("/sys"), MetricFamily::Memory, ID, MEMORY_STAT_CANDIDATES)
            .unwrap();
        assert!(path.starts_with("/sys/fs/cgroup/memory/docker"));
    }

    #[test]
    fn test_not_found_names_container() {
        let fs = MockFs::new();
        let err = locate(&fs, Path::new("/sys"), MetricFamily::Memory, ID, MEMORY_STAT_CANDIDATES)
            .unwrap_err();

        match err {
            CollectError::NotFound { family, id } => {
                assert_eq!(family, MetricFamily::Memory);
                assert_eq!(id, ID);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_locates_on_real_filesystem() {
        let root = tempfile::tempdir().unwrap();
        let dir = root
            .path()
            .join(format!("fs/cgroup/cpuacct/system.slice/docker-{ID}.scope"));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("cpuacct.usage"), "61239221\n").unwrap();

        let path = locate(&RealFs, root.path(), MetricFamily::Cpu, ID, CPU_USAGE_CANDIDATES)
            .unwrap();
        assert_eq!(path, dir.join("cpuacct.usage"));
    }
}
