//! Accounting file contents captured from a docker host.

use dockwatch::fs::MockFs;
use std::path::Path;

pub const SYS_ROOT: &str = "/sys";
pub const PROC_ROOT: &str = "/proc";

/// rss 487424 + cache 3293184 = 3780608 bytes in use.
pub const MEMORY_STAT: &str = "cache 3293184
rss 487424
rss_huge 0
mapped_file 2732032
dirty 0
writeback 0
swap 0
pgpgin 2694
pgpgout 1771
pgfault 2367
pgmajfault 32
inactive_anon 0
active_anon 487424
inactive_file 0
active_file 3293184
unevictable 0
hierarchical_memory_limit 9223372036854771712
total_cache 3293184
total_rss 487424
";

pub const CPUACCT_USAGE: &str = "61239221\n";

pub const NET_DEV: &str = "Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
  eth0:     648       8    0    0    0     0          0         0     4412      30    0    0    0     0       0          0
    lo:       0       0    0    0    0     0          0         0        0       0    0    0    0     0       0          0
";

/// Adds memory, cpu and network files for a container.
pub fn add_container(fs: &MockFs, id: &str, pid: i64) {
    fs.add_container_cgroup(Path::new(SYS_ROOT), id, MEMORY_STAT, CPUACCT_USAGE);
    fs.add_net_dev(Path::new(PROC_ROOT), pid, NET_DEV);
}
