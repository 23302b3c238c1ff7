//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged on top of
//! the configuration from the `dockwatch.toml` file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Prometheus exporter for per-container memory, CPU and network usage.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address the metrics server listens on.
    #[arg(long, value_name = "ADDR")]
    pub listen_address: Option<SocketAddr>,

    /// Mount point of sysfs.
    #[arg(long, value_name = "DIR")]
    pub sys_root: Option<PathBuf>,

    /// Mount point of procfs.
    #[arg(long, value_name = "DIR")]
    pub proc_root: Option<PathBuf>,

    /// Unix socket of the Docker daemon.
    #[arg(long, value_name = "PATH")]
    pub docker_socket: Option<String>,

    /// Comma separated metric families (presence, memory, cpu, network).
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub families: Option<Vec<String>>,

    /// Log level, used when RUST_LOG is not set.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(addr) = self.listen_address {
            insert_nested(&mut dict, "metrics.listen_address", Value::from(addr.to_string()));
        }

        if let Some(root) = &self.sys_root {
            insert_nested(
                &mut dict,
                "collection.sys_root",
                Value::from(root.display().to_string()),
            );
        }

        if let Some(root) = &self.proc_root {
            insert_nested(
                &mut dict,
                "collection.proc_root",
                Value::from(root.display().to_string()),
            );
        }

        if let Some(socket) = &self.docker_socket {
            insert_nested(&mut dict, "docker.socket_path", Value::from(socket.clone()));
        }

        // Family names are checked when the figment is extracted.
        if let Some(families) = &self.families {
            let names: Vec<Value> = families
                .iter()
                .map(|f| Value::from(f.trim().to_lowercase()))
                .collect();
            insert_nested(&mut dict, "collection.families", Value::Array(Tag::Default, names));
        }

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}

/// Inserts `value` at a dotted `path`, creating intermediate tables.
fn insert_nested(dict: &mut Dict, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            dict.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = dict
                .entry(head.to_string())
                .or_insert_with(|| Value::Dict(Tag::Default, Dict::new()));
            if let Value::Dict(_, inner) = entry {
                insert_nested(inner, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_flags_provide_nothing() {
        let data = Cli::default().data().unwrap();
        assert!(data[&Profile::Default].is_empty());
    }

    #[test]
    fn test_flags_are_nested() {
        let cli = Cli::parse_from([
            "dockwatch",
            "--listen-address",
            "127.0.0.1:9000",
            "--docker-socket",
            "/run/docker.sock",
            "--families",
            "cpu,Memory",
        ]);
        let data = cli.data().unwrap();
        let dict = &data[&Profile::Default];

        let Some(Value::Dict(_, metrics)) = dict.get("metrics") else {
            panic!("metrics table missing");
        };
        assert_eq!(
            metrics.get("listen_address").and_then(|v| v.as_str()),
            Some("127.0.0.1:9000")
        );

        let Some(Value::Dict(_, collection)) = dict.get("collection") else {
            panic!("collection table missing");
        };
        let Value::Array(_, items) = &collection["families"] else {
            panic!("families is not an array");
        };
        let families: Vec<&str> = items
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(families, vec!["cpu", "memory"]);
    }

    #[test]
    fn test_insert_nested_keeps_siblings() {
        let mut dict = Dict::new();
        insert_nested(&mut dict, "collection.sys_root", Value::from("/host/sys"));
        insert_nested(&mut dict, "collection.proc_root", Value::from("/host/proc"));

        let Some(Value::Dict(_, collection)) = dict.get("collection") else {
            panic!("collection table missing");
        };
        assert_eq!(collection.len(), 2);
    }
}
