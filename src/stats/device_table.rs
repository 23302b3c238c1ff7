//! Parser for the `/proc/<pid>/net/dev` device table.
//!
//! ```text
//! Inter-|   Receive                                                |  Transmit
//!  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets ...
//!     lo: 580019245 1087616    0    0    0     0          0         0 580019245 1087616 ...
//! ```
//!
//! The first line is decoration. The second names the topics of the receive
//! and transmit halves, which share order and count. Each following line is
//! an interface name followed by all receive values, then all transmit values.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::ParseError;

/// Data fields are separated by runs of spaces, the interface name by a colon.
static FIELD_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[ :] *").expect("field separator pattern is valid"));

/// Raw receive and transmit values of one topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Direction {
    pub receive: String,
    pub transmit: String,
}

/// Interface name to topic to raw values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceTable {
    topics: Vec<String>,
    interfaces: HashMap<String, HashMap<String, Direction>>,
}

impl DeviceTable {
    /// Topics declared by the header, in column order.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn interface(&self, name: &str) -> Option<&HashMap<String, Direction>> {
        self.interfaces.get(name)
    }

    pub fn get(&self, interface: &str, topic: &str) -> Option<&Direction> {
        self.interfaces.get(interface)?.get(topic)
    }

    pub fn interfaces(&self) -> impl Iterator<Item = (&str, &HashMap<String, Direction>)> {
        self.interfaces
            .iter()
            .map(|(name, topics)| (name.as_str(), topics))
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}

/// Parses a device table.
///
/// A header that does not split into exactly three `|` segments fails the
/// whole parse. A data row with fewer values than the header promises only
/// fills the topics it reaches; values past `2 * topics` are ignored.
pub fn parse_device_table(content: &str) -> Result<DeviceTable, ParseError> {
    let mut lines = content.lines();

    // title
    lines.next();

    let header = lines.next().unwrap_or_default();
    let segments: Vec<&str> = header.split('|').collect();
    let [_, receive, _] = segments.as_slice() else {
        return Err(ParseError::MalformedHeader {
            header: header.to_string(),
        });
    };

    let topics: Vec<String> = receive.split_whitespace().map(str::to_string).collect();
    if topics.is_empty() {
        return Err(ParseError::MissingTopics);
    }

    let mut interfaces = HashMap::new();
    for line in lines {
        let line = line.trim_start();
        if line.is_empty() {
            continue;
        }

        let mut tokens = FIELD_SEPARATOR.split(line);
        let Some(name) = tokens.next() else {
            continue;
        };

        let mut row: HashMap<String, Direction> = HashMap::with_capacity(topics.len());
        for (index, value) in tokens.take(2 * topics.len()).enumerate() {
            let direction = row.entry(topics[index % topics.len()].clone()).or_default();
            if index < topics.len() {
                direction.receive = value.to_string();
            } else {
                direction.transmit = value.to_string();
            }
        }

        interfaces.insert(name.to_string(), row);
    }

    Ok(DeviceTable { topics, interfaces })
}
