//! Parser for flat `field value` accounting files such as `memory.stat`.

use std::collections::HashMap;

use super::ParseError;

/// Field name to value, one entry per non-blank line.
pub type KeyValueStats = HashMap<String, f64>;

/// Parses `field value` lines.
///
/// Blank lines are skipped. A line that does not hold exactly two fields,
/// or whose value is not numeric, fails the whole file. Duplicate fields
/// keep the last value.
pub fn parse_key_value_stats(content: &str) -> Result<KeyValueStats, ParseError> {
    let mut stats = KeyValueStats::new();

    for (idx, line) in content.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let Some(key) = fields.next() else {
            continue;
        };

        let (Some(raw), None) = (fields.next(), fields.next()) else {
            return Err(ParseError::MalformedLine {
                line: idx + 1,
                content: line.to_string(),
            });
        };

        let value: f64 = raw.parse().map_err(|_| ParseError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        })?;

        stats.insert(key.to_string(), value);
    }

    Ok(stats)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const MEMORY_STAT: &str = "
cache 3293184
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
hierarchical_memsw_limit 9223372036854771712
total_cache 3293184
total_rss 487424
total_rss_huge 0
total_mapped_file 2732032
total_dirty 0
total_writeback 0
total_swap 0
total_pgpgin 2694
total_pgpgout 1771
total_pgfault 2367
total_pgmajfault 32
total_inactive_anon 0
total_active_anon 487424
total_inactive_file 0
total_active_file 3293184
total_unevictable 0
recent_rotated_anon 1890
recent_rotated_file 804
recent_scanned_anon 1890
recent_scanned_file 804
";

    #[test]
    fn test_parse_memory_stat() {
        let stats = parse_key_value_stats(MEMORY_STAT).unwrap();

        assert_eq!(stats.len(), 38);
        assert_eq!(stats["rss"], 487424.0);
        assert_eq!(stats["cache"], 3293184.0);
        assert_eq!(stats["recent_scanned_file"], 804.0);
        assert_eq!(stats["hierarchical_memory_limit"], 9223372036854771712.0);
    }

    #[test]
    fn test_blank_lines_produce_no_entries() {
        let stats = parse_key_value_stats("\n\nrss 1\n   \n\ncache 2\n\n").unwrap();
        assert_eq!(stats.len(), 2);
        assert!(!stats.contains_key(""));
    }

    #[test]
    fn test_duplicate_key_keeps_last_value() {
        let stats = parse_key_value_stats("rss 1\nrss 5\n").unwrap();
        assert_eq!(stats["rss"], 5.0);
    }

    #[test]
    fn test_non_numeric_value_fails_whole_file() {
        let err = parse_key_value_stats("rss 1\ncache lots\nswap 0\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidValue {
                key: "cache".to_string(),
                value: "lots".to_string(),
            }
        );
    }

    #[test]
    fn test_single_field_line_is_malformed() {
        let err = parse_key_value_stats("rss 1\ncache\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedLine { line: 2, .. }));
    }

    #[test]
    fn test_extra_field_line_is_malformed() {
        let err = parse_key_value_stats("rss 1 2\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedLine { line: 1, .. }));
    }

    #[test]
    fn test_parsing_is_idempotent() {
        assert_eq!(
            parse_key_value_stats(MEMORY_STAT).unwrap(),
            parse_key_value_stats(MEMORY_STAT).unwrap()
        );
    }
}
