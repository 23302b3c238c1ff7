//! Parser for nanosecond counter files such as `cpuacct.usage`.

use std::time::Duration;

use super::ParseError;

/// Parses a file of one-nanosecond-counter-per-line and returns the last
/// counter in seconds.
///
/// Every line is scanned. Only the last value counts; earlier ones are
/// overwritten, not summed. A non-numeric line aborts with the seconds
/// parsed so far attached to the error.
pub fn parse_scalar_seconds(content: &str) -> Result<f64, ParseError> {
    let mut seconds = 0.0;

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let nanos: u64 = line.parse().map_err(|_| ParseError::InvalidScalar {
            line: idx + 1,
            content: line.to_string(),
            partial_seconds: seconds,
        })?;
        seconds = Duration::from_nanos(nanos).as_secs_f64();
    }

    Ok(seconds)
}
