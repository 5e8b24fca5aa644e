//! `grpc-timeout` Header
//!
//! The caller's deadline travels as `grpc-timeout: <1-8 digits><unit>` where
//! the unit is one of `H` (hours), `M` (minutes), `S` (seconds),
//! `m` (milliseconds), `u` (microseconds) or `n` (nanoseconds).

use std::time::Duration;

use tonic::metadata::MetadataMap;

/// Header carrying the caller's timeout.
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

const MAX_DIGITS: usize = 8;

/// Parse a `grpc-timeout` value. Malformed values yield `None`.
#[must_use]
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    let unit = value.chars().last()?;
    let digits = &value[..value.len() - unit.len_utf8()];
    if digits.is_empty() || digits.len() > MAX_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    let duration = match unit {
        'H' => Duration::from_secs(amount * 3600),
        'M' => Duration::from_secs(amount * 60),
        'S' => Duration::from_secs(amount),
        'm' => Duration::from_millis(amount),
        'u' => Duration::from_micros(amount),
        'n' => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(duration)
}

/// Timeout requested by the caller, if any.
#[must_use]
pub fn request_timeout(metadata: &MetadataMap) -> Option<Duration> {
    let value = metadata.get(GRPC_TIMEOUT_HEADER)?.to_str().ok()?;
    let timeout = parse_grpc_timeout(value);
    if timeout.is_none() {
        tracing::warn!(value, "Ignoring malformed grpc-timeout header");
    }
    timeout
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1H", Duration::from_secs(3600); "hours")]
    #[test_case("2M", Duration::from_secs(120); "minutes")]
    #[test_case("4S", Duration::from_secs(4); "seconds")]
    #[test_case("3999m", Duration::from_millis(3999); "millis")]
    #[test_case("250u", Duration::from_micros(250); "micros")]
    #[test_case("99999999n", Duration::from_nanos(99_999_999); "eight digit nanos")]
    fn parses_units(value: &str, expected: Duration) {
        assert_eq!(parse_grpc_timeout(value), Some(expected));
    }

    #[test_case(""; "empty")]
    #[test_case("S"; "no digits")]
    #[test_case("10"; "no unit")]
    #[test_case("10s"; "unknown unit")]
    #[test_case("123456789m"; "too many digits")]
    #[test_case("-5S"; "sign")]
    #[test_case("1.5S"; "fraction")]
    fn rejects_malformed(value: &str) {
        assert_eq!(parse_grpc_timeout(value), None);
    }

    #[test]
    fn reads_header_from_metadata() {
        let mut metadata = MetadataMap::new();
        assert_eq!(request_timeout(&metadata), None);

        metadata.insert(GRPC_TIMEOUT_HEADER, "1500m".parse().unwrap());
        assert_eq!(request_timeout(&metadata), Some(Duration::from_millis(1500)));
    }
}
