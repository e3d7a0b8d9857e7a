use tokio::time::Duration;

/// Parses a duration string such as "30s", "15m", "2h", "1d", "500ms" or a
/// compound form like "1m30s".
///
/// Supported units:
/// - `ms` for milliseconds
/// - `s` for seconds
/// - `m` for minutes
/// - `h` for hours
/// - `d` for days
///
/// A bare `0` is accepted as a zero duration.
pub fn parse_duration_string(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration string cannot be empty".to_string());
    }

    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    let mut rest = s;

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (value_str, after_value) = rest.split_at(digits_end);

        let value: u64 = value_str
            .parse()
            .map_err(|_| format!("Invalid numeric value in duration: '{}'", s))?;

        let unit_end = after_value
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(after_value.len());
        let (unit, remaining) = after_value.split_at(unit_end);

        let component = match unit {
            "ms" => Some(Duration::from_millis(value)),
            "s" => Some(Duration::from_secs(value)),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "h" => value.checked_mul(60 * 60).map(Duration::from_secs),
            "d" => value.checked_mul(24 * 60 * 60).map(Duration::from_secs),
            "" => {
                return Err(format!(
                    "Unknown duration unit in '{}': missing unit. Use 'ms', 's', 'm', 'h', or 'd'.",
                    s
                ))
            }
            other => {
                return Err(format!(
                    "Unknown duration unit: '{}'. Use 'ms', 's', 'm', 'h', or 'd'.",
                    other
                ))
            }
        };

        total = component
            .and_then(|c| total.checked_add(c))
            .ok_or_else(|| format!("Duration '{}' is too large", s))?;
        rest = remaining;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minutes() {
        assert_eq!(
            parse_duration_string("15m").unwrap(),
            Duration::from_secs(900)
        );
    }

    #[test]
    fn parse_seconds() {
        assert_eq!(
            parse_duration_string("30s").unwrap(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn parse_hours_and_days() {
        assert_eq!(
            parse_duration_string("5h").unwrap(),
            Duration::from_secs(18000)
        );
        assert_eq!(
            parse_duration_string("3d").unwrap(),
            Duration::from_secs(259200)
        );
    }

    #[test]
    fn parse_milliseconds() {
        assert_eq!(
            parse_duration_string("250ms").unwrap(),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn parse_compound() {
        assert_eq!(
            parse_duration_string("1m30s").unwrap(),
            Duration::from_secs(90)
        );
        assert_eq!(
            parse_duration_string("1h2m3s").unwrap(),
            Duration::from_secs(3723)
        );
        assert_eq!(
            parse_duration_string("2s500ms").unwrap(),
            Duration::from_millis(2500)
        );
    }

    #[test]
    fn parse_zero_forms() {
        assert_eq!(parse_duration_string("0s").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration_string("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(
            parse_duration_string("  10m  ").unwrap(),
            Duration::from_secs(600)
        );
    }

    #[test]
    fn overflowing_durations_error() {
        let err = parse_duration_string("18446744073709551615m").unwrap_err();
        assert!(err.contains("too large"), "error was: {}", err);

        let err = parse_duration_string("18446744073709551615s1s").unwrap_err();
        assert!(err.contains("too large"), "error was: {}", err);

        assert_eq!(
            parse_duration_string("18446744073709551615s").unwrap(),
            Duration::from_secs(u64::MAX)
        );
    }

    #[test]
    fn empty_string_errors() {
        let err = parse_duration_string("   ").unwrap_err();
        assert!(err.contains("empty"), "error was: {}", err);
    }

    #[test]
    fn unknown_suffix_errors() {
        let err = parse_duration_string("10x").unwrap_err();
        assert!(err.contains("Unknown duration unit"), "error was: {}", err);
    }

    #[test]
    fn no_suffix_errors() {
        let err = parse_duration_string("10").unwrap_err();
        assert!(err.contains("missing unit"), "error was: {}", err);
    }

    #[test]
    fn no_number_errors() {
        let err = parse_duration_string("m").unwrap_err();
        assert!(err.contains("Invalid numeric"), "error was: {}", err);
    }

    #[test]
    fn fractional_number_errors() {
        // "5" parses, then ".5h" is not a known unit
        assert!(parse_duration_string("5.5h").is_err());
    }

    #[test]
    fn negative_number_errors() {
        let err = parse_duration_string("-5m").unwrap_err();
        assert!(err.contains("Invalid numeric"), "error was: {}", err);
    }
}
