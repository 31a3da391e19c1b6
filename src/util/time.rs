use chrono::{DateTime, Duration, SecondsFormat, Utc};

// Parse a window string like "365d", "52w", "36h" or a bare day count into a positive span.
// Returns None if unparseable or not positive.
pub fn parse_window(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (num, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], Some(c.to_ascii_lowercase())),
        Some(_) => (s, None),
        None => return None,
    };
    let n = num.trim().parse::<i64>().ok().filter(|n| *n > 0)?;
    match unit {
        None | Some('d') => Duration::try_days(n),
        Some('w') => Duration::try_weeks(n),
        Some('h') => Duration::try_hours(n),
        _ => None,
    }
}

// clap value_parser for --inactive-after
pub fn parse_window_arg(s: &str) -> Result<Duration, String> {
    parse_window(s).ok_or_else(|| format!("invalid window {s:?}; expected e.g. \"365d\", \"52w\" or a day count"))
}

// Compact age like "412d" or "5h" for log lines.
pub fn format_age(d: Duration) -> String {
    if d.num_days() >= 1 { format!("{}d", d.num_days()) } else { format!("{}h", d.num_hours().max(0)) }
}

pub fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_units_and_bare_days() {
        assert_eq!(parse_window("365d"), Some(Duration::days(365)));
        assert_eq!(parse_window("365"), Some(Duration::days(365)));
        assert_eq!(parse_window("52W"), Some(Duration::weeks(52)));
        assert_eq!(parse_window(" 36h "), Some(Duration::hours(36)));
    }

    #[test]
    fn rejects_garbage_and_non_positive() {
        for s in ["", "d", "0d", "-3d", "3m", "abc", "1.5d"] {
            assert_eq!(parse_window(s), None, "{s}");
        }
        assert!(parse_window_arg("soon").is_err());
    }

    #[test]
    fn age_prefers_days() {
        assert_eq!(format_age(Duration::days(400) + Duration::hours(3)), "400d");
        assert_eq!(format_age(Duration::hours(5)), "5h");
    }
}
