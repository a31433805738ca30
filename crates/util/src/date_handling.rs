//! Timestamp parsing and display formatting.
//!
//! The backend returns naive ISO timestamps (implicitly UTC) while the client
//! writes RFC 3339 with a `Z` suffix; both are accepted here.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use flowdesk_types::DisplaySettings;

/// Renders `now` the way the client stores timestamps in workflow data.
pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses RFC 3339, naive ISO date-time, or plain date strings.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Formats a stored timestamp for display according to the user's settings.
///
/// `date_format` of `12h` uses a 12 hour clock; anything else uses 24 hours.
/// Unparseable input is returned unchanged.
pub fn format_timestamp(raw: &str, settings: &DisplaySettings) -> String {
    let Some(parsed) = parse_timestamp(raw) else {
        return raw.to_string();
    };
    let pattern = if settings.date_format == "12h" { "%Y-%m-%d %I:%M %p" } else { "%Y-%m-%d %H:%M" };
    parsed.format(pattern).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_backend_and_client_timestamps() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 14, 30, 0).single().expect("valid date");
        assert_eq!(parse_timestamp("2024-05-01T14:30:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T14:30:00.123456").map(|value| value.timestamp()), Some(expected.timestamp()));
        assert!(parse_timestamp("2024-05-01").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn formats_with_clock_preference() {
        let mut settings = DisplaySettings::default();
        assert_eq!(format_timestamp("2024-05-01T14:30:00Z", &settings), "2024-05-01 14:30");
        settings.date_format = "12h".into();
        assert_eq!(format_timestamp("2024-05-01T14:30:00Z", &settings), "2024-05-01 02:30 PM");
        assert_eq!(format_timestamp("n/a", &settings), "n/a");
    }

    #[test]
    fn iso_timestamp_uses_millis_and_z() {
        let moment = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().expect("valid date");
        assert_eq!(iso_timestamp(moment), "2024-01-02T03:04:05.000Z");
    }
}
