use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;

/// Numeric timestamps at or below this value are interpreted as seconds.
const MILLIS_THRESHOLD: f64 = 1.0e12;

/// Normalizes a raw timestamp value into canonical epoch milliseconds.
///
/// Accepts a JSON number, a numeric string, or an ISO-8601 string. Anything
/// that cannot be parsed yields `now_ms` (fail-open): a malformed timestamp
/// must never abort the merge pipeline, even if the message lands slightly
/// out of order. Callers that need strictness validate before calling.
pub fn to_epoch_millis(raw: &Value, now_ms: i64) -> i64 {
    match raw {
        Value::Number(number) => number
            .as_f64()
            .map(numeric_to_millis)
            .unwrap_or(now_ms),
        Value::String(text) => string_to_millis(text).unwrap_or(now_ms),
        _ => now_ms,
    }
}

/// Same policy for timestamps that may be absent from the payload entirely.
pub fn field_to_epoch_millis(raw: Option<&Value>, now_ms: i64) -> i64 {
    raw.map(|value| to_epoch_millis(value, now_ms))
        .unwrap_or(now_ms)
}

fn numeric_to_millis(value: f64) -> i64 {
    if value.abs() <= MILLIS_THRESHOLD {
        (value * 1000.0) as i64
    } else {
        value as i64
    }
}

fn string_to_millis(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(numeric) = trimmed.parse::<f64>() {
        return Some(numeric_to_millis(numeric));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.timestamp_millis());
    }

    // Upstream occasionally drops the timezone designator.
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW_MS: i64 = 1_700_000_000_000;

    #[test]
    fn treats_small_numbers_as_seconds() {
        assert_eq!(
            to_epoch_millis(&json!(1_690_000_000), NOW_MS),
            1_690_000_000_000
        );
    }

    #[test]
    fn keeps_large_numbers_as_millis() {
        assert_eq!(
            to_epoch_millis(&json!(1_690_000_000_123_i64), NOW_MS),
            1_690_000_000_123
        );
    }

    #[test]
    fn parses_numeric_strings_with_seconds_heuristic() {
        assert_eq!(
            to_epoch_millis(&json!("1690000000"), NOW_MS),
            1_690_000_000_000
        );
        assert_eq!(
            to_epoch_millis(&json!("1690000000123"), NOW_MS),
            1_690_000_000_123
        );
    }

    #[test]
    fn parses_rfc3339_strings() {
        assert_eq!(
            to_epoch_millis(&json!("2023-07-22T05:46:40Z"), NOW_MS),
            1_690_000_000_000
        );
    }

    #[test]
    fn parses_naive_datetime_strings_as_utc() {
        assert_eq!(
            to_epoch_millis(&json!("2023-07-22T05:46:40"), NOW_MS),
            1_690_000_000_000
        );
    }

    #[test]
    fn falls_open_to_now_for_garbage_input() {
        assert_eq!(to_epoch_millis(&json!("yesterday-ish"), NOW_MS), NOW_MS);
        assert_eq!(to_epoch_millis(&json!(null), NOW_MS), NOW_MS);
        assert_eq!(to_epoch_millis(&json!({"t": 1}), NOW_MS), NOW_MS);
        assert_eq!(to_epoch_millis(&json!(""), NOW_MS), NOW_MS);
    }

    #[test]
    fn missing_field_falls_open_to_now() {
        assert_eq!(field_to_epoch_millis(None, NOW_MS), NOW_MS);

        let value = json!(1_690_000_000);
        assert_eq!(
            field_to_epoch_millis(Some(&value), NOW_MS),
            1_690_000_000_000
        );
    }
}
