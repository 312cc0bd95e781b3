//! Value and date formatting shared by both renderers.
//!
//! Dates follow es-CO short conventions: `d/m/yyyy` for dates and
//! `d/m/yyyy, h:mm:ss a. m.` for date-times. Timestamps are rendered in
//! the wall-clock time they were written with; no timezone conversion
//! happens, so output never depends on the host clock or zone.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde_json::Value;

/// Text of a scalar value, or `None` for null, blank strings and
/// structured values.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Readable dump of any value: scalars inline, structures as indented JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}

/// Single-line form of a value, used inside bulleted lists.
pub fn inline_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Strip trailing whitespace and periods so a value can end a sentence.
pub fn clause(text: &str) -> &str {
    text.trim().trim_end_matches('.').trim_end()
}

// ── Dates ─────────────────────────────────────────────────────────────────

/// A parsed timestamp and whether the source carried a time of day.
struct Parsed {
    at: NaiveDateTime,
    has_time: bool,
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

fn parse_text(raw: &str) -> Option<Parsed> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(Parsed {
            at: dt.naive_local(),
            has_time: true,
        });
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Parsed { at, has_time: true });
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(Parsed {
                at: date.and_hms_opt(0, 0, 0)?,
                has_time: false,
            });
        }
    }

    None
}

fn parse_value(value: &Value) -> Option<Parsed> {
    match value {
        Value::String(s) => parse_text(s),
        // Epoch milliseconds, as browsers send them.
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| Parsed {
                at: dt.naive_utc(),
                has_time: true,
            }),
        _ => None,
    }
}

fn short_date(at: &NaiveDateTime) -> String {
    format!("{}/{}/{}", at.day(), at.month(), at.year())
}

fn short_datetime(at: &NaiveDateTime) -> String {
    let (pm, hour) = at.hour12();
    let meridiem = if pm { "p. m." } else { "a. m." };
    format!(
        "{}, {}:{:02}:{:02} {}",
        short_date(at),
        hour,
        at.minute(),
        at.second(),
        meridiem
    )
}

/// Format a value as a short date. Unparseable input is returned verbatim.
pub fn format_date(value: &Value) -> Option<String> {
    match parse_value(value) {
        Some(parsed) => Some(short_date(&parsed.at)),
        None => scalar_text(value),
    }
}

/// Format a value as a short date-time. Unparseable input is returned verbatim.
pub fn format_datetime(value: &Value) -> Option<String> {
    match parse_value(value) {
        Some(parsed) => Some(short_datetime(&parsed.at)),
        None => scalar_text(value),
    }
}

/// Date-time when the source has a time of day, date otherwise.
pub fn format_timestamp(value: &Value) -> Option<String> {
    match parse_value(value) {
        Some(parsed) if parsed.has_time => Some(short_datetime(&parsed.at)),
        Some(parsed) => Some(short_date(&parsed.at)),
        None => scalar_text(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_text_skips_blank_and_structures() {
        assert_eq!(scalar_text(&json!("  Ana ")), Some("Ana".into()));
        assert_eq!(scalar_text(&json!(45)), Some("45".into()));
        assert_eq!(scalar_text(&json!(72.5)), Some("72.5".into()));
        assert_eq!(scalar_text(&json!("")), None);
        assert_eq!(scalar_text(&json!(null)), None);
        assert_eq!(scalar_text(&json!({"a": 1})), None);
    }

    #[test]
    fn display_value_indents_structures() {
        assert_eq!(display_value(&json!({"a": 1})), "{\n  \"a\": 1\n}");
        assert_eq!(display_value(&json!("texto")), "texto");
        assert_eq!(display_value(&json!(false)), "false");
    }

    #[test]
    fn clause_drops_trailing_periods() {
        assert_eq!(clause(" Normocéfalo. "), "Normocéfalo");
        assert_eq!(clause("Sin hallazgos..."), "Sin hallazgos");
    }

    #[test]
    fn date_formats_day_first_without_padding() {
        assert_eq!(format_date(&json!("1980-03-05")), Some("5/3/1980".into()));
        assert_eq!(
            format_date(&json!("1980-03-05T23:59:00Z")),
            Some("5/3/1980".into())
        );
    }

    #[test]
    fn datetime_uses_twelve_hour_clock() {
        assert_eq!(
            format_datetime(&json!("2024-03-15T10:30:00")),
            Some("15/3/2024, 10:30:00 a. m.".into())
        );
        assert_eq!(
            format_datetime(&json!("2024-03-15T14:05:09.123-05:00")),
            Some("15/3/2024, 2:05:09 p. m.".into())
        );
        assert_eq!(
            format_datetime(&json!("2024-03-15 00:00:00")),
            Some("15/3/2024, 12:00:00 a. m.".into())
        );
    }

    #[test]
    fn epoch_millis_are_dates() {
        assert_eq!(
            format_datetime(&json!(0)),
            Some("1/1/1970, 12:00:00 a. m.".into())
        );
    }

    #[test]
    fn unparseable_dates_render_verbatim() {
        assert_eq!(format_date(&json!("ayer")), Some("ayer".into()));
        assert_eq!(format_datetime(&json!("")), None);
    }

    #[test]
    fn timestamp_keeps_date_only_inputs_short() {
        assert_eq!(format_timestamp(&json!("2024-01-02")), Some("2/1/2024".into()));
        assert_eq!(
            format_timestamp(&json!("2024-01-02T08:00:00")),
            Some("2/1/2024, 8:00:00 a. m.".into())
        );
    }
}
