//! Text formatting for rendered field slots.

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;

/// How a timestamp should be decorated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTimeStyle {
    /// Append the UTC offset, e.g. `(UTC+01:00)`.
    pub add_offset: bool,
    /// Append the configured time zone name.
    pub append_time_zone: bool,
}

impl DateTimeStyle {
    pub const FULL: Self = Self {
        add_offset: true,
        append_time_zone: true,
    };
}

/// The console user's display preferences.
///
/// `time_zone` is resolved as an IANA zone so each instant gets the offset in
/// force at that moment. Names that don't resolve use the fixed offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPreferences {
    pub time_zone: String,
    zone: Option<Tz>,
    offset: FixedOffset,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            time_zone: "UTC".into(),
            zone: Some(Tz::UTC),
            offset: utc(),
        }
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

impl UserPreferences {
    /// `utc_offset_minutes` only applies when `time_zone` is not a known zone
    /// name. Offsets outside ±24h fall back to UTC.
    pub fn new(time_zone: impl Into<String>, utc_offset_minutes: i32) -> Self {
        let time_zone = time_zone.into();
        let zone = time_zone.trim().parse::<Tz>().ok();
        if zone.is_none() {
            log::debug!("Unknown time zone {time_zone:?}; using fixed offset of {utc_offset_minutes} minutes");
        }
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(utc);
        Self {
            time_zone,
            zone,
            offset,
        }
    }

    /// Offset from UTC at `instant`.
    pub fn offset_at(&self, instant: &DateTime<Utc>) -> FixedOffset {
        match self.zone {
            Some(zone) => zone.offset_from_utc_datetime(&instant.naive_utc()).fix(),
            None => self.offset,
        }
    }

    /// Render an epoch-millisecond or RFC 3339 timestamp in the user's zone.
    /// Returns `None` when the value is not a timestamp.
    pub fn format_date_time(&self, value: &Value, style: DateTimeStyle) -> Option<String> {
        let instant = parse_instant(value)?;
        let local = instant.with_timezone(&self.offset_at(&instant));
        let mut out = local.format("%Y-%m-%d %H:%M:%S%.3f").to_string();
        if style.add_offset {
            out.push_str(&format!(" (UTC{})", local.format("%:z")));
        }
        if style.append_time_zone && !self.time_zone.is_empty() {
            out.push(' ');
            out.push_str(&self.time_zone);
        }
        Some(out)
    }
}

fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

/// Entity-escape text for insertion into HTML.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Display text for an attribute value: strings verbatim, numbers and
/// booleans as-is, structures as compact JSON, null as nothing.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        _ => value.to_string(),
    }
}

/// [`scalar_text`], entity-escaped.
pub fn scalar_html(value: &Value) -> String {
    escape_html(&scalar_text(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // 2016-05-10T12:34:56.789Z
    const ARRIVAL: i64 = 1_462_883_696_789;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn scalar_rendering() {
        assert_eq!(scalar_html(&json!("<b>")), "&lt;b&gt;");
        assert_eq!(scalar_html(&json!(4)), "4");
        assert_eq!(scalar_html(&json!(true)), "true");
        assert_eq!(scalar_html(&json!(null)), "");
        assert_eq!(scalar_html(&json!({"a": "<"})), "{&quot;a&quot;:&quot;&lt;&quot;}");
    }

    #[test]
    fn utc_timestamp_with_offset_and_zone() {
        let prefs = UserPreferences::default();
        let out = prefs.format_date_time(&json!(ARRIVAL), DateTimeStyle::FULL).unwrap();
        assert_eq!(out, "2016-05-10 12:34:56.789 (UTC+00:00) UTC");
    }

    #[test]
    fn timestamp_in_user_zone() {
        let prefs = UserPreferences::new("Europe/Berlin", 120);
        let out = prefs.format_date_time(&json!(ARRIVAL), DateTimeStyle::FULL).unwrap();
        assert_eq!(out, "2016-05-10 14:34:56.789 (UTC+02:00) Europe/Berlin");
    }

    #[test]
    fn daylight_saving_changes_the_offset() {
        let prefs = UserPreferences::new("Europe/Berlin", 0);
        // 2016-01-10T12:00:00Z
        let winter = prefs.format_date_time(&json!(1_452_427_200_000_i64), DateTimeStyle::FULL).unwrap();
        assert_eq!(winter, "2016-01-10 13:00:00.000 (UTC+01:00) Europe/Berlin");
        let summer = prefs.format_date_time(&json!(ARRIVAL), DateTimeStyle::FULL).unwrap();
        assert_eq!(summer, "2016-05-10 14:34:56.789 (UTC+02:00) Europe/Berlin");
    }

    #[test]
    fn zone_name_wins_over_configured_offset() {
        let prefs = UserPreferences::new("America/New_York", 120);
        // 2016-01-10T12:00:00Z
        let out = prefs
            .format_date_time(&json!(1_452_427_200_000_i64), DateTimeStyle { add_offset: true, append_time_zone: false })
            .unwrap();
        assert_eq!(out, "2016-01-10 07:00:00.000 (UTC-05:00)");
    }

    #[test]
    fn unknown_zone_uses_fixed_offset() {
        let prefs = UserPreferences::new("Lab time", 90);
        let out = prefs.format_date_time(&json!(ARRIVAL), DateTimeStyle::FULL).unwrap();
        assert_eq!(out, "2016-05-10 14:04:56.789 (UTC+01:30) Lab time");
    }

    #[test]
    fn negative_offsets() {
        let prefs = UserPreferences::new("America/New_York", -240);
        let out = prefs
            .format_date_time(&json!(ARRIVAL), DateTimeStyle { add_offset: true, append_time_zone: false })
            .unwrap();
        assert_eq!(out, "2016-05-10 08:34:56.789 (UTC-04:00)");
    }

    #[test]
    fn rfc3339_strings_are_accepted() {
        let prefs = UserPreferences::default();
        let out = prefs
            .format_date_time(&json!("2016-05-10T14:34:56.789+02:00"), DateTimeStyle::default())
            .unwrap();
        assert_eq!(out, "2016-05-10 12:34:56.789");
    }

    #[test]
    fn non_timestamps_are_rejected() {
        let prefs = UserPreferences::default();
        assert!(prefs.format_date_time(&json!("yesterday"), DateTimeStyle::FULL).is_none());
        assert!(prefs.format_date_time(&json!(null), DateTimeStyle::FULL).is_none());
    }

    #[test]
    fn absurd_offset_falls_back_to_utc() {
        let prefs = UserPreferences::new("Nowhere", 100_000);
        let instant = Utc.timestamp_millis_opt(ARRIVAL).unwrap();
        assert_eq!(prefs.offset_at(&instant), utc());
    }
}
