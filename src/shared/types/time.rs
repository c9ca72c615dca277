//! Wall-clock formatting for event payloads
//!
//! Events carry local timestamps rendered as `yyyy-MM-dd HH:mm:ss`.

use chrono::{DateTime, Local, NaiveDateTime, Timelike, Utc};

pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Convert a stored UTC instant to local wall-clock time, truncated to seconds.
pub fn to_local(instant: DateTime<Utc>) -> NaiveDateTime {
    let local = instant.with_timezone(&Local).naive_local();
    local.with_nanosecond(0).unwrap_or(local)
}

/// Serde adapter for `NaiveDateTime` fields
pub mod event_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::EVENT_TIME_FORMAT;

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(EVENT_TIME_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, EVENT_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<NaiveDateTime>` fields
pub mod event_time_option {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::EVENT_TIME_FORMAT;

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.collect_str(&v.format(EVENT_TIME_FORMAT)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| {
                NaiveDateTime::parse_from_str(&raw, EVENT_TIME_FORMAT)
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "event_time")]
        at: NaiveDateTime,
        #[serde(with = "event_time_option")]
        until: Option<NaiveDateTime>,
    }

    #[test]
    fn formats_without_fraction_or_zone() {
        let at = NaiveDate::from_ymd_opt(2025, 11, 7)
            .unwrap()
            .and_hms_milli_opt(9, 5, 3, 750)
            .unwrap();
        let json = serde_json::to_value(Stamped { at, until: None }).unwrap();
        assert_eq!(json["at"], "2025-11-07 09:05:03");
        assert!(json["until"].is_null());
    }

    #[test]
    fn parses_back_the_wire_format() {
        let parsed: Stamped =
            serde_json::from_str(r#"{"at":"2025-01-02 03:04:05","until":"2025-01-02 04:00:00"}"#)
                .unwrap();
        assert_eq!(parsed.at.format(EVENT_TIME_FORMAT).to_string(), "2025-01-02 03:04:05");
        assert!(parsed.until.is_some());
    }

    #[test]
    fn to_local_drops_sub_second_precision() {
        let local = to_local(Utc::now());
        assert_eq!(local.nanosecond(), 0);
    }
}
