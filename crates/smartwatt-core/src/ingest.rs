// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of SmartWatt.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Smart meter payloads
//!
//! Meters post `{"meter_id": "METER001", "consumption_kwh": 2.5, "timestamp": "2026-02-21T12:34:00"}`.
//! The timestamp is optional.

use crate::error::{EngineError, Result, ensure_consumption};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use smartwatt_types::Reading;
use tracing::warn;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeterPayload {
    #[serde(default)]
    pub meter_id: Option<String>,

    #[serde(default)]
    pub consumption_kwh: Option<f64>,

    #[serde(default)]
    pub timestamp: Option<String>,
}

impl MeterPayload {
    /// Convert to a reading
    ///
    /// A missing or unparseable timestamp is replaced by `now`.
    pub fn into_reading(self, now: DateTime<Utc>) -> Result<Reading> {
        if self.meter_id.as_deref().is_none_or(|id| id.trim().is_empty()) {
            return Err(EngineError::InvalidInput(
                "meter_id and consumption_kwh are required".to_owned(),
            ));
        }
        let Some(value_kwh) = self.consumption_kwh else {
            return Err(EngineError::InvalidInput(
                "meter_id and consumption_kwh are required".to_owned(),
            ));
        };
        ensure_consumption("consumption_kwh", value_kwh)?;

        let timestamp = match self.timestamp.as_deref() {
            None => now,
            Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
                warn!(timestamp = raw, "Unparseable meter timestamp, using current time");
                now
            }),
        };

        Ok(Reading::new(timestamp, value_kwh))
    }
}

/// ISO-8601 with or without offset; naive values are taken as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 21, 18, 0, 0).unwrap()
    }

    fn payload(json: &str) -> MeterPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let reading = payload(
            r#"{"meter_id": "METER001", "consumption_kwh": 2.5, "timestamp": "2026-02-21T12:34:00"}"#,
        )
        .into_reading(now())
        .unwrap();

        assert_eq!(reading.timestamp, Utc.with_ymd_and_hms(2026, 2, 21, 12, 34, 0).unwrap());
        assert_eq!(reading.calendar_date, NaiveDate::from_ymd_opt(2026, 2, 21).unwrap());
        assert!((reading.value_kwh - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_offset_timestamp_is_converted() {
        let reading = payload(
            r#"{"meter_id": "M", "consumption_kwh": 1.0, "timestamp": "2026-02-22T01:30:00+02:00"}"#,
        )
        .into_reading(now())
        .unwrap();

        assert_eq!(reading.timestamp, Utc.with_ymd_and_hms(2026, 2, 21, 23, 30, 0).unwrap());
        assert_eq!(reading.calendar_date, NaiveDate::from_ymd_opt(2026, 2, 21).unwrap());
    }

    #[test]
    fn test_missing_or_bad_timestamp_uses_now() {
        let reading = payload(r#"{"meter_id": "M", "consumption_kwh": 1.0}"#)
            .into_reading(now())
            .unwrap();
        assert_eq!(reading.timestamp, now());

        let reading = payload(r#"{"meter_id": "M", "consumption_kwh": 1.0, "timestamp": "yesterday"}"#)
            .into_reading(now())
            .unwrap();
        assert_eq!(reading.timestamp, now());
    }

    #[test]
    fn test_required_fields() {
        assert!(matches!(
            payload(r#"{"consumption_kwh": 1.0}"#).into_reading(now()),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            payload(r#"{"meter_id": "  ", "consumption_kwh": 1.0}"#).into_reading(now()),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            payload(r#"{"meter_id": "M"}"#).into_reading(now()),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            payload(r#"{"meter_id": "M", "consumption_kwh": -4.0}"#).into_reading(now()),
            Err(EngineError::InvalidInput(_))
        ));
    }
}
