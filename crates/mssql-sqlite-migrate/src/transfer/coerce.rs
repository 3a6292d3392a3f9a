//! Conversion of source values into SQLite values.
//!
//! SQLite has no decimal or temporal storage class: decimals become REAL and
//! temporal values become ISO-8601 text, which sorts and compares correctly.

use crate::core::SqlValue;
use crate::error::{MigrateError, Result};
use chrono::Timelike;
use rusqlite::types::Value;
use rust_decimal::prelude::ToPrimitive;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATETIME_MICROS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const DATETIME_OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";
const DATETIME_OFFSET_MICROS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f%:z";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const TIME_MICROS_FORMAT: &str = "%H:%M:%S%.6f";

/// Fractional seconds are written as exactly six digits, and only when the
/// value has a non-zero microsecond part.
fn seconds_format<T: Timelike>(
    value: &T,
    whole: &'static str,
    micros: &'static str,
) -> &'static str {
    if value.nanosecond() / 1_000 == 0 {
        whole
    } else {
        micros
    }
}

/// Convert one value. `table` is only used in error messages.
pub fn coerce_value(table: &str, value: SqlValue) -> Result<Value> {
    Ok(match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Integer(i64::from(b)),
        SqlValue::I16(v) => Value::Integer(i64::from(v)),
        SqlValue::I32(v) => Value::Integer(i64::from(v)),
        SqlValue::I64(v) => Value::Integer(v),
        SqlValue::F32(v) => Value::Real(f64::from(v)),
        SqlValue::F64(v) => Value::Real(v),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Bytes(b) => Value::Blob(b),
        SqlValue::Uuid(u) => Value::Text(u.hyphenated().to_string().to_uppercase()),
        SqlValue::Decimal(d) => Value::Real(d.to_f64().ok_or_else(|| {
            MigrateError::transfer(table, format!("decimal {} is not representable as REAL", d))
        })?),
        SqlValue::DateTime(dt) => {
            let fmt = seconds_format(&dt, DATETIME_FORMAT, DATETIME_MICROS_FORMAT);
            Value::Text(dt.format(fmt).to_string())
        }
        SqlValue::DateTimeOffset(dt) => {
            let fmt = seconds_format(&dt, DATETIME_OFFSET_FORMAT, DATETIME_OFFSET_MICROS_FORMAT);
            Value::Text(dt.format(fmt).to_string())
        }
        SqlValue::Date(d) => Value::Text(d.format(DATE_FORMAT).to_string()),
        SqlValue::Time(t) => {
            let fmt = seconds_format(&t, TIME_FORMAT, TIME_MICROS_FORMAT);
            Value::Text(t.format(fmt).to_string())
        }
    })
}

/// Convert a whole row, checking it matches the projection width.
pub fn coerce_row(table: &str, expected: usize, row: Vec<SqlValue>) -> Result<Vec<Value>> {
    if row.len() != expected {
        return Err(MigrateError::transfer(
            table,
            format!("row has {} values, expected {}", row.len(), expected),
        ));
    }
    row.into_iter().map(|v| coerce_value(table, v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use uuid::Uuid;

    #[test]
    fn test_decimal_to_real() {
        let v = coerce_value("t", SqlValue::Decimal(Decimal::from_str("19.99").unwrap())).unwrap();
        match v {
            Value::Real(f) => assert!((f - 19.99).abs() < 1e-9),
            other => panic!("expected REAL, got {:?}", other),
        }
    }

    #[test]
    fn test_temporal_values_to_iso_text() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            coerce_value("t", SqlValue::Date(date)).unwrap(),
            Value::Text("2024-03-01".into())
        );

        let dt = date.and_hms_opt(13, 45, 0).unwrap();
        assert_eq!(
            coerce_value("t", SqlValue::DateTime(dt)).unwrap(),
            Value::Text("2024-03-01T13:45:00".into())
        );

        let dt_micro = date.and_hms_micro_opt(8, 5, 9, 250_000).unwrap();
        assert_eq!(
            coerce_value("t", SqlValue::DateTime(dt_micro)).unwrap(),
            Value::Text("2024-03-01T08:05:09.250000".into())
        );

        let time = NaiveTime::from_hms_opt(23, 59, 1).unwrap();
        assert_eq!(
            coerce_value("t", SqlValue::Time(time)).unwrap(),
            Value::Text("23:59:01".into())
        );

        let offset = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        let with_tz = offset.from_local_datetime(&dt).unwrap();
        assert_eq!(
            coerce_value("t", SqlValue::DateTimeOffset(with_tz)).unwrap(),
            Value::Text("2024-03-01T13:45:00+02:00".into())
        );
    }

    #[test]
    fn test_fractional_seconds_use_six_digits() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        // datetime2(7) carries 100ns ticks; they are truncated to microseconds
        let ticks = date.and_hms_nano_opt(10, 0, 0, 123_456_700).unwrap();
        assert_eq!(
            coerce_value("t", SqlValue::DateTime(ticks)).unwrap(),
            Value::Text("2024-03-01T10:00:00.123456".into())
        );

        // sub-microsecond remainder alone prints no fraction
        let sub_micro = date.and_hms_nano_opt(10, 0, 0, 700).unwrap();
        assert_eq!(
            coerce_value("t", SqlValue::DateTime(sub_micro)).unwrap(),
            Value::Text("2024-03-01T10:00:00".into())
        );

        let time = NaiveTime::from_hms_milli_opt(7, 30, 15, 5).unwrap();
        assert_eq!(
            coerce_value("t", SqlValue::Time(time)).unwrap(),
            Value::Text("07:30:15.005000".into())
        );

        let offset = chrono::FixedOffset::west_opt(5 * 3600).unwrap();
        let with_tz = offset
            .from_local_datetime(&date.and_hms_micro_opt(1, 2, 3, 42).unwrap())
            .unwrap();
        assert_eq!(
            coerce_value("t", SqlValue::DateTimeOffset(with_tz)).unwrap(),
            Value::Text("2024-03-01T01:02:03.000042-05:00".into())
        );
    }

    #[test]
    fn test_scalars() {
        assert_eq!(coerce_value("t", SqlValue::Bool(true)).unwrap(), Value::Integer(1));
        assert_eq!(coerce_value("t", SqlValue::I16(-3)).unwrap(), Value::Integer(-3));
        assert_eq!(coerce_value("t", SqlValue::Null).unwrap(), Value::Null);
        assert_eq!(
            coerce_value("t", SqlValue::Bytes(vec![1, 2])).unwrap(),
            Value::Blob(vec![1, 2])
        );

        let id = Uuid::parse_str("a1b2c3d4-0000-4000-8000-00000000abcd").unwrap();
        assert_eq!(
            coerce_value("t", SqlValue::Uuid(id)).unwrap(),
            Value::Text("A1B2C3D4-0000-4000-8000-00000000ABCD".into())
        );
    }

    #[test]
    fn test_row_arity_mismatch() {
        let err = coerce_row("dbo.Orders", 3, vec![SqlValue::I32(1)]).unwrap_err();
        assert!(err.to_string().contains("row has 1 values, expected 3"));
    }
}
