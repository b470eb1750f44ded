//! Conversions from database values into member types.

use crate::db::cursor::uuid_from_value;
use crate::error::CoercionError;
use crate::mapping::members::MemberKind;
use crate::models::DbValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// A member type that can be assigned from a [`DbValue`].
pub trait FromDbValue: Sized {
    /// Logical kind used by the materializer to pick a read strategy.
    const KIND: MemberKind;

    /// Convert a non-NULL value. NULL is handled by the materializer.
    fn from_db_value(value: &DbValue) -> Result<Self, CoercionError>;
}

fn incompatible(target: &'static str, value: &DbValue, detail: impl Into<String>) -> CoercionError {
    CoercionError::incompatible(target, value.type_name(), detail)
}

impl FromDbValue for bool {
    const KIND: MemberKind = MemberKind::Bool;

    /// True only when the string form is `1` or `True`.
    fn from_db_value(value: &DbValue) -> Result<Self, CoercionError> {
        let text = value.to_string();
        Ok(text == "1" || text == "True")
    }
}

macro_rules! impl_from_db_value_int {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromDbValue for $ty {
                const KIND: MemberKind = MemberKind::Integer;

                fn from_db_value(value: &DbValue) -> Result<Self, CoercionError> {
                    let target = stringify!($ty);
                    match value {
                        DbValue::Int(v) => <$ty>::try_from(*v)
                            .map_err(|_| incompatible(target, value, format!("{} is out of range", v))),
                        DbValue::Float(v) => {
                            let rounded = v.round_ties_even();
                            if !rounded.is_finite() {
                                return Err(incompatible(target, value, format!("{} is out of range", v)));
                            }
                            // i128 covers every target range; larger magnitudes saturate and fail below
                            <$ty>::try_from(rounded as i128)
                                .map_err(|_| incompatible(target, value, format!("{} is out of range", v)))
                        }
                        DbValue::Bool(v) => Ok(<$ty>::from(*v)),
                        DbValue::Text(s) => s
                            .trim()
                            .parse::<$ty>()
                            .map_err(|e| incompatible(target, value, e.to_string())),
                        _ => Err(incompatible(target, value, "not a number")),
                    }
                }
            }
        )+
    };
}

impl_from_db_value_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromDbValue for f64 {
    const KIND: MemberKind = MemberKind::Float;

    fn from_db_value(value: &DbValue) -> Result<Self, CoercionError> {
        match value {
            DbValue::Float(v) => Ok(*v),
            DbValue::Int(v) => Ok(*v as f64),
            DbValue::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
            DbValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| incompatible("f64", value, e.to_string())),
            _ => Err(incompatible("f64", value, "not a number")),
        }
    }
}

impl FromDbValue for f32 {
    const KIND: MemberKind = MemberKind::Float;

    fn from_db_value(value: &DbValue) -> Result<Self, CoercionError> {
        let wide = f64::from_db_value(value)?;
        let narrow = wide as f32;
        if wide.is_finite() && !narrow.is_finite() {
            return Err(incompatible("f32", value, format!("{} is out of range", wide)));
        }
        Ok(narrow)
    }
}

impl FromDbValue for String {
    const KIND: MemberKind = MemberKind::Text;

    fn from_db_value(value: &DbValue) -> Result<Self, CoercionError> {
        match value {
            DbValue::Text(s) => Ok(s.clone()),
            other => Ok(other.to_string()),
        }
    }
}

impl FromDbValue for Uuid {
    const KIND: MemberKind = MemberKind::Uuid;

    fn from_db_value(value: &DbValue) -> Result<Self, CoercionError> {
        uuid_from_value(value)
    }
}

impl FromDbValue for Vec<u8> {
    const KIND: MemberKind = MemberKind::Bytes;

    fn from_db_value(value: &DbValue) -> Result<Self, CoercionError> {
        match value {
            DbValue::Bytes(b) => Ok(b.clone()),
            DbValue::Text(s) => Ok(s.as_bytes().to_vec()),
            DbValue::Uuid(u) => Ok(u.as_bytes().to_vec()),
            _ => Err(incompatible("Vec<u8>", value, "not binary data")),
        }
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

impl FromDbValue for NaiveDateTime {
    const KIND: MemberKind = MemberKind::DateTime;

    fn from_db_value(value: &DbValue) -> Result<Self, CoercionError> {
        match value {
            DbValue::DateTime(v) => Ok(*v),
            DbValue::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            DbValue::Text(s) => parse_datetime(s)
                .ok_or_else(|| incompatible("NaiveDateTime", value, "unrecognized date/time format")),
            DbValue::Int(secs) => DateTime::from_timestamp(*secs, 0)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| incompatible("NaiveDateTime", value, "timestamp out of range")),
            _ => Err(incompatible("NaiveDateTime", value, "not a date/time")),
        }
    }
}

impl FromDbValue for DateTime<Utc> {
    const KIND: MemberKind = MemberKind::DateTime;

    fn from_db_value(value: &DbValue) -> Result<Self, CoercionError> {
        NaiveDateTime::from_db_value(value)
            .map(|dt| dt.and_utc())
            .map_err(|e| match e {
                CoercionError::Incompatible { found, detail, .. } => CoercionError::Incompatible {
                    target: "DateTime<Utc>",
                    found,
                    detail,
                },
                other => other,
            })
    }
}

impl FromDbValue for NaiveDate {
    const KIND: MemberKind = MemberKind::Date;

    fn from_db_value(value: &DbValue) -> Result<Self, CoercionError> {
        match value {
            DbValue::Date(d) => Ok(*d),
            DbValue::DateTime(dt) => Ok(dt.date()),
            DbValue::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .or_else(|_| parse_datetime(s).map(|dt| dt.date()).ok_or(()))
                .map_err(|_| incompatible("NaiveDate", value, "unrecognized date format")),
            _ => Err(incompatible("NaiveDate", value, "not a date")),
        }
    }
}

impl FromDbValue for JsonValue {
    const KIND: MemberKind = MemberKind::Json;

    fn from_db_value(value: &DbValue) -> Result<Self, CoercionError> {
        match value {
            DbValue::Json(v) => Ok(v.clone()),
            DbValue::Text(s) => serde_json::from_str(s)
                .map_err(|e| incompatible("serde_json::Value", value, e.to_string())),
            other => Ok(other.to_json()),
        }
    }
}

impl<T: FromDbValue> FromDbValue for Option<T> {
    const KIND: MemberKind = T::KIND;

    fn from_db_value(value: &DbValue) -> Result<Self, CoercionError> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_db_value(value).map(Some)
    }
}
