//! Sensor readings and the canonical leaf encoding.
//!
//! A reading is encoded as the `|`-joined decimal rendering of
//! `deviceId | ts | t_c_x100 | rh_x100 | p_pa | gas`, with an absent device id
//! rendered as the empty string. The leaf is `keccak256(encoding)`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::digest::Hash32;

/// Field delimiter of the canonical encoding.
pub const DELIMITER: char = '|';

/// One time-series sample from an environmental sensor.
///
/// Integer fields are fixed-point: temperature and humidity in hundredths,
/// pressure in pascals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Reading {
    /// Optional originating device.
    #[serde(rename = "deviceId", skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Unix timestamp, seconds.
    pub ts: u64,
    /// Temperature in centi-degrees Celsius.
    pub t_c_x100: i32,
    /// Relative humidity in centi-percent.
    pub rh_x100: u32,
    /// Pressure in pascals.
    pub p_pa: u32,
    /// Raw gas sensor value.
    pub gas: u32,
}

/// Error raised for a reading that cannot be canonically encoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReadingError {
    /// A field is missing, has the wrong type, or is out of range.
    #[error("invalid reading{}: {field} {reason}", .index.map(|i| format!(" #{i}")).unwrap_or_default())]
    InvalidReading {
        /// Position within the input sequence, when known.
        index: Option<usize>,
        /// Offending field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ReadingError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidReading {
            index: None,
            field,
            reason: reason.into(),
        }
    }

    fn at(self, position: usize) -> Self {
        match self {
            Self::InvalidReading { field, reason, .. } => Self::InvalidReading {
                index: Some(position),
                field,
                reason,
            },
        }
    }
}

impl Reading {
    /// Validates and converts one JSON object into a reading.
    pub fn from_value(value: &Value) -> Result<Self, ReadingError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ReadingError::invalid("reading", "is not a JSON object"))?;

        let device_id = match obj.get("deviceId") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.contains(DELIMITER) => {
                return Err(ReadingError::invalid(
                    "deviceId",
                    format!("must not contain '{DELIMITER}'"),
                ))
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(ReadingError::invalid("deviceId", "is not a string")),
        };

        Ok(Self {
            device_id,
            ts: unsigned(obj, "ts")?,
            t_c_x100: signed_i32(obj, "t_c_x100")?,
            rh_x100: unsigned_u32(obj, "rh_x100")?,
            p_pa: unsigned_u32(obj, "p_pa")?,
            gas: unsigned_u32(obj, "gas")?,
        })
    }
}

impl TryFrom<Value> for Reading {
    type Error = ReadingError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

fn number<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, ReadingError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ReadingError::invalid(field, "is missing")),
        Some(v @ Value::Number(_)) => Ok(v),
        Some(_) => Err(ReadingError::invalid(field, "is not a number")),
    }
}

fn unsigned(obj: &Map<String, Value>, field: &'static str) -> Result<u64, ReadingError> {
    number(obj, field)?
        .as_u64()
        .ok_or_else(|| ReadingError::invalid(field, "is not a non-negative integer"))
}

fn unsigned_u32(obj: &Map<String, Value>, field: &'static str) -> Result<u32, ReadingError> {
    let v = unsigned(obj, field)?;
    u32::try_from(v).map_err(|_| ReadingError::invalid(field, format!("({v}) is out of range")))
}

fn signed_i32(obj: &Map<String, Value>, field: &'static str) -> Result<i32, ReadingError> {
    let v = number(obj, field)?
        .as_i64()
        .ok_or_else(|| ReadingError::invalid(field, "is not an integer"))?;
    i32::try_from(v).map_err(|_| ReadingError::invalid(field, format!("({v}) is out of range")))
}

/// Parses a JSON array of readings, reporting the index of the first bad entry.
pub fn parse_readings(value: &Value) -> Result<Vec<Reading>, ReadingError> {
    let items = value
        .as_array()
        .ok_or_else(|| ReadingError::invalid("readings", "is not an array"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| Reading::from_value(item).map_err(|e| e.at(i)))
        .collect()
}

/// Canonical byte encoding of one reading.
pub fn encode(reading: &Reading) -> Vec<u8> {
    format!(
        "{device}{d}{ts}{d}{t}{d}{rh}{d}{p}{d}{gas}",
        device = reading.device_id.as_deref().unwrap_or(""),
        d = DELIMITER,
        ts = reading.ts,
        t = reading.t_c_x100,
        rh = reading.rh_x100,
        p = reading.p_pa,
        gas = reading.gas,
    )
    .into_bytes()
}

/// Leaf digest: `keccak256(encode(reading))`.
pub fn leaf_hash(reading: &Reading) -> Hash32 {
    Hash32::keccak(&[&encode(reading)])
}
