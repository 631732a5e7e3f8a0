use std::fmt;

use physioband_codec::{
    FieldMap,
    constants::{ACC_X, ACC_Y, ACC_Z, GYRO_X, GYRO_Y, GYRO_Z},
};
use physioband_types::{Reading, Vector3};
use thiserror::Error;

/// Scale factors turning raw sensor counts into physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorScale {
    /// LSB per g.
    pub acc_sensitivity: f64,
    /// m/s² per g.
    pub gravity: f64,
    /// LSB per °/s.
    pub gyro_sensitivity: f64,
}

impl SensorScale {
    /// ±2 g full-scale range.
    pub const ACC_SENSITIVITY: f64 = 16384.0;
    pub const GRAVITY: f64 = 9.81;
    /// ±500 °/s full-scale range.
    pub const GYRO_SENSITIVITY: f64 = 65.5;

    pub fn acceleration(&self, raw: f64) -> f64 {
        raw / self.acc_sensitivity * self.gravity
    }

    pub fn angular_rate(&self, raw: f64) -> f64 {
        raw / self.gyro_sensitivity
    }
}

impl Default for SensorScale {
    fn default() -> Self {
        Self {
            acc_sensitivity: Self::ACC_SENSITIVITY,
            gravity: Self::GRAVITY,
            gyro_sensitivity: Self::GYRO_SENSITIVITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Integer,
    Float,
}

impl fmt::Display for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberKind::Integer => f.write_str("integer"),
            NumberKind::Float => f.write_str("float"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConversionError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid {kind} for `{key}`: {value:?}")]
    InvalidNumber {
        key: &'static str,
        value: String,
        kind: NumberKind,
    },
}

fn field<'a>(fields: &'a FieldMap, key: &'static str) -> Result<&'a str, ConversionError> {
    fields
        .get(key)
        .map(str::trim)
        .ok_or(ConversionError::MissingField(key))
}

fn float(fields: &FieldMap, key: &'static str) -> Result<f64, ConversionError> {
    let value = field(fields, key)?;
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConversionError::InvalidNumber {
            key,
            value: value.to_owned(),
            kind: NumberKind::Float,
        })
}

fn integer(fields: &FieldMap, key: &'static str) -> Result<f64, ConversionError> {
    let value = field(fields, key)?;
    value
        .parse::<i64>()
        .map(|v| v as f64)
        .map_err(|_| ConversionError::InvalidNumber {
            key,
            value: value.to_owned(),
            kind: NumberKind::Integer,
        })
}

fn angular_rate(fields: &FieldMap, scale: &SensorScale) -> Result<Vector3, ConversionError> {
    Ok(Vector3::new(
        scale.angular_rate(float(fields, GYRO_X)?),
        scale.angular_rate(float(fields, GYRO_Y)?),
        scale.angular_rate(float(fields, GYRO_Z)?),
    ))
}

/// Converts the packet captured as the session reference.
///
/// Every field is read as a float, so `aX=16384.0` is accepted here.
pub fn convert_reference(
    fields: &FieldMap,
    scale: &SensorScale,
) -> Result<Reading, ConversionError> {
    let acc = Vector3::new(
        scale.acceleration(float(fields, ACC_X)?),
        scale.acceleration(float(fields, ACC_Y)?),
        scale.acceleration(float(fields, ACC_Z)?),
    );

    Ok(Reading {
        acc,
        gyro: angular_rate(fields, scale)?,
    })
}

/// Converts a streamed packet.
///
/// Acceleration counts must be integers while gyro counts may be floats.
/// This is stricter than [`convert_reference`] and is kept that way so both
/// paths match the device's established output.
pub fn convert_sample(
    fields: &FieldMap,
    scale: &SensorScale,
) -> Result<Reading, ConversionError> {
    let acc = Vector3::new(
        scale.acceleration(integer(fields, ACC_X)?),
        scale.acceleration(integer(fields, ACC_Y)?),
        scale.acceleration(integer(fields, ACC_Z)?),
    );

    Ok(Reading {
        acc,
        gyro: angular_rate(fields, scale)?,
    })
}
