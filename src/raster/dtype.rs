//! Pixel data types
//!
//! Arrays are held as `f64` in memory; `DataType` records what the
//! samples really are so every resample and every write can cast back.

use std::fmt;
use std::str::FromStr;

use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::sample_format;

/// Sample type of a raster band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    Float64,
}

impl DataType {
    /// Maps TIFF BitsPerSample / SampleFormat onto a data type
    pub fn from_tiff(bits: u16, format: u16) -> Option<Self> {
        match (bits, format) {
            (8, sample_format::UNSIGNED) => Some(DataType::UInt8),
            (8, sample_format::SIGNED) => Some(DataType::Int8),
            (16, sample_format::UNSIGNED) => Some(DataType::UInt16),
            (16, sample_format::SIGNED) => Some(DataType::Int16),
            (32, sample_format::UNSIGNED) => Some(DataType::UInt32),
            (32, sample_format::SIGNED) => Some(DataType::Int32),
            (32, sample_format::IEEEFP) => Some(DataType::Float32),
            (64, sample_format::IEEEFP) => Some(DataType::Float64),
            _ => None,
        }
    }

    pub fn bits(&self) -> u16 {
        (self.bytes() * 8) as u16
    }

    pub fn bytes(&self) -> usize {
        match self {
            DataType::UInt8 | DataType::Int8 => 1,
            DataType::UInt16 | DataType::Int16 => 2,
            DataType::UInt32 | DataType::Int32 | DataType::Float32 => 4,
            DataType::Float64 => 8,
        }
    }

    /// TIFF SampleFormat value
    pub fn sample_format(&self) -> u16 {
        match self {
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 => sample_format::UNSIGNED,
            DataType::Int8 | DataType::Int16 | DataType::Int32 => sample_format::SIGNED,
            DataType::Float32 | DataType::Float64 => sample_format::IEEEFP,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::UInt8 => "uint8",
            DataType::Int8 => "int8",
            DataType::UInt16 => "uint16",
            DataType::Int16 => "int16",
            DataType::UInt32 => "uint32",
            DataType::Int32 => "int32",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }

    /// Representable value range
    pub fn range(&self) -> (f64, f64) {
        match self {
            DataType::UInt8 => (0.0, u8::MAX as f64),
            DataType::Int8 => (i8::MIN as f64, i8::MAX as f64),
            DataType::UInt16 => (0.0, u16::MAX as f64),
            DataType::Int16 => (i16::MIN as f64, i16::MAX as f64),
            DataType::UInt32 => (0.0, u32::MAX as f64),
            DataType::Int32 => (i32::MIN as f64, i32::MAX as f64),
            DataType::Float32 => (f32::MIN as f64, f32::MAX as f64),
            DataType::Float64 => (f64::MIN, f64::MAX),
        }
    }

    /// Casts a computed value to what this type can hold
    ///
    /// Integer types round to nearest and saturate; NaN becomes 0.
    /// Float32 goes through `f32` so stored values match what a reader sees.
    pub fn cast(&self, value: f64) -> f64 {
        match self {
            DataType::Float64 => value,
            DataType::Float32 => value as f32 as f64,
            _ => {
                if value.is_nan() {
                    return 0.0;
                }
                let (lo, hi) = self.range();
                value.round().clamp(lo, hi)
            }
        }
    }

    /// Decodes one sample from `bytes` in the given byte order
    pub fn decode(&self, bytes: &[u8], order: ByteOrder) -> f64 {
        match self {
            DataType::UInt8 => bytes[0] as f64,
            DataType::Int8 => bytes[0] as i8 as f64,
            DataType::UInt16 => order.u16_from(bytes) as f64,
            DataType::Int16 => order.u16_from(bytes) as i16 as f64,
            DataType::UInt32 => order.u32_from(bytes) as f64,
            DataType::Int32 => order.u32_from(bytes) as i32 as f64,
            DataType::Float32 => order.f32_from(bytes) as f64,
            DataType::Float64 => order.f64_from(bytes),
        }
    }

    /// Appends one little-endian sample, casting first
    pub fn encode_le(&self, value: f64, out: &mut Vec<u8>) {
        let v = self.cast(value);
        match self {
            DataType::UInt8 => out.push(v as u8),
            DataType::Int8 => out.push(v as i8 as u8),
            DataType::UInt16 => out.extend_from_slice(&(v as u16).to_le_bytes()),
            DataType::Int16 => out.extend_from_slice(&(v as i16).to_le_bytes()),
            DataType::UInt32 => out.extend_from_slice(&(v as u32).to_le_bytes()),
            DataType::Int32 => out.extend_from_slice(&(v as i32).to_le_bytes()),
            DataType::Float32 => out.extend_from_slice(&(v as f32).to_le_bytes()),
            DataType::Float64 => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uint8" | "byte" => Ok(DataType::UInt8),
            "int8" => Ok(DataType::Int8),
            "uint16" => Ok(DataType::UInt16),
            "int16" => Ok(DataType::Int16),
            "uint32" => Ok(DataType::UInt32),
            "int32" => Ok(DataType::Int32),
            "float32" => Ok(DataType::Float32),
            "float64" => Ok(DataType::Float64),
            other => Err(format!("Unknown data type: {}", other)),
        }
    }
}
