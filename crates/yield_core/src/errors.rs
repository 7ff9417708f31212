//! Error types for the cropsim core

use thiserror::Error;

use crate::encoder::Attribute;

/// Errors raised while mapping raw categorical values to codes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    /// Value was not observed when the encoding table was fit
    #[error("unknown {attribute} value: {value:?}")]
    UnknownCategory { attribute: Attribute, value: String },

    /// Code has no entry in the table
    #[error("unknown {attribute} code: {code}")]
    UnknownCode { attribute: Attribute, code: u32 },

    /// Numeric input is NaN or infinite
    #[error("non-finite value for {column}: {value}")]
    NonFiniteValue { column: &'static str, value: f64 },
}

/// Errors raised by the economic analyzer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomicsError {
    /// Crop has no cost/price entry and fallback is disabled
    #[error("no cost table for crop: {0}")]
    UnknownCrop(String),
}
