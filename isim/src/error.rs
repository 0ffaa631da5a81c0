//! Error types for the isim library

use thiserror::Error;

/// Result type alias for isim operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during isim operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed fingerprint input (ragged rows, zero width, ...)
    #[error("Shape error: {0}")]
    Shape(String),

    /// Width of a fingerprint or column sum does not match the accumulator
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A column sum was given without the number of objects it condenses
    #[error("Input is a column sum, the number of objects must be specified")]
    MissingObjectCount,

    /// Unknown index abbreviation, or an index without a closed form for the input kind
    #[error("Unsupported similarity index: {0}")]
    UnsupportedIndex(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Operation requires at least one object
    #[error("No fingerprints provided")]
    EmptyInput,
}
