//! Error types for the texture codec library.

use crate::format::PixelFormat;
use thiserror::Error;

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors that can occur in codec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The pixel format exists in the enumeration but is not supported
    /// by the scanline codec (planar, palettized, or opaque video formats).
    #[error("unsupported pixel format: {0:?}")]
    UnsupportedFormat(PixelFormat),

    /// A source or destination buffer does not cover the rows or blocks
    /// implied by its format and dimensions.
    #[error("buffer too small: need {needed} bytes, have {actual}")]
    BufferTooSmall {
        /// Bytes required by the format and dimensions.
        needed: usize,
        /// Bytes actually provided.
        actual: usize,
    },

    /// A caller-supplied argument is invalid (zero dimension, row pitch
    /// smaller than a row, mismatched image sizes).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A working buffer could not be allocated.
    #[error("out of memory allocating {0}")]
    OutOfMemory(&'static str),

    /// A row failed to convert. The destination holds the rows written
    /// before the failure.
    #[error("conversion failed after {rows_written} rows")]
    Conversion {
        /// Number of complete rows written to the destination.
        rows_written: usize,
    },
}
