//! Image transactions
//!
//! Read, extract, write, verify and erase against the bound chip. Buffers
//! are always chip-sized. For write and verify the buffer is assembled
//! before the chip is touched: the operation's own file first, then the
//! files of included regions over their sub-ranges. For reads the region
//! files are written out of the buffer instead.

mod buffer;
mod ops;

pub use buffer::ImageBuffer;
pub use ops::*;

use std::path::PathBuf;

use crate::error::Error;
use crate::layout::LayoutError;

/// Image transaction errors
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Neither an image file nor region files were given
    #[error("No image file specified.")]
    NoImageFile,
    /// Layout problem, including overlapping region files
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// A file does not have the size of the chip or region it maps to
    #[error("Image size ({actual} B) doesn't match the expected size ({expected} B) for {}", path.display())]
    SizeMismatch {
        /// Offending file
        path: PathBuf,
        /// Size of the file
        actual: u64,
        /// Size it must have
        expected: usize,
    },
    /// Reading or writing a file failed
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The read primitive failed
    #[error("Read operation failed: {0}")]
    Read(#[source] Error),
    /// The write primitive failed
    #[error("Write operation failed: {0}")]
    Write(#[source] Error),
    /// The verify primitive failed
    #[error("Verification failed: {0}")]
    Verify(#[source] Error),
    /// The erase primitive failed
    #[error("Erase operation failed: {0}")]
    Erase(#[source] Error),
}

/// Result type for image transactions
pub type ImageResult<T> = std::result::Result<T, ImageError>;
