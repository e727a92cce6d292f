//! Layout construction and validation errors

use std::path::PathBuf;

use crate::error::Error;

/// Errors that can occur when building, merging or checking layouts
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// A region name was not found in the layout
    #[error("Invalid region specified: \"{0}\".")]
    RegionNotFound(String),
    /// An include argument had no region name
    #[error("Empty region name in include argument \"{0}\"")]
    EmptyRegionName(String),
    /// An include argument ended with a colon but no file
    #[error("Missing filename parameter in include argument \"{0}\"")]
    EmptyIncludeFile(String),
    /// The same region was included twice
    #[error("Duplicate region name: \"{0}\"")]
    DuplicateInclude(String),
    /// An include argument needs a file because the operation has none
    #[error("No file specified for region \"{0}\"")]
    MissingIncludeFile(String),
    /// Include arguments were given but no layout source was selected
    #[error("Region requested (with -i \"{0}\"), but no layout data is available.")]
    NoLayout(String),
    /// A region extends beyond the end of the chip
    #[error("Region \"{name}\" (0x{start:08x}-0x{end:08x}) exceeds the chip size (0x{chip_size:08x})")]
    RegionOutOfBounds {
        /// Region name
        name: String,
        /// Region start
        start: u32,
        /// Region end (inclusive)
        end: u32,
        /// Size of the bound chip
        chip_size: u32,
    },
    /// A region starts after it ends
    #[error("Region \"{name}\" has start 0x{start:08x} beyond its end 0x{end:08x}")]
    InvalidRegion {
        /// Region name
        name: String,
        /// Region start
        start: u32,
        /// Region end (inclusive)
        end: u32,
    },
    /// Included regions with files overlap
    #[error("Included regions must not overlap when writing.")]
    Overlap {
        /// Every overlapping pair, by region name
        pairs: Vec<(String, String)>,
    },
    /// The layout declares a different chip size than the bound chip
    #[error("Layout is for a {expected} byte chip, but the chip has {actual} bytes")]
    ChipSizeMismatch {
        /// Size declared in the layout
        expected: u32,
        /// Size of the bound chip
        actual: u32,
    },
    /// A TOML layout failed to parse
    #[error("failed to parse layout: {0}")]
    Parse(String),
    /// A line of a text layout failed to parse
    #[error("layout line {line}: {message}")]
    TextSyntax {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
    /// File access failed
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Reading the descriptor from the chip failed
    #[error("Read operation failed!")]
    IfdRead(#[source] Error),
    /// The data does not hold a valid Intel Flash Descriptor
    #[error("Couldn't parse the descriptor!")]
    InvalidIfd,
    /// The chip descriptor and the reference dump differ
    #[error("Descriptors don't match!")]
    IfdMismatch,
    /// No valid fmap was found
    #[error("No valid fmap found")]
    FmapNotFound,
    /// The fmap has a major version this tool cannot parse
    #[error("Unsupported fmap version {0}")]
    UnsupportedFmapVersion(u8),
    /// Reading the fmap from the chip failed
    #[error("Failed to read fmap from ROM.")]
    FmapRead(#[source] Error),
    /// The fmap in the image file differs from the one on the chip
    #[error("FMAP layouts do not match! Aborting.")]
    FmapMismatch,
}

impl LayoutError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
