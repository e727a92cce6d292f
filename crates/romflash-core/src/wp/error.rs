//! Write protection primitive errors

/// Outcome of a write-protection primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WpError {
    /// Chip or master has no write-protection support
    #[error("WP operations are not implemented for this chip")]
    ChipUnsupported,
    /// Failed to read the configuration registers
    #[error("failed to read the current WP configuration")]
    ReadFailed,
    /// Failed to write the configuration registers
    #[error("failed to write the new WP configuration")]
    WriteFailed,
    /// The value read back after writing did not match
    #[error("unexpected WP configuration read back from chip")]
    VerifyFailed,
    /// Requested mode is not supported by chip
    #[error("the requested protection mode is not supported")]
    ModeUnsupported,
    /// Requested range is not supported by chip
    #[error("the requested protection range is not supported")]
    RangeUnsupported,
    /// Cannot enumerate available ranges
    #[error("could not determine what protection ranges are available")]
    RangeListUnavailable,
    /// Chip is in a state the scheme cannot describe (e.g. per-sector mode)
    #[error("can't operate on current WP configuration of the chip")]
    UnsupportedState,
    /// Anything else
    #[error("unknown WP error")]
    Other,
}

/// Result type for write protection primitives
pub type WpResult<T> = core::result::Result<T, WpError>;
