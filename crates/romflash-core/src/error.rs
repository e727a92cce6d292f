//! Error types for romflash-core
//!
//! [`Error`] is the low-level status returned by programmer primitives.
//! Each higher-level component (probe, layout, write protection, image
//! transactions) wraps it in its own error type carrying more context.

use core::fmt;

/// Details about an erase failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseFailure {
    /// Erase command failed or timed out
    CommandFailed {
        /// Address where erase was attempted
        addr: u32,
    },
    /// Erase verification failed - flash not erased to 0xFF
    VerifyFailed {
        /// Address where first non-0xFF byte was found
        addr: u32,
        /// The byte value found (should be 0xFF if erased)
        found: u8,
    },
    /// Generic erase failure (no details available)
    Unknown,
}

/// Programmer-level error, Copy so it can be embedded anywhere
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The master does not drive any bus the chip can sit on
    BusNotSupported,
    /// Programmer is not ready (not initialized or busy)
    ProgrammerNotReady,
    /// General programmer error
    ProgrammerError,
    /// Operation timed out
    Timeout,

    /// Read operation failed
    ReadError {
        /// First address that could not be read
        addr: u32,
    },
    /// Erase operation failed
    EraseError(EraseFailure),
    /// Write/program operation failed
    WriteError {
        /// Address where programming failed
        addr: u32,
    },
    /// Verify operation failed (data mismatch)
    VerifyError {
        /// Address of the first mismatching byte
        addr: u32,
        /// Expected byte value
        expected: u8,
        /// Byte value found on the chip
        found: u8,
    },

    /// Address is beyond flash chip size
    AddressOutOfBounds,
    /// Provided buffer does not match the chip size
    BufferSizeMismatch {
        /// Size of the buffer handed to the primitive
        len: usize,
        /// Size the primitive expected
        expected: usize,
    },

    /// Flash chip is write protected
    WriteProtected {
        /// First protected address hit by the operation
        addr: u32,
    },
    /// Region cannot be accessed through this master
    RegionLocked {
        /// Start of the locked range
        start: u32,
        /// End of the locked range (inclusive)
        end: u32,
    },
}

impl fmt::Display for EraseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandFailed { addr } => {
                write!(f, "erase command failed at address 0x{:08X}", addr)
            }
            Self::VerifyFailed { addr, found } => {
                write!(
                    f,
                    "erase verify failed at 0x{:08X}: expected 0xFF, found 0x{:02X}",
                    addr, found
                )
            }
            Self::Unknown => write!(f, "erase failed"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusNotSupported => write!(f, "bus not supported by programmer"),
            Self::ProgrammerNotReady => write!(f, "programmer not ready"),
            Self::ProgrammerError => write!(f, "programmer error"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::ReadError { addr } => write!(f, "read failed at 0x{:08X}", addr),
            Self::EraseError(failure) => write!(f, "{}", failure),
            Self::WriteError { addr } => write!(f, "write failed at 0x{:08X}", addr),
            Self::VerifyError {
                addr,
                expected,
                found,
            } => write!(
                f,
                "verify failed at 0x{:08X}: expected 0x{:02X}, found 0x{:02X}",
                addr, expected, found
            ),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::BufferSizeMismatch { len, expected } => {
                write!(f, "buffer is {} bytes, expected {} bytes", len, expected)
            }
            Self::WriteProtected { addr } => {
                write!(f, "flash chip is write protected at 0x{:08X}", addr)
            }
            Self::RegionLocked { start, end } => write!(
                f,
                "region 0x{:08X}-0x{:08X} is not accessible through this programmer",
                start, end
            ),
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
