//! Flash chip type definitions

use super::features::{BusType, Features};
use crate::wp::{RangeDecoder, WpRegBitMap};

/// Test status for a chip operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestStatus {
    /// Not tested
    #[default]
    Untested,
    /// Tested and working
    Ok,
    /// Tested and not working
    Bad,
    /// Not applicable
    Na,
}

/// Test status for all chip operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChipTestStatus {
    /// Probe test status
    pub probe: TestStatus,
    /// Read test status
    pub read: TestStatus,
    /// Erase test status
    pub erase: TestStatus,
    /// Write test status
    pub write: TestStatus,
    /// Write protection test status
    pub wp: TestStatus,
}

/// Register layout used by a chip's status-register write protection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WpRegisterLayout {
    /// SR1: SRP0 SEC TB BP2 BP1 BP0, SR2: CMP SRL
    #[default]
    Winbond,
    /// Like [`WpRegisterLayout::Winbond`] with BP3 in SR2 bit 2
    WinbondBp3,
    /// SR1: SRP0 BP3 BP2 BP1 BP0 (no TB, SEC or CMP)
    Basic,
}

impl WpRegisterLayout {
    /// Get the register bit map for this layout
    pub const fn bit_map(self) -> WpRegBitMap {
        match self {
            Self::Winbond => WpRegBitMap::winbond_standard(),
            Self::WinbondBp3 => WpRegBitMap::winbond_with_bp3(),
            Self::Basic => WpRegBitMap::basic_bp4(),
        }
    }
}

/// How a chip implements write protection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WpScheme {
    /// Where the protection bits live
    pub registers: WpRegisterLayout,
    /// How the bits decode into a protected range
    pub decoder: RangeDecoder,
}

/// Flash chip descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashChip {
    /// Vendor name
    pub vendor: String,
    /// Chip name, unique within the database
    pub name: String,
    /// Buses the chip can be attached to
    pub bus: BusType,
    /// Manufacturer ID as returned by the chip's identification command
    pub manufacturer_id: u32,
    /// Model ID as returned by the chip's identification command
    pub model_id: u32,
    /// Total size in bytes
    pub total_size: u32,
    /// Page size in bytes
    pub page_size: u32,
    /// Smallest erase block in bytes
    pub erase_size: u32,
    /// Feature flags
    pub features: Features,
    /// Write-protection scheme, if the chip has one
    pub wp: Option<WpScheme>,
    /// Test status
    pub tested: ChipTestStatus,
}

impl FlashChip {
    /// Check if this chip matches the given identification bytes
    pub fn matches_id(&self, manufacturer: u32, model: u32) -> bool {
        self.manufacturer_id == manufacturer && self.model_id == model
    }

    /// Check if the chip can sit on one of the given buses
    pub fn is_compatible_with(&self, buses: BusType) -> bool {
        self.bus.intersects(buses)
    }

    /// Value of an erased byte
    pub fn erased_value(&self) -> u8 {
        if self.features.contains(Features::ERASED_ZERO) {
            0x00
        } else {
            0xFF
        }
    }

    /// Check if an address range is valid for this chip
    pub fn is_valid_range(&self, addr: u32, len: usize) -> bool {
        addr as u64 + len as u64 <= self.total_size as u64
    }
}
