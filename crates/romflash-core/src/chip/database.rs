//! Chip database for runtime loading and lookup
//!
//! This module provides the `ChipDatabase` type for loading chip definitions
//! from RON files at runtime. Each file describes one vendor:
//!
//! ```ron
//! (
//!     vendor: "Winbond",
//!     manufacturer_id: 0xEF,
//!     chips: [
//!         (
//!             name: "W25Q128.V",
//!             device_id: 0x4018,
//!             total_size: MiB(16),
//!             bus: [Spi],
//!             wp: Some((registers: Winbond, decoder: Spi25)),
//!         ),
//!     ],
//! )
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::features::{BusType, Features};
use super::types::{ChipTestStatus, FlashChip, TestStatus, WpRegisterLayout, WpScheme};
use crate::wp::RangeDecoder;

/// Error type for chip database operations
#[derive(Debug, thiserror::Error)]
pub enum ChipDbError {
    /// I/O error reading files
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File or directory being read
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// RON parsing error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

// ============================================================================
// RON deserialization types (intermediate format)
// ============================================================================

/// Size specification with human-readable units (for RON parsing)
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub enum Size {
    /// Size in bytes
    B(u32),
    /// Size in kibibytes (1024 bytes)
    KiB(u32),
    /// Size in mebibytes (1024 * 1024 bytes)
    MiB(u32),
}

impl Size {
    /// Convert to bytes
    pub fn to_bytes(self) -> u32 {
        match self {
            Size::B(n) => n,
            Size::KiB(n) => n * 1024,
            Size::MiB(n) => n * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
#[serde(default)]
struct FeaturesDef {
    fast_read: bool,
    four_byte_addr: bool,
    otp: bool,
    sfdp: bool,
    status_reg_2: bool,
    write_byte: bool,
    erased_zero: bool,
}

impl From<FeaturesDef> for Features {
    fn from(def: FeaturesDef) -> Self {
        let pairs = [
            (def.fast_read, Features::FAST_READ),
            (def.four_byte_addr, Features::FOUR_BYTE_ADDR),
            (def.otp, Features::OTP),
            (def.sfdp, Features::SFDP),
            (def.status_reg_2, Features::STATUS_REG_2),
            (def.write_byte, Features::WRITE_BYTE),
            (def.erased_zero, Features::ERASED_ZERO),
        ];
        pairs
            .into_iter()
            .filter(|(set, _)| *set)
            .fold(Features::empty(), |acc, (_, flag)| acc | flag)
    }
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
enum BusDef {
    Parallel,
    Lpc,
    Fwh,
    Spi,
    Prog,
}

impl From<BusDef> for BusType {
    fn from(def: BusDef) -> Self {
        match def {
            BusDef::Parallel => BusType::PARALLEL,
            BusDef::Lpc => BusType::LPC,
            BusDef::Fwh => BusType::FWH,
            BusDef::Spi => BusType::SPI,
            BusDef::Prog => BusType::PROG,
        }
    }
}

fn default_bus() -> Vec<BusDef> {
    vec![BusDef::Spi]
}

#[derive(Debug, Clone, Copy, serde::Deserialize, Default)]
enum TestStatusDef {
    #[default]
    Untested,
    Ok,
    Bad,
    Na,
}

impl From<TestStatusDef> for TestStatus {
    fn from(def: TestStatusDef) -> Self {
        match def {
            TestStatusDef::Untested => TestStatus::Untested,
            TestStatusDef::Ok => TestStatus::Ok,
            TestStatusDef::Bad => TestStatus::Bad,
            TestStatusDef::Na => TestStatus::Na,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(default)]
struct TestStatusesDef {
    probe: TestStatusDef,
    read: TestStatusDef,
    erase: TestStatusDef,
    write: TestStatusDef,
    wp: TestStatusDef,
}

impl From<TestStatusesDef> for ChipTestStatus {
    fn from(def: TestStatusesDef) -> Self {
        ChipTestStatus {
            probe: def.probe.into(),
            read: def.read.into(),
            erase: def.erase.into(),
            write: def.write.into(),
            wp: def.wp.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
enum RegisterLayoutDef {
    Winbond,
    WinbondBp3,
    Basic,
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
enum DecoderDef {
    Spi25,
    Spi25_64kBlock,
    Spi25BitCmp,
    Spi25_2xBlock,
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
struct WpSchemeDef {
    registers: RegisterLayoutDef,
    #[serde(default = "default_decoder")]
    decoder: DecoderDef,
}

fn default_decoder() -> DecoderDef {
    DecoderDef::Spi25
}

impl From<WpSchemeDef> for WpScheme {
    fn from(def: WpSchemeDef) -> Self {
        WpScheme {
            registers: match def.registers {
                RegisterLayoutDef::Winbond => WpRegisterLayout::Winbond,
                RegisterLayoutDef::WinbondBp3 => WpRegisterLayout::WinbondBp3,
                RegisterLayoutDef::Basic => WpRegisterLayout::Basic,
            },
            decoder: match def.decoder {
                DecoderDef::Spi25 => RangeDecoder::Spi25,
                DecoderDef::Spi25_64kBlock => RangeDecoder::Spi25_64kBlock,
                DecoderDef::Spi25BitCmp => RangeDecoder::Spi25BitCmp,
                DecoderDef::Spi25_2xBlock => RangeDecoder::Spi25_2xBlock,
            },
        }
    }
}

/// Single chip definition in RON format
#[derive(Debug, Clone, serde::Deserialize)]
struct ChipDef {
    name: String,
    device_id: u32,
    total_size: Size,
    #[serde(default = "default_bus")]
    bus: Vec<BusDef>,
    #[serde(default = "default_page_size")]
    page_size: u32,
    #[serde(default = "default_erase_size")]
    erase_size: Size,
    #[serde(default)]
    features: FeaturesDef,
    #[serde(default)]
    wp: Option<WpSchemeDef>,
    #[serde(default)]
    tested: TestStatusesDef,
}

fn default_page_size() -> u32 {
    256
}

fn default_erase_size() -> Size {
    Size::KiB(4)
}

/// Vendor definition containing multiple chips
#[derive(Debug, Clone, serde::Deserialize)]
struct VendorDef {
    vendor: String,
    manufacturer_id: u32,
    chips: Vec<ChipDef>,
}

// ============================================================================
// Chip database
// ============================================================================

/// Runtime chip database
///
/// Holds a collection of flash chip definitions that can be loaded from RON
/// files. Order is preserved: probing walks the chips in load order, and
/// within a directory files are loaded sorted by name.
#[derive(Debug, Clone, Default)]
pub struct ChipDatabase {
    chips: Vec<FlashChip>,
}

impl ChipDatabase {
    /// Create an empty chip database
    pub fn new() -> Self {
        Self { chips: Vec::new() }
    }

    /// Create a database from already-built descriptors
    pub fn from_chips(chips: Vec<FlashChip>) -> Self {
        Self { chips }
    }

    /// Load chip definitions from a single RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ChipDbError> {
        let content = fs::read_to_string(path).map_err(|source| ChipDbError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_ron(&content)
    }

    /// Load chip definitions from a RON string
    pub fn load_ron(&mut self, content: &str) -> Result<usize, ChipDbError> {
        let vendor_def: VendorDef = ron::from_str(content)?;
        let count = vendor_def.chips.len();

        for chip_def in vendor_def.chips {
            if self.find_exact(&chip_def.name).is_some() {
                return Err(ChipDbError::Validation(format!(
                    "duplicate chip name '{}'",
                    chip_def.name
                )));
            }

            let total_size = chip_def.total_size.to_bytes();
            let erase_size = chip_def.erase_size.to_bytes();
            if total_size == 0 || erase_size == 0 || total_size % erase_size != 0 {
                return Err(ChipDbError::Validation(format!(
                    "chip '{}': size {} is not a non-zero multiple of erase size {}",
                    chip_def.name, total_size, erase_size
                )));
            }

            let bus = chip_def
                .bus
                .into_iter()
                .fold(BusType::empty(), |acc, b| acc | BusType::from(b));

            self.chips.push(FlashChip {
                vendor: vendor_def.vendor.clone(),
                name: chip_def.name,
                bus,
                manufacturer_id: vendor_def.manufacturer_id,
                model_id: chip_def.device_id,
                total_size,
                page_size: chip_def.page_size,
                erase_size,
                features: chip_def.features.into(),
                wp: chip_def.wp.map(Into::into),
                tested: chip_def.tested.into(),
            });
        }

        Ok(count)
    }

    /// Load all RON files from a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, ChipDbError> {
        let io_err = |source| ChipDbError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().is_some_and(|ext| ext == "ron") {
                files.push(path);
            }
        }
        files.sort();

        let mut total = 0;
        for path in files {
            total += self.load_file(&path)?;
        }
        Ok(total)
    }

    /// Get all chips in the database
    pub fn chips(&self) -> &[FlashChip] {
        &self.chips
    }

    /// Get the number of chips in the database
    pub fn len(&self) -> usize {
        self.chips.len()
    }

    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    /// Find a chip by its exact name (case-sensitive)
    pub fn find_exact(&self, name: &str) -> Option<&FlashChip> {
        self.chips.iter().find(|c| c.name == name)
    }

    /// Find chips by their identification bytes
    pub fn find_by_signature(&self, manufacturer: u32, model: u32) -> Vec<&FlashChip> {
        self.chips
            .iter()
            .filter(|c| c.matches_id(manufacturer, model))
            .collect()
    }

    /// Find chips by name (case-insensitive partial match)
    pub fn find_by_name(&self, name: &str) -> Vec<&FlashChip> {
        let name_lower = name.to_lowercase();
        self.chips
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&name_lower))
            .collect()
    }

    /// Find chips by vendor (case-insensitive partial match)
    pub fn find_by_vendor(&self, vendor: &str) -> Vec<&FlashChip> {
        let vendor_lower = vendor.to_lowercase();
        self.chips
            .iter()
            .filter(|c| c.vendor.to_lowercase().contains(&vendor_lower))
            .collect()
    }

    /// Iterate over all chips
    pub fn iter(&self) -> impl Iterator<Item = &FlashChip> {
        self.chips.iter()
    }
}
