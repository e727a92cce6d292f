//! Emulated chip configuration

use romflash_core::chip::{BusType, FlashChip, WpRegisterLayout, WpScheme};
use romflash_core::wp::RangeDecoder;

/// Configuration for the dummy flash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyConfig {
    /// Name reported by the master
    pub name: String,
    /// Buses the master drives
    pub buses: BusType,
    /// Manufacturer ID the chip answers with
    pub manufacturer_id: u32,
    /// Model ID the chip answers with
    pub model_id: u32,
    /// Flash size in bytes
    pub size: u32,
    /// Smallest erase block in bytes
    pub erase_size: u32,
    /// Value of an erased byte
    pub erased_value: u8,
    /// Largest chip the master can map, on every bus
    pub max_rom_decode: Option<u32>,
    /// Status-register protection, `None` if the chip has none
    pub wp: Option<WpScheme>,
    /// WP# pin asserted
    pub hw_wp: bool,
    /// Inclusive ranges the master can neither read nor write
    pub locked: Vec<(u32, u32)>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            name: "dummy".into(),
            buses: BusType::SPI,
            manufacturer_id: 0xEF, // Winbond
            model_id: 0x4018,      // W25Q128.V
            size: 16 * 1024 * 1024,
            erase_size: 4096,
            erased_value: 0xFF,
            max_rom_decode: None,
            wp: Some(WpScheme {
                registers: WpRegisterLayout::Winbond,
                decoder: RangeDecoder::Spi25,
            }),
            hw_wp: false,
            locked: Vec::new(),
        }
    }
}

impl DummyConfig {
    /// Emulate the chip described by a database entry
    pub fn emulate(chip: &FlashChip) -> Self {
        Self {
            buses: chip.bus,
            manufacturer_id: chip.manufacturer_id,
            model_id: chip.model_id,
            size: chip.total_size,
            erase_size: if chip.erase_size == 0 { 4096 } else { chip.erase_size },
            erased_value: chip.erased_value(),
            wp: chip.wp,
            ..Self::default()
        }
    }
}
