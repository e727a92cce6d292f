//! Intel Flash Descriptor (IFD) parsing
//!
//! The descriptor lives in the first 4 KiB of the chip on Intel platforms.
//! Its signature sits at 0x10, followed by FLMAP0 which locates the flash
//! region table (FRBA) and gives the number of regions (NR).

use super::{Layout, LayoutError, LayoutKind, Region};

/// IFD signature at offset 0x10
pub const IFD_SIGNATURE: u32 = 0x0FF0_A55A;

/// Bytes read from the chip to parse a descriptor
pub const IFD_SIZE: usize = 0x1000;

const SIGNATURE_OFFSET: usize = 0x10;
const FLMAP0_OFFSET: usize = 0x14;
const MAX_IFD_REGIONS: usize = 16;

const REGION_NAMES: [&str; MAX_IFD_REGIONS] = [
    "descriptor",
    "bios",
    "me",
    "gbe",
    "platform",
    "devexp",
    "bios2",
    "ec",
    "ie",
    "10gbe",
    "oprom",
    "region11",
    "region12",
    "region13",
    "region14",
    "ptt",
];

const DANGEROUS_REGIONS: [&str; 3] = ["me", "descriptor", "ptt"];
const READONLY_REGIONS: [&str; 1] = ["descriptor"];

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Check if data starts with an Intel Flash Descriptor
pub fn has_ifd(data: &[u8]) -> bool {
    read_u32(data, SIGNATURE_OFFSET) == Some(IFD_SIGNATURE)
}

/// Parse an Intel Flash Descriptor into a layout
///
/// Regions whose limit lies below their base are unused and skipped.
/// Regions keep descriptor order.
pub fn parse_ifd(data: &[u8]) -> Result<Layout, LayoutError> {
    if data.len() < IFD_SIZE || !has_ifd(data) {
        return Err(LayoutError::InvalidIfd);
    }
    let flmap0 = read_u32(data, FLMAP0_OFFSET).ok_or(LayoutError::InvalidIfd)?;

    let nr = ((flmap0 >> 24) & 0x07) as usize + 1;
    let num_regions = nr.min(MAX_IFD_REGIONS);
    let frba = ((flmap0 >> 12) & 0xFF0) as usize;

    let mut layout = Layout::with_kind(LayoutKind::Ifd);
    layout.name = Some("Intel Flash Descriptor".to_string());

    for (i, &name) in REGION_NAMES.iter().enumerate().take(num_regions) {
        let freg = read_u32(data, frba + i * 4).ok_or(LayoutError::InvalidIfd)?;
        let base = (freg & 0x7FFF) << 12;
        let limit = ((freg >> 16) & 0x7FFF) << 12;
        if limit < base {
            continue;
        }

        let mut region = Region::new(name, base, limit | 0xFFF);
        region.readonly = READONLY_REGIONS.contains(&name);
        region.dangerous = DANGEROUS_REGIONS.contains(&name);
        layout.add_region(region);
    }

    Ok(layout)
}

/// Require the chip descriptor to match a reference dump
///
/// Regions are compared pairwise in order on start, end and name. Any
/// difference, including a different number of regions, is a mismatch.
pub fn check_against_dump(chip: &Layout, dump: &[u8]) -> Result<(), LayoutError> {
    let dump_layout = parse_ifd(dump)?;
    if chip.same_regions(&dump_layout) {
        Ok(())
    } else {
        Err(LayoutError::IfdMismatch)
    }
}

impl Layout {
    /// Parse a layout from Intel Flash Descriptor bytes
    pub fn from_ifd(data: &[u8]) -> Result<Self, LayoutError> {
        parse_ifd(data)
    }
}
