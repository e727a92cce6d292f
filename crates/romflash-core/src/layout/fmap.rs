//! FMAP (flash map) parsing
//!
//! An fmap is a self-describing table of named areas, embedded anywhere in
//! the image. All fields are little-endian:
//!
//! ```text
//! header (56 bytes): signature[8] ver_major ver_minor base:u64 size:u32 name[32] nareas:u16
//! area   (42 bytes): offset:u32 size:u32 name[32] flags:u16
//! ```

use zerocopy::little_endian::{U16, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::{Layout, LayoutError, LayoutKind, Region};

/// FMAP signature
pub const FMAP_SIGNATURE: &[u8; 8] = b"__FMAP__";

/// Highest supported major version
pub const FMAP_VER_MAJOR: u8 = 1;

/// Size of the fmap header
pub const FMAP_HEADER_SIZE: usize = 56;

/// Size of one fmap area record
pub const FMAP_AREA_SIZE: usize = 42;

const FMAP_STRLEN: usize = 32;

/// Area flags
pub mod flags {
    /// Area contents do not change between builds
    pub const STATIC: u16 = 1 << 0;
    /// Area is compressed
    pub const COMPRESSED: u16 = 1 << 1;
    /// Area is read-only
    pub const RO: u16 = 1 << 2;
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct FmapHeader {
    signature: [u8; 8],
    ver_major: u8,
    ver_minor: u8,
    base: U64,
    size: U32,
    name: [u8; FMAP_STRLEN],
    nareas: U16,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct FmapArea {
    offset: U32,
    size: U32,
    name: [u8; FMAP_STRLEN],
    flags: U16,
}

const _: () = assert!(core::mem::size_of::<FmapHeader>() == FMAP_HEADER_SIZE);
const _: () = assert!(core::mem::size_of::<FmapArea>() == FMAP_AREA_SIZE);

fn fmap_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn fixed_string(s: &str) -> [u8; FMAP_STRLEN] {
    let mut out = [0u8; FMAP_STRLEN];
    let len = s.len().min(FMAP_STRLEN - 1);
    out[..len].copy_from_slice(&s.as_bytes()[..len]);
    out
}

fn header(data: &[u8]) -> Result<FmapHeader, LayoutError> {
    let (header, _) = FmapHeader::read_from_prefix(data).map_err(|_| LayoutError::FmapNotFound)?;
    if &header.signature != FMAP_SIGNATURE {
        return Err(LayoutError::FmapNotFound);
    }
    if header.ver_major > FMAP_VER_MAJOR {
        return Err(LayoutError::UnsupportedFmapVersion(header.ver_major));
    }
    Ok(header)
}

/// Total size of the fmap whose header starts `data`
///
/// Returns `None` unless `data` holds a valid header.
pub fn fmap_total_size(data: &[u8]) -> Option<usize> {
    let header = header(data).ok()?;
    Some(FMAP_HEADER_SIZE + header.nareas.get() as usize * FMAP_AREA_SIZE)
}

fn is_valid_at(data: &[u8]) -> bool {
    fmap_total_size(data).is_some_and(|size| size <= data.len())
}

/// Offset of the first valid fmap in `data`
pub fn find_fmap(data: &[u8]) -> Option<usize> {
    if data.len() < FMAP_HEADER_SIZE {
        return None;
    }
    (0..=data.len() - FMAP_HEADER_SIZE)
        .filter(|&offset| &data[offset..offset + FMAP_SIGNATURE.len()] == FMAP_SIGNATURE)
        .find(|&offset| is_valid_at(&data[offset..]))
}

/// Check if `data` contains an fmap
pub fn has_fmap(data: &[u8]) -> bool {
    find_fmap(data).is_some()
}

/// Parse the fmap starting at the beginning of `data`
///
/// Zero-size areas are dropped with a warning since a region cannot be
/// empty. Areas keep table order.
pub fn parse_fmap_at(data: &[u8]) -> Result<Layout, LayoutError> {
    let header = header(data)?;
    let mut rest = &data[FMAP_HEADER_SIZE..];

    let mut layout = Layout::with_kind(LayoutKind::Fmap);
    layout.name = Some(format!(
        "FMAP: {} (v{}.{})",
        fmap_string(&header.name),
        header.ver_major,
        header.ver_minor
    ));

    for _ in 0..header.nareas.get() {
        let (area, tail) = FmapArea::read_from_prefix(rest).map_err(|_| LayoutError::FmapNotFound)?;
        rest = tail;

        let name = fmap_string(&area.name);
        let (offset, size) = (area.offset.get(), area.size.get());
        if size == 0 {
            log::warn!(
                "Ignoring zero-size fmap region \"{}\"; empty regions are unsupported.",
                name
            );
            continue;
        }
        let end = offset
            .checked_add(size - 1)
            .ok_or_else(|| LayoutError::InvalidRegion {
                name: name.clone(),
                start: offset,
                end: u32::MAX,
            })?;

        let mut region = Region::new(name, offset, end);
        region.readonly = area.flags.get() & (flags::STATIC | flags::RO) != 0;
        layout.add_region(region);
    }

    Ok(layout)
}

/// Find and parse the first fmap in `data`
pub fn parse_fmap(data: &[u8]) -> Result<Layout, LayoutError> {
    log::debug!("Attempting to read fmap from buffer.");
    let offset = find_fmap(data).ok_or(LayoutError::FmapNotFound)?;
    log::debug!("Found fmap at offset 0x{:x}", offset);
    parse_fmap_at(&data[offset..])
}

/// Serialize a layout as an fmap covering `rom_size` bytes
///
/// Region names longer than 31 bytes are truncated.
pub fn encode_fmap(layout: &Layout, rom_size: u32) -> Vec<u8> {
    let header = FmapHeader {
        signature: *FMAP_SIGNATURE,
        ver_major: FMAP_VER_MAJOR,
        ver_minor: 1,
        base: U64::new(0),
        size: U32::new(rom_size),
        name: fixed_string(layout.name.as_deref().unwrap_or("FMAP")),
        nareas: U16::new(layout.regions.len() as u16),
    };

    let mut out = header.as_bytes().to_vec();
    for region in &layout.regions {
        let area = FmapArea {
            offset: U32::new(region.start),
            size: U32::new(region.size()),
            name: fixed_string(&region.name),
            flags: U16::new(if region.readonly { flags::RO } else { 0 }),
        };
        out.extend_from_slice(area.as_bytes());
    }
    out
}
