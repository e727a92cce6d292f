//! Reading layouts from the chip
//!
//! The descriptor is read from the first 4 KiB. An fmap is first looked
//! for at power-of-two aligned offsets, largest stride first, and only
//! then by reading the whole chip.

use super::fmap::{self, FMAP_HEADER_SIZE, FMAP_SIGNATURE};
use super::{ifd, Layout, LayoutError};
use crate::flash::FlashContext;

/// Smallest stride probed by the aligned fmap search
const MIN_FMAP_STRIDE: u32 = 256;

/// Read and parse the chip's Intel Flash Descriptor
///
/// With a reference `dump`, the dump's descriptor must describe exactly
/// the same regions.
pub fn read_ifd_from_rom(
    ctx: &mut FlashContext<'_>,
    dump: Option<&[u8]>,
) -> Result<Layout, LayoutError> {
    let mut desc = vec![0u8; ifd::IFD_SIZE];
    log::info!("Reading ich descriptor...");
    ctx.read_range(0, &mut desc).map_err(LayoutError::IfdRead)?;

    let layout = ifd::parse_ifd(&desc)?;
    if let Some(dump) = dump {
        ifd::check_against_dump(&layout, dump)?;
    }
    Ok(layout)
}

/// Locate and parse the fmap stored on the chip
pub fn read_fmap_from_rom(ctx: &mut FlashContext<'_>) -> Result<Layout, LayoutError> {
    log::debug!("Attempting to read fmap from ROM content.");
    let chip_size = ctx.chip_size();
    if let Some(layout) = fmap_bsearch_rom(ctx, chip_size)? {
        return Ok(layout);
    }
    fmap_lsearch_rom(ctx, chip_size)
}

fn fmap_bsearch_rom(
    ctx: &mut FlashContext<'_>,
    len: u32,
) -> Result<Option<Layout>, LayoutError> {
    if (len as usize) < FMAP_HEADER_SIZE {
        return Ok(None);
    }
    let last = len - FMAP_HEADER_SIZE as u32;
    let mut sig = [0u8; 8];
    let mut checked_zero = false;

    let mut stride = len / 2;
    while stride >= MIN_FMAP_STRIDE {
        let mut offset = 0u32;
        while offset <= last {
            let visited = if offset == 0 {
                checked_zero
            } else {
                offset % (stride * 2) == 0
            };
            checked_zero = true;

            if !visited && ctx.read_range(offset, &mut sig).is_ok() && &sig == FMAP_SIGNATURE {
                if let Some(layout) = read_fmap_at(ctx, offset)? {
                    log::debug!("Found fmap at offset 0x{:x}", offset);
                    return Ok(Some(layout));
                }
            }

            offset = match offset.checked_add(stride) {
                Some(next) => next,
                None => break,
            };
        }
        stride /= 2;
    }
    Ok(None)
}

fn read_fmap_at(ctx: &mut FlashContext<'_>, offset: u32) -> Result<Option<Layout>, LayoutError> {
    let mut header = [0u8; FMAP_HEADER_SIZE];
    ctx.read_range(offset, &mut header)
        .map_err(LayoutError::FmapRead)?;
    let Some(total) = fmap::fmap_total_size(&header) else {
        return Ok(None);
    };
    if offset as u64 + total as u64 > ctx.chip_size() as u64 {
        return Ok(None);
    }

    let mut data = vec![0u8; total];
    ctx.read_range(offset, &mut data)
        .map_err(LayoutError::FmapRead)?;
    fmap::parse_fmap_at(&data).map(Some)
}

fn fmap_lsearch_rom(ctx: &mut FlashContext<'_>, len: u32) -> Result<Layout, LayoutError> {
    log::debug!("Falling back to a linear fmap search");
    let mut data = vec![0u8; len as usize];
    ctx.read_range(0, &mut data)
        .map_err(LayoutError::FmapRead)?;
    fmap::parse_fmap(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::fmap::tests::make_test_image;
    use crate::layout::ifd::tests::make_test_ifd;
    use crate::testing::{test_chip, MemoryMaster};

    fn master_with(contents: &[u8], offset: usize) -> MemoryMaster {
        let mut master = MemoryMaster::new(test_chip(), 0xFF);
        master.data[offset..offset + contents.len()].copy_from_slice(contents);
        master
    }

    #[test]
    fn test_fmap_at_aligned_offset() {
        let image = make_test_image(0x200, 0);
        let mut master = master_with(&image, 0x8000);
        let mut ctx = FlashContext::new(&mut master, test_chip());

        let layout = read_fmap_from_rom(&mut ctx).unwrap();
        assert_eq!(layout.regions.len(), 2);
        assert_eq!(layout.regions[1].name, "RW_SECTION");
    }

    #[test]
    fn test_fmap_at_unaligned_offset_uses_linear_search() {
        let image = make_test_image(0x200, 0);
        let mut master = master_with(&image, 0x1234);
        let mut ctx = FlashContext::new(&mut master, test_chip());

        let layout = read_fmap_from_rom(&mut ctx).unwrap();
        assert_eq!(layout.regions[0].name, "RO_SECTION");
    }

    #[test]
    fn test_no_fmap() {
        let mut master = MemoryMaster::new(test_chip(), 0xFF);
        let mut ctx = FlashContext::new(&mut master, test_chip());
        assert!(matches!(
            read_fmap_from_rom(&mut ctx),
            Err(LayoutError::FmapNotFound)
        ));
    }

    #[test]
    fn test_ifd_from_rom() {
        let mut master = master_with(&make_test_ifd(), 0);
        let mut ctx = FlashContext::new(&mut master, test_chip());

        let layout = read_ifd_from_rom(&mut ctx, None).unwrap();
        assert_eq!(layout.regions.len(), 3);

        let layout = read_ifd_from_rom(&mut ctx, Some(&make_test_ifd())).unwrap();
        assert_eq!(layout.regions[1].name, "bios");
    }

    #[test]
    fn test_ifd_read_failure() {
        let mut master = master_with(&make_test_ifd(), 0);
        master.data.truncate(0x800);
        let mut ctx = FlashContext::new(&mut master, test_chip());
        assert!(matches!(
            read_ifd_from_rom(&mut ctx, None),
            Err(LayoutError::IfdRead(_))
        ));
    }
}
