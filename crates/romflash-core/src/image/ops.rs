//! Read, extract, write, verify and erase

use std::path::Path;

use super::{ImageBuffer, ImageError, ImageResult};
use crate::flash::FlashContext;
use crate::layout::{IncludeArgs, Layout};

/// Check the file arguments of a read, write or verify before probing
///
/// Without a file of its own an operation needs at least one include
/// argument, and every include argument must then name a file.
pub fn check_file_args(has_file: bool, includes: &IncludeArgs) -> ImageResult<()> {
    if has_file {
        return Ok(());
    }
    if includes.is_empty() {
        return Err(ImageError::NoImageFile);
    }
    includes.check_files()?;
    Ok(())
}

/// Build the content buffer for a write or verify
///
/// The whole image seeds the buffer, then each included region with a file
/// overrides its sub-range. Region files must not overlap.
pub fn assemble(size: usize, layout: &Layout, image: Option<&Path>) -> ImageResult<ImageBuffer> {
    layout.check_file_overlap()?;

    let mut regions = layout.included_file_regions().peekable();
    if image.is_none() && regions.peek().is_none() {
        return Err(ImageError::NoImageFile);
    }

    let mut buf = match image {
        Some(path) => ImageBuffer::from_file(path, size)?,
        None => ImageBuffer::new(size),
    };
    for region in regions {
        log::debug!("Loading region \"{}\" from {}", region.name, display_file(region.file.as_deref()));
        buf.load_region(region)?;
    }
    Ok(buf)
}

fn display_file(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}

/// Read the selected ranges of the chip
///
/// Region files are written from the buffer first, then the whole buffer
/// goes to `output` when given.
pub fn read_image(ctx: &mut FlashContext<'_>, output: Option<&Path>) -> ImageResult<ImageBuffer> {
    let layout = ctx.active_layout();
    if output.is_none() && layout.included_file_regions().next().is_none() {
        return Err(ImageError::NoImageFile);
    }
    layout.check_bounds(ctx.chip_size())?;

    let mut buf = ImageBuffer::new(ctx.chip_size() as usize);
    log::info!("Reading flash...");
    ctx.image_read(&mut buf).map_err(ImageError::Read)?;

    for region in ctx.active_layout().included_file_regions() {
        buf.store_region(region)?;
    }
    if let Some(path) = output {
        buf.store_file(path)?;
    }
    log::info!("Read complete.");
    Ok(buf)
}

/// Read every layout region into its own file under `dir`
///
/// Any include selection is replaced by all regions. Regions without a file
/// are written to a file named after the region.
pub fn extract(ctx: &mut FlashContext<'_>, dir: &Path) -> ImageResult<ImageBuffer> {
    let mut layout = ctx.active_layout().clone();
    layout.prepare_for_extraction(dir);
    let previous = ctx.set_layout(layout);

    let result = read_image(ctx, None);
    match previous {
        Some(layout) => {
            ctx.set_layout(layout);
        }
        None => {
            ctx.take_layout();
        }
    }
    result
}

/// Write an image to the chip
///
/// `reference`, when given, is a file of the chip's size holding what the
/// caller believes is already on the chip.
pub fn write_image(
    ctx: &mut FlashContext<'_>,
    image: Option<&Path>,
    reference: Option<&Path>,
) -> ImageResult<()> {
    let size = ctx.chip_size() as usize;
    let layout = ctx.active_layout();
    layout.check_bounds(ctx.chip_size())?;
    let buf = assemble(size, layout, image)?;
    let refbuf = reference
        .map(|path| ImageBuffer::from_file(path, size))
        .transpose()?;

    log::info!("Writing flash...");
    ctx.image_write(&buf, refbuf.as_deref())
        .map_err(ImageError::Write)?;
    log::info!("Write complete.");
    Ok(())
}

/// Compare the chip against an image
pub fn verify_image(ctx: &mut FlashContext<'_>, image: Option<&Path>) -> ImageResult<()> {
    let size = ctx.chip_size() as usize;
    let layout = ctx.active_layout();
    layout.check_bounds(ctx.chip_size())?;
    let buf = assemble(size, layout, image)?;

    log::info!("Verifying flash...");
    ctx.image_verify(&buf).map_err(ImageError::Verify)?;
    log::info!("VERIFIED.");
    Ok(())
}

/// Erase the selected ranges
pub fn erase(ctx: &mut FlashContext<'_>) -> ImageResult<()> {
    ctx.active_layout().check_bounds(ctx.chip_size())?;
    log::info!("Erasing flash...");
    ctx.erase().map_err(ImageError::Erase)?;
    log::info!("Erase complete.");
    Ok(())
}
