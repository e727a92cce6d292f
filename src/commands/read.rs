//! Read and extract command implementations

use romflash_core::flash::FlashContext;
use romflash_core::image;
use std::path::Path;

/// Run the read command
pub fn run_read(
    ctx: &mut FlashContext<'_>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = image::read_image(ctx, output)?;
    if let Some(path) = output {
        println!("Wrote {} bytes to {}", data.len(), path.display());
    }
    for region in ctx.active_layout().included_file_regions() {
        if let Some(file) = &region.file {
            println!("Region \"{}\" saved to {}", region.name, file.display());
        }
    }
    Ok(())
}

/// Run the extract command
///
/// Every region of the layout ends up in its own file under `dir`.
pub fn run_extract(ctx: &mut FlashContext<'_>, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if ctx.layout().is_none() {
        return Err("Extracting regions requires a layout (--layout, --ifd or --fmap)".into());
    }
    std::fs::create_dir_all(dir)?;
    image::extract(ctx, dir)?;
    println!(
        "Extracted {} region(s) to {}",
        ctx.active_layout().regions.len(),
        dir.display()
    );
    Ok(())
}
