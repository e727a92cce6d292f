//! Erase command implementation

use romflash_core::flash::FlashContext;
use romflash_core::image;

/// Run the erase command over the included regions, or the whole chip
pub fn run_erase(ctx: &mut FlashContext<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let bytes: u64 = ctx
        .active_layout()
        .included_regions()
        .map(|r| u64::from(r.size()))
        .sum();
    image::erase(ctx)?;
    println!("Erased {} bytes", bytes);
    Ok(())
}
