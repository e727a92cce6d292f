//! Write command implementation

use romflash_core::flash::{Flag, FlashContext};
use romflash_core::image;
use std::path::Path;

/// Run the write command
///
/// Verification after the write follows the context flags.
pub fn run_write(
    ctx: &mut FlashContext<'_>,
    input: Option<&Path>,
    reference: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if reference.is_some() {
        log::info!("Assuming the chip contents match the reference file.");
    }
    image::write_image(ctx, input, reference)?;

    if ctx.flag(Flag::VerifyAfterWrite) {
        println!("Write and verify complete");
    } else {
        println!("Write complete");
    }
    Ok(())
}
