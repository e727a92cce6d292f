//! Verify command implementation

use romflash_core::flash::FlashContext;
use romflash_core::image;
use std::path::Path;

/// Run the verify command
pub fn run_verify(
    ctx: &mut FlashContext<'_>,
    input: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    image::verify_image(ctx, input)?;
    println!("Verification passed");
    Ok(())
}
