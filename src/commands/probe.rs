//! Probe and chip query commands

use romflash_core::flash::FlashContext;

/// Print what probing found
pub fn run_probe(ctx: &FlashContext<'_>) {
    let chip = ctx.chip();
    println!("Found: {} {} on {}", chip.vendor, chip.name, ctx.master_name());
    println!(
        "  JEDEC ID: {:02X} {:04X}",
        chip.manufacturer_id, chip.model_id
    );
    println!("  Size:     {} bytes", chip.total_size);
    println!("  Bus:      {}", chip.bus);
}

/// Print the vendor and name of the chip
pub fn run_flash_name(ctx: &FlashContext<'_>) {
    let chip = ctx.chip();
    println!("vendor=\"{}\" name=\"{}\"", chip.vendor, chip.name);
}

/// Print the size of the chip in bytes
pub fn run_flash_size(ctx: &FlashContext<'_>) {
    println!("{}", ctx.chip_size());
}
