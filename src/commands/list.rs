//! List commands implementation

use romflash_core::chip::{ChipDatabase, FlashChip};
use romflash_core::layout::format_size;

/// List all supported programmers
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();
    for info in romflash_registry::available_programmers() {
        let aliases = if info.aliases.is_empty() {
            String::new()
        } else {
            format!(" (aliases: {})", info.aliases.join(", "))
        };
        println!("  {:<10} - {}{}", info.name, info.description, aliases);
    }
}

/// List the chips in the database
pub fn list_chips(db: &ChipDatabase, vendor_filter: Option<&str>) {
    let chips: Vec<&FlashChip> = match vendor_filter {
        Some(vendor) => db.find_by_vendor(vendor),
        None => db.iter().collect(),
    };

    println!("Supported flash chips:");
    println!();
    println!(
        "{:<12} {:<20} {:>10} {:>10} {:<16} {:>3}",
        "Vendor", "Name", "Size", "JEDEC ID", "Bus", "WP"
    );
    println!("{}", "-".repeat(76));

    for chip in &chips {
        println!(
            "{:<12} {:<20} {:>10} {:>10} {:<16} {:>3}",
            chip.vendor,
            chip.name,
            format_size(chip.total_size),
            format!("{:02X} {:04X}", chip.manufacturer_id, chip.model_id),
            chip.bus.to_string(),
            if chip.wp.is_some() { "yes" } else { "-" }
        );
    }

    println!();
    println!("{} chip(s)", chips.len());
}
