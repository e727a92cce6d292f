//! Layout command implementations

use romflash_core::layout::{self, format_size, ifd::has_ifd, Layout, LayoutKind};
use std::fs;
use std::path::Path;

/// Show layout from a file
pub fn cmd_show(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let layout = Layout::from_file(file)?;
    print_layout(&layout);
    Ok(())
}

/// Extract IFD layout from image
pub fn cmd_ifd(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;

    if !has_ifd(&data) {
        return Err("No Intel Flash Descriptor found in image".into());
    }

    let mut layout = Layout::from_ifd(&data)?;
    layout.chip_size = Some(u32::try_from(data.len())?);
    print_layout(&layout);
    emit(&layout, output)
}

/// Extract FMAP layout from image
pub fn cmd_fmap(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;

    let layout = layout::fmap::parse_fmap(&data)?;
    print_layout(&layout);
    emit(&layout, output)
}

fn emit(layout: &Layout, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(out) = output {
        fs::write(out, layout.to_toml_string())?;
        println!("\nSaved layout to {:?}", out);
    } else {
        println!("\n--- TOML Output ---\n");
        println!("{}", layout.to_toml_string());
    }
    Ok(())
}

/// Print layout information
pub fn print_layout(layout: &Layout) {
    println!("Layout Information");
    println!("==================");

    if let Some(name) = &layout.name {
        println!("Name:   {}", name);
    }

    println!(
        "Source: {}",
        match layout.kind {
            LayoutKind::WholeChip => "Whole chip",
            LayoutKind::File => "Layout file",
            LayoutKind::Ifd => "Intel Flash Descriptor",
            LayoutKind::Fmap => "FMAP",
            LayoutKind::Manual => "Manual",
        }
    );

    if let Some(size) = layout.chip_size {
        println!("Chip:   {} bytes ({})", size, format_size(size));
    }

    println!("\nRegions ({}):", layout.regions.len());
    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>8} {:>8}",
        "Name", "Start", "End", "Size", "RO", "Danger"
    );
    println!("{:-<74}", "");

    for region in &layout.regions {
        println!(
            "{:<20} {:#010X} {:#010X} {:>10} {:>8} {:>8}",
            region.name,
            region.start,
            region.end,
            format_size(region.size()),
            if region.readonly { "yes" } else { "-" },
            if region.dangerous { "yes" } else { "-" }
        );
    }
}
