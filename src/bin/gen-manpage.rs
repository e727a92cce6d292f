//! Man page generator for romflash
//!
//! Writes `romflash.1` plus one page per subcommand (`romflash-read.1`, ...).
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
#[allow(dead_code)]
mod cli;

fn render(cmd: clap::Command, path: &Path) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut buffer)?;
    fs::write(path, buffer)
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();
    let mut pages = Vec::new();

    for sub in cmd.get_subcommands() {
        let path = output_dir.join(format!("romflash-{}.1", sub.get_name()));
        render(sub.clone(), &path)?;
        pages.push(path);
    }

    let main_page = output_dir.join("romflash.1");
    render(cmd, &main_page)?;
    pages.insert(0, main_page);

    for page in &pages {
        println!("Man page generated at: {}", page.display());
    }
    println!("\nTo view the main page:");
    println!("  man -l {}", pages[0].display());
    println!("\nTo install system-wide (requires sudo):");
    println!("  sudo cp {}/*.1 /usr/local/share/man/man1/", output_dir.display());
    println!("  sudo mandb");

    Ok(())
}
