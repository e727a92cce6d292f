//! romflash - probe, read, write, erase and write-protect flash chips
//!
//! Every hardware command follows the same sequence:
//!
//! 1. File and include arguments are checked
//! 2. The programmers given with `-p` are opened
//! 3. The masters are probed and exactly one chip is bound
//! 4. Flags, the sacrifice ratio and the progress display are applied
//! 5. The layout source is read and the include arguments are applied
//! 6. The operation runs against the bound chip

mod cli;
mod commands;
mod progress;
mod session;

use clap::Parser;
use cli::{Cli, Commands, LayoutCommands, RegionArgs, TargetArgs};
use romflash_core::chip::ChipDatabase;
use romflash_core::flash::{Flag, FlashContext};
use romflash_core::image;
use romflash_core::layout::{IncludeArgs, LayoutSource};
use std::error::Error;
use std::path::{Path, PathBuf};

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    // Load chip database
    let db = match load_chip_database(cli.chip_db.as_deref()) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to load chip database: {}", e);
            std::process::exit(1);
        }
    };

    log::debug!("Loaded {} chip definitions", db.len());

    if let Err(e) = run(cli.command, &db) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands, db: &ChipDatabase) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Probe { target } => with_chip(db, &target, false, |ctx| {
            commands::run_probe(ctx);
            Ok(())
        }),
        Commands::Read {
            target,
            output,
            regions,
            skip_unreadable,
        } => {
            let (includes, source) = prepare_image_args(output.as_deref(), &regions, false)?;
            with_chip(db, &target, true, |ctx| {
                ctx.set_flag(Flag::SkipUnreadableRegions, skip_unreadable);
                source.bind(ctx, &includes)?;
                commands::run_read(ctx, output.as_deref())
            })
        }
        Commands::Write {
            target,
            input,
            reference,
            regions,
            noverify,
            noverify_all,
            skip_unwritable,
        } => {
            let (includes, source) = prepare_image_args(input.as_deref(), &regions, true)?;
            with_chip(db, &target, false, |ctx| {
                ctx.set_flag(Flag::VerifyAfterWrite, !noverify);
                ctx.set_flag(Flag::VerifyWholeChip, !noverify_all);
                ctx.set_flag(Flag::SkipUnwritableRegions, skip_unwritable);
                source.bind(ctx, &includes)?;
                commands::run_write(ctx, input.as_deref(), reference.as_deref())
            })
        }
        Commands::Verify {
            target,
            input,
            regions,
        } => {
            let (includes, source) = prepare_image_args(input.as_deref(), &regions, true)?;
            with_chip(db, &target, false, |ctx| {
                source.bind(ctx, &includes)?;
                commands::run_verify(ctx, input.as_deref())
            })
        }
        Commands::Erase { target, regions } => {
            let includes = IncludeArgs::parse_all(&regions.include)?;
            let source = regions.layout.source(None)?;
            with_chip(db, &target, false, |ctx| {
                source.bind(ctx, &includes)?;
                commands::run_erase(ctx)
            })
        }
        Commands::Extract {
            target,
            dir,
            layout,
        } => {
            let source = layout.source(None)?;
            with_chip(db, &target, true, |ctx| {
                source.bind(ctx, &IncludeArgs::new())?;
                commands::run_extract(ctx, &dir)
            })
        }
        Commands::FlashName { target } => with_chip(db, &target, false, |ctx| {
            commands::run_flash_name(ctx);
            Ok(())
        }),
        Commands::FlashSize { target } => with_chip(db, &target, false, |ctx| {
            commands::run_flash_size(ctx);
            Ok(())
        }),
        Commands::Wp {
            target,
            wp_list,
            wp_status,
            wp_range,
            wp_region,
            wp_enable,
            wp_disable,
            layout,
        } => {
            let request = commands::wp::build_request(&commands::wp::WpOptions {
                list: wp_list,
                status: wp_status,
                range: wp_range.as_deref(),
                region: wp_region.as_deref(),
                enable: wp_enable,
                disable: wp_disable,
            })?;
            let source = layout.source(None)?;
            with_chip(db, &target, false, |ctx| {
                source.bind(ctx, &IncludeArgs::new())?;
                commands::wp::run_wp(ctx, &request)
            })
        }
        Commands::Layout(cmd) => match cmd {
            LayoutCommands::Show { file } => commands::layout::cmd_show(&file),
            LayoutCommands::Ifd { input, output } => {
                commands::layout::cmd_ifd(&input, output.as_deref())
            }
            LayoutCommands::Fmap { input, output } => {
                commands::layout::cmd_fmap(&input, output.as_deref())
            }
        },
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
        Commands::ListChips { vendor } => {
            commands::list_chips(db, vendor.as_deref());
            Ok(())
        }
    }
}

/// Validate the file arguments of a read, write or verify before any
/// hardware is touched
///
/// Only an input image can back `--ifd-verify`/`--fmap-verify`; a read's
/// output file is never compared against.
fn prepare_image_args(
    file: Option<&Path>,
    regions: &RegionArgs,
    file_is_input: bool,
) -> Result<(IncludeArgs, LayoutSource), Box<dyn Error>> {
    let includes = IncludeArgs::parse_all(&regions.include)?;
    image::check_file_args(file.is_some(), &includes)?;
    let source = regions.layout.source(file.filter(|_| file_is_input))?;
    Ok((includes, source))
}

/// Open the programmers, bind the chip and run `op` on it
fn with_chip<F>(
    db: &ChipDatabase,
    target: &TargetArgs,
    force_read: bool,
    op: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnOnce(&mut FlashContext<'_>) -> Result<(), Box<dyn Error>>,
{
    let mut masters = session::open_masters(target, db)?;
    let mut ctx = session::bind(&mut masters, db, target, force_read)?;
    op(&mut ctx)
}

// =============================================================================
// Chip database loading
// =============================================================================

/// Load chip database from the specified path or default locations
fn load_chip_database(path: Option<&Path>) -> Result<ChipDatabase, Box<dyn Error>> {
    let mut db = ChipDatabase::new();

    if let Some(path) = path {
        // User specified a path
        if path.is_dir() {
            db.load_dir(path)?;
        } else if path.is_file() {
            db.load_file(path)?;
        } else {
            return Err(format!("Chip database path not found: {}", path.display()).into());
        }
    } else {
        // Try default locations
        let default_paths = [
            PathBuf::from("chips/vendors"),
            PathBuf::from("/usr/share/romflash/chips"),
            PathBuf::from("/usr/local/share/romflash/chips"),
        ];

        let mut loaded = false;
        for dir in &default_paths {
            if dir.is_dir() {
                match db.load_dir(dir) {
                    Ok(count) => {
                        log::debug!("Loaded {} chips from {}", count, dir.display());
                        loaded = true;
                    }
                    Err(e) => {
                        log::warn!("Failed to load chips from {}: {}", dir.display(), e);
                    }
                }
            }
        }

        if !loaded {
            log::warn!("No chip database found in default locations");
        }
    }

    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundled_db() -> ChipDatabase {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("chips/vendors");
        load_chip_database(Some(&dir)).unwrap()
    }

    fn parse(args: &[&str]) -> Commands {
        let mut argv = vec!["romflash"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("romflash-cli-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_bundled_chip_database_loads() {
        let db = bundled_db();
        assert!(db.find_exact("W25Q128.V").is_some());
        assert_eq!(db.find_by_signature(0xC2, 0x2017).len(), 2);
        assert!(db.find_by_vendor("sst").len() >= 2);
    }

    #[test]
    fn test_missing_database_path() {
        assert!(load_chip_database(Some(Path::new("/nonexistent/romflash-chips"))).is_err());
    }

    #[test]
    fn test_read_without_file_fails_before_probing() {
        let db = ChipDatabase::new();
        let err = run(parse(&["read", "-p", "no-such-programmer"]), &db).unwrap_err();
        assert_eq!(err.to_string(), "No image file specified.");
    }

    #[test]
    fn test_read_rejects_verifying_layout_sources() {
        let db = ChipDatabase::new();
        for flag in ["--ifd-verify", "--fmap-verify"] {
            let cmd = parse(&["read", "-p", "no-such-programmer", "-o", "out.bin", flag]);
            let err = run(cmd, &db).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("{} needs an input image and only applies to write and verify", flag)
            );
        }
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_probe_default_emulator() {
        assert!(run(parse(&["probe", "-p", "dummy"]), &bundled_db()).is_ok());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_ambiguous_probe_needs_chip_name() {
        let db = bundled_db();
        let err = run(parse(&["flash-size", "-p", "dummy:emulate=MX25L6405"]), &db).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Multiple flash chip definitions match the detected chip(s): \"MX25L6405\""));

        let cmd = parse(&["flash-size", "-p", "dummy:emulate=MX25L6405", "-c", "MX25L6405"]);
        assert!(run(cmd, &db).is_ok());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_same_chip_on_two_programmers() {
        let cmd = parse(&["flash-size", "-p", "dummy:emulate=W25X05", "-p", "dummy:emulate=W25X05"]);
        let err = run(cmd, &bundled_db()).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Flash chip \"W25X05\" was found on more than one programmer."));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_read_write_verify_through_cli() {
        let db = bundled_db();
        let image = temp_file("image");
        let out = temp_file("out");
        let mut data = vec![0xFFu8; 64 * 1024];
        data[..4].copy_from_slice(b"ROM!");
        std::fs::write(&image, &data).unwrap();

        let fresh = "dummy:emulate=W25X05";
        let preloaded = format!("dummy:emulate=W25X05,image={}", image.display());
        let image_arg = image.to_str().unwrap();

        assert!(run(parse(&["write", "-p", fresh, "--input", image_arg]), &db).is_ok());

        let read = parse(&["read", "-p", preloaded.as_str(), "-o", out.to_str().unwrap()]);
        assert!(run(read, &db).is_ok());
        assert_eq!(std::fs::read(&out).unwrap(), data);

        assert!(run(parse(&["verify", "-p", preloaded.as_str(), "--input", image_arg]), &db).is_ok());
        assert!(run(parse(&["verify", "-p", fresh, "--input", image_arg]), &db).is_err());

        let _ = std::fs::remove_file(&image);
        let _ = std::fs::remove_file(&out);
    }
}
