//! CLI argument parsing

use clap::{Parser, Subcommand};
use romflash_core::layout::LayoutSource;
use std::path::{Path, PathBuf};

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use, repeatable; masters are probed in the order given \
         [available: {}]",
        romflash_registry::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "romflash")]
#[command(author, version, about = "Flash chip programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to chip database directory (contains .ron files)
    /// Defaults to looking in ./chips/vendors/ and /usr/share/romflash/chips/
    #[arg(long, global = true)]
    pub chip_db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options selecting and configuring the chip, shared by hardware commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TargetArgs {
    #[arg(short, long = "programmer", help = programmer_help(), required = true)]
    pub programmer: Vec<String>,

    /// Probe only for this chip (exact name from the database)
    #[arg(short, long)]
    pub chip: Option<String>,

    /// Force operations that would otherwise be refused
    #[arg(short, long)]
    pub force: bool,

    /// Show progress bars
    #[arg(long)]
    pub progress: bool,

    /// Percentage of extra bytes an erase may rewrite to use larger blocks (0-50)
    #[arg(long, value_name = "PERCENT")]
    pub sacrifice_ratio: Option<i32>,
}

/// Layout source; at most one may be given
#[derive(clap::Args, Debug, Clone, Default)]
#[group(multiple = false)]
pub struct LayoutArgs {
    /// Layout file (TOML, or `start:end name` lines)
    #[arg(short, long)]
    pub layout: Option<PathBuf>,

    /// Read the layout from the Intel Flash Descriptor on the chip
    #[arg(long)]
    pub ifd: bool,

    /// Like --ifd, and require the image's descriptor to match the chip's
    #[arg(long)]
    pub ifd_verify: bool,

    /// Read the layout from the fmap on the chip
    #[arg(long)]
    pub fmap: bool,

    /// Read the layout from the fmap in this file
    #[arg(long, value_name = "FILE")]
    pub fmap_file: Option<PathBuf>,

    /// Read the layout from the chip's fmap and require the image's fmap to match
    #[arg(long)]
    pub fmap_verify: bool,
}

impl LayoutArgs {
    /// Resolve the arguments into a layout source
    ///
    /// `image` is the input file the verifying variants compare against.
    pub fn source(&self, image: Option<&Path>) -> Result<LayoutSource, String> {
        let need_image = |flag: &str| {
            image.map(Path::to_path_buf).ok_or_else(|| {
                format!("{} needs an input image and only applies to write and verify", flag)
            })
        };

        Ok(if let Some(path) = &self.layout {
            LayoutSource::File(path.clone())
        } else if self.ifd {
            LayoutSource::Ifd { dump: None }
        } else if self.ifd_verify {
            LayoutSource::Ifd {
                dump: Some(need_image("--ifd-verify")?),
            }
        } else if self.fmap {
            LayoutSource::FmapRom
        } else if let Some(path) = &self.fmap_file {
            LayoutSource::FmapFile(path.clone())
        } else if self.fmap_verify {
            LayoutSource::FmapVerify {
                image: need_image("--fmap-verify")?,
            }
        } else {
            LayoutSource::None
        })
    }
}

/// Region selection, shared by commands that take a layout
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RegionArgs {
    #[command(flatten)]
    pub layout: LayoutArgs,

    /// Include a region, optionally with its own file (`name` or `name:file`)
    #[arg(short, long = "include", value_name = "REGION[:FILE]")]
    pub include: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe for flash chip
    Probe {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Read flash contents to file
    Read {
        #[command(flatten)]
        target: TargetArgs,

        /// Output file (may be omitted when every included region has a file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        regions: RegionArgs,

        /// Fill unreadable ranges with the erased value instead of failing
        #[arg(long)]
        skip_unreadable: bool,
    },

    /// Write file to flash
    Write {
        #[command(flatten)]
        target: TargetArgs,

        /// Input file (may be omitted when every included region has a file)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Current chip contents, used instead of reading the chip first
        #[arg(long = "flash-contents", value_name = "FILE")]
        reference: Option<PathBuf>,

        #[command(flatten)]
        regions: RegionArgs,

        /// Don't verify after writing
        #[arg(short = 'n', long)]
        noverify: bool,

        /// Verify only the included regions instead of the whole chip
        #[arg(short = 'N', long)]
        noverify_all: bool,

        /// Leave unwritable ranges alone instead of failing
        #[arg(long)]
        skip_unwritable: bool,
    },

    /// Verify flash contents against file
    Verify {
        #[command(flatten)]
        target: TargetArgs,

        /// Input file (may be omitted when every included region has a file)
        #[arg(long)]
        input: Option<PathBuf>,

        #[command(flatten)]
        regions: RegionArgs,
    },

    /// Erase flash
    Erase {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        regions: RegionArgs,
    },

    /// Read every layout region into its own file
    Extract {
        #[command(flatten)]
        target: TargetArgs,

        /// Directory for the region files
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Print the vendor and name of the detected chip
    FlashName {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print the size of the detected chip in bytes
    FlashSize {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Write protection operations
    Wp {
        #[command(flatten)]
        target: TargetArgs,

        /// List the ranges the chip can protect
        #[arg(long)]
        wp_list: bool,

        /// Show the current protection mode and range
        #[arg(long)]
        wp_status: bool,

        /// Set the protected range (`start,length`)
        #[arg(long, value_name = "START,LEN")]
        wp_range: Option<String>,

        /// Set the protected range to a layout region
        #[arg(long, value_name = "REGION")]
        wp_region: Option<String>,

        /// Enable hardware write protection
        #[arg(long)]
        wp_enable: bool,

        /// Disable write protection
        #[arg(long)]
        wp_disable: bool,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Layout file operations
    #[command(subcommand)]
    Layout(LayoutCommands),

    /// List supported programmers
    ListProgrammers,

    /// List chips in the database
    ListChips {
        /// Filter by vendor name
        #[arg(long)]
        vendor: Option<String>,
    },
}

/// Layout-related subcommands
#[derive(Subcommand)]
pub enum LayoutCommands {
    /// Show layout from a file
    Show {
        /// Layout file (TOML or `start:end name` lines)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Extract Intel Flash Descriptor layout from image
    Ifd {
        /// Input file (flash image)
        #[arg(short, long)]
        input: PathBuf,

        /// Output layout file (TOML format, optional - prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract FMAP layout from image
    Fmap {
        /// Input file (flash image)
        #[arg(short, long)]
        input: PathBuf,

        /// Output layout file (TOML format, optional - prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
