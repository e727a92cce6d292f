//! The bound flash context

use bitflags::bitflags;

use super::progress::{Progress, ProgressSink};
use crate::chip::{BusType, FlashChip};
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::programmer::{Access, ProgrammerMaster};
use crate::wp::{WpConfig, WpRange, WpResult};

/// Largest accepted sacrifice ratio, in percent
pub const MAX_SACRIFICE_RATIO: i32 = 50;

bitflags! {
    /// Set of operation flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        /// Proceed despite safety checks
        const FORCE = 1 << 0;
        /// Ignore a board/chipset mismatch
        const FORCE_BOARDMISMATCH = 1 << 1;
        /// Verify the written ranges after a write
        const VERIFY_AFTER_WRITE = 1 << 2;
        /// Verify the whole chip instead of only the written ranges
        const VERIFY_WHOLE_CHIP = 1 << 3;
        /// Substitute unreadable ranges instead of failing
        const SKIP_UNREADABLE_REGIONS = 1 << 4;
        /// Leave unwritable ranges alone instead of failing
        const SKIP_UNWRITABLE_REGIONS = 1 << 5;
    }
}

/// A single operation flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Proceed despite safety checks
    Force,
    /// Ignore a board/chipset mismatch
    ForceBoardMismatch,
    /// Verify the written ranges after a write
    VerifyAfterWrite,
    /// Verify the whole chip instead of only the written ranges
    VerifyWholeChip,
    /// Substitute unreadable ranges instead of failing
    SkipUnreadableRegions,
    /// Leave unwritable ranges alone instead of failing
    SkipUnwritableRegions,
}

impl From<Flag> for Flags {
    fn from(flag: Flag) -> Self {
        match flag {
            Flag::Force => Flags::FORCE,
            Flag::ForceBoardMismatch => Flags::FORCE_BOARDMISMATCH,
            Flag::VerifyAfterWrite => Flags::VERIFY_AFTER_WRITE,
            Flag::VerifyWholeChip => Flags::VERIFY_WHOLE_CHIP,
            Flag::SkipUnreadableRegions => Flags::SKIP_UNREADABLE_REGIONS,
            Flag::SkipUnwritableRegions => Flags::SKIP_UNWRITABLE_REGIONS,
        }
    }
}

/// A chip bound to the master it was found on
///
/// Created by probing. Owns a copy of the chip descriptor, the optional
/// active layout, the operation flags and the progress counters. Every
/// hardware operation goes through the primitive wrappers here.
pub struct FlashContext<'m> {
    master: &'m mut dyn ProgrammerMaster,
    chip: FlashChip,
    layout: Option<Layout>,
    default_layout: Layout,
    flags: Flags,
    sacrifice_ratio: u8,
    progress: Progress,
    forced: bool,
}

impl<'m> FlashContext<'m> {
    /// Bind `chip` to `master`
    pub fn new(master: &'m mut dyn ProgrammerMaster, chip: FlashChip) -> Self {
        let default_layout = Layout::whole_chip(chip.total_size);
        Self {
            master,
            chip,
            layout: None,
            default_layout,
            flags: Flags::empty(),
            sacrifice_ratio: 0,
            progress: Progress::new(),
            forced: false,
        }
    }

    /// The bound chip
    pub fn chip(&self) -> &FlashChip {
        &self.chip
    }

    /// Chip size in bytes
    pub fn chip_size(&self) -> u32 {
        self.chip.total_size
    }

    /// Name of the bound master
    pub fn master_name(&self) -> &str {
        self.master.name()
    }

    /// Whether the chip was bound without a successful probe
    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub(crate) fn set_forced(&mut self, forced: bool) {
        self.forced = forced;
    }

    /// Set or clear a flag
    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        self.flags.set(flag.into(), value);
    }

    /// Query a flag
    pub fn flag(&self, flag: Flag) -> bool {
        self.flags.contains(flag.into())
    }

    /// All flags
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Set the erase sacrifice ratio
    ///
    /// Values outside `0..=50` fall back to 0. Returns the stored value.
    pub fn set_sacrifice_ratio(&mut self, ratio: i32) -> u8 {
        self.sacrifice_ratio = match u8::try_from(ratio) {
            Ok(r) if ratio <= MAX_SACRIFICE_RATIO => r,
            _ => {
                log::warn!(
                    "Invalid input of sacrifice ratio, valid 0-{}. Fallback to default value 0.",
                    MAX_SACRIFICE_RATIO
                );
                0
            }
        };
        self.sacrifice_ratio
    }

    /// Current sacrifice ratio
    pub fn sacrifice_ratio(&self) -> u8 {
        self.sacrifice_ratio
    }

    /// Install the active layout, returning the previous one
    pub fn set_layout(&mut self, layout: Layout) -> Option<Layout> {
        self.layout.replace(layout)
    }

    /// Remove the active layout
    pub fn take_layout(&mut self) -> Option<Layout> {
        self.layout.take()
    }

    /// Explicitly installed layout, if any
    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    /// Layout primitives operate on
    ///
    /// The installed layout, or a single region covering the whole chip.
    pub fn active_layout(&self) -> &Layout {
        self.layout.as_ref().unwrap_or(&self.default_layout)
    }

    /// Install a progress sink
    pub fn set_progress_sink(&mut self, sink: Box<dyn ProgressSink>) {
        self.progress.set_sink(sink);
    }

    /// Progress counters
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Buses on which the chip exceeds the master's decode window
    ///
    /// Only buses both the chip and the master support are considered.
    pub fn decode_limit_exceedings(&self) -> Vec<(BusType, u32)> {
        let shared = self.chip.bus & self.master.buses_supported();
        [BusType::PARALLEL, BusType::LPC, BusType::FWH, BusType::SPI]
            .into_iter()
            .filter(|bus| shared.contains(*bus))
            .filter_map(|bus| {
                self.master
                    .max_rom_decode(bus)
                    .filter(|&max| max < self.chip.total_size)
                    .map(|max| (bus, max))
            })
            .collect()
    }

    fn split(&mut self) -> (&mut dyn ProgrammerMaster, Access<'_>) {
        let layout = self.layout.as_ref().unwrap_or(&self.default_layout);
        let access = Access {
            chip: &self.chip,
            layout,
            flags: self.flags,
            sacrifice_ratio: self.sacrifice_ratio,
            progress: &mut self.progress,
        };
        (&mut *self.master, access)
    }

    /// Read `buf.len()` bytes at `addr`, bounds-checked against the chip
    pub fn read_range(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        let end = addr as u64 + buf.len() as u64;
        if end > self.chip.total_size as u64 {
            return Err(Error::AddressOutOfBounds);
        }
        self.master.read(&self.chip, addr, buf)
    }

    /// Read the selected ranges into a chip-sized buffer
    pub fn image_read(&mut self, buf: &mut [u8]) -> Result<()> {
        let (master, mut access) = self.split();
        master.image_read(&mut access, buf)
    }

    /// Write the selected ranges of a chip-sized buffer
    pub fn image_write(&mut self, buf: &[u8], reference: Option<&[u8]>) -> Result<()> {
        let (master, mut access) = self.split();
        master.image_write(&mut access, buf, reference)
    }

    /// Verify the selected ranges against a chip-sized buffer
    pub fn image_verify(&mut self, buf: &[u8]) -> Result<()> {
        let (master, mut access) = self.split();
        master.image_verify(&mut access, buf)
    }

    /// Erase the selected ranges
    pub fn erase(&mut self) -> Result<()> {
        let (master, mut access) = self.split();
        master.erase(&mut access)
    }

    /// Read the write-protection configuration
    pub fn wp_read_cfg(&mut self) -> WpResult<WpConfig> {
        let (master, mut access) = self.split();
        master.wp_read_cfg(&mut access)
    }

    /// Apply a write-protection configuration
    pub fn wp_write_cfg(&mut self, config: &WpConfig) -> WpResult<()> {
        let (master, mut access) = self.split();
        master.wp_write_cfg(&mut access, config)
    }

    /// List the protection ranges the chip supports
    pub fn wp_get_available_ranges(&mut self) -> WpResult<Vec<WpRange>> {
        let (master, mut access) = self.split();
        master.wp_get_available_ranges(&mut access)
    }
}

impl core::fmt::Debug for FlashContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlashContext")
            .field("master", &self.master.name())
            .field("chip", &self.chip.name)
            .field("layout", &self.layout.as_ref().map(|l| &l.name))
            .field("flags", &self.flags)
            .field("sacrifice_ratio", &self.sacrifice_ratio)
            .field("forced", &self.forced)
            .finish()
    }
}
