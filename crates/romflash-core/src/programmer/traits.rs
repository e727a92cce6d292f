//! Programmer trait definitions

use crate::chip::{BusType, FlashChip};
use crate::error::{Error, Result};
use crate::flash::{Flag, Flags, Progress, ProgressStage};
use crate::layout::Layout;
use crate::wp::{WpConfig, WpError, WpRange, WpResult};

/// Chunk size used by the default read and verify implementations
pub const READ_CHUNK_SIZE: usize = 4096;

/// State of the bound context handed to every image primitive
///
/// Carries the chip being operated on, the active layout (whose included
/// regions select what to touch), the operation flags, the wear-reduction
/// tuning and the progress counters.
pub struct Access<'a> {
    /// Bound chip
    pub chip: &'a FlashChip,
    /// Active layout
    pub layout: &'a Layout,
    /// Operation flags
    pub flags: Flags,
    /// Percentage of an erase block that may be erased needlessly (0-50)
    pub sacrifice_ratio: u8,
    /// Progress counters
    pub progress: &'a mut Progress,
}

impl Access<'_> {
    /// Check a single flag
    pub fn flag(&self, flag: Flag) -> bool {
        self.flags.contains(flag.into())
    }

    /// Inclusive `(start, end)` ranges to operate on
    ///
    /// The included regions of the layout, or the whole chip when nothing
    /// is included.
    pub fn ranges(&self) -> Vec<(u32, u32)> {
        let ranges: Vec<(u32, u32)> = self
            .layout
            .included_regions()
            .map(|r| (r.start, r.end))
            .collect();
        if ranges.is_empty() && self.chip.total_size > 0 {
            vec![(0, self.chip.total_size - 1)]
        } else {
            ranges
        }
    }

    /// Total number of bytes covered by [`Access::ranges`]
    pub fn range_bytes(&self) -> usize {
        self.ranges()
            .iter()
            .map(|&(start, end)| (end - start) as usize + 1)
            .sum()
    }
}

/// Check that a primitive was handed a chip-sized buffer
pub fn check_buffer(chip: &FlashChip, len: usize) -> Result<()> {
    let expected = chip.total_size as usize;
    if len != expected {
        return Err(Error::BufferSizeMismatch { len, expected });
    }
    Ok(())
}

/// A programmer backend
///
/// Required methods cover identification, partial reads, the full-image
/// write and erase. Image reads and verification have chunked defaults
/// built on [`ProgrammerMaster::read`]. Write-protection primitives default
/// to [`WpError::ChipUnsupported`].
pub trait ProgrammerMaster {
    /// Name of the programmer, as used on the command line
    fn name(&self) -> &str;

    /// Buses this master can drive
    fn buses_supported(&self) -> BusType;

    /// Largest chip the master can map on `bus`, if limited
    fn max_rom_decode(&self, _bus: BusType) -> Option<u32> {
        None
    }

    /// Check whether `chip` is present
    ///
    /// Implementations read the chip's identification and compare it with
    /// the descriptor. An `Err` is an internal failure, not an absent chip.
    fn probe_chip(&mut self, chip: &FlashChip) -> Result<bool>;

    /// Read `buf.len()` bytes starting at `addr`
    fn read(&mut self, chip: &FlashChip, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Read the selected ranges of the chip into a chip-sized buffer
    ///
    /// Bytes outside the selected ranges are left untouched.
    fn image_read(&mut self, access: &mut Access<'_>, buf: &mut [u8]) -> Result<()> {
        check_buffer(access.chip, buf.len())?;
        let chip = access.chip;
        let skip_locked = access.flag(Flag::SkipUnreadableRegions);

        access.progress.init(ProgressStage::Read, access.range_bytes());
        for (start, end) in access.ranges() {
            let mut addr = start as usize;
            while addr <= end as usize {
                let len = READ_CHUNK_SIZE.min(end as usize + 1 - addr);
                let chunk = &mut buf[addr..addr + len];
                match self.read(chip, addr as u32, chunk) {
                    Ok(()) => {}
                    Err(Error::RegionLocked { start, end }) if skip_locked => {
                        log::warn!(
                            "Skipping unreadable range 0x{:08x}-0x{:08x}",
                            start.max(addr as u32),
                            end
                        );
                        chunk.fill(chip.erased_value());
                    }
                    Err(e) => return Err(e),
                }
                access.progress.update(ProgressStage::Read, len);
                addr += len;
            }
        }
        Ok(())
    }

    /// Write the selected ranges of `buf` to the chip
    ///
    /// `reference`, when given, is the caller's belief about the current
    /// chip contents and may be used to skip erase blocks that do not
    /// change.
    fn image_write(
        &mut self,
        access: &mut Access<'_>,
        buf: &[u8],
        reference: Option<&[u8]>,
    ) -> Result<()>;

    /// Compare the selected ranges of the chip against `buf`
    fn image_verify(&mut self, access: &mut Access<'_>, buf: &[u8]) -> Result<()> {
        check_buffer(access.chip, buf.len())?;
        let chip = access.chip;
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];

        access.progress.init(ProgressStage::Read, access.range_bytes());
        for (start, end) in access.ranges() {
            let mut addr = start as usize;
            while addr <= end as usize {
                let len = READ_CHUNK_SIZE.min(end as usize + 1 - addr);
                self.read(chip, addr as u32, &mut chunk[..len])?;
                let expected = &buf[addr..addr + len];
                if let Some(i) = (0..len).find(|&i| chunk[i] != expected[i]) {
                    return Err(Error::VerifyError {
                        addr: (addr + i) as u32,
                        expected: expected[i],
                        found: chunk[i],
                    });
                }
                access.progress.update(ProgressStage::Read, len);
                addr += len;
            }
        }
        Ok(())
    }

    /// Erase the selected ranges
    fn erase(&mut self, access: &mut Access<'_>) -> Result<()>;

    /// Read the chip's write-protection configuration
    fn wp_read_cfg(&mut self, _access: &mut Access<'_>) -> WpResult<WpConfig> {
        Err(WpError::ChipUnsupported)
    }

    /// Write a write-protection configuration and verify it took effect
    fn wp_write_cfg(&mut self, _access: &mut Access<'_>, _config: &WpConfig) -> WpResult<()> {
        Err(WpError::ChipUnsupported)
    }

    /// List the protection ranges the chip can realize
    fn wp_get_available_ranges(&mut self, _access: &mut Access<'_>) -> WpResult<Vec<WpRange>> {
        Err(WpError::ChipUnsupported)
    }
}
