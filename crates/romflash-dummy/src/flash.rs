//! The emulated chip and its programmer primitives

use romflash_core::chip::{BusType, FlashChip};
use romflash_core::error::{Error, Result};
use romflash_core::flash::{Flag, ProgressStage};
use romflash_core::programmer::{check_buffer, Access, ProgrammerMaster};
use romflash_core::wp::regs::StatusRegisterWp;
use romflash_core::wp::{WpConfig, WpError, WpRange, WpResult};

use crate::config::DummyConfig;
use crate::status::StatusRegs;

/// Counters of what the emulated chip went through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    /// Erase blocks erased
    pub erased_blocks: usize,
    /// Erase blocks left alone because their content did not change
    pub skipped_blocks: usize,
    /// Bytes programmed
    pub programmed_bytes: usize,
}

/// Dummy flash programmer
///
/// Emulates a flash chip in memory. Programming can only move bits away
/// from the erased value; anything else needs an erase of the whole block.
#[derive(Debug, Clone)]
pub struct DummyFlash {
    config: DummyConfig,
    data: Vec<u8>,
    status: StatusRegs,
    stats: DummyStats,
}

impl DummyFlash {
    /// Create a new, erased dummy flash
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![config.erased_value; config.size as usize];
        Self {
            config,
            data,
            status: StatusRegs::default(),
            stats: DummyStats::default(),
        }
    }

    /// Create a new dummy flash with default configuration (W25Q128.V)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy flash with pre-filled data
    ///
    /// Data beyond the chip size is ignored; a short image leaves the rest
    /// erased.
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = initial_data.len().min(flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Operation counters
    pub fn stats(&self) -> DummyStats {
        self.stats
    }

    /// Raw status register values, SR1 first
    pub fn status_registers(&self) -> [u8; 3] {
        self.status.values
    }

    /// Preset the status registers
    pub fn set_status_registers(&mut self, values: [u8; 3]) {
        self.status.values = values;
    }

    /// Drive the WP# pin
    pub fn set_wp_pin(&mut self, asserted: bool) {
        self.config.hw_wp = asserted;
    }

    fn scheme(&self) -> WpResult<StatusRegisterWp> {
        let scheme = self.config.wp.ok_or(WpError::ChipUnsupported)?;
        Ok(StatusRegisterWp {
            bit_map: scheme.registers.bit_map(),
            decoder: scheme.decoder,
            total_size: self.config.size,
        })
    }

    /// Range currently protected by the status registers
    fn protected_range(&mut self) -> Option<WpRange> {
        let scheme = self.scheme().ok()?;
        scheme
            .read_config(&mut self.status)
            .ok()
            .map(|config| config.range)
            .filter(|range| range.is_protected())
    }

    fn locked_overlap(&self, lo: u32, hi: u32) -> Option<(u32, u32)> {
        self.config
            .locked
            .iter()
            .copied()
            .find(|&(start, end)| start <= hi && lo <= end)
    }

    fn check_writable(&self, lo: u32, hi: u32, protected: Option<WpRange>) -> Result<()> {
        if let Some((start, end)) = self.locked_overlap(lo, hi) {
            return Err(Error::RegionLocked { start, end });
        }
        if let Some(range) = protected.filter(|r| r.overlaps(lo, hi - lo + 1)) {
            return Err(Error::WriteProtected {
                addr: lo.max(range.start),
            });
        }
        Ok(())
    }

    /// Erase blocks touching `[start, end]`, as inclusive bounds
    fn blocks(&self, start: u32, end: u32) -> impl Iterator<Item = (u32, u32)> {
        let size = self.config.erase_size;
        let first = start / size;
        let last = end / size;
        (first..=last).map(move |i| (i * size, i * size + size - 1))
    }

    fn can_program(&self, from: u8, to: u8) -> bool {
        if self.config.erased_value == 0xFF {
            from & to == to
        } else {
            from | to == to
        }
    }

    fn program(&mut self, addr: usize, value: u8) {
        let cell = &mut self.data[addr];
        if self.config.erased_value == 0xFF {
            *cell &= value;
        } else {
            *cell |= value;
        }
        self.stats.programmed_bytes += 1;
    }

    fn erase_block(&mut self, start: u32, end: u32) {
        let erased = self.config.erased_value;
        self.data[start as usize..=end as usize].fill(erased);
        self.stats.erased_blocks += 1;
    }

    /// Bring `[lo, hi]` inside the block to `buf`
    ///
    /// `current` is what the caller believes the block holds; it decides
    /// whether the block is skipped or erased. Returns false if the block
    /// did not change.
    fn write_block(
        &mut self,
        (bstart, bend): (u32, u32),
        (lo, hi): (u32, u32),
        buf: &[u8],
        current: &[u8],
    ) -> bool {
        let (bstart, bend) = (bstart as usize, bend as usize);
        let (lo, hi) = (lo as usize, hi as usize);

        let mut desired = current.to_vec();
        desired[lo - bstart..=hi - bstart].copy_from_slice(&buf[lo..=hi]);
        if desired == current {
            self.stats.skipped_blocks += 1;
            return false;
        }

        let need_erase = current
            .iter()
            .zip(&desired)
            .any(|(&from, &to)| !self.can_program(from, to));
        if need_erase {
            self.erase_block(bstart as u32, bend as u32);
            let erased = self.config.erased_value;
            for (i, &value) in desired.iter().enumerate() {
                if value != erased {
                    self.program(bstart + i, value);
                }
            }
        } else {
            for (i, (&from, &to)) in current.iter().zip(&desired).enumerate() {
                if from != to {
                    self.program(bstart + i, to);
                }
            }
        }
        true
    }

    fn compare(&self, expected: &[u8], start: usize, end: usize) -> Result<()> {
        match (start..=end).find(|&i| self.data[i] != expected[i]) {
            Some(i) => Err(Error::VerifyError {
                addr: i as u32,
                expected: expected[i],
                found: self.data[i],
            }),
            None => Ok(()),
        }
    }
}

impl ProgrammerMaster for DummyFlash {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn buses_supported(&self) -> BusType {
        self.config.buses
    }

    fn max_rom_decode(&self, _bus: BusType) -> Option<u32> {
        self.config.max_rom_decode
    }

    fn probe_chip(&mut self, chip: &FlashChip) -> Result<bool> {
        Ok(chip.is_compatible_with(self.config.buses)
            && chip.matches_id(self.config.manufacturer_id, self.config.model_id))
    }

    fn read(&mut self, _chip: &FlashChip, addr: u32, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let start = addr as usize;
        let end = start + buf.len();
        if end > self.data.len() {
            return Err(Error::AddressOutOfBounds);
        }
        if let Some((start, end)) = self.locked_overlap(addr, (end - 1) as u32) {
            return Err(Error::RegionLocked { start, end });
        }
        buf.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn image_write(
        &mut self,
        access: &mut Access<'_>,
        buf: &[u8],
        reference: Option<&[u8]>,
    ) -> Result<()> {
        check_buffer(access.chip, buf.len())?;
        if let Some(reference) = reference {
            check_buffer(access.chip, reference.len())?;
        }
        if buf.len() != self.data.len() {
            return Err(Error::BufferSizeMismatch {
                len: buf.len(),
                expected: self.data.len(),
            });
        }

        let skip_unwritable = access.flag(Flag::SkipUnwritableRegions);
        let protected = self.protected_range();
        let before = self.data.clone();
        let mut written: Vec<(u32, u32)> = Vec::new();

        let ranges = access.ranges();
        access.progress.init(ProgressStage::Write, access.range_bytes());
        for &(start, end) in &ranges {
            let blocks: Vec<(u32, u32)> = self.blocks(start, end).collect();
            for block in blocks {
                let lo = start.max(block.0);
                let hi = end.min(block.1);
                let span = block.0 as usize..=block.1 as usize;
                let current = match reference {
                    Some(reference) => reference[span].to_vec(),
                    None => self.data[span].to_vec(),
                };

                let changes = current[(lo - block.0) as usize..=(hi - block.0) as usize]
                    != buf[lo as usize..=hi as usize];
                if changes {
                    match self.check_writable(lo, hi, protected) {
                        Ok(()) => {}
                        Err(e) if skip_unwritable => {
                            log::warn!("Skipping unwritable range 0x{:08x}-0x{:08x}: {}", lo, hi, e);
                            access.progress.update(ProgressStage::Write, (hi - lo + 1) as usize);
                            continue;
                        }
                        Err(e) => return Err(e),
                    }
                }
                self.write_block(block, (lo, hi), buf, &current);
                written.push((lo, hi));
                access.progress.update(ProgressStage::Write, (hi - lo + 1) as usize);
            }
        }

        if !access.flag(Flag::VerifyAfterWrite) {
            return Ok(());
        }
        log::debug!("Verifying flash after write");
        let mut expected = before;
        for &(lo, hi) in &written {
            expected[lo as usize..=hi as usize].copy_from_slice(&buf[lo as usize..=hi as usize]);
        }
        if access.flag(Flag::VerifyWholeChip) {
            self.compare(&expected, 0, expected.len() - 1)
        } else {
            written
                .iter()
                .try_for_each(|&(lo, hi)| self.compare(&expected, lo as usize, hi as usize))
        }
    }

    fn erase(&mut self, access: &mut Access<'_>) -> Result<()> {
        let skip_unwritable = access.flag(Flag::SkipUnwritableRegions);
        let protected = self.protected_range();

        access.progress.init(ProgressStage::Erase, access.range_bytes());
        for (start, end) in access.ranges() {
            if end as usize >= self.data.len() {
                return Err(Error::AddressOutOfBounds);
            }
            let blocks: Vec<(u32, u32)> = self.blocks(start, end).collect();
            for (bstart, bend) in blocks {
                let lo = start.max(bstart);
                let hi = end.min(bend);
                match self.check_writable(lo, hi, protected) {
                    Ok(()) => {}
                    Err(e) if skip_unwritable => {
                        log::warn!("Skipping unwritable range 0x{:08x}-0x{:08x}: {}", lo, hi, e);
                        access.progress.update(ProgressStage::Erase, (hi - lo + 1) as usize);
                        continue;
                    }
                    Err(e) => return Err(e),
                }

                // Bytes of the block outside the range are restored.
                let saved = self.data[bstart as usize..=bend as usize].to_vec();
                self.erase_block(bstart, bend);
                let erased = self.config.erased_value;
                for (i, &value) in saved.iter().enumerate() {
                    let addr = bstart + i as u32;
                    if (addr < lo || addr > hi) && value != erased {
                        self.program(addr as usize, value);
                    }
                }
                access.progress.update(ProgressStage::Erase, (hi - lo + 1) as usize);
            }
        }
        Ok(())
    }

    fn wp_read_cfg(&mut self, _access: &mut Access<'_>) -> WpResult<WpConfig> {
        self.scheme()?.read_config(&mut self.status)
    }

    fn wp_write_cfg(&mut self, _access: &mut Access<'_>, config: &WpConfig) -> WpResult<()> {
        let scheme = self.scheme()?;
        let mode = scheme.read_config(&mut self.status)?.mode;
        self.status.frozen = !StatusRegs::writable_in(mode, self.config.hw_wp);
        let result = scheme.write_config(&mut self.status, config);
        self.status.frozen = false;
        result
    }

    fn wp_get_available_ranges(&mut self, _access: &mut Access<'_>) -> WpResult<Vec<WpRange>> {
        self.scheme()?.available_ranges()
    }
}
