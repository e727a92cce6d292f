//! In-memory master used by the unit tests

use crate::chip::{BusType, ChipTestStatus, Features, FlashChip, WpRegisterLayout, WpScheme};
use crate::error::{Error, Result};
use crate::flash::{Flag, ProgressStage};
use crate::programmer::{check_buffer, Access, ProgrammerMaster};
use crate::wp::regs::{StatusRegisterWp, StatusRegisters};
use crate::wp::{RangeDecoder, StatusRegister, WpConfig, WpError, WpRange, WpResult};

pub(crate) fn chip_named(name: &str, manufacturer_id: u32, model_id: u32, size: u32) -> FlashChip {
    FlashChip {
        vendor: "Test".into(),
        name: name.into(),
        bus: BusType::SPI,
        manufacturer_id,
        model_id,
        total_size: size,
        page_size: 256,
        erase_size: 4096,
        features: Features::empty(),
        wp: Some(WpScheme {
            registers: WpRegisterLayout::Winbond,
            decoder: RangeDecoder::Spi25,
        }),
        tested: ChipTestStatus::default(),
    }
}

/// 64 KiB SPI chip with Winbond-style protection bits
pub(crate) fn test_chip() -> FlashChip {
    chip_named("TEST25Q05", 0xEF, 0x4010, 0x10000)
}

pub(crate) struct Registers {
    pub sr: [u8; 3],
    pub locked: bool,
}

impl StatusRegisters for Registers {
    fn read_status(&mut self, reg: StatusRegister) -> WpResult<u8> {
        Ok(self.sr[reg.index()])
    }

    fn write_status(&mut self, reg: StatusRegister, value: u8) -> WpResult<()> {
        if !self.locked {
            self.sr[reg.index()] = value;
        }
        Ok(())
    }
}

/// Master backed by a byte vector
pub(crate) struct MemoryMaster {
    pub name: String,
    pub buses: BusType,
    /// Identification the fake chip answers with, `None` for no chip
    pub id: Option<(u32, u32)>,
    pub data: Vec<u8>,
    pub max_decode: Option<u32>,
    pub probe_error: bool,
    pub regs: Registers,
    pub write_calls: usize,
    pub erase_calls: usize,
}

impl MemoryMaster {
    pub(crate) fn new(chip: FlashChip, fill: u8) -> Self {
        Self {
            name: "memory".into(),
            buses: BusType::SPI,
            id: Some((chip.manufacturer_id, chip.model_id)),
            data: vec![fill; chip.total_size as usize],
            max_decode: None,
            probe_error: false,
            regs: Registers {
                sr: [0; 3],
                locked: false,
            },
            write_calls: 0,
            erase_calls: 0,
        }
    }

    pub(crate) fn absent() -> Self {
        let mut master = Self::new(test_chip(), 0xFF);
        master.id = None;
        master
    }

    fn scheme(access: &Access<'_>) -> WpResult<StatusRegisterWp> {
        let scheme = access.chip.wp.ok_or(WpError::ChipUnsupported)?;
        Ok(StatusRegisterWp {
            bit_map: scheme.registers.bit_map(),
            decoder: scheme.decoder,
            total_size: access.chip.total_size,
        })
    }
}

impl ProgrammerMaster for MemoryMaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn buses_supported(&self) -> BusType {
        self.buses
    }

    fn max_rom_decode(&self, _bus: BusType) -> Option<u32> {
        self.max_decode
    }

    fn probe_chip(&mut self, chip: &FlashChip) -> Result<bool> {
        if self.probe_error {
            return Err(Error::ProgrammerError);
        }
        Ok(chip.is_compatible_with(self.buses)
            && self.id == Some((chip.manufacturer_id, chip.model_id)))
    }

    fn read(&mut self, _chip: &FlashChip, addr: u32, buf: &mut [u8]) -> Result<()> {
        let start = addr as usize;
        let src = self
            .data
            .get(start..start + buf.len())
            .ok_or(Error::AddressOutOfBounds)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn image_write(
        &mut self,
        access: &mut Access<'_>,
        buf: &[u8],
        _reference: Option<&[u8]>,
    ) -> Result<()> {
        check_buffer(access.chip, buf.len())?;
        self.write_calls += 1;
        access.progress.init(ProgressStage::Write, access.range_bytes());
        for (start, end) in access.ranges() {
            let range = start as usize..end as usize + 1;
            self.data[range.clone()].copy_from_slice(&buf[range.clone()]);
            access.progress.update(ProgressStage::Write, range.len());
        }
        if access.flag(Flag::VerifyAfterWrite) {
            self.image_verify(access, buf)?;
        }
        Ok(())
    }

    fn erase(&mut self, access: &mut Access<'_>) -> Result<()> {
        self.erase_calls += 1;
        let erased = access.chip.erased_value();
        access.progress.init(ProgressStage::Erase, access.range_bytes());
        for (start, end) in access.ranges() {
            self.data[start as usize..=end as usize].fill(erased);
            access
                .progress
                .update(ProgressStage::Erase, (end - start) as usize + 1);
        }
        Ok(())
    }

    fn wp_read_cfg(&mut self, access: &mut Access<'_>) -> WpResult<WpConfig> {
        Self::scheme(access)?.read_config(&mut self.regs)
    }

    fn wp_write_cfg(&mut self, access: &mut Access<'_>, config: &WpConfig) -> WpResult<()> {
        Self::scheme(access)?.write_config(&mut self.regs, config)
    }

    fn wp_get_available_ranges(&mut self, access: &mut Access<'_>) -> WpResult<Vec<WpRange>> {
        Self::scheme(access)?.available_ranges()
    }
}
