//! Status-register write protection
//!
//! Most SPI chips keep their protection configuration in one to three
//! status registers. Masters that talk to such chips implement
//! [`StatusRegisters`] and get the WP primitives from the functions here:
//! the configuration is read bit by bit through a [`WpRegBitMap`], and
//! writes merge the new bits into the current register values, write them
//! and read them back to verify.

use super::error::{WpError, WpResult};
use super::ranges::{all_ranges, decode_range, find_bits_for_range};
use super::types::{
    RangeDecoder, RegBitInfo, StatusRegister, WpBits, WpConfig, WpMode, WpRange, WpRegBitMap,
};

/// Raw access to a chip's status registers
pub trait StatusRegisters {
    /// Read one status register
    fn read_status(&mut self, reg: StatusRegister) -> WpResult<u8>;

    /// Write one status register
    ///
    /// Chips may silently ignore the write (e.g. when the configuration is
    /// locked); the caller detects that by reading back.
    fn write_status(&mut self, reg: StatusRegister, value: u8) -> WpResult<()>;
}

/// Everything needed to interpret a chip's protection bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRegisterWp {
    /// Bit locations
    pub bit_map: WpRegBitMap,
    /// Range decoding algorithm
    pub decoder: RangeDecoder,
    /// Chip size in bytes
    pub total_size: u32,
}

fn read_bit<R: StatusRegisters + ?Sized>(
    regs: &mut R,
    values: &mut [Option<u8>; 3],
    info: &RegBitInfo,
) -> WpResult<Option<u8>> {
    let Some(reg) = info.reg.filter(|_| info.is_present()) else {
        return Ok(None);
    };
    let slot = &mut values[reg.index()];
    let value = match *slot {
        Some(v) => v,
        None => {
            let v = regs.read_status(reg)?;
            *slot = Some(v);
            v
        }
    };
    Ok(Some((value >> info.bit_index) & 1))
}

/// Read all protection bits from the chip
pub fn read_wp_bits<R: StatusRegisters + ?Sized>(
    regs: &mut R,
    bit_map: &WpRegBitMap,
) -> WpResult<WpBits> {
    let mut cache = [None; 3];
    let mut bits = WpBits::empty();

    bits.srp = read_bit(regs, &mut cache, &bit_map.srp)?;
    bits.srl = read_bit(regs, &mut cache, &bit_map.srl)?;
    bits.cmp = read_bit(regs, &mut cache, &bit_map.cmp)?;
    bits.sec = read_bit(regs, &mut cache, &bit_map.sec)?;
    bits.tb = read_bit(regs, &mut cache, &bit_map.tb)?;

    bits.bp_count = bit_map.bp_count();
    for i in 0..bits.bp_count {
        bits.bp[i] = read_bit(regs, &mut cache, &bit_map.bp[i])?.unwrap_or(0);
    }

    if read_bit(regs, &mut cache, &bit_map.wps)? == Some(1) {
        return Err(WpError::UnsupportedState);
    }

    Ok(bits)
}

/// Register values and masks for the bits set in `bits`
fn register_updates(bits: &WpBits, bit_map: &WpRegBitMap) -> ([u8; 3], [u8; 3]) {
    let mut values = [0u8; 3];
    let mut masks = [0u8; 3];

    let mut set = |info: &RegBitInfo, val: Option<u8>| {
        let (Some(reg), Some(val)) = (info.reg, val) else {
            return;
        };
        if !info.is_writable() {
            return;
        }
        masks[reg.index()] |= info.mask();
        if val & 1 != 0 {
            values[reg.index()] |= info.mask();
        }
    };

    set(&bit_map.srp, bits.srp);
    set(&bit_map.srl, bits.srl);
    set(&bit_map.cmp, bits.cmp);
    set(&bit_map.sec, bits.sec);
    set(&bit_map.tb, bits.tb);
    for i in 0..bits.bp_count {
        set(&bit_map.bp[i], Some(bits.bp[i]));
    }

    (values, masks)
}

/// Merge `bits` into the current registers, write and verify
pub fn write_wp_bits<R: StatusRegisters + ?Sized>(
    regs: &mut R,
    bits: &WpBits,
    bit_map: &WpRegBitMap,
) -> WpResult<()> {
    let (values, masks) = register_updates(bits, bit_map);

    let mut expected = [0u8; 3];
    for reg in StatusRegister::ALL {
        let i = reg.index();
        if masks[i] == 0 {
            continue;
        }
        let current = regs.read_status(reg).map_err(|_| WpError::ReadFailed)?;
        expected[i] = (current & !masks[i]) | (values[i] & masks[i]);
        if expected[i] != current {
            regs.write_status(reg, expected[i])
                .map_err(|_| WpError::WriteFailed)?;
        }
    }

    for reg in StatusRegister::ALL {
        let i = reg.index();
        if masks[i] == 0 {
            continue;
        }
        let readback = regs.read_status(reg).map_err(|_| WpError::ReadFailed)?;
        if readback & masks[i] != expected[i] & masks[i] {
            log::debug!(
                "SR{} readback 0x{:02x} does not match 0x{:02x} (mask 0x{:02x})",
                i + 1,
                readback,
                expected[i],
                masks[i]
            );
            return Err(WpError::VerifyFailed);
        }
    }

    Ok(())
}

impl StatusRegisterWp {
    /// Read the current configuration
    pub fn read_config<R: StatusRegisters + ?Sized>(&self, regs: &mut R) -> WpResult<WpConfig> {
        let bits = read_wp_bits(regs, &self.bit_map)?;
        Ok(WpConfig::new(
            bits.mode(),
            decode_range(&bits, self.total_size, self.decoder),
        ))
    }

    /// Write a complete configuration
    ///
    /// The mode is encoded as an (SRL, SRP) pair. A mode is refused only
    /// when the chip lacks a writable bit it needs; a chip whose registers
    /// are frozen shows up as a verification failure instead.
    pub fn write_config<R: StatusRegisters + ?Sized>(
        &self,
        regs: &mut R,
        config: &WpConfig,
    ) -> WpResult<()> {
        let (srl, srp) = match config.mode {
            WpMode::Disabled => (0, 0),
            WpMode::Hardware => (0, 1),
            WpMode::PowerCycle => (1, 0),
            WpMode::Permanent => (1, 1),
        };
        if (srp == 1 && !self.bit_map.srp.is_writable())
            || (srl == 1 && !self.bit_map.srl.is_writable())
        {
            return Err(WpError::ModeUnsupported);
        }

        let template = self.bit_map.range_template();
        let mut bits = find_bits_for_range(&config.range, self.total_size, &template, self.decoder)
            .ok_or(WpError::RangeUnsupported)?;
        bits.srp = self.bit_map.srp.is_writable().then_some(srp);
        bits.srl = self.bit_map.srl.is_writable().then_some(srl);

        write_wp_bits(regs, &bits, &self.bit_map)
    }

    /// Every range the chip can protect
    pub fn available_ranges(&self) -> WpResult<Vec<WpRange>> {
        let template = self.bit_map.range_template();
        if template.bp_count == 0 {
            return Err(WpError::RangeListUnavailable);
        }
        Ok(all_ranges(&template, self.total_size, self.decoder))
    }
}
