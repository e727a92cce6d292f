//! Emulated status registers

use romflash_core::wp::regs::StatusRegisters;
use romflash_core::wp::{StatusRegister, WpMode, WpResult};

/// Status registers with write gating
#[derive(Debug, Clone, Default)]
pub(crate) struct StatusRegs {
    pub values: [u8; 3],
    /// Writes are silently dropped, as a locked chip does
    pub frozen: bool,
}

impl StatusRegs {
    /// Whether register writes go through in `mode` with the given WP# level
    pub fn writable_in(mode: WpMode, pin_asserted: bool) -> bool {
        match mode {
            WpMode::Disabled => true,
            WpMode::Hardware => !pin_asserted,
            WpMode::PowerCycle | WpMode::Permanent => false,
        }
    }
}

impl StatusRegisters for StatusRegs {
    fn read_status(&mut self, reg: StatusRegister) -> WpResult<u8> {
        Ok(self.values[reg.index()])
    }

    fn write_status(&mut self, reg: StatusRegister, value: u8) -> WpResult<()> {
        if self.frozen {
            log::trace!("Ignoring write of 0x{:02x} to SR{}", value, reg.index() + 1);
        } else {
            self.values[reg.index()] = value;
        }
        Ok(())
    }
}
