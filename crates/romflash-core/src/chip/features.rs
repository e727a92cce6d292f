//! Flash chip feature and bus flags

use bitflags::bitflags;

bitflags! {
    /// Feature flags for flash chips
    ///
    /// These flags describe what capabilities and behaviors a flash chip has.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Features: u32 {
        /// Supports Fast Read (0x0B)
        const FAST_READ       = 1 << 0;
        /// Supports 4-byte address mode
        const FOUR_BYTE_ADDR  = 1 << 1;
        /// Has OTP (One-Time Programmable) area
        const OTP             = 1 << 2;
        /// Supports SFDP (Serial Flash Discoverable Parameters)
        const SFDP            = 1 << 3;
        /// Has a second status register
        const STATUS_REG_2    = 1 << 4;
        /// Byte-granularity writes (can write single bytes)
        const WRITE_BYTE      = 1 << 5;
        /// Erased state is 0x00 instead of 0xFF
        const ERASED_ZERO     = 1 << 6;
    }
}

bitflags! {
    /// Buses a chip can be attached to, or a master can drive
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BusType: u8 {
        /// Parallel flash
        const PARALLEL = 1 << 0;
        /// Low Pin Count bus
        const LPC      = 1 << 1;
        /// Firmware Hub
        const FWH      = 1 << 2;
        /// Serial Peripheral Interface
        const SPI      = 1 << 3;
        /// Programmer-specific access; the master hides the chip protocol
        const PROG     = 1 << 4;

        /// Every bus except programmer-specific access
        const NONSPI = Self::PARALLEL.bits() | Self::LPC.bits() | Self::FWH.bits();
    }
}

impl core::fmt::Display for BusType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        const NAMES: [(BusType, &str); 5] = [
            (BusType::PARALLEL, "Parallel"),
            (BusType::LPC, "LPC"),
            (BusType::FWH, "FWH"),
            (BusType::SPI, "SPI"),
            (BusType::PROG, "Programmer-specific"),
        ];

        if self.is_empty() {
            return write!(f, "None");
        }
        let mut first = true;
        for (bus, name) in NAMES {
            if self.contains(bus) {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}
