//! Write protection configuration types

/// Maximum number of block protect (BP) bits supported
pub const MAX_BP_BITS: usize = 4;

/// Status-register protection mode
///
/// Decides under which conditions the protection configuration itself can
/// be changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WpMode {
    /// Configuration can be freely modified
    #[default]
    Disabled,
    /// Configuration is locked while the WP# pin is asserted
    Hardware,
    /// Configuration is locked until the next power cycle
    PowerCycle,
    /// Configuration is locked forever
    Permanent,
}

impl WpMode {
    /// Lower-case name as printed in status output
    pub const fn as_str(self) -> &'static str {
        match self {
            WpMode::Disabled => "disabled",
            WpMode::Hardware => "hardware",
            WpMode::PowerCycle => "power_cycle",
            WpMode::Permanent => "permanent",
        }
    }
}

impl core::fmt::Display for WpMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protected range: `len` bytes starting at `start`
///
/// A zero length means nothing is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct WpRange {
    /// Start address of protected region
    pub start: u32,
    /// Length of protected region in bytes
    pub len: u32,
}

impl WpRange {
    /// Create a new protected range
    pub const fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }

    /// Create a range representing no protection
    pub const fn none() -> Self {
        Self { start: 0, len: 0 }
    }

    /// Create a range representing full chip protection
    pub const fn full(size: u32) -> Self {
        Self {
            start: 0,
            len: size,
        }
    }

    /// Check if this range protects any part of the chip
    pub const fn is_protected(&self) -> bool {
        self.len > 0
    }

    /// Get the end address (exclusive)
    pub const fn end(&self) -> u32 {
        self.start.saturating_add(self.len)
    }

    /// Check if an address is within the protected range
    pub const fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr < self.end()
    }

    /// Check if `[start, start + len)` intersects the protected range
    pub const fn overlaps(&self, start: u32, len: u32) -> bool {
        let range_end = start.saturating_add(len);
        len > 0 && self.len > 0 && !(range_end <= self.start || start >= self.end())
    }
}

/// Write protection configuration: mode plus protected range
///
/// This is a transient buffer: read it from the chip, change fields, write
/// it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WpConfig {
    /// Protection mode
    pub mode: WpMode,
    /// Protected range
    pub range: WpRange,
}

impl WpConfig {
    /// Create a new WpConfig
    pub const fn new(mode: WpMode, range: WpRange) -> Self {
        Self { mode, range }
    }
}

/// Values of the protection bits in a chip's status registers
///
/// `None` means the bit does not exist on this chip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WpBits {
    /// Status Register Protect (SRP0/SRP)
    pub srp: Option<u8>,
    /// Status Register Lock (SRL/SRP1)
    pub srl: Option<u8>,
    /// Complement (CMP)
    pub cmp: Option<u8>,
    /// Sector/Block select (SEC)
    pub sec: Option<u8>,
    /// Top/Bottom select (TB)
    pub tb: Option<u8>,
    /// Block Protect values, BP0 first; only `bp_count` entries are valid
    pub bp: [u8; MAX_BP_BITS],
    /// Number of BP bits available (0-4)
    pub bp_count: usize,
}

impl WpBits {
    /// Create empty WpBits with no bits present
    pub const fn empty() -> Self {
        Self {
            srp: None,
            srl: None,
            cmp: None,
            sec: None,
            tb: None,
            bp: [0; MAX_BP_BITS],
            bp_count: 0,
        }
    }

    /// BP bits as one integer, BP0 in the least significant position
    pub fn bp_value(&self) -> u8 {
        self.bp[..self.bp_count]
            .iter()
            .enumerate()
            .filter(|(_, &b)| b != 0)
            .fold(0u8, |acc, (i, _)| acc | (1 << i))
    }

    /// Set BP bits from a single integer value
    pub fn set_bp_value(&mut self, val: u8, count: usize) {
        self.bp_count = count.min(MAX_BP_BITS);
        for i in 0..MAX_BP_BITS {
            self.bp[i] = if i < self.bp_count { (val >> i) & 1 } else { 0 };
        }
    }

    /// Protection mode encoded by SRP and SRL
    pub fn mode(&self) -> WpMode {
        match (self.srl.unwrap_or(0), self.srp.unwrap_or(0)) {
            (0, 0) => WpMode::Disabled,
            (0, _) => WpMode::Hardware,
            (_, 0) => WpMode::PowerCycle,
            _ => WpMode::Permanent,
        }
    }
}

/// Which status register a bit is located in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRegister {
    /// Status Register 1
    Status1,
    /// Status Register 2
    Status2,
    /// Status Register 3
    Status3,
}

impl StatusRegister {
    /// Index of this register (0 for SR1)
    pub const fn index(self) -> usize {
        match self {
            StatusRegister::Status1 => 0,
            StatusRegister::Status2 => 1,
            StatusRegister::Status3 => 2,
        }
    }

    /// All registers, in index order
    pub const ALL: [StatusRegister; 3] = [
        StatusRegister::Status1,
        StatusRegister::Status2,
        StatusRegister::Status3,
    ];
}

/// Writability of a register bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitWritability {
    /// Bit is not present on this chip
    #[default]
    NotPresent,
    /// Read-only (cannot be modified)
    ReadOnly,
    /// Read-write (can be modified)
    ReadWrite,
    /// One-Time Programmable (can only be programmed once)
    Otp,
}

/// Location of a single protection bit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegBitInfo {
    /// Which register the bit is in
    pub reg: Option<StatusRegister>,
    /// Bit index within the register (0-7)
    pub bit_index: u8,
    /// Whether this bit can be written
    pub writability: BitWritability,
}

impl RegBitInfo {
    /// Create a new RegBitInfo for a present bit
    pub const fn new(reg: StatusRegister, bit_index: u8, writability: BitWritability) -> Self {
        Self {
            reg: Some(reg),
            bit_index,
            writability,
        }
    }

    /// Shorthand for a read-write bit
    pub const fn rw(reg: StatusRegister, bit_index: u8) -> Self {
        Self::new(reg, bit_index, BitWritability::ReadWrite)
    }

    /// Create a RegBitInfo for a bit that is not present
    pub const fn not_present() -> Self {
        Self {
            reg: None,
            bit_index: 0,
            writability: BitWritability::NotPresent,
        }
    }

    /// Check if this bit is present on the chip
    pub const fn is_present(&self) -> bool {
        self.reg.is_some() && !matches!(self.writability, BitWritability::NotPresent)
    }

    /// Check if this bit can be written
    pub const fn is_writable(&self) -> bool {
        matches!(
            self.writability,
            BitWritability::ReadWrite | BitWritability::Otp
        )
    }

    /// Mask of this bit within its register
    pub const fn mask(&self) -> u8 {
        1 << self.bit_index
    }
}

/// Where every protection bit of a chip lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WpRegBitMap {
    /// Status Register Protect (SRP0/SRP)
    pub srp: RegBitInfo,
    /// Status Register Lock (SRL/SRP1)
    pub srl: RegBitInfo,
    /// Complement bit (CMP)
    pub cmp: RegBitInfo,
    /// Sector/Block protect (SEC)
    pub sec: RegBitInfo,
    /// Top/Bottom (TB)
    pub tb: RegBitInfo,
    /// Block Protect bits (BP0, BP1, BP2, BP3)
    pub bp: [RegBitInfo; MAX_BP_BITS],
    /// Write Protect Selection; when set the chip uses per-sector locks
    pub wps: RegBitInfo,
}

impl WpRegBitMap {
    /// Standard Winbond-style register layout
    ///
    /// SR1: SRP0(7), SEC(6), TB(5), BP2(4), BP1(3), BP0(2), WEL(1), BUSY(0)
    /// SR2: SUS(7), CMP(6), LB3(5), LB2(4), LB1(3), R(2), QE(1), SRL(0)
    pub const fn winbond_standard() -> Self {
        use StatusRegister::*;
        Self {
            srp: RegBitInfo::rw(Status1, 7),
            srl: RegBitInfo::rw(Status2, 0),
            cmp: RegBitInfo::rw(Status2, 6),
            sec: RegBitInfo::rw(Status1, 6),
            tb: RegBitInfo::rw(Status1, 5),
            bp: [
                RegBitInfo::rw(Status1, 2),
                RegBitInfo::rw(Status1, 3),
                RegBitInfo::rw(Status1, 4),
                RegBitInfo::not_present(),
            ],
            wps: RegBitInfo::not_present(),
        }
    }

    /// Winbond layout with BP3 in SR2 bit 2, for larger chips
    pub const fn winbond_with_bp3() -> Self {
        let mut map = Self::winbond_standard();
        map.bp[3] = RegBitInfo::rw(StatusRegister::Status2, 2);
        map
    }

    /// Single status register: SRP(7), BP3(5)..BP0(2); no TB, SEC or CMP
    pub const fn basic_bp4() -> Self {
        use StatusRegister::*;
        Self {
            srp: RegBitInfo::rw(Status1, 7),
            srl: RegBitInfo::not_present(),
            cmp: RegBitInfo::not_present(),
            sec: RegBitInfo::not_present(),
            tb: RegBitInfo::not_present(),
            bp: [
                RegBitInfo::rw(Status1, 2),
                RegBitInfo::rw(Status1, 3),
                RegBitInfo::rw(Status1, 4),
                RegBitInfo::rw(Status1, 5),
            ],
            wps: RegBitInfo::not_present(),
        }
    }

    /// Get the number of BP bits present
    pub fn bp_count(&self) -> usize {
        self.bp.iter().filter(|b| b.is_present()).count()
    }

    /// Template with every present range bit set to zero
    ///
    /// Used as the starting point when searching for bits that encode a
    /// requested range.
    pub fn range_template(&self) -> WpBits {
        let present = |info: &RegBitInfo| info.is_present().then_some(0);
        WpBits {
            tb: present(&self.tb),
            sec: present(&self.sec),
            cmp: present(&self.cmp),
            bp_count: self.bp_count(),
            ..WpBits::empty()
        }
    }
}

/// Algorithm used to decode BP/TB/SEC/CMP bits into a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeDecoder {
    /// Standard SPI25 decoding with variable block sizes
    #[default]
    Spi25,
    /// Fixed 64K block sizes
    Spi25_64kBlock,
    /// CMP bit inverts the BP bits instead of the range (some Macronix)
    Spi25BitCmp,
    /// Double coefficient for chips with extra BP bit
    Spi25_2xBlock,
}
