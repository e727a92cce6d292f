//! Human-readable rendering of protection ranges

use core::fmt;

use super::types::WpRange;

/// Where a partial range sits in the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeLocation {
    /// Starts at address 0
    Lower,
    /// Ends at the last byte of the chip
    Upper,
    /// Touches neither end
    Middle,
}

/// Shape of a range relative to the chip size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeShape {
    /// Nothing protected
    None,
    /// Whole chip protected
    All,
    /// `num/den` of the chip, reduced by common factors of two
    Fraction {
        /// Position of the range
        location: RangeLocation,
        /// Numerator
        num: u64,
        /// Denominator
        den: u64,
    },
}

impl RangeShape {
    /// Classify `range` on a chip of `chip_size` bytes
    ///
    /// A range that both starts at 0 and ends at the top is labelled upper.
    pub fn of(range: &WpRange, chip_size: u32) -> Self {
        let (start, mut len, mut den) = (range.start as u64, range.len as u64, chip_size as u64);

        if len == 0 {
            return RangeShape::None;
        }
        if len == den {
            return RangeShape::All;
        }

        let location = if start + len == den {
            RangeLocation::Upper
        } else if start == 0 {
            RangeLocation::Lower
        } else {
            RangeLocation::Middle
        };

        while den % 2 == 0 && len % 2 == 0 {
            den /= 2;
            len /= 2;
        }

        RangeShape::Fraction {
            location,
            num: len,
            den,
        }
    }
}

impl fmt::Display for RangeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeShape::None => f.write_str("(none)"),
            RangeShape::All => f.write_str("(all)"),
            RangeShape::Fraction { location, num, den } => {
                let prefix = match location {
                    RangeLocation::Lower => "lower ",
                    RangeLocation::Upper => "upper ",
                    RangeLocation::Middle => "",
                };
                write!(f, "{}{}/{}", prefix, num, den)
            }
        }
    }
}

/// Short description such as `lower 1/8`, `(all)` or `(none)`
pub fn describe_range(range: &WpRange, chip_size: u32) -> String {
    RangeShape::of(range, chip_size).to_string()
}

/// Full line: `start=0x00000000 length=0x00020000 (lower 1/8)`
pub fn format_range_line(range: &WpRange, chip_size: u32) -> String {
    let shape = RangeShape::of(range, chip_size);
    let description = match shape {
        RangeShape::Fraction { .. } => format!("({})", shape),
        _ => shape.to_string(),
    };
    format!(
        "start=0x{:08x} length=0x{:08x} {}",
        range.start, range.len, description
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHIP: u32 = 0x100000;

    #[test]
    fn test_describe_examples() {
        assert_eq!(describe_range(&WpRange::new(0, 0x20000), CHIP), "lower 1/8");
        assert_eq!(describe_range(&WpRange::new(0, CHIP), CHIP), "(all)");
        assert_eq!(describe_range(&WpRange::new(0, 0), CHIP), "(none)");
    }

    #[test]
    fn test_describe_upper_and_middle() {
        assert_eq!(
            describe_range(&WpRange::new(CHIP - 0x40000, 0x40000), CHIP),
            "upper 1/4"
        );
        assert_eq!(describe_range(&WpRange::new(0x10000, 0x30000), CHIP), "3/16");
    }

    #[test]
    fn test_odd_chip_size_is_not_reduced() {
        assert_eq!(describe_range(&WpRange::new(0, 2), 3), "lower 2/3");
    }

    #[test]
    fn test_range_line() {
        assert_eq!(
            format_range_line(&WpRange::new(0, 0x20000), CHIP),
            "start=0x00000000 length=0x00020000 (lower 1/8)"
        );
        assert_eq!(
            format_range_line(&WpRange::none(), CHIP),
            "start=0x00000000 length=0x00000000 (none)"
        );
    }
}
