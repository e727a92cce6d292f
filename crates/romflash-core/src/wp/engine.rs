//! Write-protection request engine
//!
//! A [`WpRequest`] bundles the independent parts of a `wp` invocation:
//! listing the available ranges, changing the range, enabling or
//! disabling hardware protection and printing the status. Changes go
//! through a single read-modify-write of the chip's configuration.

use core::fmt;

use super::{format_range_line, WpConfig, WpError, WpMode, WpRange};
use crate::flash::FlashContext;

/// Range to protect, given literally or by layout region name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WpTarget {
    /// Explicit start and length
    Range(WpRange),
    /// Bounds of a region of the active layout
    Region(String),
}

/// One `wp` invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WpRequest {
    /// List every range the chip can protect
    pub list_ranges: bool,
    /// New protection range
    pub target: Option<WpTarget>,
    /// Enable hardware protection
    pub enable: bool,
    /// Disable hardware protection
    pub disable: bool,
    /// Print the resulting range and mode
    pub print_status: bool,
}

/// Errors of the write-protection engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WpRequestError {
    /// Enable and disable were both requested
    #[error("--wp-enable and --wp-disable are mutually exclusive")]
    MutuallyExclusive,
    /// A literal range and a region were both given
    #[error("Cannot use both --wp-range and --wp-region simultaneously.")]
    BothRangeAndRegion,
    /// A `start,len` argument could not be parsed
    #[error("Invalid wp-range argument format \"{0}\". Valid format is --wp-range <start>,<length>")]
    InvalidRange(String),
    /// A region was named but no layout is bound
    #[error("A flash layout must be specified to use --wp-region.")]
    NoLayout,
    /// The named region is not in the layout
    #[error("Region {0} not found in flash layout.")]
    RegionNotFound(String),
    /// Listing the available ranges failed
    #[error("Failed to get list of protection ranges: {0}")]
    ListRanges(WpError),
    /// Reading or writing the new configuration failed
    #[error("Failed to apply new WP settings: {source}{}", note_suffix(.source, .prior_mode))]
    Apply {
        /// Primitive error
        source: WpError,
        /// Mode before the change was attempted
        prior_mode: WpMode,
    },
    /// Reading the configuration for the status report failed
    #[error("Failed to get WP status: {0}")]
    Status(WpError),
}

/// Explanation for a configuration that did not stick, keyed on the mode
/// the chip was in before the write
pub fn verify_failure_note(prior_mode: WpMode) -> Option<&'static str> {
    match prior_mode {
        WpMode::Hardware => Some(
            "Note: hardware status register protection is enabled. The chip's WP# pin must be \
             set to an inactive voltage level to be able to change the WP settings.",
        ),
        WpMode::PowerCycle => Some(
            "Note: power-cycle status register protection is enabled. A power-off, power-on \
             cycle is usually required to change the chip's WP settings.",
        ),
        WpMode::Permanent => Some(
            "Note: permanent status register protection is enabled. The chip's WP settings \
             cannot be modified.",
        ),
        WpMode::Disabled => None,
    }
}

fn note_suffix(source: &WpError, prior_mode: &WpMode) -> String {
    match (source, verify_failure_note(*prior_mode)) {
        (WpError::VerifyFailed, Some(note)) => format!("\n{}", note),
        _ => String::new(),
    }
}

impl WpRequestError {
    /// Underlying primitive error, if any
    pub fn wp_error(&self) -> Option<WpError> {
        match self {
            Self::ListRanges(e) | Self::Status(e) => Some(*e),
            Self::Apply { source, .. } => Some(*source),
            _ => None,
        }
    }

    /// Advisory note for a failed write, if one applies
    pub fn note(&self) -> Option<&'static str> {
        match self {
            Self::Apply {
                source: WpError::VerifyFailed,
                prior_mode,
            } => verify_failure_note(*prior_mode),
            _ => None,
        }
    }
}

fn parse_c_number(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if s.len() > 1 && s.starts_with('0') {
        u32::from_str_radix(&s[1..], 8).ok()
    } else {
        s.parse().ok()
    }
}

/// Parse a `start,len` range
///
/// Exactly one comma, both sides non-empty. Numbers may be decimal, `0x`
/// hexadecimal or `0` octal.
pub fn parse_wp_range(arg: &str) -> Result<WpRange, WpRequestError> {
    let invalid = || WpRequestError::InvalidRange(arg.to_string());
    let (start, len) = arg.split_once(',').ok_or_else(invalid)?;
    if start.is_empty() || len.is_empty() || len.contains(',') {
        return Err(invalid());
    }
    let start = parse_c_number(start).ok_or_else(invalid)?;
    let len = parse_c_number(len).ok_or_else(invalid)?;
    Ok(WpRange::new(start, len))
}

impl WpRequest {
    /// Combine the optional literal range and region into one target
    pub fn target_from(
        range: Option<WpRange>,
        region: Option<String>,
    ) -> Result<Option<WpTarget>, WpRequestError> {
        match (range, region) {
            (Some(_), Some(_)) => Err(WpRequestError::BothRangeAndRegion),
            (Some(range), None) => Ok(Some(WpTarget::Range(range))),
            (None, Some(region)) => Ok(Some(WpTarget::Region(region))),
            (None, None) => Ok(None),
        }
    }

    /// Whether the request does anything at all
    pub fn is_empty(&self) -> bool {
        !(self.list_ranges || self.target.is_some() || self.enable || self.disable || self.print_status)
    }

    /// Whether the request changes the chip's configuration
    pub fn mutates(&self) -> bool {
        self.target.is_some() || self.enable || self.disable
    }

    /// Check the request for contradictions
    pub fn validate(&self) -> Result<(), WpRequestError> {
        if self.enable && self.disable {
            return Err(WpRequestError::MutuallyExclusive);
        }
        Ok(())
    }
}

/// A change applied by [`run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WpChange {
    /// The protection range was set
    RangeActivated(WpRange),
    /// Hardware protection was disabled
    Disabled,
    /// Hardware protection was enabled
    Enabled,
}

/// Everything a [`run`] produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WpReport {
    /// Size of the chip, used to describe ranges
    pub chip_size: u32,
    /// Available ranges, if listed
    pub available: Option<Vec<WpRange>>,
    /// Applied changes, in reporting order
    pub changes: Vec<WpChange>,
    /// Configuration read at the end, if requested
    pub status: Option<WpConfig>,
}

impl fmt::Display for WpReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ranges) = &self.available {
            writeln!(f, "Available protection ranges:")?;
            for range in ranges {
                writeln!(f, "\t{}", format_range_line(range, self.chip_size))?;
            }
        }
        for change in &self.changes {
            match change {
                WpChange::Disabled => writeln!(f, "Disabled hardware protection")?,
                WpChange::Enabled => writeln!(f, "Enabled hardware protection")?,
                WpChange::RangeActivated(range) => writeln!(
                    f,
                    "Activated protection range: {}",
                    format_range_line(range, self.chip_size)
                )?,
            }
        }
        if let Some(config) = &self.status {
            writeln!(
                f,
                "Protection range: {}",
                format_range_line(&config.range, self.chip_size)
            )?;
            writeln!(f, "Protection mode: {}", config.mode)?;
        }
        Ok(())
    }
}

fn resolve_target(
    ctx: &FlashContext<'_>,
    target: &WpTarget,
) -> Result<WpRange, WpRequestError> {
    match target {
        WpTarget::Range(range) => Ok(*range),
        WpTarget::Region(name) => {
            let layout = ctx.layout().ok_or(WpRequestError::NoLayout)?;
            let (start, len) = layout
                .region_range(name)
                .ok_or_else(|| WpRequestError::RegionNotFound(name.clone()))?;
            Ok(WpRange::new(start, len))
        }
    }
}

/// Execute a write-protection request
///
/// Validation and region lookup happen before the chip is touched. The
/// parts run in order: list ranges, apply changes, read status. Changes
/// are applied to the configuration read from the chip in the order
/// range, disable, enable.
pub fn run(ctx: &mut FlashContext<'_>, request: &WpRequest) -> Result<WpReport, WpRequestError> {
    request.validate()?;
    let range = request
        .target
        .as_ref()
        .map(|target| resolve_target(ctx, target))
        .transpose()?;

    let mut report = WpReport {
        chip_size: ctx.chip_size(),
        ..Default::default()
    };

    if request.list_ranges {
        let ranges = ctx
            .wp_get_available_ranges()
            .map_err(WpRequestError::ListRanges)?;
        report.available = Some(ranges);
    }

    if request.mutates() {
        let mut prior_mode = WpMode::Disabled;
        let applied = ctx.wp_read_cfg().and_then(|mut config| {
            prior_mode = config.mode;
            if let Some(range) = range {
                config.range = range;
            }
            if request.disable {
                config.mode = WpMode::Disabled;
            }
            if request.enable {
                config.mode = WpMode::Hardware;
            }
            log::debug!(
                "Writing WP configuration: mode {}, {}",
                config.mode,
                format_range_line(&config.range, report.chip_size)
            );
            ctx.wp_write_cfg(&config)
        });
        if let Err(source) = applied {
            return Err(WpRequestError::Apply { source, prior_mode });
        }

        if request.disable {
            report.changes.push(WpChange::Disabled);
        }
        if request.enable {
            report.changes.push(WpChange::Enabled);
        }
        if let Some(range) = range {
            report.changes.push(WpChange::RangeActivated(range));
        }
    }

    if request.print_status {
        report.status = Some(ctx.wp_read_cfg().map_err(WpRequestError::Status)?);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::FlashChip;
    use crate::layout::{Layout, Region};
    use crate::testing::{test_chip, MemoryMaster};

    const CHIP_SIZE: u32 = 0x10000;

    fn run_on(master: &mut MemoryMaster, chip: FlashChip, request: &WpRequest) -> Result<WpReport, WpRequestError> {
        let mut ctx = FlashContext::new(master, chip);
        run(&mut ctx, request)
    }

    #[test]
    fn test_parse_wp_range() {
        assert_eq!(parse_wp_range("0,0x1000").unwrap(), WpRange::new(0, 0x1000));
        assert_eq!(parse_wp_range("0x8000,32768").unwrap(), WpRange::new(0x8000, 0x8000));
        assert_eq!(parse_wp_range("010,0").unwrap(), WpRange::new(8, 0));
        for bad in ["", ",", "0,", ",0x1000", "0x1000", "0,1,2", "zz,1"] {
            assert!(
                matches!(parse_wp_range(bad), Err(WpRequestError::InvalidRange(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_target_from() {
        assert_eq!(WpRequest::target_from(None, None), Ok(None));
        assert_eq!(
            WpRequest::target_from(None, Some("RO".into())),
            Ok(Some(WpTarget::Region("RO".into())))
        );
        assert_eq!(
            WpRequest::target_from(Some(WpRange::none()), Some("RO".into())),
            Err(WpRequestError::BothRangeAndRegion)
        );
    }

    #[test]
    fn test_enable_and_disable_rejected_before_hardware() {
        let mut master = MemoryMaster::new(test_chip(), 0xFF);
        let request = WpRequest {
            enable: true,
            disable: true,
            ..Default::default()
        };
        assert_eq!(
            run_on(&mut master, test_chip(), &request),
            Err(WpRequestError::MutuallyExclusive)
        );
        assert_eq!(master.regs.sr, [0; 3]);
    }

    #[test]
    fn test_set_range_and_enable() {
        let mut master = MemoryMaster::new(test_chip(), 0xFF);
        let request = WpRequest {
            target: Some(WpTarget::Range(WpRange::new(0, CHIP_SIZE / 2))),
            enable: true,
            print_status: true,
            ..Default::default()
        };
        let report = run_on(&mut master, test_chip(), &request).unwrap();

        assert_eq!(
            report.changes,
            vec![WpChange::Enabled, WpChange::RangeActivated(WpRange::new(0, CHIP_SIZE / 2))]
        );
        let status = report.status.unwrap();
        assert_eq!(status.mode, WpMode::Hardware);
        assert_eq!(status.range, WpRange::new(0, CHIP_SIZE / 2));

        let text = report.to_string();
        assert!(text.contains("Enabled hardware protection\n"));
        assert!(text.contains("Activated protection range: start=0x00000000 length=0x00008000 (lower 1/2)"));
        assert!(text.contains("Protection mode: hardware\n"));
    }

    #[test]
    fn test_every_listed_range_round_trips() {
        let mut master = MemoryMaster::new(test_chip(), 0xFF);
        let mut ctx = FlashContext::new(&mut master, test_chip());
        let ranges = ctx.wp_get_available_ranges().unwrap();
        assert!(ranges.len() > 2);

        for range in ranges {
            ctx.wp_write_cfg(&WpConfig::new(WpMode::Disabled, range)).unwrap();
            assert_eq!(ctx.wp_read_cfg().unwrap().range, range);
        }
    }

    #[test]
    fn test_region_target() {
        let mut master = MemoryMaster::new(test_chip(), 0xFF);
        let mut ctx = FlashContext::new(&mut master, test_chip());
        let request = WpRequest {
            target: Some(WpTarget::Region("RO".into())),
            ..Default::default()
        };
        assert_eq!(run(&mut ctx, &request), Err(WpRequestError::NoLayout));

        let mut layout = Layout::new();
        layout.add_region(Region::new("RO", 0x8000, 0xFFFF));
        ctx.set_layout(layout);
        let report = run(&mut ctx, &request).unwrap();
        assert_eq!(
            report.changes,
            vec![WpChange::RangeActivated(WpRange::new(0x8000, 0x8000))]
        );
        assert_eq!(ctx.wp_read_cfg().unwrap().range, WpRange::new(0x8000, 0x8000));

        let request = WpRequest {
            target: Some(WpTarget::Region("RW".into())),
            ..Default::default()
        };
        assert_eq!(
            run(&mut ctx, &request),
            Err(WpRequestError::RegionNotFound("RW".into()))
        );
    }

    #[test]
    fn test_locked_chip_explains_hardware_mode() {
        let mut master = MemoryMaster::new(test_chip(), 0xFF);
        // SRP0 set, registers ignore writes as if WP# were asserted
        master.regs.sr[0] = 0x80;
        master.regs.locked = true;
        let request = WpRequest {
            disable: true,
            ..Default::default()
        };
        let err = run_on(&mut master, test_chip(), &request).unwrap_err();

        assert_eq!(err.wp_error(), Some(WpError::VerifyFailed));
        let text = err.to_string();
        assert!(text.starts_with("Failed to apply new WP settings: unexpected WP configuration read back from chip"));
        assert!(text.contains("WP# pin must be set to an inactive voltage level"));
    }

    #[test]
    fn test_permanent_note_has_no_pin_guidance() {
        let err = WpRequestError::Apply {
            source: WpError::VerifyFailed,
            prior_mode: WpMode::Permanent,
        };
        let text = err.to_string();
        assert!(text.contains("cannot be modified"));
        assert!(!text.contains("WP# pin"));

        let err = WpRequestError::Apply {
            source: WpError::VerifyFailed,
            prior_mode: WpMode::Disabled,
        };
        assert_eq!(err.note(), None);
        assert_eq!(
            err.to_string(),
            "Failed to apply new WP settings: unexpected WP configuration read back from chip"
        );

        // Only verification failures get a note
        let err = WpRequestError::Apply {
            source: WpError::WriteFailed,
            prior_mode: WpMode::Hardware,
        };
        assert_eq!(err.note(), None);
    }

    #[test]
    fn test_list_ranges_unsupported_chip() {
        let mut chip = test_chip();
        chip.wp = None;
        let mut master = MemoryMaster::new(chip.clone(), 0xFF);
        let request = WpRequest {
            list_ranges: true,
            ..Default::default()
        };
        assert_eq!(
            run_on(&mut master, chip, &request),
            Err(WpRequestError::ListRanges(WpError::ChipUnsupported))
        );
    }
}
