//! TOML layout files
//!
//! ```toml
//! [layout]
//! name = "coreboot"
//! chip_size = "8 MiB"
//!
//! [[region]]
//! name = "descriptor"
//! start = 0x000000
//! end = 0x000FFF
//! readonly = true
//!
//! [[region]]
//! name = "bios"
//! start = "0x200000"
//! end = 0x7FFFFF
//! ```

use std::fmt::Write as _;

use super::{Layout, LayoutError, LayoutKind, Region};

#[derive(Debug, serde::Deserialize)]
struct LayoutFile {
    layout: Option<LayoutMeta>,
    #[serde(default)]
    region: Vec<RegionEntry>,
}

#[derive(Debug, serde::Deserialize)]
struct LayoutMeta {
    name: Option<String>,
    chip_size: Option<SizeValue>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Int(u32),
    Str(String),
}

#[derive(Debug, serde::Deserialize)]
struct RegionEntry {
    name: String,
    #[serde(deserialize_with = "deserialize_address")]
    start: u32,
    #[serde(deserialize_with = "deserialize_address")]
    end: u32,
    #[serde(default)]
    readonly: bool,
    #[serde(default)]
    dangerous: bool,
}

fn deserialize_address<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrStr {
        Int(u32),
        Str(String),
    }

    match IntOrStr::deserialize(deserializer)? {
        IntOrStr::Int(n) => Ok(n),
        IntOrStr::Str(s) => parse_number(&s).map_err(serde::de::Error::custom),
    }
}

/// Parse a hex (`0x`) or decimal number
pub fn parse_number(s: &str) -> Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex number \"{}\": {}", s, e))
    } else {
        s.parse()
            .map_err(|e| format!("invalid number \"{}\": {}", s, e))
    }
}

/// Parse a size like `4096`, `0x1000`, `4 KiB` or `16MiB`
pub fn parse_size(s: &str) -> Result<u32, String> {
    let trimmed = s.trim();
    if let Ok(n) = parse_number(trimmed) {
        return Ok(n);
    }

    let lower = trimmed.to_lowercase();
    let (digits, multiplier) = [("mib", 1 << 20), ("mb", 1 << 20), ("kib", 1 << 10), ("kb", 1 << 10), ("b", 1)]
        .iter()
        .find_map(|&(suffix, mult)| lower.strip_suffix(suffix).map(|n| (n.trim(), mult)))
        .ok_or_else(|| format!("invalid size: {}", trimmed))?;

    let n: u32 = digits
        .parse()
        .map_err(|_| format!("invalid size: {}", trimmed))?;
    n.checked_mul(multiplier)
        .ok_or_else(|| format!("size too large: {}", trimmed))
}

/// Render a size as `N MiB`, `N KiB` or plain bytes
pub fn format_size(size: u32) -> String {
    if size >= 1 << 20 && size % (1 << 20) == 0 {
        format!("{} MiB", size >> 20)
    } else if size >= 1 << 10 && size % (1 << 10) == 0 {
        format!("{} KiB", size >> 10)
    } else {
        format!("{}", size)
    }
}

impl Layout {
    /// Parse a layout from TOML
    pub fn from_toml_str(content: &str) -> Result<Self, LayoutError> {
        let file: LayoutFile =
            toml::from_str(content).map_err(|e| LayoutError::Parse(e.to_string()))?;

        let mut layout = Layout::with_kind(LayoutKind::File);
        if let Some(meta) = file.layout {
            layout.name = meta.name;
            layout.chip_size = match meta.chip_size {
                None => None,
                Some(SizeValue::Int(n)) => Some(n),
                Some(SizeValue::Str(s)) => Some(parse_size(&s).map_err(LayoutError::Parse)?),
            };
        }

        for entry in file.region {
            if entry.start > entry.end {
                return Err(LayoutError::InvalidRegion {
                    name: entry.name,
                    start: entry.start,
                    end: entry.end,
                });
            }
            if layout.find_region(&entry.name).is_some() {
                return Err(LayoutError::Parse(format!(
                    "duplicate region name \"{}\"",
                    entry.name
                )));
            }
            let mut region = Region::new(entry.name, entry.start, entry.end);
            region.readonly = entry.readonly;
            region.dangerous = entry.dangerous;
            layout.add_region(region);
        }

        Ok(layout)
    }

    /// Render the layout as TOML
    pub fn to_toml_string(&self) -> String {
        let mut out = String::from("[layout]\n");
        if let Some(name) = &self.name {
            let _ = writeln!(out, "name = {:?}", name);
        }
        if let Some(size) = self.chip_size {
            let _ = writeln!(out, "chip_size = \"{}\"", format_size(size));
        }

        for region in &self.regions {
            out.push_str("\n[[region]]\n");
            let _ = writeln!(out, "name = {:?}", region.name);
            let _ = writeln!(out, "start = 0x{:08X}", region.start);
            let _ = writeln!(out, "end = 0x{:08X}", region.end);
            if region.readonly {
                out.push_str("readonly = true\n");
            }
            if region.dangerous {
                out.push_str("dangerous = true\n");
            }
        }
        out
    }
}
