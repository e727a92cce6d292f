//! Classic line-based layout files
//!
//! One region per line, `start:end name`, with hexadecimal addresses:
//!
//! ```text
//! 00000000:00000fff fd
//! 00001000:007fffff bios
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::path::Path;

use super::{Layout, LayoutError, LayoutKind, Region};

fn parse_hex(s: &str) -> Option<u32> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).ok()
}

impl Layout {
    /// Parse a layout in `start:end name` line format
    pub fn from_text_str(content: &str) -> Result<Self, LayoutError> {
        let mut layout = Layout::with_kind(LayoutKind::File);

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let syntax = |message: String| LayoutError::TextSyntax {
                line: index + 1,
                message,
            };

            let (range, name) = line
                .split_once(char::is_whitespace)
                .map(|(r, n)| (r, n.trim()))
                .ok_or_else(|| syntax(format!("expected \"start:end name\", got \"{}\"", line)))?;
            let (start, end) = range
                .split_once(':')
                .ok_or_else(|| syntax(format!("missing ':' in \"{}\"", range)))?;
            let start = parse_hex(start).ok_or_else(|| syntax(format!("bad start \"{}\"", start)))?;
            let end = parse_hex(end).ok_or_else(|| syntax(format!("bad end \"{}\"", end)))?;

            if start > end {
                return Err(LayoutError::InvalidRegion {
                    name: name.to_string(),
                    start,
                    end,
                });
            }
            if layout.find_region(name).is_some() {
                return Err(syntax(format!("duplicate region name \"{}\"", name)));
            }
            layout.add_region(Region::new(name, start, end));
        }

        Ok(layout)
    }

    /// Render the layout in `start:end name` line format
    pub fn to_text_string(&self) -> String {
        self.regions
            .iter()
            .map(|r| format!("{:08x}:{:08x} {}\n", r.start, r.end, r.name))
            .collect()
    }

    /// Load a layout file
    ///
    /// Files ending in `.toml` are parsed as TOML, anything else in the
    /// line format.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| LayoutError::io(path, e))?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let mut layout = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_text_str(&content)?
        };
        if layout.name.is_none() {
            layout.name = Some(path.display().to_string());
        }
        Ok(layout)
    }
}
