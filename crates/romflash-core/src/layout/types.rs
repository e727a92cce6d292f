//! Layout types

use std::path::{Path, PathBuf};

use super::LayoutError;

/// Name of the region in the default layout
pub const WHOLE_CHIP_REGION: &str = "complete flash";

/// A named region within a flash chip
///
/// Bounds are inclusive on both ends, so a region is never empty.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Region {
    /// Name of the region
    pub name: String,
    /// Start address (inclusive)
    pub start: u32,
    /// End address (inclusive)
    pub end: u32,
    /// Whether this region is read-only
    #[serde(default)]
    pub readonly: bool,
    /// Whether modifying this region may brick the machine
    #[serde(default)]
    pub dangerous: bool,
    /// Whether this region is included in operations
    #[serde(skip)]
    pub included: bool,
    /// File for partial I/O of this region
    #[serde(skip)]
    pub file: Option<PathBuf>,
}

impl Region {
    /// Create a new region
    pub fn new(name: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            readonly: false,
            dangerous: false,
            included: false,
            file: None,
        }
    }

    /// Size of this region in bytes
    pub fn size(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Check if an address is within this region
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr <= self.end
    }

    /// Check if this region overlaps with another
    pub fn overlaps(&self, other: &Region) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Byte range of this region for slicing a chip-sized buffer
    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize + 1
    }

    /// Same name and bounds, ignoring flags and inclusion state
    pub fn same_bounds(&self, other: &Region) -> bool {
        self.start == other.start && self.end == other.end && self.name == other.name
    }
}

/// Where a layout came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    /// Synthetic single region covering the chip
    WholeChip,
    /// Loaded from a layout file
    File,
    /// Parsed from an Intel Flash Descriptor
    Ifd,
    /// Parsed from an fmap
    Fmap,
    /// Built in code
    Manual,
}

/// A flash layout: ordered regions plus the subset included in operations
#[derive(Debug, Clone)]
pub struct Layout {
    /// Optional name for this layout
    pub name: Option<String>,
    /// Chip size the layout was made for
    pub chip_size: Option<u32>,
    /// Source of this layout
    pub kind: LayoutKind,
    /// Regions in this layout
    pub regions: Vec<Region>,
}

impl Layout {
    /// Create a new empty layout
    pub fn new() -> Self {
        Self::with_kind(LayoutKind::Manual)
    }

    /// Create an empty layout of the given kind
    pub fn with_kind(kind: LayoutKind) -> Self {
        Self {
            name: None,
            chip_size: None,
            kind,
            regions: Vec::new(),
        }
    }

    /// The default layout: one included region spanning the chip
    pub fn whole_chip(chip_size: u32) -> Self {
        let mut layout = Self::with_kind(LayoutKind::WholeChip);
        layout.chip_size = Some(chip_size);
        if chip_size > 0 {
            let mut region = Region::new(WHOLE_CHIP_REGION, 0, chip_size - 1);
            region.included = true;
            layout.regions.push(region);
        }
        layout
    }

    /// Add a region to the layout
    pub fn add_region(&mut self, region: Region) {
        self.regions.push(region);
    }

    /// Find a region by exact name
    pub fn find_region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    fn find_region_mut(&mut self, name: &str) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.name == name)
    }

    /// `(start, len)` of a named region
    pub fn region_range(&self, name: &str) -> Option<(u32, u32)> {
        self.find_region(name).map(|r| (r.start, r.size()))
    }

    /// Mark a region as included, optionally binding a file to it
    pub fn include_region(&mut self, name: &str, file: Option<PathBuf>) -> Result<(), LayoutError> {
        let region = self
            .find_region_mut(name)
            .ok_or_else(|| LayoutError::RegionNotFound(name.to_string()))?;
        region.included = true;
        region.file = file;
        Ok(())
    }

    /// All included regions, in layout order
    pub fn included_regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(|r| r.included)
    }

    /// Included regions that carry a file
    pub fn included_file_regions(&self) -> impl Iterator<Item = &Region> {
        self.included_regions().filter(|r| r.file.is_some())
    }

    /// Check if any region is included
    pub fn has_included_regions(&self) -> bool {
        self.regions.iter().any(|r| r.included)
    }

    /// Number of regions
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Check if the layout has no regions
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Check the layout against the bound chip
    ///
    /// A declared chip size must match. Regions must be well-formed; a
    /// region outside the chip is only an error if it is included.
    pub fn check_bounds(&self, chip_size: u32) -> Result<(), LayoutError> {
        if let Some(expected) = self.chip_size {
            if expected != chip_size {
                return Err(LayoutError::ChipSizeMismatch {
                    expected,
                    actual: chip_size,
                });
            }
        }

        for region in &self.regions {
            if region.start > region.end {
                return Err(LayoutError::InvalidRegion {
                    name: region.name.clone(),
                    start: region.start,
                    end: region.end,
                });
            }
            if region.end >= chip_size {
                if region.included {
                    return Err(LayoutError::RegionOutOfBounds {
                        name: region.name.clone(),
                        start: region.start,
                        end: region.end,
                        chip_size,
                    });
                }
                log::warn!(
                    "Region \"{}\" 0x{:08x}-0x{:08x} exceeds the chip size, ignoring it",
                    region.name,
                    region.start,
                    region.end
                );
            }
        }
        Ok(())
    }

    /// Every pair of included, file-bearing regions that overlap
    pub fn overlapping_file_regions(&self) -> Vec<(String, String)> {
        let regions: Vec<&Region> = self.included_file_regions().collect();
        let mut pairs = Vec::new();
        for (i, a) in regions.iter().enumerate() {
            for b in &regions[i + 1..] {
                if a.overlaps(b) {
                    pairs.push((a.name.clone(), b.name.clone()));
                }
            }
        }
        pairs
    }

    /// Whether any two included, file-bearing regions overlap
    pub fn has_file_overlap(&self) -> bool {
        !self.overlapping_file_regions().is_empty()
    }

    /// Reject layouts whose included files would write the same bytes
    pub fn check_file_overlap(&self) -> Result<(), LayoutError> {
        let pairs = self.overlapping_file_regions();
        if pairs.is_empty() {
            return Ok(());
        }
        for (a, b) in &pairs {
            log::debug!("Regions \"{}\" and \"{}\" overlap", a, b);
        }
        Err(LayoutError::Overlap { pairs })
    }

    /// Include every region, each with its own output file
    ///
    /// Regions without a file get one in `dir` named after the region,
    /// with whitespace replaced by underscores.
    pub fn prepare_for_extraction(&mut self, dir: &Path) {
        for region in &mut self.regions {
            region.included = true;
            if region.file.is_none() {
                let file_name: String = region
                    .name
                    .chars()
                    .map(|c| if c.is_whitespace() { '_' } else { c })
                    .collect();
                region.file = Some(dir.join(file_name));
            }
        }
    }

    /// Compare region lists in order by start, end and name
    ///
    /// Layouts with different region counts never match.
    pub fn same_regions(&self, other: &Layout) -> bool {
        self.regions.len() == other.regions.len()
            && self
                .regions
                .iter()
                .zip(&other.regions)
                .all(|(a, b)| a.same_bounds(b))
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}
