//! Chip-sized image buffer

use std::ops::{Deref, DerefMut};
use std::path::Path;

use super::{ImageError, ImageResult};
use crate::layout::Region;

/// Owned, zero-initialized buffer the size of the chip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    data: Vec<u8>,
}

fn read_exact_file(path: &Path, expected: usize) -> ImageResult<Vec<u8>> {
    let data = std::fs::read(path).map_err(|source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if data.len() != expected {
        return Err(ImageError::SizeMismatch {
            path: path.to_path_buf(),
            actual: data.len() as u64,
            expected,
        });
    }
    Ok(data)
}

fn write_file(path: &Path, data: &[u8]) -> ImageResult<()> {
    std::fs::write(path, data).map_err(|source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl ImageBuffer {
    /// Allocate `size` zero bytes
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// Load a file of exactly `size` bytes
    pub fn from_file(path: &Path, size: usize) -> ImageResult<Self> {
        Ok(Self {
            data: read_exact_file(path, size)?,
        })
    }

    /// Overwrite `region` with its file, which must be exactly region-sized
    ///
    /// Regions without a file are left alone.
    pub fn load_region(&mut self, region: &Region) -> ImageResult<()> {
        let Some(path) = &region.file else {
            return Ok(());
        };
        let content = read_exact_file(path, region.size() as usize)?;
        self.region_mut(region)?.copy_from_slice(&content);
        Ok(())
    }

    /// Write the whole buffer to a file
    pub fn store_file(&self, path: &Path) -> ImageResult<()> {
        write_file(path, &self.data)
    }

    /// Write the bytes of `region` to its file
    pub fn store_region(&self, region: &Region) -> ImageResult<()> {
        let Some(path) = &region.file else {
            return Ok(());
        };
        let range = region.byte_range();
        let bytes = self.data.get(range).ok_or_else(|| out_of_bounds(region, self.data.len()))?;
        write_file(path, bytes)
    }

    fn region_mut(&mut self, region: &Region) -> ImageResult<&mut [u8]> {
        let len = self.data.len();
        self.data
            .get_mut(region.byte_range())
            .ok_or_else(|| out_of_bounds(region, len))
    }
}

fn out_of_bounds(region: &Region, size: usize) -> ImageError {
    crate::layout::LayoutError::RegionOutOfBounds {
        name: region.name.clone(),
        start: region.start,
        end: region.end,
        chip_size: size as u32,
    }
    .into()
}

impl Deref for ImageBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for ImageBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl From<Vec<u8>> for ImageBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("romflash-buffer-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_region_round_trip() {
        let dir = temp_dir("region");
        let mut region = Region::new("b", 4, 7);
        region.file = Some(dir.join("b.bin"));

        let mut buf = ImageBuffer::from(vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        buf.store_region(&region).unwrap();
        assert_eq!(std::fs::read(dir.join("b.bin")).unwrap(), vec![4, 5, 6, 7]);

        std::fs::write(dir.join("b.bin"), [0xAA; 4]).unwrap();
        buf.load_region(&region).unwrap();
        assert_eq!(&buf[..], &[0, 1, 2, 3, 0xAA, 0xAA, 0xAA, 0xAA, 8, 9]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_size_mismatch() {
        let dir = temp_dir("size");
        let path = dir.join("short.bin");
        std::fs::write(&path, [0u8; 8]).unwrap();

        let err = ImageBuffer::from_file(&path, 16).unwrap_err();
        assert!(matches!(
            err,
            ImageError::SizeMismatch { actual: 8, expected: 16, .. }
        ));
        assert!(err.to_string().starts_with("Image size (8 B) doesn't match the expected size (16 B)"));

        let mut region = Region::new("r", 0, 3);
        region.file = Some(path);
        let mut buf = ImageBuffer::new(16);
        assert!(matches!(
            buf.load_region(&region),
            Err(ImageError::SizeMismatch { expected: 4, .. })
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let err = ImageBuffer::from_file(Path::new("/nonexistent/romflash/image.bin"), 16).unwrap_err();
        assert!(matches!(err, ImageError::Io { .. }));
    }
}
