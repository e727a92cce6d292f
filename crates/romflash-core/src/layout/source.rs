//! Layout source selection

use std::path::{Path, PathBuf};

use super::{fmap, rom, IncludeArgs, Layout, LayoutError};
use crate::flash::FlashContext;

/// Where the active layout comes from
///
/// Exactly one source is chosen per session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LayoutSource {
    /// No layout; operations cover the whole chip
    #[default]
    None,
    /// A layout file (TOML or `start:end name` lines)
    File(PathBuf),
    /// The Intel Flash Descriptor on the chip, optionally checked against
    /// the descriptor of a dump file
    Ifd {
        /// Reference image whose descriptor must match the chip's
        dump: Option<PathBuf>,
    },
    /// The fmap stored on the chip
    FmapRom,
    /// The fmap found in a side file
    FmapFile(PathBuf),
    /// The fmap on the chip, required to match the fmap in the image about
    /// to be written
    FmapVerify {
        /// Image file holding the expected fmap
        image: PathBuf,
    },
}

fn read_file(path: &Path) -> Result<Vec<u8>, LayoutError> {
    std::fs::read(path).map_err(|e| LayoutError::io(path, e))
}

impl LayoutSource {
    /// Build the layout this source describes
    ///
    /// Returns `None` for [`LayoutSource::None`]. Chip-backed sources read
    /// through the context's master.
    pub fn build(&self, ctx: &mut FlashContext<'_>) -> Result<Option<Layout>, LayoutError> {
        let layout = match self {
            LayoutSource::None => return Ok(None),
            LayoutSource::File(path) => Layout::from_file(path)?,
            LayoutSource::Ifd { dump } => {
                let dump = dump.as_deref().map(read_file).transpose()?;
                rom::read_ifd_from_rom(ctx, dump.as_deref())?
            }
            LayoutSource::FmapRom => rom::read_fmap_from_rom(ctx)?,
            LayoutSource::FmapFile(path) => fmap::parse_fmap(&read_file(path)?)?,
            LayoutSource::FmapVerify { image } => {
                let chip_layout = rom::read_fmap_from_rom(ctx)?;
                let data = read_file(image)?;
                let len = data.len().min(ctx.chip_size() as usize);
                let file_layout = fmap::parse_fmap(&data[..len])?;
                if !chip_layout.same_regions(&file_layout) {
                    return Err(LayoutError::FmapMismatch);
                }
                log::info!("FMAP layouts match.");
                chip_layout
            }
        };
        Ok(Some(layout))
    }

    /// Build the layout, apply the include arguments and install it
    ///
    /// Include arguments without a layout are rejected. When there is no
    /// source the context keeps its whole-chip default.
    pub fn bind(
        &self,
        ctx: &mut FlashContext<'_>,
        includes: &IncludeArgs,
    ) -> Result<(), LayoutError> {
        match self.build(ctx)? {
            Some(mut layout) => {
                includes.apply(&mut layout)?;
                layout.check_bounds(ctx.chip_size())?;
                ctx.set_layout(layout);
                Ok(())
            }
            None => match includes.iter().next() {
                Some(arg) => Err(LayoutError::NoLayout(arg.name.clone())),
                None => Ok(()),
            },
        }
    }
}
