//! Opening programmers by name

use romflash_core::chip::ChipDatabase;
use romflash_core::programmer::ProgrammerMaster;

use crate::params::parse_programmer_params;
#[allow(unused_imports)] // Used in feature-gated code
use crate::params::ProgrammerParams;
use crate::{find_programmer, RegistryError};

/// Open a programmer from a `name[:key=value,...]` string
///
/// The chip database is used by programmers that need chip definitions,
/// such as the emulator's `emulate=` parameter.
#[allow(unused_variables)]
pub fn open_master(
    programmer: &str,
    db: &ChipDatabase,
) -> Result<Box<dyn ProgrammerMaster>, RegistryError> {
    let params = parse_programmer_params(programmer)?;
    let canonical = find_programmer(&params.name)
        .ok_or_else(|| RegistryError::UnknownProgrammer(params.name.clone()))?;
    log::debug!("Opening programmer {} ({})", canonical, programmer);

    match canonical {
        #[cfg(feature = "dummy")]
        "dummy" => dummy::open(&params, db),
        _ => Err(RegistryError::UnknownProgrammer(params.name.clone())),
    }
}

#[cfg(feature = "dummy")]
mod dummy {
    use std::path::PathBuf;

    use romflash_core::chip::{BusType, ChipDatabase};
    use romflash_core::layout::{parse_number, parse_size};
    use romflash_core::programmer::ProgrammerMaster;
    use romflash_dummy::{DummyConfig, DummyFlash};

    use super::ProgrammerParams;
    use crate::RegistryError;

    const KNOWN: &[&str] = &["emulate", "image", "bus", "hwwp", "max_decode", "locked"];

    fn invalid(key: &str, value: &str) -> RegistryError {
        RegistryError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    fn parse_buses(value: &str) -> Result<BusType, RegistryError> {
        value.split('+').try_fold(BusType::empty(), |acc, bus| {
            let bus = match bus.trim().to_ascii_lowercase().as_str() {
                "spi" => BusType::SPI,
                "lpc" => BusType::LPC,
                "fwh" => BusType::FWH,
                "parallel" => BusType::PARALLEL,
                "prog" => BusType::PROG,
                _ => return Err(invalid("bus", value)),
            };
            Ok(acc | bus)
        })
    }

    fn parse_bool(key: &str, value: &str) -> Result<bool, RegistryError> {
        match value {
            "yes" | "on" | "1" | "true" => Ok(true),
            "no" | "off" | "0" | "false" => Ok(false),
            _ => Err(invalid(key, value)),
        }
    }

    fn parse_locked(value: &str) -> Result<(u32, u32), RegistryError> {
        let (start, end) = value.split_once('-').ok_or_else(|| invalid("locked", value))?;
        let start = parse_number(start).map_err(|_| invalid("locked", value))?;
        let end = parse_number(end).map_err(|_| invalid("locked", value))?;
        if start > end {
            return Err(invalid("locked", value));
        }
        Ok((start, end))
    }

    /// Build the emulator configuration described by the parameters
    pub(super) fn config(params: &ProgrammerParams, db: &ChipDatabase) -> Result<DummyConfig, RegistryError> {
        params.check_known(KNOWN)?;

        let mut config = match params.get("emulate") {
            Some(name) => {
                let chip = db
                    .find_exact(name)
                    .ok_or_else(|| RegistryError::UnknownChip(name.to_string()))?;
                DummyConfig::emulate(chip)
            }
            None => DummyConfig::default(),
        };
        if let Some(bus) = params.get("bus") {
            config.buses = parse_buses(bus)?;
        }
        if let Some(hwwp) = params.get("hwwp") {
            config.hw_wp = parse_bool("hwwp", hwwp)?;
        }
        if let Some(max) = params.get("max_decode") {
            config.max_rom_decode = Some(parse_size(max).map_err(|_| invalid("max_decode", max))?);
        }
        if let Some(locked) = params.get("locked") {
            config.locked = locked
                .split('+')
                .map(parse_locked)
                .collect::<Result<_, _>>()?;
        }
        Ok(config)
    }

    pub(super) fn open(
        params: &ProgrammerParams,
        db: &ChipDatabase,
    ) -> Result<Box<dyn ProgrammerMaster>, RegistryError> {
        let config = config(params, db)?;
        log::info!(
            "Emulating 0x{:02x}/0x{:04x} ({} kB) on {}",
            config.manufacturer_id,
            config.model_id,
            config.size / 1024,
            config.buses
        );

        let flash = match params.get("image") {
            Some(path) => {
                let path = PathBuf::from(path);
                let data = std::fs::read(&path).map_err(|source| RegistryError::Io {
                    path: path.clone(),
                    source,
                })?;
                if data.len() != config.size as usize {
                    log::warn!(
                        "Image {} is {} bytes, emulated chip is {} bytes",
                        path.display(),
                        data.len(),
                        config.size
                    );
                }
                DummyFlash::with_data(config, &data)
            }
            None => DummyFlash::new(config),
        };
        Ok(Box::new(flash))
    }
}
