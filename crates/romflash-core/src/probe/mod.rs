//! Chip detection
//!
//! Every registered master is probed in registration order. A master is
//! probed repeatedly, each time resuming after the last matching database
//! entry, so one master can report several matching definitions. The
//! outcome is exactly one bound chip, none, or an ambiguous set of names
//! that the caller must resolve with an explicit chip name.

use crate::chip::{ChipDatabase, FlashChip};
use crate::error::Error;
use crate::flash::{Flag, FlashContext};
use crate::programmer::ProgrammerMaster;

/// Probe failures
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The requested chip name is not in the database
    #[error("Unknown chip '{0}' specified.")]
    UnknownChip(String),
    /// A master failed while probing
    #[error("Probing with {master} failed: {source}")]
    Internal {
        /// Name of the failing master
        master: String,
        /// Underlying error
        #[source]
        source: Error,
    },
    /// No registered master can drive the requested chip's bus
    #[error("No compatible controller found for the requested flash chip.")]
    NoCompatibleMaster,
    /// The chip exceeds the decode window of the master
    #[error("This flash chip is too big for this programmer (--verbose/-v gives details). Use --force/-f to override.")]
    ChipTooBig,
}

/// Result of probing all masters
#[derive(Debug)]
pub enum ProbeOutcome<'m> {
    /// Exactly one chip matched and is bound
    Found(FlashContext<'m>),
    /// Nothing matched
    NotFound,
    /// Several definitions matched; names in discovery order, no duplicates
    Ambiguous(Vec<String>),
}

/// Find a chip definition by exact name
pub fn lookup_chip<'a>(db: &'a ChipDatabase, name: &str) -> Result<&'a FlashChip, ProbeError> {
    db.find_exact(name)
        .ok_or_else(|| ProbeError::UnknownChip(name.to_string()))
}

/// Probe one master starting at database index `start`
///
/// Definitions whose bus the master cannot drive are skipped, as are
/// definitions not named `filter` when a filter is given. With `force` the
/// first remaining candidate is returned without touching the hardware.
/// Returns the index of the match, or `None` once the database is
/// exhausted.
pub fn probe_master(
    master: &mut dyn ProgrammerMaster,
    chips: &[FlashChip],
    start: usize,
    filter: Option<&str>,
    force: bool,
) -> Result<Option<usize>, Error> {
    let buses = master.buses_supported();
    for (index, chip) in chips.iter().enumerate().skip(start) {
        if !chip.is_compatible_with(buses) {
            continue;
        }
        if filter.is_some_and(|name| name != chip.name) {
            continue;
        }
        log::debug!("Probing for {} {}, {} kB", chip.vendor, chip.name, chip.total_size / 1024);
        if force || master.probe_chip(chip)? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

fn report_found(chip: &FlashChip, master: &str, forced: bool) {
    log::info!(
        "{} {} flash chip \"{}\" ({} kB, {}) on {}.",
        if forced { "Assuming" } else { "Found" },
        chip.vendor,
        chip.name,
        chip.total_size / 1024,
        chip.bus,
        master
    );
}

/// Probe every master, recording `(master index, chip index)` pairs
///
/// Each master is walked through the whole database, so one master can
/// contribute several matching definitions.
pub fn find_matches(
    masters: &mut [Box<dyn ProgrammerMaster>],
    db: &ChipDatabase,
    filter: Option<&str>,
) -> Result<Vec<(usize, usize)>, ProbeError> {
    let chips = db.chips();
    let mut matches = Vec::new();

    for (master_index, master) in masters.iter_mut().enumerate() {
        let mut start = 0;
        loop {
            let found = probe_master(master.as_mut(), chips, start, filter, false).map_err(
                |source| ProbeError::Internal {
                    master: master.name().to_string(),
                    source,
                },
            )?;
            let Some(chip_index) = found else { break };
            report_found(&chips[chip_index], master.name(), false);
            matches.push((master_index, chip_index));
            start = chip_index + 1;
        }
    }
    Ok(matches)
}

/// Turn the result of [`find_matches`] into an outcome
///
/// A context is created only for a single match.
pub fn resolve<'m>(
    masters: &'m mut [Box<dyn ProgrammerMaster>],
    db: &ChipDatabase,
    matches: &[(usize, usize)],
) -> ProbeOutcome<'m> {
    let chips = db.chips();
    match matches {
        [] => ProbeOutcome::NotFound,
        &[(master_index, chip_index)] => {
            let master = masters[master_index].as_mut();
            ProbeOutcome::Found(FlashContext::new(master, chips[chip_index].clone()))
        }
        many => {
            let mut names: Vec<String> = Vec::new();
            for &(_, chip_index) in many {
                let name = &chips[chip_index].name;
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            ProbeOutcome::Ambiguous(names)
        }
    }
}

/// Probe every master and bind the chip if exactly one matched
pub fn probe_all<'m>(
    masters: &'m mut [Box<dyn ProgrammerMaster>],
    db: &ChipDatabase,
    filter: Option<&str>,
) -> Result<ProbeOutcome<'m>, ProbeError> {
    let matches = find_matches(masters, db, filter)?;
    Ok(resolve(masters, db, &matches))
}

/// Bind the named chip without a signature match
///
/// The first master whose buses include the chip's is used. The context
/// is marked forced and has [`Flag::Force`] set; its contents are not
/// known to come from the named chip.
pub fn force_probe<'m>(
    masters: &'m mut [Box<dyn ProgrammerMaster>],
    db: &ChipDatabase,
    name: &str,
) -> Result<FlashContext<'m>, ProbeError> {
    let chip = lookup_chip(db, name)?;
    let compatible: Vec<usize> = masters
        .iter()
        .enumerate()
        .filter(|(_, m)| chip.is_compatible_with(m.buses_supported()))
        .map(|(i, _)| i)
        .collect();

    let Some(&master_index) = compatible.first() else {
        return Err(ProbeError::NoCompatibleMaster);
    };
    if compatible.len() > 1 {
        log::info!(
            "More than one compatible controller found for the requested flash chip, using the first one."
        );
    }

    let master = masters[master_index].as_mut();
    let found = probe_master(&mut *master, std::slice::from_ref(chip), 0, Some(name), true).map_err(
        |source| ProbeError::Internal {
            master: master.name().to_string(),
            source,
        },
    )?;
    if found.is_none() {
        return Err(ProbeError::NoCompatibleMaster);
    }
    report_found(chip, master.name(), true);
    log::warn!("Please note that forced reads most likely contain garbage.");

    let mut ctx = FlashContext::new(master, chip.clone());
    ctx.set_forced(true);
    ctx.set_flag(Flag::Force, true);
    Ok(ctx)
}

/// Refuse chips larger than the master can map, unless forced
pub fn check_decode_limits(ctx: &FlashContext<'_>) -> Result<(), ProbeError> {
    let exceedings = ctx.decode_limit_exceedings();
    if exceedings.is_empty() {
        return Ok(());
    }
    for (bus, max) in &exceedings {
        log::info!(
            "Chip size {} kB is bigger than supported size {} kB of chipset/board/programmer for {} interface!",
            ctx.chip_size() / 1024,
            max / 1024,
            bus
        );
    }
    if ctx.flag(Flag::Force) {
        log::warn!("Proceeding anyway because user forced us to.");
        Ok(())
    } else {
        Err(ProbeError::ChipTooBig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::BusType;
    use crate::testing::{chip_named, test_chip, MemoryMaster};

    fn db() -> ChipDatabase {
        ChipDatabase::from_chips(vec![
            chip_named("A25", 0xC2, 0x2017, 0x10000),
            test_chip(),
            chip_named("B25", 0xC2, 0x2017, 0x10000),
            chip_named("C25", 0x01, 0x0001, 0x20000),
        ])
    }

    fn masters(list: Vec<MemoryMaster>) -> Vec<Box<dyn ProgrammerMaster>> {
        list.into_iter()
            .map(|m| Box::new(m) as Box<dyn ProgrammerMaster>)
            .collect()
    }

    #[test]
    fn test_single_match() {
        let mut masters = masters(vec![MemoryMaster::absent(), MemoryMaster::new(test_chip(), 0xFF)]);
        match probe_all(&mut masters, &db(), None).unwrap() {
            ProbeOutcome::Found(ctx) => {
                assert_eq!(ctx.chip().name, "TEST25Q05");
                assert!(!ctx.is_forced());
                assert!(ctx.layout().is_none());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_nothing_found() {
        let mut masters = masters(vec![MemoryMaster::absent()]);
        assert!(matches!(
            probe_all(&mut masters, &db(), None).unwrap(),
            ProbeOutcome::NotFound
        ));
    }

    #[test]
    fn test_filter_matching_no_definition_is_absent() {
        let mut masters = masters(vec![MemoryMaster::new(test_chip(), 0xFF)]);
        assert!(matches!(
            probe_all(&mut masters, &db(), Some("NOPE")).unwrap(),
            ProbeOutcome::NotFound
        ));
    }

    #[test]
    fn test_ambiguous_in_discovery_order() {
        let mut master = MemoryMaster::new(test_chip(), 0xFF);
        master.id = Some((0xC2, 0x2017));
        let mut masters = masters(vec![master]);

        match probe_all(&mut masters, &db(), None).unwrap() {
            ProbeOutcome::Ambiguous(names) => assert_eq!(names, vec!["A25", "B25"]),
            other => panic!("unexpected outcome {:?}", other),
        }

        match probe_all(&mut masters, &db(), Some("B25")).unwrap() {
            ProbeOutcome::Found(ctx) => assert_eq!(ctx.chip().name, "B25"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_same_chip_on_two_masters_is_ambiguous() {
        let mut masters = masters(vec![
            MemoryMaster::new(test_chip(), 0xFF),
            MemoryMaster::new(test_chip(), 0xFF),
        ]);
        match probe_all(&mut masters, &db(), None).unwrap() {
            ProbeOutcome::Ambiguous(names) => assert_eq!(names, vec!["TEST25Q05"]),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_internal_error_is_distinct() {
        let mut failing = MemoryMaster::new(test_chip(), 0xFF);
        failing.probe_error = true;
        let mut masters = masters(vec![failing]);
        assert!(matches!(
            probe_all(&mut masters, &db(), None),
            Err(ProbeError::Internal { .. })
        ));
    }

    #[test]
    fn test_bus_mismatch_skipped() {
        let mut lpc = MemoryMaster::new(test_chip(), 0xFF);
        lpc.buses = BusType::LPC;
        let mut masters = masters(vec![lpc]);
        assert!(matches!(
            probe_all(&mut masters, &db(), None).unwrap(),
            ProbeOutcome::NotFound
        ));
    }

    #[test]
    fn test_find_matches_then_force() {
        let mut masters = masters(vec![MemoryMaster::absent()]);
        let db = db();
        let matches = find_matches(&mut masters, &db, Some("C25")).unwrap();
        assert!(matches.is_empty());
        assert!(matches!(resolve(&mut masters, &db, &matches), ProbeOutcome::NotFound));

        let ctx = force_probe(&mut masters, &db, "C25").unwrap();
        assert!(ctx.is_forced());
    }

    #[test]
    fn test_force_probe() {
        let mut lpc = MemoryMaster::absent();
        lpc.buses = BusType::LPC;
        let mut masters = masters(vec![lpc, MemoryMaster::absent(), MemoryMaster::absent()]);

        let ctx = force_probe(&mut masters, &db(), "C25").unwrap();
        assert!(ctx.is_forced());
        assert!(ctx.flag(Flag::Force));
        assert_eq!(ctx.chip().name, "C25");
        assert_eq!(ctx.master_name(), "memory");
    }

    #[test]
    fn test_force_probe_errors() {
        let mut lpc = MemoryMaster::absent();
        lpc.buses = BusType::LPC;
        let mut masters = masters(vec![lpc]);

        assert!(matches!(
            force_probe(&mut masters, &db(), "C25"),
            Err(ProbeError::NoCompatibleMaster)
        ));
        assert!(matches!(
            force_probe(&mut masters, &db(), "missing"),
            Err(ProbeError::UnknownChip(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_decode_limits() {
        let mut master = MemoryMaster::new(test_chip(), 0xFF);
        master.max_decode = Some(0x8000);
        let mut ctx = FlashContext::new(&mut master, test_chip());

        assert!(matches!(check_decode_limits(&ctx), Err(ProbeError::ChipTooBig)));
        ctx.set_flag(Flag::Force, true);
        assert!(check_decode_limits(&ctx).is_ok());
    }
}
