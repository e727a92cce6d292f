//! Opening programmers and binding the chip for a hardware command

use crate::cli::TargetArgs;
use crate::progress::ProgressBars;
use romflash_core::chip::ChipDatabase;
use romflash_core::flash::{Flag, FlashContext};
use romflash_core::probe::{self, ProbeOutcome};
use romflash_core::programmer::ProgrammerMaster;
use std::error::Error;

/// Open every programmer given with `-p`, in order
pub fn open_masters(
    target: &TargetArgs,
    db: &ChipDatabase,
) -> Result<Vec<Box<dyn ProgrammerMaster>>, Box<dyn Error>> {
    let mut masters = Vec::with_capacity(target.programmer.len());
    for programmer in &target.programmer {
        let master = romflash_registry::open_master(programmer, db)?;
        log::debug!("Opened programmer {}", master.name());
        masters.push(master);
    }
    Ok(masters)
}

/// Probe the masters and prepare the context for an operation
///
/// `force_read` allows binding the chip named with `-c` without a
/// signature match when `-f` is given; only reads may use that.
pub fn bind<'m>(
    masters: &'m mut [Box<dyn ProgrammerMaster>],
    db: &ChipDatabase,
    target: &TargetArgs,
    force_read: bool,
) -> Result<FlashContext<'m>, Box<dyn Error>> {
    let filter = target.chip.as_deref();
    if let Some(name) = filter {
        probe::lookup_chip(db, name)?;
    }

    let matches = probe::find_matches(masters, db, filter)?;
    let forced = filter.filter(|_| matches.is_empty() && force_read && target.force);

    let mut ctx = match forced {
        Some(name) => probe::force_probe(masters, db, name)?,
        None => match probe::resolve(masters, db, &matches) {
            ProbeOutcome::Found(ctx) => ctx,
            ProbeOutcome::NotFound => {
                if !(filter.is_some() && target.force) {
                    log::info!(
                        "Note: romflash can never write if the flash chip isn't found automatically."
                    );
                }
                return Err("No EEPROM/flash device found.".into());
            }
            ProbeOutcome::Ambiguous(names) => {
                return Err(ambiguity_message(&names).into());
            }
        },
    };

    if target.force {
        ctx.set_flag(Flag::Force, true);
    }
    probe::check_decode_limits(&ctx)?;

    if let Some(ratio) = target.sacrifice_ratio {
        ctx.set_sacrifice_ratio(ratio);
    }
    if target.progress {
        ctx.set_progress_sink(Box::new(ProgressBars::new()));
    }
    Ok(ctx)
}

/// Error text for a probe that matched more than once
///
/// A single name means the same chip answered on several programmers;
/// `-c` cannot resolve that.
fn ambiguity_message(names: &[String]) -> String {
    if let [name] = names {
        return format!(
            "Flash chip \"{}\" was found on more than one programmer.\n\
             Please specify a single programmer with the -p option.",
            name
        );
    }
    let quoted: Vec<String> = names.iter().map(|n| format!("\"{}\"", n)).collect();
    format!(
        "Multiple flash chip definitions match the detected chip(s): {}\n\
         Please specify which chip definition to use with the -c <chipname> option.",
        quoted.join(", ")
    )
}
