//! End-to-end runs of probing, layouts, image transactions and write
//! protection against the emulator

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use romflash_core::chip::{BusType, ChipDatabase, ChipTestStatus, Features, FlashChip, WpRegisterLayout, WpScheme};
use romflash_core::error::Error;
use romflash_core::flash::{Flag, FlashContext, ProgressStage};
use romflash_core::image::{self, ImageError};
use romflash_core::layout::fmap::encode_fmap;
use romflash_core::layout::{IncludeArgs, Layout, LayoutError, LayoutSource, Region};
use romflash_core::probe::{self, ProbeError, ProbeOutcome};
use romflash_core::programmer::ProgrammerMaster;
use romflash_core::wp::{self, RangeDecoder, WpError, WpMode, WpRange, WpRequest, WpRequestError, WpTarget};

use crate::{DummyConfig, DummyFlash};

const MIB: u32 = 1024 * 1024;

fn chip(name: &str, model_id: u32, size: u32) -> FlashChip {
    FlashChip {
        vendor: "Winbond".into(),
        name: name.into(),
        bus: BusType::SPI,
        manufacturer_id: 0xEF,
        model_id,
        total_size: size,
        page_size: 256,
        erase_size: 4096,
        features: Features::FAST_READ,
        wp: Some(WpScheme {
            registers: WpRegisterLayout::Winbond,
            decoder: RangeDecoder::Spi25,
        }),
        tested: ChipTestStatus::default(),
    }
}

/// 64 KiB chip
pub(crate) fn small_chip() -> FlashChip {
    chip("W25X05", 0x3010, 0x10000)
}

pub(crate) fn small_config() -> DummyConfig {
    DummyConfig::emulate(&small_chip())
}

fn mib_chip() -> FlashChip {
    chip("W25Q80.V", 0x4014, MIB)
}

struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("romflash-dummy-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn path(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }

    fn write(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, data).unwrap();
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

const MACRONIX: &str = r#"
    (
        vendor: "Macronix",
        manufacturer_id: 0xC2,
        chips: [
            (name: "MX25L8005", device_id: 0x2014, total_size: MiB(1)),
            (name: "MX25L8006E", device_id: 0x2014, total_size: MiB(1)),
            (name: "MX25L1605", device_id: 0x2015, total_size: MiB(2)),
        ],
    )
"#;

fn database() -> ChipDatabase {
    let mut db = ChipDatabase::from_chips(vec![small_chip(), mib_chip()]);
    db.load_ron(MACRONIX).unwrap();
    db
}

fn masters(list: Vec<DummyConfig>) -> Vec<Box<dyn ProgrammerMaster>> {
    list.into_iter()
        .map(|config| Box::new(DummyFlash::new(config)) as Box<dyn ProgrammerMaster>)
        .collect()
}

fn macronix_config() -> DummyConfig {
    DummyConfig {
        manufacturer_id: 0xC2,
        model_id: 0x2014,
        size: MIB,
        wp: None,
        ..DummyConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

#[test]
fn probe_binds_the_single_match() {
    let db = database();
    let mut absent = DummyConfig::emulate(&mib_chip());
    absent.model_id = 0xFFFF;
    absent.name = "absent".into();
    let mut masters = masters(vec![absent, DummyConfig::emulate(&mib_chip())]);

    match probe::probe_all(&mut masters, &db, None).unwrap() {
        ProbeOutcome::Found(ctx) => {
            assert_eq!(ctx.chip().name, "W25Q80.V");
            assert_eq!(ctx.master_name(), "dummy");
            assert_eq!(ctx.chip_size(), MIB);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn probe_reports_ambiguity_and_filter_resolves_it() {
    let db = database();
    let mut masters = masters(vec![macronix_config()]);

    match probe::probe_all(&mut masters, &db, None).unwrap() {
        ProbeOutcome::Ambiguous(names) => {
            assert_eq!(names, vec!["MX25L8005".to_string(), "MX25L8006E".to_string()]);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    probe::lookup_chip(&db, "MX25L8006E").unwrap();
    match probe::probe_all(&mut masters, &db, Some("MX25L8006E")).unwrap() {
        ProbeOutcome::Found(ctx) => assert_eq!(ctx.chip().name, "MX25L8006E"),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn forced_read_of_an_unresponsive_chip() {
    let db = database();
    let mut silent = DummyConfig::emulate(&mib_chip());
    silent.model_id = 0;
    let mut masters = masters(vec![silent]);

    assert!(matches!(
        probe::probe_all(&mut masters, &db, Some("W25Q80.V")).unwrap(),
        ProbeOutcome::NotFound
    ));
    assert!(matches!(
        probe::force_probe(&mut masters, &db, "W25Q81"),
        Err(ProbeError::UnknownChip(_))
    ));

    let tmp = TempDir::new("forced");
    let mut ctx = probe::force_probe(&mut masters, &db, "W25Q80.V").unwrap();
    assert!(ctx.is_forced());
    assert!(ctx.flag(Flag::Force));
    image::read_image(&mut ctx, Some(&tmp.path("dump.bin"))).unwrap();
    assert_eq!(std::fs::read(tmp.path("dump.bin")).unwrap().len(), MIB as usize);
}

#[test]
fn decode_limit_refuses_unless_forced() {
    let mut config = DummyConfig::emulate(&mib_chip());
    config.max_rom_decode = Some(512 * 1024);
    let mut flash = DummyFlash::new(config);
    let mut ctx = FlashContext::new(&mut flash, mib_chip());

    assert_eq!(ctx.decode_limit_exceedings(), vec![(BusType::SPI, 512 * 1024)]);
    assert!(matches!(probe::check_decode_limits(&ctx), Err(ProbeError::ChipTooBig)));
    ctx.set_flag(Flag::Force, true);
    probe::check_decode_limits(&ctx).unwrap();
}

// ---------------------------------------------------------------------------
// Image transactions
// ---------------------------------------------------------------------------

fn layout_file(tmp: &TempDir) -> PathBuf {
    tmp.write(
        "layout.txt",
        b"# start:end name\n00000000:00000fff low\n00001000:00001fff r\n00002000:000fffff rest\n",
    )
}

#[test]
fn region_file_overrides_whole_image_on_write() {
    let tmp = TempDir::new("override");
    let f = tmp.write("f.bin", &vec![0u8; MIB as usize]);
    let g = tmp.write("g.bin", &[0xFFu8; 0x1000]);
    let layout = layout_file(&tmp);

    let mut flash = DummyFlash::new(DummyConfig::emulate(&mib_chip()));
    {
        let mut ctx = FlashContext::new(&mut flash, mib_chip());
        ctx.set_flag(Flag::VerifyAfterWrite, true);
        let includes = IncludeArgs::parse_all(["low".to_string(), format!("r:{}", g.display())]).unwrap();
        LayoutSource::File(layout).bind(&mut ctx, &includes).unwrap();

        image::write_image(&mut ctx, Some(&f), None).unwrap();
        image::verify_image(&mut ctx, Some(&f)).unwrap();
    }

    let data = flash.data();
    assert!(data[..0x1000].iter().all(|&b| b == 0x00));
    assert!(data[0x1000..0x2000].iter().all(|&b| b == 0xFF));
    // "rest" was not included and keeps the erased state.
    assert!(data[0x2000..].iter().all(|&b| b == 0xFF));
}

#[test]
fn write_with_reference_skips_unchanged_blocks() {
    let tmp = TempDir::new("reference");
    let mut image_data = vec![0xFFu8; MIB as usize];
    image_data[0x3000..0x3100].fill(0x42);
    let image_path = tmp.write("new.bin", &image_data);
    let reference = tmp.write("old.bin", &vec![0xFFu8; MIB as usize]);

    let mut flash = DummyFlash::new(DummyConfig::emulate(&mib_chip()));
    {
        let mut ctx = FlashContext::new(&mut flash, mib_chip());
        image::write_image(&mut ctx, Some(&image_path), Some(&reference)).unwrap();
    }
    let stats = flash.stats();
    assert_eq!(stats.skipped_blocks, 255);
    assert_eq!(stats.erased_blocks, 0);
    assert_eq!(flash.data(), &image_data[..]);
}

#[test]
fn overlapping_region_files_abort_before_write() {
    let tmp = TempDir::new("overlap");
    let a = tmp.write("a.bin", &[0u8; 0x2000]);
    let b = tmp.write("b.bin", &[0u8; 0x2000]);
    let layout = tmp.write("layout.txt", b"0:1fff a\n1000:2fff b\n");

    let mut flash = DummyFlash::new(DummyConfig::emulate(&mib_chip()));
    {
        let mut ctx = FlashContext::new(&mut flash, mib_chip());
        let includes = IncludeArgs::parse_all([
            format!("a:{}", a.display()),
            format!("b:{}", b.display()),
        ])
        .unwrap();
        LayoutSource::File(layout).bind(&mut ctx, &includes).unwrap();

        let err = image::write_image(&mut ctx, None, None).unwrap_err();
        assert!(matches!(err, ImageError::Layout(LayoutError::Overlap { .. })));
        assert_eq!(err.to_string(), "Included regions must not overlap when writing.");
    }
    assert_eq!(flash.stats(), Default::default());
}

#[test]
fn include_without_layout_is_rejected() {
    let mut flash = DummyFlash::new(small_config());
    let mut ctx = FlashContext::new(&mut flash, small_chip());
    let includes = IncludeArgs::parse_all(["bios"]).unwrap();
    assert!(matches!(
        LayoutSource::None.bind(&mut ctx, &includes),
        Err(LayoutError::NoLayout(name)) if name == "bios"
    ));
}

#[test]
fn read_reports_progress() {
    let mut flash = DummyFlash::new(small_config());
    let mut ctx = FlashContext::new(&mut flash, small_chip());

    let reports: Rc<RefCell<Vec<(ProgressStage, usize, usize)>>> = Rc::default();
    let sink = Rc::clone(&reports);
    ctx.set_progress_sink(Box::new(move |stage: ProgressStage, current: usize, total: usize| {
        sink.borrow_mut().push((stage, current, total));
    }));

    let mut buf = vec![0u8; 0x10000];
    ctx.image_read(&mut buf).unwrap();

    let reports = reports.borrow();
    assert_eq!(reports.first(), Some(&(ProgressStage::Read, 0, 0x10000)));
    assert_eq!(reports.last(), Some(&(ProgressStage::Read, 0x10000, 0x10000)));
    assert!(reports.windows(2).all(|w| w[0].1 <= w[1].1));
}

#[test]
fn unreadable_range_is_skipped_when_allowed() {
    let mut config = small_config();
    config.locked = vec![(0x2000, 0x2FFF)];
    let mut flash = DummyFlash::with_data(config, &[0x5Au8; 0x10000]);
    let mut ctx = FlashContext::new(&mut flash, small_chip());

    let mut buf = vec![0u8; 0x10000];
    assert_eq!(
        ctx.image_read(&mut buf),
        Err(Error::RegionLocked { start: 0x2000, end: 0x2FFF })
    );

    ctx.set_flag(Flag::SkipUnreadableRegions, true);
    ctx.image_read(&mut buf).unwrap();
    assert!(buf[0x2000..0x3000].iter().all(|&b| b == 0xFF));
    assert!(buf[0x3000..].iter().all(|&b| b == 0x5A));
}

// ---------------------------------------------------------------------------
// fmap layouts
// ---------------------------------------------------------------------------

fn fmap_image(split: u32) -> Vec<u8> {
    let mut layout = Layout::new();
    layout.name = Some("FMAP".into());
    layout.add_region(Region::new("RO SECTION", 0, split - 1));
    layout.add_region(Region::new("RW", split, 0xFFFF));

    let mut image: Vec<u8> = (0..0x10000u32).map(|i| (i >> 8) as u8).collect();
    let fmap = encode_fmap(&layout, 0x10000);
    image[0x4000..0x4000 + fmap.len()].copy_from_slice(&fmap);
    image
}

fn check_extracted(dir: &Path, image: &[u8]) {
    assert_eq!(std::fs::read(dir.join("RO_SECTION")).unwrap(), &image[..0x8000]);
    assert_eq!(std::fs::read(dir.join("RW")).unwrap(), &image[0x8000..]);
}

#[test]
fn extract_regions_from_chip_fmap() {
    let tmp = TempDir::new("extract");
    let image = fmap_image(0x8000);
    let mut flash = DummyFlash::with_data(small_config(), &image);
    let mut ctx = FlashContext::new(&mut flash, small_chip());

    LayoutSource::FmapRom.bind(&mut ctx, &IncludeArgs::new()).unwrap();
    image::extract(&mut ctx, &tmp.0).unwrap();
    check_extracted(&tmp.0, &image);
}

#[test]
fn fmap_verify_requires_matching_layouts() {
    let tmp = TempDir::new("fmap-verify");
    let on_chip = fmap_image(0x8000);
    let same = tmp.write("same.bin", &on_chip);
    let different = tmp.write("different.bin", &fmap_image(0xC000));

    let mut flash = DummyFlash::with_data(small_config(), &on_chip);
    let mut ctx = FlashContext::new(&mut flash, small_chip());

    let source = LayoutSource::FmapVerify { image: different };
    assert!(matches!(
        source.bind(&mut ctx, &IncludeArgs::new()),
        Err(LayoutError::FmapMismatch)
    ));

    let source = LayoutSource::FmapVerify { image: same.clone() };
    let includes = IncludeArgs::parse_all(["RW"]).unwrap();
    source.bind(&mut ctx, &includes).unwrap();
    image::write_image(&mut ctx, Some(&same), None).unwrap();
    image::verify_image(&mut ctx, Some(&same)).unwrap();
}

// ---------------------------------------------------------------------------
// Write protection
// ---------------------------------------------------------------------------

fn wp_run(flash: &mut DummyFlash, request: &WpRequest) -> Result<wp::WpReport, WpRequestError> {
    let mut ctx = FlashContext::new(flash, mib_chip());
    wp::run(&mut ctx, request)
}

#[test]
fn enable_protection_of_lower_eighth() {
    let mut flash = DummyFlash::new(DummyConfig::emulate(&mib_chip()));
    let request = WpRequest {
        target: Some(WpTarget::Range(WpRange::new(0, 0x20000))),
        enable: true,
        print_status: true,
        ..Default::default()
    };

    let report = wp_run(&mut flash, &request).unwrap();
    assert_eq!(
        report.to_string(),
        "Enabled hardware protection\n\
         Activated protection range: start=0x00000000 length=0x00020000 (lower 1/8)\n\
         Protection range: start=0x00000000 length=0x00020000 (lower 1/8)\n\
         Protection mode: hardware\n"
    );

    // The protected blocks refuse programming.
    let image = vec![0u8; MIB as usize];
    let mut ctx = FlashContext::new(&mut flash, mib_chip());
    assert_eq!(ctx.image_write(&image, None), Err(Error::WriteProtected { addr: 0 }));
}

#[test]
fn asserted_pin_blocks_disable() {
    let mut flash = DummyFlash::new(DummyConfig::emulate(&mib_chip()));
    let enable = WpRequest {
        target: Some(WpTarget::Range(WpRange::new(0, 0x20000))),
        enable: true,
        ..Default::default()
    };
    wp_run(&mut flash, &enable).unwrap();
    let registers = flash.status_registers();

    flash.set_wp_pin(true);
    let disable = WpRequest {
        disable: true,
        ..Default::default()
    };
    let err = wp_run(&mut flash, &disable).unwrap_err();
    assert_eq!(
        err,
        WpRequestError::Apply {
            source: WpError::VerifyFailed,
            prior_mode: WpMode::Hardware
        }
    );
    assert!(err.note().unwrap().contains("WP# pin"));
    assert_eq!(flash.status_registers(), registers);

    flash.set_wp_pin(false);
    let report = wp_run(&mut flash, &disable).unwrap();
    assert_eq!(report.to_string(), "Disabled hardware protection\n");
}

#[test]
fn power_cycle_lock_explains_failure() {
    let mut flash = DummyFlash::new(DummyConfig::emulate(&mib_chip()));
    // SRL set, SRP clear
    flash.set_status_registers([0x00, 0x01, 0x00]);

    let request = WpRequest {
        disable: true,
        print_status: true,
        ..Default::default()
    };
    let err = wp_run(&mut flash, &request).unwrap_err();
    assert!(matches!(
        err,
        WpRequestError::Apply {
            source: WpError::VerifyFailed,
            prior_mode: WpMode::PowerCycle
        }
    ));
    assert!(err.to_string().contains("power-off, power-on"));
}

#[test]
fn range_change_on_locked_chips_reports_prior_mode() {
    let request = WpRequest {
        target: Some(WpTarget::Range(WpRange::new(0, 0x20000))),
        ..Default::default()
    };
    let cases = [
        ([0x00, 0x01, 0x00], WpMode::PowerCycle, "power-off, power-on"),
        ([0x80, 0x01, 0x00], WpMode::Permanent, "cannot be modified"),
    ];

    for (registers, mode, hint) in cases {
        let mut flash = DummyFlash::new(DummyConfig::emulate(&mib_chip()));
        flash.set_status_registers(registers);

        let err = wp_run(&mut flash, &request).unwrap_err();
        assert_eq!(
            err,
            WpRequestError::Apply {
                source: WpError::VerifyFailed,
                prior_mode: mode
            }
        );
        assert!(err.to_string().contains(hint), "{}", err);
        assert_eq!(flash.status_registers(), registers);
    }
}

#[test]
fn protect_layout_region_and_list_ranges() {
    let mut flash = DummyFlash::new(DummyConfig::emulate(&mib_chip()));
    let mut layout = Layout::new();
    layout.add_region(Region::new("RO", 0xE0000, 0xFFFFF));

    let request = WpRequest {
        list_ranges: true,
        target: Some(WpTarget::Region("RO".into())),
        print_status: true,
        ..Default::default()
    };
    let report = {
        let mut ctx = FlashContext::new(&mut flash, mib_chip());
        ctx.set_layout(layout);
        wp::run(&mut ctx, &request).unwrap()
    };

    let available = report.available.as_ref().unwrap();
    assert!(available.contains(&WpRange::new(0xE0000, 0x20000)));
    assert!(available.windows(2).all(|w| (w[0].start, w[0].len) < (w[1].start, w[1].len)));
    assert_eq!(report.changes, vec![wp::WpChange::RangeActivated(WpRange::new(0xE0000, 0x20000))]);
    let status = report.status.unwrap();
    assert_eq!(status.mode, WpMode::Disabled);
    assert_eq!(status.range, WpRange::new(0xE0000, 0x20000));
}

#[test]
fn region_target_needs_a_layout() {
    let mut flash = DummyFlash::new(DummyConfig::emulate(&mib_chip()));
    let request = WpRequest {
        target: Some(WpTarget::Region("RO".into())),
        ..Default::default()
    };
    assert_eq!(wp_run(&mut flash, &request), Err(WpRequestError::NoLayout));
    assert_eq!(flash.status_registers(), [0, 0, 0]);
}

#[test]
fn chip_without_protection_reports_unsupported() {
    let mut flash = DummyFlash::new(macronix_config());
    let request = WpRequest {
        print_status: true,
        ..Default::default()
    };
    let mut ctx = FlashContext::new(&mut flash, mib_chip());
    assert_eq!(
        wp::run(&mut ctx, &request),
        Err(WpRequestError::Status(WpError::ChipUnsupported))
    );
}
