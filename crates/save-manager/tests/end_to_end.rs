use std::fs;

use memcard::{CardKind, HostCard, MemcardIo, MemoryCard};
use ps2_filetypes::{
    lzari, CBSWriter, DirectoryEntry, EntryName, McDateTime, PSUWriter, PSVWriter, SaveArchive,
    ICON_SYS_FILE, MAX_MAGIC, PSU, TEXEL_COUNT, XPS_ENTRY_SIZE, XPS_MAGIC,
};
use save_manager::{
    bulk_export, export_cbs, export_psu, export_psv, import_any, load_icon, probe, read_archive,
    Error, NoProgress, SaveFormat, Settings,
};
use tempfile::tempdir;

fn timestamp() -> McDateTime {
    McDateTime {
        sec: 30,
        min: 12,
        hour: 9,
        day: 24,
        month: 12,
        year: 2004,
        ..Default::default()
    }
}

fn icon_sys(icon: &str) -> Vec<u8> {
    let mut data = vec![0u8; 964];
    data[..4].copy_from_slice(b"PS2D");
    data[0xC0..0xC9].copy_from_slice(b"Test Game");
    for offset in [0x104, 0x144, 0x184] {
        data[offset..offset + icon.len()].copy_from_slice(icon.as_bytes());
    }
    data
}

/// Uncompressed icon with no geometry and a solid texture.
fn icon(texel: u16) -> Vec<u8> {
    let mut data = Vec::new();
    for field in [0x010000u32, 1, 7, 0, 0] {
        data.extend_from_slice(&field.to_le_bytes());
    }
    data.extend_from_slice(&[0u8; 20]);
    for _ in 0..TEXEL_COUNT {
        data.extend_from_slice(&texel.to_le_bytes());
    }
    data
}

fn sample_archive() -> SaveArchive {
    let time = timestamp();
    let mut archive = SaveArchive::new(DirectoryEntry::directory("BASLUS-21050SAVE", time));
    archive.push_file(
        DirectoryEntry::file(ICON_SYS_FILE, 0, time),
        icon_sys("view.ico"),
    );
    archive.push_file(DirectoryEntry::file("view.ico", 0, time), icon(0x7C1F));
    archive.push_file(
        DirectoryEntry::file("SAVEDATA", 0, time),
        (0..5000u32).map(|i| (i * 7 % 251) as u8).collect(),
    );
    archive
}

#[test]
fn psu_import_then_export_is_byte_identical() {
    let tempdir = tempdir().expect("temp dir");
    let source = tempdir.path().join("in.psu");
    let original = PSUWriter::new(sample_archive()).to_bytes();
    fs::write(&source, &original).expect("write psu");

    let card_root = tempdir.path().join("card");
    fs::create_dir_all(&card_root).expect("card dir");
    let mut card = HostCard::new(&card_root, CardKind::Ps2);
    let report = import_any(&source, &mut card, Settings::default().psu_min_size, &mut NoProgress)
        .expect("import psu");
    assert_eq!(report.written, 3);
    assert!(report.is_complete());

    // A fresh handle only sees what the host directory and sidecar hold.
    let card = HostCard::new(&card_root, CardKind::Ps2);
    let exported = tempdir.path().join("out.psu");
    export_psu(&card, "BASLUS-21050SAVE", &exported, &mut NoProgress).expect("export psu");
    assert_eq!(fs::read(&exported).expect("read export"), original);
}

#[test]
fn import_then_export_minimal_psu() {
    let tempdir = tempdir().expect("temp dir");
    let mut archive = SaveArchive::new(DirectoryEntry::directory("TESTDIR", timestamp()));
    archive.push_file(DirectoryEntry::file("DATA", 0, timestamp()), b"0123456789".to_vec());
    let original = PSUWriter::new(archive).to_bytes();
    let source = tempdir.path().join("TESTDIR.psu");
    fs::write(&source, &original).expect("write psu");

    let mut card = MemoryCard::new(CardKind::Ps2);
    let report = import_any(&source, &mut card, Settings::default().psu_min_size, &mut NoProgress)
        .expect("import psu");
    assert_eq!((report.dir_name.as_str(), report.written), ("TESTDIR", 1));

    let exported = tempdir.path().join("out.psu");
    export_psu(&card, "TESTDIR", &exported, &mut NoProgress).expect("export psu");
    let bytes = fs::read(&exported).expect("read export");
    let psu = PSU::new(&bytes).expect("parse export");
    assert_eq!(psu.archive.name(), "TESTDIR");
    assert_eq!(psu.archive.directory.length, 3);
    assert_eq!(psu.archive.files.len(), 1);
    assert_eq!(psu.archive.files[0].entry.name.as_str(), "DATA");
    assert_eq!(psu.archive.files[0].data, b"0123456789");
    assert_eq!(bytes, original);
}

#[test]
fn cbs_and_psv_survive_export_then_import() {
    let tempdir = tempdir().expect("temp dir");
    let mut card = MemoryCard::new(CardKind::Ps2);
    save_manager::write_archive(&mut card, &sample_archive(), &mut NoProgress).expect("seed card");
    let settings = Settings::default();

    let cbs = tempdir.path().join("save.cbs");
    export_cbs(&card, "BASLUS-21050SAVE", &cbs, &settings, &mut NoProgress).expect("export cbs");
    let psv = export_psv(&card, "BASLUS-21050SAVE", tempdir.path(), &settings, &mut NoProgress)
        .expect("export psv");

    for (path, format) in [(cbs, SaveFormat::Cbs), (psv, SaveFormat::Psv)] {
        assert_eq!(probe(&path, settings.psu_min_size).unwrap(), Some(format));

        let mut target = MemoryCard::new(CardKind::Ps2);
        import_any(&path, &mut target, settings.psu_min_size, &mut NoProgress)
            .unwrap_or_else(|err| panic!("import {format}: {err}"));
        let back = read_archive(&target, "BASLUS-21050SAVE", &mut NoProgress).unwrap();
        let expected = sample_archive();
        assert_eq!(back.files.len(), expected.files.len(), "{format}");
        for (got, want) in back.files.iter().zip(&expected.files) {
            assert_eq!(got.entry.name, want.entry.name, "{format}");
            assert_eq!(got.data, want.data, "{format}");
        }
        assert_eq!(back.directory.created, timestamp(), "{format}");
    }
}

fn max_file(dir: &str, files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut payload = Vec::new();
    for (name, contents) in files {
        payload.extend_from_slice(&(contents.len() as u32).to_le_bytes());
        payload.extend_from_slice(&EntryName::new(name).0);
        payload.extend_from_slice(contents);
        let aligned = (payload.len() + 8).next_multiple_of(16) - 8;
        payload.resize(aligned, 0);
    }

    let stream = lzari::compress(&payload);
    let mut data = MAX_MAGIC.to_vec();
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&EntryName::new(dir).0);
    data.extend_from_slice(&EntryName::new(ICON_SYS_FILE).0);
    data.extend_from_slice(&(stream.len() as u32).to_le_bytes());
    data.extend_from_slice(&(files.len() as u32).to_le_bytes());
    data.extend_from_slice(&stream);
    data
}

fn xps_entry(name: &str, length: u32, mode: u16) -> Vec<u8> {
    let mut entry = vec![0u8; XPS_ENTRY_SIZE];
    entry[..2].copy_from_slice(&(XPS_ENTRY_SIZE as u16).to_le_bytes());
    entry[2..2 + name.len()].copy_from_slice(name.as_bytes());
    entry[66..70].copy_from_slice(&length.to_le_bytes());
    entry[78..80].copy_from_slice(&mode.to_be_bytes());
    entry
}

fn xps_file(dir: &str, files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut data = vec![0u8; 0x15];
    data[4..20].copy_from_slice(XPS_MAGIC);
    for blob in [&b"Game"[..], &b"Notes"[..]] {
        data.extend_from_slice(&(blob.len() as u32).to_le_bytes());
        data.extend_from_slice(blob);
    }
    data.extend_from_slice(&[0u8; 8]);
    data.extend_from_slice(&xps_entry(dir, files.len() as u32 + 2, ps2_filetypes::DIR_ID));
    for (name, contents) in files {
        data.extend_from_slice(&xps_entry(name, contents.len() as u32, ps2_filetypes::FILE_ID));
        data.extend_from_slice(contents);
    }
    data
}

#[test]
fn import_only_formats_land_on_the_card() {
    let tempdir = tempdir().expect("temp dir");
    let icon_sys = icon_sys("view.ico");
    let files = [(ICON_SYS_FILE, &icon_sys[..]), ("SLOT0", &b"max or xps"[..])];

    let max = tempdir.path().join("save.max");
    fs::write(&max, max_file("BESLES-50001", &files)).expect("write max");
    let xps = tempdir.path().join("save.xps");
    fs::write(&xps, xps_file("BESLES-50002", &files)).expect("write xps");

    let mut card = MemoryCard::new(CardKind::Ps2);
    for path in [&max, &xps] {
        import_any(path, &mut card, Settings::default().psu_min_size, &mut NoProgress)
            .unwrap_or_else(|err| panic!("import {}: {err}", path.display()));
    }

    for dir in ["BESLES-50001", "BESLES-50002"] {
        assert_eq!(card.read_file(&format!("{dir}/SLOT0")).unwrap(), b"max or xps");
        assert_eq!(card.read_file(&format!("{dir}/{ICON_SYS_FILE}")).unwrap(), icon_sys);
    }
    assert_eq!(
        card.list_saves()
            .unwrap()
            .iter()
            .map(|entry| entry.name.as_str().into_owned())
            .collect::<Vec<_>>(),
        ["BESLES-50001", "BESLES-50002"]
    );
}

#[test]
fn unknown_files_are_reported() {
    let tempdir = tempdir().expect("temp dir");
    let junk = tempdir.path().join("notes.txt");
    fs::write(&junk, b"shopping list").expect("write junk");

    let mut card = MemoryCard::new(CardKind::Ps2);
    let err = import_any(&junk, &mut card, Settings::default().psu_min_size, &mut NoProgress)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownFormat(path) if path == junk));
}

#[test]
fn bulk_export_to_every_writable_format() {
    let tempdir = tempdir().expect("temp dir");
    let mut card = MemoryCard::new(CardKind::Ps2);
    save_manager::write_archive(&mut card, &sample_archive(), &mut NoProgress).expect("seed card");
    let settings = Settings {
        timestamp: chrono::NaiveDate::from_ymd_opt(2025, 1, 2)
            .and_then(|date| date.and_hms_opt(3, 4, 5)),
        ..Default::default()
    };
    let dirs = vec!["BASLUS-21050SAVE".to_string()];

    for format in [SaveFormat::Psu, SaveFormat::Cbs, SaveFormat::Psv] {
        let report = bulk_export(
            &card,
            &dirs,
            format,
            Some(tempdir.path()),
            &settings,
            &mut NoProgress,
        )
        .expect("bulk export");
        assert_eq!((report.done, report.errors), (1, 0), "{format}");
    }

    let psu = fs::read(tempdir.path().join("SLUS21050_2025-01-02_030405.psu")).expect("psu");
    assert_eq!(PSU::new(&psu).unwrap().archive.files.len(), 3);
    assert!(tempdir.path().join("SLUS21050_2025-01-02_030405.cbs").exists());
    assert!(tempdir.path().join("BASLUS-2105053415645.PSV").exists());
}

#[test]
fn icon_is_decoded_from_icon_sys() {
    let mut card = MemoryCard::new(CardKind::Ps2);
    save_manager::write_archive(&mut card, &sample_archive(), &mut NoProgress).expect("seed card");

    let image = load_icon(&card, "BASLUS-21050SAVE")
        .expect("load icon")
        .expect("icon decodes");
    assert_eq!((image.width, image.height), (128, 128));
    assert_eq!(image.rgba.len(), TEXEL_COUNT * 4);
    // 0x7C1F: red and blue at full intensity.
    assert_eq!(&image.rgba[..4], &[0xF8, 0x00, 0xF8, 0xFF]);

    let mut broken = sample_archive();
    broken.files[1].data.truncate(100);
    let mut card = MemoryCard::new(CardKind::Ps2);
    save_manager::write_archive(&mut card, &broken, &mut NoProgress).expect("seed card");
    assert_eq!(load_icon(&card, "BASLUS-21050SAVE").unwrap(), None);

    let mut bare = SaveArchive::new(DirectoryEntry::directory("BARE", timestamp()));
    bare.push_file(DirectoryEntry::file("DATA", 0, timestamp()), vec![0]);
    save_manager::write_archive(&mut card, &bare, &mut NoProgress).expect("seed card");
    assert!(matches!(
        load_icon(&card, "BARE"),
        Err(Error::MissingIconSys(_))
    ));
}

#[test]
fn psv_writer_output_matches_card_export() {
    let tempdir = tempdir().expect("temp dir");
    let mut card = MemoryCard::new(CardKind::Ps2);
    save_manager::write_archive(&mut card, &sample_archive(), &mut NoProgress).expect("seed card");

    let path = export_psv(
        &card,
        "BASLUS-21050SAVE",
        tempdir.path(),
        &Settings::default(),
        &mut NoProgress,
    )
    .expect("export psv");
    let direct = PSVWriter::ps2(sample_archive()).to_bytes().unwrap();
    assert_eq!(fs::read(path).unwrap(), direct);

    let cbs = CBSWriter::new(sample_archive(), "Test Game").to_bytes().unwrap();
    let exported = tempdir.path().join("direct.cbs");
    export_cbs(&card, "BASLUS-21050SAVE", &exported, &Settings::default(), &mut NoProgress)
        .expect("export cbs");
    assert_eq!(fs::read(exported).unwrap(), cbs);
}
