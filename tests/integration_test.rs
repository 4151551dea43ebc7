use pokesave::checksum;
use pokesave::image::{ImageError, SaveImage, SessionState};
use pokesave::layout::{gold_silver, Chunk, FieldKind, Layout};
use pokesave::store::{FileStore, MemoryStore, SaveStore};
use pokesave::value::{Badges, FieldValue, PlayTime, NAME_MAX_CHARS};
use pokesave::{charmap, CharsetError};
use proptest::prelude::*;
use tempfile::NamedTempFile;

fn blank_save() -> Vec<u8> {
    vec![0u8; gold_silver::IMAGE_SIZE]
}

fn noisy_save(seed: u8) -> Vec<u8> {
    (0..gold_silver::IMAGE_SIZE)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

#[test]
fn test_checksum_scenario_front_destination() {
    let mut l = Layout::new();
    l.declare_checksum("sum", 0x00, &[Chunk::new(0x10, 0x12)]).unwrap();
    let mut bytes = vec![0u8; 0x20];
    bytes[0x10] = 0x01;
    bytes[0x11] = 0x02;
    let mut img = SaveImage::load(bytes, l).unwrap();
    let out = img.validate().unwrap();
    assert_eq!(&out[0x00..0x02], &[0x03, 0x00]);
}

#[test]
fn test_encode_ab1() {
    let bytes = charmap::encode("AB1").unwrap();
    assert_eq!(bytes, vec![0x80, 0x81, 0xF7]);
    assert_eq!(charmap::decode(&bytes), "AB1");
}

#[test]
fn test_standard_checksums_match_manual_sum() {
    let bytes = noisy_save(7);
    let mut img = SaveImage::load(bytes.clone(), gold_silver::layout().unwrap()).unwrap();
    img.validate().unwrap();
    let out = img.as_bytes();

    let primary: u64 = bytes[0x2009..0x2D68].iter().map(|&b| b as u64).sum();
    let secondary: u64 = [0x0C6Busize..0x17EC, 0x3D96..0x3F3F, 0x7E39..0x7E6C]
        .into_iter()
        .flat_map(|r| bytes[r].iter().map(|&b| b as u64).collect::<Vec<_>>())
        .sum();

    assert_eq!(out[0x2D69], (primary & 0xFF) as u8);
    assert_eq!(out[0x2D6A], ((primary >> 8) & 0xFF) as u8);
    assert_eq!(out[0x7E6D], (secondary & 0xFF) as u8);
    assert_eq!(out[0x7E6E], ((secondary >> 8) & 0xFF) as u8);
    assert!(img.verify().unwrap().is_consistent());
}

#[test]
fn test_truncated_save_rejected() {
    let short = vec![0u8; gold_silver::SECONDARY_CHECKSUM + 1];
    match SaveImage::load(short, gold_silver::layout().unwrap()) {
        Err(ImageError::TruncatedImage { required, actual }) => {
            assert_eq!(required, gold_silver::SECONDARY_CHECKSUM + 2);
            assert_eq!(actual, gold_silver::SECONDARY_CHECKSUM + 1);
        }
        other => panic!("expected TruncatedImage, got {other:?}"),
    }
}

#[test]
fn test_stale_checksum_gate() {
    let mut img = SaveImage::load(blank_save(), gold_silver::layout().unwrap()).unwrap();
    img.write_value("money", &FieldValue::Money(3000)).unwrap();
    img.validate().unwrap();
    img.write_name("player_name", "GOLD").unwrap();
    assert!(matches!(img.export(), Err(ImageError::StaleChecksum)));
    assert_eq!(img.state(), SessionState::Edited);
    img.validate().unwrap();
    assert!(img.export().is_ok());
}

#[test]
fn test_edit_session_through_memory_store() {
    let mut store = MemoryStore::new(noisy_save(1));
    let mut img = SaveImage::load(store.load().unwrap(), gold_silver::layout().unwrap()).unwrap();
    assert!(!img.verify().unwrap().is_consistent());

    img.write_name("player_name", "Hiro").unwrap();
    img.write_name("rival_name", "SILVER").unwrap();
    img.write_value("money", &FieldValue::Money(999_999)).unwrap();
    img.write_value("johto_badges", &FieldValue::Badges(Badges(Badges::ZEPHYR | Badges::HIVE))).unwrap();
    img.write_value("time_played", &FieldValue::PlayTime(PlayTime::parse("27:03:15").unwrap())).unwrap();
    img.validate().unwrap();
    store.persist(&img.export().unwrap()).unwrap();
    assert_eq!(store.persists, 1);

    let reopened = SaveImage::load(store.load().unwrap(), gold_silver::layout().unwrap()).unwrap();
    assert!(reopened.verify().unwrap().is_consistent());
    assert_eq!(reopened.read_name("player_name").unwrap(), "Hiro");
    assert_eq!(reopened.read_name("rival_name").unwrap(), "SILVER");
    assert_eq!(reopened.read_value("money").unwrap(), FieldValue::Money(999_999));
    assert_eq!(reopened.read_value("time_played").unwrap().to_string(), "27:03:15.00");
    assert_eq!(reopened.read_field("johto_badges").unwrap(), &[0xC0]);
}

#[test]
fn test_name_too_long_is_reported() {
    let mut img = SaveImage::load(blank_save(), gold_silver::layout().unwrap()).unwrap();
    let err = img.write_name("player_name", "ABCDEFGHIJKL").unwrap_err();
    match err {
        ImageError::Charset(CharsetError::TextTooLong { needed, capacity, truncated }) => {
            assert_eq!((needed, capacity), (13, NAME_MAX_CHARS + 1));
            assert_eq!(charmap::decode(&truncated), "ABCDEFG");
        }
        other => panic!("expected TextTooLong, got {other:?}"),
    }
    assert_eq!(img.state(), SessionState::Loaded);
}

#[test]
fn test_rival_name_suffix_survives_rename() {
    let mut bytes = blank_save();
    let rival = gold_silver::layout().unwrap().resolve("rival_name").unwrap().address;
    bytes[rival + 7..rival + 11].copy_from_slice(&[0x50, 0x86, 0x91, 0x84]);
    let mut img = SaveImage::load(bytes, gold_silver::layout().unwrap()).unwrap();

    img.write_name("rival_name", "BLUE").unwrap();
    assert_eq!(
        img.read_field("rival_name").unwrap(),
        &[0x81, 0x8B, 0x94, 0x84, 0x50, 0x00, 0x00, 0x00, 0x86, 0x91, 0x84]
    );
    assert!(img.write_name("player_name", "ABCDEFGHIJ").is_err());
    img.write_name("player_name", "ABCDEFG").unwrap();
    assert_eq!(img.read_name("player_name").unwrap(), "ABCDEFG");
}

#[test]
fn test_box_names_edit_one_slot() {
    let mut img = SaveImage::load(blank_save(), gold_silver::layout().unwrap()).unwrap();
    let labels: Vec<String> = (1..=14).map(|i| format!("BOX{i}")).collect();
    img.write_value("pc_box_names", &FieldValue::TextList(labels.clone())).unwrap();
    assert_eq!(img.read_value("pc_box_names").unwrap(), FieldValue::TextList(labels.clone()));

    let before = img.read_field("pc_box_names").unwrap().to_vec();
    img.write_slot("pc_box_names", 4, "MYBOX").unwrap();
    let after = img.read_field("pc_box_names").unwrap();
    let w = gold_silver::BOX_NAME_SIZE;
    for slot in (0..14).filter(|&s| s != 4) {
        assert_eq!(&after[slot * w..(slot + 1) * w], &before[slot * w..(slot + 1) * w]);
    }
    let FieldValue::TextList(read) = img.read_value("pc_box_names").unwrap() else {
        panic!("pc_box_names should decode as a text list");
    };
    assert_eq!(read.len(), 14);
    assert_eq!(read[4], "MYBOX");
    assert_eq!(read[13], "BOX14");

    // A single parsed name rewrites slot 1 only.
    let one = FieldValue::parse(FieldKind::TextSlots(w), "HOME").unwrap();
    img.write_value("pc_box_names", &one).unwrap();
    let FieldValue::TextList(read) = img.read_value("pc_box_names").unwrap() else {
        panic!("pc_box_names should decode as a text list");
    };
    assert_eq!(read[0], "HOME");
    assert_eq!(read[1], "BOX2");
}

#[test]
fn test_overflowing_json_layout_rejected() {
    let json = r#"{"fields":[{"name":"x","address":18446744073709551615,"size":2,"kind":"opaque"}],"checksums":[]}"#;
    assert!(Layout::from_json(json).is_err());
}

#[test]
fn test_file_store_persist_with_backup() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_path_buf();
    let original = noisy_save(3);
    std::fs::write(&path, &original).unwrap();

    let mut store = FileStore::new(&path).backup(true);
    let mut img = SaveImage::load(store.load().unwrap(), gold_silver::layout().unwrap()).unwrap();
    img.write_name("rival_name", "Blue").unwrap();
    img.validate().unwrap();
    store.persist(&img.export().unwrap()).unwrap();

    let backup = std::fs::read(store.backup_path()).unwrap();
    assert_eq!(backup, original);
    let written = std::fs::read(&path).unwrap();
    assert_eq!(written.len(), original.len());
    let reopened = SaveImage::load(written, gold_silver::layout().unwrap()).unwrap();
    assert_eq!(reopened.read_name("rival_name").unwrap(), "Blue");
    assert!(reopened.verify().unwrap().is_consistent());
    std::fs::remove_file(store.backup_path()).unwrap();
}

#[test]
fn test_file_store_separate_output() {
    let input = NamedTempFile::new().unwrap();
    let output = NamedTempFile::new().unwrap();
    std::fs::write(input.path(), blank_save()).unwrap();

    let mut store = FileStore::new(input.path()).output(output.path());
    let mut img = SaveImage::load(store.load().unwrap(), gold_silver::layout().unwrap()).unwrap();
    img.validate().unwrap();
    store.persist(&img.export().unwrap()).unwrap();

    assert_eq!(std::fs::read(input.path()).unwrap(), blank_save());
    assert_eq!(std::fs::read(output.path()).unwrap().len(), gold_silver::IMAGE_SIZE);
}

#[test]
fn test_custom_layout_from_json() {
    let json = r#"{
        "fields": [
            { "name": "hero",  "address": 2, "size": 6, "kind": "name" },
            { "name": "coins", "address": 8, "size": 2, "kind": "number" }
        ],
        "checksums": [
            { "name": "sum", "address": 0, "chunks": [ { "start": 2, "end": 10 } ] }
        ]
    }"#;
    let layout = Layout::from_json(json).unwrap();
    assert_eq!(layout.name_at(2), Some("sum"));
    let mut img = SaveImage::load(vec![0u8; 10], layout).unwrap();
    img.write_value("coins", &FieldValue::Number(0x0102)).unwrap();
    img.validate().unwrap();
    assert_eq!(&img.as_bytes()[0..2], &[0x03, 0x00]);
}

#[test]
fn test_loaded_fields_skip_checksums() {
    let img = SaveImage::load(noisy_save(9), gold_silver::layout().unwrap()).unwrap();
    let fields = img.fields();
    assert_eq!(fields.len(), img.layout().len() - 2);
    assert!(fields.get("checksum_primary").is_none());
    assert_eq!(fields.get("money").unwrap(), img.read_field("money").unwrap());
}

// ── properties ───────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_alphanumeric_round_trip(text in "[A-Za-z0-9]{0,32}") {
        let bytes = charmap::encode(&text).unwrap();
        prop_assert_eq!(charmap::decode(&bytes), text);
    }

    #[test]
    fn prop_validate_is_idempotent(seed in any::<u8>(), poke in any::<(u16, u8)>()) {
        let mut bytes = noisy_save(seed);
        let at = poke.0 as usize % bytes.len();
        bytes[at] = poke.1;
        let mut img = SaveImage::load(bytes, gold_silver::layout().unwrap()).unwrap();
        let once = img.validate().unwrap().to_vec();
        let twice = img.validate().unwrap().to_vec();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_write_touches_only_its_field(index in 0usize..34, fill in any::<u8>()) {
        let layout = gold_silver::layout().unwrap();
        let target = layout.fields()[index].clone();
        let before = noisy_save(fill);
        let mut img = SaveImage::load(before.clone(), layout).unwrap();
        img.write_field(&target.name, &vec![fill ^ 0xA5; target.size]).unwrap();
        let after = img.as_bytes();
        for (i, (a, b)) in before.iter().zip(after).enumerate() {
            if !target.range().contains(&i) {
                prop_assert_eq!(a, b, "byte 0x{:04x} changed outside {}", i, target.name);
            }
        }
    }

    #[test]
    fn prop_checksum_is_low_16_bits(data in proptest::collection::vec(any::<u8>(), 2..600)) {
        let chunks = [Chunk::new(2, data.len())];
        let expected: u64 = data[2..].iter().map(|&b| b as u64).sum();
        prop_assert_eq!(checksum::compute(&data, &chunks).unwrap() as u64, expected & 0xFFFF);
    }
}

#[test]
fn test_standard_layout_field_count() {
    let layout = gold_silver::layout().unwrap();
    assert_eq!(layout.len(), 36);
    assert_eq!(layout.fields().iter().filter(|f| f.kind == FieldKind::Checksum).count(), 2);
}
