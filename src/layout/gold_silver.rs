//! Standard Gold/Silver (international) SRAM layout.
//!
//! These offsets and checksum chunk boundaries are the byte contract with the
//! game; they are shared by the load and validate paths and must not change.

use super::{Chunk, FieldKind, Layout, LayoutError};

/// Size of a full SRAM dump.
pub const IMAGE_SIZE: usize = 0x8000;

pub const OPTIONS_SIZE:     usize = 8;
pub const ID_SIZE:          usize = 2;
pub const NAME_SIZE:        usize = 11;
pub const MONEY_SIZE:       usize = 3;
pub const PLAY_TIME_SIZE:   usize = 4;
pub const POKEDEX_SIZE:     usize = 32;
pub const PARTY_SIZE:       usize = 428;
pub const TM_POCKET_SIZE:   usize = 57;
pub const ITEM_POCKET_SIZE: usize = 42;
pub const KEY_POCKET_SIZE:  usize = 54;
pub const BALL_POCKET_SIZE: usize = 26;
pub const PC_ITEM_SIZE:     usize = 102;
pub const PC_NAME_SIZE:     usize = 126;
/// One PC box label: eight characters and a terminator.
pub const BOX_NAME_SIZE:    usize = 9;
pub const BOX_SIZE:         usize = 1102;

pub const PRIMARY_CHECKSUM:   usize = 0x2D69;
pub const SECONDARY_CHECKSUM: usize = 0x7E6D;

pub const PRIMARY_CHUNKS: [Chunk; 1] = [Chunk::new(0x2009, 0x2D68)];
pub const SECONDARY_CHUNKS: [Chunk; 3] = [
    Chunk::new(0x0C6B, 0x17EC),
    Chunk::new(0x3D96, 0x3F3F),
    Chunk::new(0x7E39, 0x7E6C),
];

/// Stored PC boxes 1..=14.
pub const BOX_ADDRESSES: [usize; 14] = [
    0x4000, 0x4450, 0x48A0, 0x4CF0, 0x5140, 0x5590, 0x59E0,
    0x6000, 0x6450, 0x68A0, 0x6CF0, 0x7140, 0x7590, 0x79E0,
];

const FIELDS: &[(&str, usize, usize, FieldKind)] = &[
    ("options",         0x2000, OPTIONS_SIZE,     FieldKind::Opaque),
    ("trainer_id",      0x2009, ID_SIZE,          FieldKind::Number),
    ("player_name",     0x200B, NAME_SIZE,        FieldKind::Name),
    ("rival_name",      0x2021, NAME_SIZE,        FieldKind::Name),
    ("dst",             0x2037, 1,                FieldKind::Number),
    ("time_played",     0x2053, PLAY_TIME_SIZE,   FieldKind::PlayTime),
    ("player_palette",  0x206B, 1,                FieldKind::Palette),
    ("money",           0x23DB, MONEY_SIZE,       FieldKind::Money),
    ("johto_badges",    0x23E4, 1,                FieldKind::Badges),
    ("tm_pocket",       0x23E6, TM_POCKET_SIZE,   FieldKind::Opaque),
    ("item_pocket",     0x241F, ITEM_POCKET_SIZE, FieldKind::Opaque),
    ("key_item_pocket", 0x2449, KEY_POCKET_SIZE,  FieldKind::Opaque),
    ("ball_pocket",     0x2464, BALL_POCKET_SIZE, FieldKind::Opaque),
    ("pc_items",        0x247E, PC_ITEM_SIZE,     FieldKind::Opaque),
    ("pc_box_current",  0x2724, 1,                FieldKind::Number),
    ("pc_box_names",    0x2727, PC_NAME_SIZE,     FieldKind::TextSlots(BOX_NAME_SIZE)),
    ("pokemon_party",   0x288A, PARTY_SIZE,       FieldKind::Opaque),
    ("pokedex_owned",   0x2A4C, POKEDEX_SIZE,     FieldKind::Opaque),
    ("pokedex_seen",    0x2A6C, POKEDEX_SIZE,     FieldKind::Opaque),
    ("pokemon_cur_box", 0x2D6C, BOX_SIZE,         FieldKind::Opaque),
];

/// Build the standard layout.
pub fn layout() -> Result<Layout, LayoutError> {
    let mut l = Layout::new();
    for &(name, address, size, kind) in FIELDS {
        l.declare(name, address, size, kind)?;
    }
    for (i, &address) in BOX_ADDRESSES.iter().enumerate() {
        l.declare(&format!("pokemon_box_{}", i + 1), address, BOX_SIZE, FieldKind::Opaque)?;
    }
    l.declare_checksum("checksum_primary", PRIMARY_CHECKSUM, &PRIMARY_CHUNKS)?;
    l.declare_checksum("checksum_secondary", SECONDARY_CHECKSUM, &SECONDARY_CHUNKS)?;
    Ok(l)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_fits_in_sram() {
        let l = layout().expect("standard layout must be valid");
        assert_eq!(l.len(), FIELDS.len() + BOX_ADDRESSES.len() + 2);
        assert_eq!(l.required_len(), SECONDARY_CHECKSUM + 2);
        assert!(l.required_len() <= IMAGE_SIZE);
    }

    #[test]
    fn checksums_come_last() {
        let l = layout().unwrap();
        let n = l.len();
        assert_eq!(l.name_at(n - 2), Some("checksum_primary"));
        assert_eq!(l.name_at(n - 1), Some("checksum_secondary"));
        assert!(l.fields()[..n - 2].iter().all(|f| f.kind != FieldKind::Checksum));
    }

    #[test]
    fn known_offsets() {
        let l = layout().unwrap();
        let name = l.resolve("player_name").unwrap();
        assert_eq!((name.address, name.size), (0x200B, NAME_SIZE));
        let box14 = l.resolve("pokemon_box_14").unwrap();
        assert_eq!((box14.address, box14.size), (0x79E0, BOX_SIZE));
        let primary = &l.checksums()[0];
        assert_eq!(primary.address, 0x2D69);
        assert_eq!(primary.chunks, PRIMARY_CHUNKS.to_vec());
        assert_eq!(l.checksums()[1].chunks.len(), 3);
        let names = l.resolve("pc_box_names").unwrap();
        assert_eq!((names.address, names.size), (0x2727, PC_NAME_SIZE));
        assert_eq!(PC_NAME_SIZE / BOX_NAME_SIZE, BOX_ADDRESSES.len());
    }
}
