//! Field-layout registry: semantic names → absolute byte ranges.
//!
//! A [`Layout`] is two ordered tables:
//!
//! * **fields** — every named range, in declaration order.  Navigation code
//!   walks this table by index ([`Layout::name_at`], [`Layout::index_of`]).
//! * **checksums** — every [`ChecksumSpec`], in declaration order.  Declaring
//!   a checksum also appends a two-byte [`FieldKind::Checksum`] field for its
//!   destination, so a layout that declares checksums last lists them after
//!   all data fields.
//!
//! A layout is immutable once built.  Field *values* live in the save image
//! buffer, not in the registry.
//!
//! Layouts serialize to JSON so an alternative map can be supplied as a
//! configuration file.  Checksum destination fields are implied by the
//! checksum table and are not written out.

pub mod gold_silver;

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Width of every checksum destination.
pub const CHECKSUM_SIZE: usize = 2;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Unknown field: {0}")]
    UnknownField(String),
    #[error("Field declared twice: {0}")]
    DuplicateField(String),
    #[error("Checksum {name} at 0x{address:04x} lies inside its own chunk 0x{start:04x}..0x{end:04x}")]
    SelfReferentialChecksum { name: String, address: usize, start: usize, end: usize },
    #[error("Checksum {name} has an inverted chunk 0x{start:04x}..0x{end:04x}")]
    InvertedChunk { name: String, start: usize, end: usize },
    #[error("Field {name} (0x{address:04x}+{size}) lies outside a {len}-byte buffer")]
    OutOfBounds { name: String, address: usize, size: usize, len: usize },
    #[error("Field {name} (0x{address:x}+{size}) overflows the address space")]
    AddressOverflow { name: String, address: usize, size: usize },
    #[error("Field {name} ({size} bytes) does not split into {width}-byte text slots")]
    SlotWidth { name: String, size: usize, width: usize },
    #[error("Layout JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ── Field and checksum descriptors ───────────────────────────────────────────

/// How a field's bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Raw bytes with no further structure.
    Opaque,
    /// Player or rival name: encoded text, terminator, padding.
    Name,
    /// Encoded text filling the whole field.
    Text,
    /// Consecutive fixed-width text slots of the given width (PC box labels).
    TextSlots(usize),
    /// 3-byte big-endian amount.
    Money,
    /// Big-endian unsigned integer as wide as the field.
    Number,
    /// Hours, minutes, seconds, frames.
    PlayTime,
    /// Johto badge bitfield.
    Badges,
    /// Player sprite palette index.
    Palette,
    /// Destination of a [`ChecksumSpec`].
    Checksum,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Opaque   => "opaque",
            FieldKind::Name     => "name",
            FieldKind::Text     => "text",
            FieldKind::TextSlots(_) => "text_slots",
            FieldKind::Money    => "money",
            FieldKind::Number   => "number",
            FieldKind::PlayTime => "play_time",
            FieldKind::Badges   => "badges",
            FieldKind::Palette  => "palette",
            FieldKind::Checksum => "checksum",
        }
    }

    /// Encoded-text kinds, handled by the charmap.
    pub fn is_text(self) -> bool {
        matches!(self, FieldKind::Name | FieldKind::Text | FieldKind::TextSlots(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name:    String,
    pub address: usize,
    pub size:    usize,
    pub kind:    FieldKind,
}

impl FieldSpec {
    /// One past the last byte of the field.  [`Layout::declare`] rejects
    /// fields where this would overflow.
    #[inline]
    pub fn end(&self) -> usize {
        self.address + self.size
    }

    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.address..self.end()
    }
}

/// Half-open byte range `[start, end)` summed into a checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub start: usize,
    pub end:   usize,
}

impl Chunk {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn intersects(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumSpec {
    pub name:    String,
    /// Where the little-endian 16-bit result is stored.
    pub address: usize,
    pub chunks:  Vec<Chunk>,
}

impl ChecksumSpec {
    #[inline]
    pub fn end(&self) -> usize {
        self.address + CHECKSUM_SIZE
    }
}

// ── Loaded snapshot ─────────────────────────────────────────────────────────

/// Values of every non-checksum field, copied out of a buffer in layout order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedFields {
    entries: Vec<(String, Vec<u8>)>,
    by_name: HashMap<String, usize>,
}

impl LoadedFields {
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.by_name.get(name).map(|&i| self.entries[i].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Layout ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Layout {
    fields:    Vec<FieldSpec>,
    by_name:   HashMap<String, usize>,
    checksums: Vec<ChecksumSpec>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field.  Declaration order is iteration order.
    pub fn declare(
        &mut self,
        name:    &str,
        address: usize,
        size:    usize,
        kind:    FieldKind,
    ) -> Result<&mut Self, LayoutError> {
        if self.by_name.contains_key(name) {
            return Err(LayoutError::DuplicateField(name.to_owned()));
        }
        if address.checked_add(size).is_none() {
            return Err(LayoutError::AddressOverflow { name: name.to_owned(), address, size });
        }
        if let FieldKind::TextSlots(width) = kind {
            if width == 0 || size % width != 0 {
                return Err(LayoutError::SlotWidth { name: name.to_owned(), size, width });
            }
        }
        self.by_name.insert(name.to_owned(), self.fields.len());
        self.fields.push(FieldSpec { name: name.to_owned(), address, size, kind });
        Ok(self)
    }

    /// Register a checksum and its two-byte destination field.
    pub fn declare_checksum(
        &mut self,
        name:    &str,
        address: usize,
        chunks:  &[Chunk],
    ) -> Result<&mut Self, LayoutError> {
        let end = address.checked_add(CHECKSUM_SIZE).ok_or_else(|| LayoutError::AddressOverflow {
            name: name.to_owned(), address, size: CHECKSUM_SIZE,
        })?;
        for c in chunks {
            if c.end < c.start {
                return Err(LayoutError::InvertedChunk {
                    name: name.to_owned(), start: c.start, end: c.end,
                });
            }
            if c.intersects(address, end) {
                return Err(LayoutError::SelfReferentialChecksum {
                    name: name.to_owned(), address, start: c.start, end: c.end,
                });
            }
        }
        self.declare(name, address, CHECKSUM_SIZE, FieldKind::Checksum)?;
        self.checksums.push(ChecksumSpec {
            name:    name.to_owned(),
            address,
            chunks:  chunks.to_vec(),
        });
        Ok(self)
    }

    pub fn resolve(&self, name: &str) -> Result<&FieldSpec, LayoutError> {
        self.by_name
            .get(name)
            .map(|&i| &self.fields[i])
            .ok_or_else(|| LayoutError::UnknownField(name.to_owned()))
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn checksums(&self) -> &[ChecksumSpec] {
        &self.checksums
    }

    /// Smallest buffer length that holds every field, checksum destination
    /// and checksum chunk.
    pub fn required_len(&self) -> usize {
        let fields = self.fields.iter().map(FieldSpec::end);
        let targets = self.checksums.iter().map(ChecksumSpec::end);
        let chunks = self.checksums.iter().flat_map(|c| c.chunks.iter().map(|k| k.end));
        fields.chain(targets).chain(chunks).max().unwrap_or(0)
    }

    /// Copy every non-checksum field out of `buffer`.
    ///
    /// Bounds are checked for all fields before anything is copied.
    pub fn load(&self, buffer: &[u8]) -> Result<LoadedFields, LayoutError> {
        let data = || self.fields.iter().filter(|f| f.kind != FieldKind::Checksum);
        if let Some(f) = data().find(|f| f.end() > buffer.len()) {
            return Err(LayoutError::OutOfBounds {
                name:    f.name.clone(),
                address: f.address,
                size:    f.size,
                len:     buffer.len(),
            });
        }
        let entries: Vec<(String, Vec<u8>)> = data()
            .map(|f| (f.name.clone(), buffer[f.range()].to_vec()))
            .collect();
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, (n, _))| (n.clone(), i))
            .collect();
        Ok(LoadedFields { entries, by_name })
    }

    pub fn to_json(&self) -> Result<String, LayoutError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ── Serde ───────────────────────────────────────────────────────────────────
//
// The wire form lists data fields and checksums separately; deserializing
// replays every declaration so the usual checks apply to loaded layouts.

#[derive(Serialize, Deserialize)]
struct LayoutRaw {
    fields:    Vec<FieldSpec>,
    #[serde(default)]
    checksums: Vec<ChecksumSpec>,
}

impl Serialize for Layout {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        LayoutRaw {
            fields: self.fields
                .iter()
                .filter(|f| f.kind != FieldKind::Checksum)
                .cloned()
                .collect(),
            checksums: self.checksums.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Layout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = LayoutRaw::deserialize(deserializer)?;
        let mut layout = Layout::new();
        for f in &raw.fields {
            if f.kind == FieldKind::Checksum {
                return Err(serde::de::Error::custom(format!(
                    "field {} has kind checksum; declare it under \"checksums\"", f.name
                )));
            }
            layout
                .declare(&f.name, f.address, f.size, f.kind)
                .map_err(serde::de::Error::custom)?;
        }
        for c in &raw.checksums {
            layout
                .declare_checksum(&c.name, c.address, &c.chunks)
                .map_err(serde::de::Error::custom)?;
        }
        Ok(layout)
    }
}
