//! Typed views of non-opaque fields.
//!
//! [`FieldValue::decode`] never fails: every byte pattern has a readable
//! rendering.  [`FieldValue::encode`] and [`FieldValue::parse`] range-check
//! their input against the field kind.

use std::fmt;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use thiserror::Error;

use crate::charmap::{self, CharsetError};
use crate::layout::FieldKind;

/// Largest amount the game displays.
pub const MAX_MONEY: u32 = 999_999;

/// Frames per second of the play-time counter.
pub const FRAMES_PER_SECOND: u8 = 60;

/// Characters a player or rival name can hold.  The name, its terminator and
/// its padding occupy the first `NAME_MAX_CHARS + 1` bytes of a name field;
/// the bytes after that belong to the game and are never rewritten.
pub const NAME_MAX_CHARS: usize = 7;

/// Separator between slots of a text-slot field in user input and display.
pub const SLOT_SEPARATOR: char = ',';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("Value {value} out of range for {kind} field (max {max})")]
    OutOfRange { kind: &'static str, value: u64, max: u64 },
    #[error("Cannot parse {input:?} as {kind}: {reason}")]
    Parse { kind: &'static str, input: String, reason: String },
    #[error("A {value} value cannot be stored in a {kind} field")]
    KindMismatch { kind: &'static str, value: &'static str },
    #[error(transparent)]
    Charset(#[from] CharsetError),
}

fn parse_err(kind: FieldKind, input: &str, reason: impl fmt::Display) -> ValueError {
    ValueError::Parse { kind: kind.name(), input: input.to_owned(), reason: reason.to_string() }
}

// ── PlayTime ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayTime {
    pub hours:   u8,
    pub minutes: u8,
    pub seconds: u8,
    pub frames:  u8,
}

impl PlayTime {
    pub fn from_bytes(b: &[u8]) -> Self {
        let at = |i: usize| b.get(i).copied().unwrap_or(0);
        Self { hours: at(0), minutes: at(1), seconds: at(2), frames: at(3) }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        [self.hours, self.minutes, self.seconds, self.frames]
    }

    fn check(self) -> Result<Self, ValueError> {
        for (v, max) in [(self.minutes, 59), (self.seconds, 59), (self.frames, FRAMES_PER_SECOND - 1)] {
            if v > max {
                return Err(ValueError::OutOfRange {
                    kind: FieldKind::PlayTime.name(), value: v as u64, max: max as u64,
                });
            }
        }
        Ok(self)
    }

    /// Accepts `H:MM:SS` or `H:MM:SS.FF`.
    pub fn parse(s: &str) -> Result<Self, ValueError> {
        let kind = FieldKind::PlayTime;
        let (clock, frames) = match s.trim().split_once('.') {
            Some((c, f)) => (c, f),
            None         => (s.trim(), "0"),
        };
        let parts: Vec<&str> = clock.split(':').collect();
        if parts.len() != 3 {
            return Err(parse_err(kind, s, "expected H:MM:SS"));
        }
        let num = |p: &str| p.parse::<u8>().map_err(|e| parse_err(kind, s, e));
        Self {
            hours:   num(parts[0])?,
            minutes: num(parts[1])?,
            seconds: num(parts[2])?,
            frames:  num(frames)?,
        }
        .check()
    }
}

impl fmt::Display for PlayTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:02}.{:02}", self.hours, self.minutes, self.seconds, self.frames)
    }
}

// ── Badges ────────────────────────────────────────────────────────────────────

/// Johto badge bitfield, most significant bit first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Badges(pub u8);

impl Badges {
    pub const NAMES: [&'static str; 8] =
        ["zephyr", "hive", "plain", "fog", "storm", "mineral", "glacier", "rising"];

    pub const ZEPHYR:  u8 = 1 << 7;
    pub const HIVE:    u8 = 1 << 6;
    pub const PLAIN:   u8 = 1 << 5;
    pub const FOG:     u8 = 1 << 4;
    pub const STORM:   u8 = 1 << 3;
    pub const MINERAL: u8 = 1 << 2;
    pub const GLACIER: u8 = 1 << 1;
    pub const RISING:  u8 = 1 << 0;

    fn bit(index: usize) -> u8 {
        0x80 >> index
    }

    pub fn contains(self, bit: u8) -> bool {
        self.0 & bit == bit
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .enumerate()
            .filter(move |&(i, _)| self.0 & Self::bit(i) != 0)
            .map(|(_, n)| n)
    }

    /// `none`, `all`, or a comma-separated list of badge names.
    pub fn parse(s: &str) -> Result<Self, ValueError> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "" | "none" => return Ok(Self(0)),
            "all"       => return Ok(Self(0xFF)),
            _ => {}
        }
        let mut bits = 0u8;
        for part in s.split(',') {
            let part = part.trim().to_lowercase();
            let part = part.strip_suffix(" badge").unwrap_or(&part);
            let index = Self::NAMES
                .iter()
                .position(|n| *n == part)
                .ok_or_else(|| parse_err(FieldKind::Badges, s, format!("unknown badge {part:?}")))?;
            bits |= Self::bit(index);
        }
        Ok(Self(bits))
    }
}

impl fmt::Display for Badges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.names().collect();
        write!(f, "{} ({}/8)", names.join(","), self.count())
    }
}

// ── Palette ───────────────────────────────────────────────────────────────────

/// Player sprite palette.  Bytes above 7 are kept verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Palette(pub u8);

impl Palette {
    pub const NAMES: [&'static str; 8] =
        ["red", "blue", "green", "brown", "orange", "gray", "dark_green", "dark_red"];

    pub fn name(self) -> Option<&'static str> {
        Self::NAMES.get(self.0 as usize).copied()
    }

    pub fn parse(s: &str) -> Result<Self, ValueError> {
        let key = s.trim().to_lowercase().replace([' ', '-'], "_");
        if let Some(i) = Self::NAMES.iter().position(|n| *n == key) {
            return Ok(Self(i as u8));
        }
        match key.parse::<u8>() {
            Ok(i) if (i as usize) < Self::NAMES.len() => Ok(Self(i)),
            Ok(i) => Err(ValueError::OutOfRange {
                kind: FieldKind::Palette.name(), value: i as u64, max: 7,
            }),
            Err(_) => Err(parse_err(FieldKind::Palette, s, "unknown palette")),
        }
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(n) => f.write_str(n),
            None    => write!(f, "unknown (0x{:02x})", self.0),
        }
    }
}

// ── FieldValue ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Bytes(Vec<u8>),
    Text(String),
    TextList(Vec<String>),
    Number(u64),
    Money(u32),
    PlayTime(PlayTime),
    Badges(Badges),
    Palette(Palette),
}

impl FieldValue {
    fn variant(&self) -> &'static str {
        match self {
            FieldValue::Bytes(_)    => "bytes",
            FieldValue::Text(_)     => "text",
            FieldValue::TextList(_) => "text_list",
            FieldValue::Number(_)   => "number",
            FieldValue::Money(_)    => "money",
            FieldValue::PlayTime(_) => "play_time",
            FieldValue::Badges(_)   => "badges",
            FieldValue::Palette(_)  => "palette",
        }
    }

    /// Interpret raw field bytes according to `kind`.
    pub fn decode(kind: FieldKind, bytes: &[u8]) -> Self {
        let first = bytes.first().copied().unwrap_or(0);
        match kind {
            FieldKind::Opaque => FieldValue::Bytes(bytes.to_vec()),
            FieldKind::Name | FieldKind::Text => FieldValue::Text(charmap::decode(bytes)),
            FieldKind::TextSlots(width) => FieldValue::TextList(
                bytes.chunks(width.max(1)).map(charmap::decode).collect(),
            ),
            FieldKind::Money => match u32::try_from(read_be(bytes)) {
                Ok(m) if bytes.len() <= 8 => FieldValue::Money(m),
                _ => FieldValue::Bytes(bytes.to_vec()),
            },
            FieldKind::Number => FieldValue::Number(read_be(bytes)),
            FieldKind::PlayTime => FieldValue::PlayTime(PlayTime::from_bytes(bytes)),
            FieldKind::Badges => FieldValue::Badges(Badges(first)),
            FieldKind::Palette => FieldValue::Palette(Palette(first)),
            FieldKind::Checksum if bytes.len() == 2 => {
                FieldValue::Number(LittleEndian::read_u16(bytes) as u64)
            }
            FieldKind::Checksum => FieldValue::Bytes(bytes.to_vec()),
        }
    }

    /// Encode for a blank field of `kind` and `size` bytes.
    pub fn encode(&self, kind: FieldKind, size: usize) -> Result<Vec<u8>, ValueError> {
        self.encode_over(kind, &vec![charmap::PADDING; size])
    }

    /// Encode over the field's `current` bytes.  Name tails and text slots
    /// the value does not cover keep their current contents.
    ///
    /// `Bytes` is accepted for every kind and passed through unchanged; the
    /// caller checks its length.
    pub fn encode_over(&self, kind: FieldKind, current: &[u8]) -> Result<Vec<u8>, ValueError> {
        let size = current.len();
        match (self, kind) {
            (FieldValue::Bytes(b), _) => Ok(b.clone()),
            (FieldValue::Text(t), FieldKind::Name) => {
                let width = size.min(NAME_MAX_CHARS + 1);
                let mut out = current.to_vec();
                out[..width].copy_from_slice(&charmap::encode_fixed(t, width)?);
                Ok(out)
            }
            (FieldValue::Text(t), FieldKind::Text) => Ok(charmap::encode_fixed(t, size)?),
            (FieldValue::TextList(names), FieldKind::TextSlots(width)) => {
                let width = width.max(1);
                let slots = size / width;
                if names.len() > slots {
                    return Err(ValueError::OutOfRange {
                        kind: kind.name(), value: names.len() as u64, max: slots as u64,
                    });
                }
                let mut out = current.to_vec();
                for (slot, name) in out.chunks_exact_mut(width).zip(names) {
                    slot.copy_from_slice(&charmap::encode_fixed(name, width)?);
                }
                Ok(out)
            }
            (FieldValue::Number(n), FieldKind::Number) => write_be(kind, *n, size, u64::MAX),
            (FieldValue::Money(m), FieldKind::Money) => {
                write_be(kind, *m as u64, size, MAX_MONEY as u64)
            }
            (FieldValue::PlayTime(t), FieldKind::PlayTime) => Ok(t.check()?.to_bytes().to_vec()),
            (FieldValue::Badges(b), FieldKind::Badges) => Ok(vec![b.0]),
            (FieldValue::Palette(p), FieldKind::Palette) => match p.name() {
                Some(_) => Ok(vec![p.0]),
                None => Err(ValueError::OutOfRange {
                    kind: kind.name(), value: p.0 as u64, max: 7,
                }),
            },
            (v, k) => Err(ValueError::KindMismatch { kind: k.name(), value: v.variant() }),
        }
    }

    /// Parse user input for a field of `kind`.
    pub fn parse(kind: FieldKind, input: &str) -> Result<Self, ValueError> {
        let s = input.trim();
        match kind {
            FieldKind::Opaque | FieldKind::Checksum => {
                let digits: String = s.chars().filter(|c| !c.is_whitespace()).collect();
                hex::decode(digits.trim_start_matches("0x"))
                    .map(FieldValue::Bytes)
                    .map_err(|e| parse_err(kind, input, e))
            }
            FieldKind::Name | FieldKind::Text => Ok(FieldValue::Text(input.to_owned())),
            FieldKind::TextSlots(_) => Ok(FieldValue::TextList(
                input.split(SLOT_SEPARATOR).map(str::to_owned).collect(),
            )),
            FieldKind::Number => {
                let n = match s.strip_prefix("0x") {
                    Some(h) => u64::from_str_radix(h, 16),
                    None    => s.parse::<u64>(),
                };
                n.map(FieldValue::Number).map_err(|e| parse_err(kind, input, e))
            }
            FieldKind::Money => {
                let digits = s.trim_start_matches(['$', '¥']).replace(['_', ','], "");
                let m = digits.parse::<u32>().map_err(|e| parse_err(kind, input, e))?;
                if m > MAX_MONEY {
                    return Err(ValueError::OutOfRange {
                        kind: kind.name(), value: m as u64, max: MAX_MONEY as u64,
                    });
                }
                Ok(FieldValue::Money(m))
            }
            FieldKind::PlayTime => PlayTime::parse(s).map(FieldValue::PlayTime),
            FieldKind::Badges => Badges::parse(s).map(FieldValue::Badges),
            FieldKind::Palette => Palette::parse(s).map(FieldValue::Palette),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bytes(b)    => f.write_str(&hex::encode(b)),
            FieldValue::Text(t)     => write!(f, "{t:?}"),
            FieldValue::TextList(l) => {
                let quoted: Vec<String> = l.iter().map(|t| format!("{t:?}")).collect();
                f.write_str(&quoted.join(&SLOT_SEPARATOR.to_string()))
            }
            FieldValue::Number(n)   => write!(f, "{n}"),
            FieldValue::Money(m)    => write!(f, "¥{m}"),
            FieldValue::PlayTime(t) => write!(f, "{t}"),
            FieldValue::Badges(b)   => write!(f, "{b}"),
            FieldValue::Palette(p)  => write!(f, "{p}"),
        }
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn read_be(bytes: &[u8]) -> u64 {
    match bytes.len() {
        0 => 0,
        n if n <= 8 => BigEndian::read_uint(bytes, n),
        // Wider than a u64: keep the low eight bytes.
        n => BigEndian::read_u64(&bytes[n - 8..]),
    }
}

fn write_be(kind: FieldKind, value: u64, size: usize, cap: u64) -> Result<Vec<u8>, ValueError> {
    let width_max = match size {
        0 => 0,
        n if n >= 8 => u64::MAX,
        n => (1u64 << (8 * n)) - 1,
    };
    let max = width_max.min(cap);
    if value > max {
        return Err(ValueError::OutOfRange { kind: kind.name(), value, max });
    }
    let mut out = vec![0u8; size];
    if size > 0 {
        let n = size.min(8);
        BigEndian::write_uint(&mut out[size - n..], value, n);
    }
    Ok(out)
}
