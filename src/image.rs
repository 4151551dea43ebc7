//! [`SaveImage`] — the editing session over one save buffer.
//!
//! ```
//! use pokesave::image::SaveImage;
//! use pokesave::layout::gold_silver;
//!
//! let layout = gold_silver::layout()?;
//! let mut img = SaveImage::load(vec![0u8; gold_silver::IMAGE_SIZE], layout)?;
//! img.write_name("player_name", "GOLD")?;
//! img.validate()?;
//! let bytes = img.export()?;
//! assert_eq!(bytes.len(), gold_silver::IMAGE_SIZE);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Session states
//!
//! | State       | Entered by                    |
//! |-------------|-------------------------------|
//! | `Loaded`    | [`SaveImage::load`]           |
//! | `Edited`    | any successful write          |
//! | `Validated` | [`SaveImage::validate`]       |
//! | `Exported`  | [`SaveImage::export`] (final) |
//!
//! Exporting while `Edited` fails with [`ImageError::StaleChecksum`] unless
//! [`SessionOptions::auto_validate`] is set.

use thiserror::Error;

use crate::charmap::{self, CharsetError};
use crate::checksum::{self, ChecksumError, ChecksumReport};
use crate::layout::{FieldKind, Layout, LayoutError, LoadedFields};
use crate::value::{FieldValue, ValueError};

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ImageError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("Field {field} is {expected} bytes; got {actual}")]
    SizeMismatch { field: String, expected: usize, actual: usize },
    #[error("Save image is {actual} bytes; the layout needs at least {required}")]
    TruncatedImage { required: usize, actual: usize },
    #[error("Checksums are stale; validate before exporting")]
    StaleChecksum,
    #[error("Session already exported")]
    Exported,
    #[error(transparent)]
    Charset(#[from] CharsetError),
    #[error(transparent)]
    Checksum(#[from] ChecksumError),
    #[error(transparent)]
    Value(#[from] ValueError),
}

// ── SessionOptions ───────────────────────────────────────────────────────────

/// Configuration for [`SaveImage::with_options`].
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Recompute checksums on export instead of failing with
    /// [`ImageError::StaleChecksum`].
    pub auto_validate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loaded,
    Edited,
    Validated,
    Exported,
}

// ── SaveImage ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct SaveImage {
    buffer:  Vec<u8>,
    layout:  Layout,
    options: SessionOptions,
    state:   SessionState,
}

impl SaveImage {
    // ── Constructors ─────────────────────────────────────────────────────────

    pub fn load(bytes: Vec<u8>, layout: Layout) -> Result<Self, ImageError> {
        Self::with_options(bytes, layout, SessionOptions::default())
    }

    pub fn with_options(
        bytes:   Vec<u8>,
        layout:  Layout,
        options: SessionOptions,
    ) -> Result<Self, ImageError> {
        let required = layout.required_len();
        if bytes.len() < required {
            return Err(ImageError::TruncatedImage { required, actual: bytes.len() });
        }
        log::debug!(
            "loaded {} byte image ({} fields, {} checksums)",
            bytes.len(),
            layout.len(),
            layout.checksums().len(),
        );
        Ok(Self { buffer: bytes, layout, options, state: SessionState::Loaded })
    }

    // ── Read ──────────────────────────────────────────────────────────────────

    pub fn read_field(&self, name: &str) -> Result<&[u8], ImageError> {
        let spec = self.layout.resolve(name)?;
        Ok(&self.buffer[spec.range()])
    }

    pub fn read_name(&self, name: &str) -> Result<String, ImageError> {
        Ok(charmap::decode(self.read_field(name)?))
    }

    pub fn read_value(&self, name: &str) -> Result<FieldValue, ImageError> {
        let spec = self.layout.resolve(name)?;
        Ok(FieldValue::decode(spec.kind, &self.buffer[spec.range()]))
    }

    /// Snapshot of every non-checksum field.
    pub fn fields(&self) -> LoadedFields {
        // Bounds were checked at load; this cannot fail for a loaded image.
        self.layout.load(&self.buffer).unwrap_or_default()
    }

    // ── Write ─────────────────────────────────────────────────────────────────

    pub fn write_field(&mut self, name: &str, bytes: &[u8]) -> Result<(), ImageError> {
        if self.state == SessionState::Exported {
            return Err(ImageError::Exported);
        }
        let spec = self.layout.resolve(name)?;
        if bytes.len() != spec.size {
            return Err(ImageError::SizeMismatch {
                field:    name.to_owned(),
                expected: spec.size,
                actual:   bytes.len(),
            });
        }
        let range = spec.range();
        self.buffer[range].copy_from_slice(bytes);
        self.state = SessionState::Edited;
        log::debug!("wrote {} byte(s) to {name}", bytes.len());
        Ok(())
    }

    /// Encode `text` into a name or text field.  Nothing is written if the
    /// text does not fit.  Name fields only rewrite their text bytes.
    pub fn write_name(&mut self, name: &str, text: &str) -> Result<(), ImageError> {
        self.write_value(name, &FieldValue::Text(text.to_owned()))
    }

    pub fn write_value(&mut self, name: &str, value: &FieldValue) -> Result<(), ImageError> {
        let spec = self.layout.resolve(name)?;
        let bytes = value
            .encode_over(spec.kind, &self.buffer[spec.range()])
            .map_err(|e| match e {
                ValueError::Charset(c) => ImageError::Charset(c),
                e => ImageError::Value(e),
            })?;
        self.write_field(name, &bytes)
    }

    /// Encode `text` into slot `index` of a text-slot field, leaving the
    /// other slots as they are.
    pub fn write_slot(&mut self, name: &str, index: usize, text: &str) -> Result<(), ImageError> {
        let spec = self.layout.resolve(name)?;
        let FieldKind::TextSlots(width) = spec.kind else {
            return Err(ValueError::KindMismatch { kind: spec.kind.name(), value: "text slot" }.into());
        };
        let slots = spec.size / width;
        if index >= slots {
            return Err(ValueError::OutOfRange {
                kind: spec.kind.name(), value: index as u64, max: slots.saturating_sub(1) as u64,
            }
            .into());
        }
        let mut bytes = self.buffer[spec.range()].to_vec();
        let at = index * width;
        bytes[at..at + width].copy_from_slice(&charmap::encode_fixed(text, width)?);
        self.write_field(name, &bytes)
    }

    // ── Checksums ────────────────────────────────────────────────────────────

    /// Recompute every checksum footer in place.
    pub fn validate(&mut self) -> Result<&[u8], ImageError> {
        if self.state == SessionState::Exported {
            return Err(ImageError::Exported);
        }
        checksum::apply(&mut self.buffer, self.layout.checksums())?;
        self.state = SessionState::Validated;
        Ok(&self.buffer)
    }

    pub fn verify(&self) -> Result<ChecksumReport, ImageError> {
        Ok(checksum::verify(&self.buffer, self.layout.checksums())?)
    }

    // ── Export ───────────────────────────────────────────────────────────────

    /// Final bytes for the storage collaborator.
    pub fn export(&mut self) -> Result<Vec<u8>, ImageError> {
        match self.state {
            SessionState::Exported => return Err(ImageError::Exported),
            SessionState::Edited if self.options.auto_validate => {
                self.validate()?;
            }
            SessionState::Edited => return Err(ImageError::StaleChecksum),
            SessionState::Loaded | SessionState::Validated => {}
        }
        self.state = SessionState::Exported;
        Ok(self.buffer.clone())
    }

    // ── Metadata ─────────────────────────────────────────────────────────────

    pub fn layout(&self) -> &Layout { &self.layout }

    pub fn state(&self) -> SessionState { self.state }

    pub fn len(&self) -> usize { self.buffer.len() }

    pub fn is_empty(&self) -> bool { self.buffer.is_empty() }

    pub fn as_bytes(&self) -> &[u8] { &self.buffer }
}
