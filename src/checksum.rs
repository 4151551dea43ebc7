//! 16-bit additive checksums over discontiguous byte ranges.
//!
//! Each checksum is the plain sum of every byte in its chunks, accumulated
//! without limit and truncated to 16 bits once, after the last chunk.  The
//! result is stored little-endian at the checksum's destination.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::layout::{ChecksumSpec, Chunk, CHECKSUM_SIZE};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChecksumError {
    #[error("Chunk 0x{start:04x}..0x{end:04x} lies outside a {len}-byte buffer")]
    ChunkOutOfBounds { start: usize, end: usize, len: usize },
}

fn chunk_bytes<'a>(buffer: &'a [u8], chunk: &Chunk) -> Result<&'a [u8], ChecksumError> {
    buffer.get(chunk.start..chunk.end).ok_or(ChecksumError::ChunkOutOfBounds {
        start: chunk.start,
        end:   chunk.end,
        len:   buffer.len(),
    })
}

fn target<'a>(buffer: &'a mut [u8], spec: &ChecksumSpec) -> Result<&'a mut [u8], ChecksumError> {
    let len = buffer.len();
    buffer.get_mut(spec.address..spec.end()).ok_or(ChecksumError::ChunkOutOfBounds {
        start: spec.address,
        end:   spec.end(),
        len,
    })
}

/// Sum every byte of every chunk, truncated to 16 bits.
pub fn compute(buffer: &[u8], chunks: &[Chunk]) -> Result<u16, ChecksumError> {
    let mut sum: u64 = 0;
    for chunk in chunks {
        sum += chunk_bytes(buffer, chunk)?.iter().map(|&b| b as u64).sum::<u64>();
    }
    Ok((sum & 0xFFFF) as u16)
}

/// Recompute every checksum and store it in place.  Idempotent.
///
/// All checksums are computed before any is written, so the result does not
/// depend on the order of `specs`.
pub fn apply(buffer: &mut [u8], specs: &[ChecksumSpec]) -> Result<(), ChecksumError> {
    let sums = specs
        .iter()
        .map(|s| compute(buffer, &s.chunks))
        .collect::<Result<Vec<u16>, _>>()?;
    for (spec, sum) in specs.iter().zip(sums) {
        LittleEndian::write_u16(target(buffer, spec)?, sum);
        log::debug!("{}: wrote 0x{sum:04x} at 0x{:04x}", spec.name, spec.address);
    }
    Ok(())
}

/// Stored value currently at a checksum destination.
pub fn stored(buffer: &[u8], spec: &ChecksumSpec) -> Result<u16, ChecksumError> {
    buffer
        .get(spec.address..spec.address + CHECKSUM_SIZE)
        .map(LittleEndian::read_u16)
        .ok_or(ChecksumError::ChunkOutOfBounds {
            start: spec.address,
            end:   spec.end(),
            len:   buffer.len(),
        })
}

// ── Verification ─────────────────────────────────────────────────────────────

/// Stored vs. computed value for one checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumStatus {
    pub name:     String,
    pub address:  usize,
    pub stored:   u16,
    pub computed: u16,
}

impl ChecksumStatus {
    pub fn is_valid(&self) -> bool {
        self.stored == self.computed
    }
}

/// Result of [`verify`].
#[derive(Debug, Clone, Default)]
pub struct ChecksumReport {
    pub entries: Vec<ChecksumStatus>,
}

impl ChecksumReport {
    pub fn is_consistent(&self) -> bool {
        self.entries.iter().all(ChecksumStatus::is_valid)
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &ChecksumStatus> {
        self.entries.iter().filter(|e| !e.is_valid())
    }

    /// Summary line for display.
    pub fn summary(&self) -> String {
        let bad = self.mismatches().count();
        if bad == 0 {
            format!("{} checksum(s) valid", self.entries.len())
        } else {
            format!("{bad}/{} checksum(s) stale", self.entries.len())
        }
    }
}

/// Compare every stored checksum with its recomputed value.  Never writes.
pub fn verify(buffer: &[u8], specs: &[ChecksumSpec]) -> Result<ChecksumReport, ChecksumError> {
    let entries = specs
        .iter()
        .map(|s| {
            Ok(ChecksumStatus {
                name:     s.name.clone(),
                address:  s.address,
                stored:   stored(buffer, s)?,
                computed: compute(buffer, &s.chunks)?,
            })
        })
        .collect::<Result<Vec<_>, ChecksumError>>()?;
    Ok(ChecksumReport { entries })
}
