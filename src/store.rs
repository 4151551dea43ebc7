//! Storage collaborators: where save bytes come from and go back to.
//!
//! The editing core never opens files; it is handed bytes by a [`SaveStore`]
//! and hands the exported image back to it.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub trait SaveStore {
    fn load(&mut self) -> io::Result<Vec<u8>>;
    fn persist(&mut self, bytes: &[u8]) -> io::Result<()>;
}

// ── FileStore ────────────────────────────────────────────────────────────────

/// A save file on disk.
///
/// By default `persist` overwrites the file it loaded from.  With
/// [`FileStore::output`] the result goes elsewhere; with
/// [`FileStore::backup`] the original is copied to `<name>.bak` before it is
/// overwritten.
#[derive(Debug, Clone)]
pub struct FileStore {
    path:   PathBuf,
    output: Option<PathBuf>,
    backup: bool,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_owned(), output: None, backup: false }
    }

    pub fn output<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output = Some(path.as_ref().to_owned());
        self
    }

    pub fn backup(mut self, enabled: bool) -> Self {
        self.backup = enabled;
        self
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Where `persist` writes.
    pub fn target(&self) -> &Path {
        self.output.as_deref().unwrap_or(&self.path)
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.target().as_os_str().to_owned();
        name.push(".bak");
        PathBuf::from(name)
    }
}

impl SaveStore for FileStore {
    fn load(&mut self) -> io::Result<Vec<u8>> {
        let bytes = fs::read(&self.path)?;
        log::info!("read {} bytes from {}", bytes.len(), self.path.display());
        Ok(bytes)
    }

    fn persist(&mut self, bytes: &[u8]) -> io::Result<()> {
        let target = self.target().to_owned();
        if self.backup && target.exists() {
            let bak = self.backup_path();
            fs::copy(&target, &bak)?;
            log::info!("backed up {} to {}", target.display(), bak.display());
        }
        let mut f = File::create(&target)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        log::info!("wrote {} bytes to {}", bytes.len(), target.display());
        Ok(())
    }
}

// ── MemoryStore ──────────────────────────────────────────────────────────────

/// In-memory store; `persist` replaces the held bytes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub bytes:    Vec<u8>,
    pub persists: usize,
}

impl MemoryStore {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, persists: 0 }
    }
}

impl SaveStore for MemoryStore {
    fn load(&mut self) -> io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }

    fn persist(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.bytes = bytes.to_vec();
        self.persists += 1;
        Ok(())
    }
}
