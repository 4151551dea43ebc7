pub mod charmap;
pub mod layout;
pub mod checksum;
pub mod value;
pub mod image;
pub mod store;

pub use charmap::{decode, encode, encode_fixed, CharsetError};
pub use layout::{Chunk, ChecksumSpec, FieldKind, FieldSpec, Layout, LayoutError};
pub use checksum::{ChecksumError, ChecksumReport};
pub use value::{FieldValue, ValueError};
pub use image::{ImageError, SaveImage, SessionOptions, SessionState};
pub use store::{FileStore, MemoryStore, SaveStore};
