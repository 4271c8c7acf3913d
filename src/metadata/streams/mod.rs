//! Metadata streams: the heaps and the table stream.
//!
//! Each heap type wraps the raw bytes of its stream and resolves indexes into owned or borrowed
//! values. The `*Builder` types produce heaps for [`crate::metadata::tables::writer`]. The `#US`
//! heap holds string literals used by method bodies and is not read.

mod blob;
mod guid;
mod streamheader;
mod strings;
mod tablesheader;

pub use blob::{Blob, BlobBuilder};
pub use guid::{Guid, GuidBuilder};
pub use streamheader::{StreamHeader, STREAM_NAMES};
pub use strings::{Strings, StringsBuilder};
pub use tablesheader::TablesHeader;
