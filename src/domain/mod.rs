//! Domain types for the stem library.
//!
//! - `entry`: LibraryEntry, EntryId, ExtractedFile
//! - `source`: SourceRef and thumbnail derivation
//! - `layers`: Advisory layer taxonomy and volume normalization

pub mod entry;
pub mod layers;
pub mod source;

pub use entry::{EntryId, ExtractedFile, LibraryEntry};
pub use layers::{generate_layers, normalize_volumes, LayerIcon, LayerInfo};
pub use source::{thumbnail_for_link, youtube_video_id, SourceRef, PLACEHOLDER_VIDEO_ID};
