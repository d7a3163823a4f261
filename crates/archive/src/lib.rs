//! File access around the decoders.
//!
//! This crate handles:
//! - The on-disk archive layout (`{root}/{tick|minute}/{instrument}/{date}.{ext}`)
//! - Listing dated files and selecting a date range
//! - Reading whole files and handing them to the matching decoder

pub mod layout;
pub mod source;

pub use layout::{Archive, ArchiveFile, ArchiveLayout};
pub use source::{decode_file, decode_file_with, read_source};
