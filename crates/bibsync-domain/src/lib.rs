//! Bibliographic domain types mirrored from the reference store
//!
//! This crate provides the canonical shapes held in the bibsync cache:
//! - Entry: one bibliographic record, identified by its citation key
//! - Creator: author, editor or institution attached to an entry
//! - Attachment, Annotation: auxiliary source records folded into an entry
//! - Collection: hierarchical grouping of entries

pub mod attachment;
pub mod collection;
pub mod creator;
pub mod entry;

pub use attachment::*;
pub use collection::*;
pub use creator::*;
pub use entry::*;
