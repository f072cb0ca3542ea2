//! # HomeBuilder I/O
//!
//! The journal file format: project metadata plus the committed edit
//! history as JSON. Loading a journal replays every transaction through the
//! edit log, so a saved plan is rebuilt exactly as it was edited.

pub mod journal;
pub mod project;

pub use journal::{Journal, JournalError, JournalReader, JournalWriter};
pub use project::{ProjectMeta, FORMAT_VERSION};
