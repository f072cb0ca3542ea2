//! Journal format.
//!
//! A journal is one JSON document holding the project metadata and every
//! committed transaction in order:
//!
//! ```text
//! { "meta": { .. }, "transactions": [ { "name": "..", "commands": [ { "type": "CreateWall", .. } ] } ] }
//! ```
//!
//! Coordinates inside commands are fixed-point integers, so replaying a
//! journal reproduces the same walls bit for bit.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use homebuilder_core::{EditError, TransactionRecord, World};

use crate::project::{ProjectMeta, FORMAT_VERSION};

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid journal JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Replay failed at transaction {index} \"{name}\": {source}")]
    Replay {
        index: usize,
        name: String,
        #[source]
        source: EditError,
    },

    #[error("Unsupported journal format version: {0}")]
    UnsupportedVersion(u32),
}

// ── Journal ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub meta: ProjectMeta,
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
}

impl Journal {
    pub fn new(meta: ProjectMeta) -> Self {
        Self {
            meta,
            transactions: Vec::new(),
        }
    }

    /// Snapshot the committed history of `world`. Undone transactions are
    /// not part of it.
    pub fn from_world(world: &World) -> Self {
        Self {
            meta: ProjectMeta::for_world(world),
            transactions: world.history(),
        }
    }

    pub fn command_count(&self) -> usize {
        self.transactions.iter().map(|t| t.commands.len()).sum()
    }

    /// Rebuild a world by running every transaction again, then flush it.
    pub fn replay(&self) -> Result<World, JournalError> {
        check_version(self.meta.format_version)?;
        let mut world = World::with_settings(&self.meta.name, self.meta.settings.clone());
        world.id = self.meta.world_id;
        for (index, record) in self.transactions.iter().enumerate() {
            world.apply(record).map_err(|source| JournalError::Replay {
                index,
                name: record.name.clone(),
                source,
            })?;
        }
        let rebuilt = world.flush();
        log::info!(
            "Replayed '{}': {} transactions, {} walls, {} footprints rebuilt",
            self.meta.name,
            self.transactions.len(),
            world.plan().wall_count(),
            rebuilt
        );
        Ok(world)
    }
}

fn check_version(version: u32) -> Result<(), JournalError> {
    if version == 0 || version > FORMAT_VERSION {
        return Err(JournalError::UnsupportedVersion(version));
    }
    Ok(())
}

// ── Reader ────────────────────────────────────────────────────────────

pub struct JournalReader<R: Read> {
    reader: R,
}

impl<R: Read> JournalReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn read(&mut self) -> Result<Journal, JournalError> {
        let journal: Journal = serde_json::from_reader(&mut self.reader)?;
        check_version(journal.meta.format_version)?;
        log::info!(
            "Read journal '{}': {} transactions, {} commands",
            journal.meta.name,
            journal.transactions.len(),
            journal.command_count()
        );
        Ok(journal)
    }
}

// ── Writer ────────────────────────────────────────────────────────────

pub struct JournalWriter<W: Write> {
    writer: W,
    pretty: bool,
}

impl<W: Write> JournalWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pretty: false,
        }
    }

    /// Indent the output for people reading the file.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn write(&mut self, journal: &Journal) -> Result<(), JournalError> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, journal)?;
        } else {
            serde_json::to_writer(&mut self.writer, journal)?;
        }
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        log::info!(
            "Wrote journal '{}': {} transactions",
            journal.meta.name,
            journal.transactions.len()
        );
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
