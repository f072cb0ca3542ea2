//! Transactional undo/redo log.
//!
//! The log is a flat list of entries: a [`TransactionMarker`] opens every
//! user-visible edit and the actions that follow it belong to that edit.
//! `length` is the cursor; entries at or beyond it form the redo tail.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commands::{Command, CommandHandler, CommandKind, Effect};
use crate::plan::{Plan, PlanError};

#[derive(Error, Debug)]
pub enum EditError {
    #[error("a handler for {0} is already registered")]
    DuplicateHandler(CommandKind),

    #[error("no handler registered for {0}")]
    UnregisteredHandler(CommandKind),

    #[error("transaction \"{0}\" is still open")]
    TransactionOpen(String),

    #[error("no transaction is open")]
    NoTransaction,

    #[error("transaction name must not be empty")]
    EmptyName,

    #[error("transaction {found} does not match the open transaction {expected}")]
    TransactionMismatch {
        expected: TransactionId,
        found: TransactionId,
    },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("command does not survive a JSON round trip: {0}")]
    RoundTrip(String),

    #[error("command serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{handler} handler cannot run a {command} command")]
    WrongCommand {
        handler: CommandKind,
        command: CommandKind,
    },

    #[error(transparent)]
    Plan(#[from] PlanError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A command paired with the handler that runs it.
#[derive(Debug, Clone)]
pub struct Action {
    kind: CommandKind,
    command: Command,
}

impl Action {
    /// Fails unless the command encodes, decodes and re-encodes unchanged.
    pub fn new(command: Command) -> Result<Self, EditError> {
        let json = serde_json::to_string(&command)?;
        let decoded: Command = serde_json::from_str(&json)?;
        if decoded != command || serde_json::to_string(&decoded)? != json {
            return Err(EditError::RoundTrip(json));
        }
        Ok(Self {
            kind: command.kind(),
            command,
        })
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionMarker {
    pub id: TransactionId,
    pub name: String,
}

#[derive(Debug, Clone)]
enum Entry {
    Marker(TransactionMarker),
    Action(Action),
}

/// A committed transaction as the journal stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub name: String,
    pub commands: Vec<Command>,
}

#[derive(Debug, Default)]
pub struct EditLog {
    entries: Vec<Entry>,
    length: usize,
    in_transaction: bool,
    handlers: BTreeMap<CommandKind, Box<dyn CommandHandler>>,
    next_transaction: u64,
    last_rolled_back: Option<TransactionId>,
}

impl EditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each command kind gets exactly one handler.
    pub fn register(&mut self, handler: Box<dyn CommandHandler>) -> Result<(), EditError> {
        let kind = handler.kind();
        if self.handlers.contains_key(&kind) {
            return Err(EditError::DuplicateHandler(kind));
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    fn handler(&self, kind: CommandKind) -> Result<&dyn CommandHandler, EditError> {
        self.handlers
            .get(&kind)
            .map(|handler| handler.as_ref())
            .ok_or(EditError::UnregisteredHandler(kind))
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn open_marker(&self) -> Option<(usize, &TransactionMarker)> {
        self.entries.iter().enumerate().rev().find_map(|(index, entry)| match entry {
            Entry::Marker(marker) => Some((index, marker)),
            Entry::Action(_) => None,
        })
    }

    // ── Transactions ─────────────────────────────────────────────────

    /// Open a transaction, discarding the redo tail.
    pub fn begin(&mut self, name: &str) -> Result<TransactionId, EditError> {
        if name.is_empty() {
            return Err(EditError::EmptyName);
        }
        if self.in_transaction {
            let open = self.open_marker().map(|(_, m)| m.name.clone()).unwrap_or_default();
            return Err(EditError::TransactionOpen(open));
        }
        self.entries.truncate(self.length);
        self.next_transaction += 1;
        let id = TransactionId(self.next_transaction);
        self.entries.push(Entry::Marker(TransactionMarker {
            id,
            name: name.to_string(),
        }));
        self.length += 1;
        self.in_transaction = true;
        log::debug!("begin {} \"{}\"", id, name);
        Ok(id)
    }

    /// Run a command inside the open transaction.
    ///
    /// When the previous entry is an action of a mergeable handler and the
    /// merge succeeds, the merged command replaces that entry and is
    /// executed; otherwise the command is appended and executed.
    pub fn add(&mut self, plan: &mut Plan, command: Command) -> Result<Effect, EditError> {
        let kind = command.kind();
        self.handler(kind)?;
        if !self.in_transaction {
            return Err(EditError::NoTransaction);
        }

        if let Some(Entry::Action(previous)) = self.entries.last() {
            let merged = self
                .handler(previous.kind)?
                .as_mergeable()
                .and_then(|mergeable| mergeable.merge(&previous.command, &command));
            if let Some(merged) = merged {
                let action = Action::new(merged)?;
                let effect = self.handler(action.kind)?.execute(plan, &action.command)?;
                log::debug!("merged {} into previous {}", kind, action.kind);
                if let Some(last) = self.entries.last_mut() {
                    *last = Entry::Action(action);
                }
                return Ok(effect);
            }
        }

        let action = Action::new(command)?;
        let effect = self.handler(kind)?.execute(plan, &action.command)?;
        self.entries.push(Entry::Action(action));
        self.length += 1;
        Ok(effect)
    }

    /// Close the open transaction; `id` must name it.
    pub fn commit(&mut self, id: TransactionId) -> Result<(), EditError> {
        if !self.in_transaction {
            return Err(EditError::NoTransaction);
        }
        debug_assert_eq!(self.length, self.entries.len());
        let (_, marker) = self.open_marker().ok_or(EditError::NoTransaction)?;
        if marker.id != id {
            return Err(EditError::TransactionMismatch {
                expected: marker.id,
                found: id,
            });
        }
        log::debug!("commit {} \"{}\"", id, marker.name);
        self.in_transaction = false;
        Ok(())
    }

    /// Undo every action of the open transaction and drop it from the log.
    ///
    /// Rolling back a transaction that was just rolled back is a no-op.
    pub fn rollback(&mut self, plan: &mut Plan, id: TransactionId) -> Result<(), EditError> {
        if !self.in_transaction {
            if self.last_rolled_back == Some(id) {
                return Ok(());
            }
            return Err(EditError::NoTransaction);
        }
        let (index, marker) = self.open_marker().ok_or(EditError::NoTransaction)?;
        if marker.id != id {
            return Err(EditError::TransactionMismatch {
                expected: marker.id,
                found: id,
            });
        }
        for entry in self.entries[index + 1..].iter().rev() {
            if let Entry::Action(action) = entry {
                self.handler(action.kind)?.undo(plan, &action.command)?;
            }
        }
        log::debug!("rollback {} ({} actions)", id, self.entries.len() - index - 1);
        self.entries.truncate(index);
        self.length = index;
        self.in_transaction = false;
        self.last_rolled_back = Some(id);
        Ok(())
    }

    // ── Undo / Redo ──────────────────────────────────────────────────

    pub fn can_undo(&self) -> bool {
        !self.in_transaction && self.length > 0
    }

    /// Undo back to (and excluding) the nearest marker.
    pub fn undo(&mut self, plan: &mut Plan) -> Result<(), EditError> {
        if self.in_transaction {
            return Err(self.open_error());
        }
        if self.length == 0 {
            return Err(EditError::NothingToUndo);
        }
        while self.length > 0 {
            self.length -= 1;
            match &self.entries[self.length] {
                Entry::Marker(marker) => {
                    log::debug!("undo {} \"{}\"", marker.id, marker.name);
                    break;
                }
                Entry::Action(action) => self.handler(action.kind)?.undo(plan, &action.command)?,
            }
        }
        Ok(())
    }

    pub fn can_redo(&self) -> bool {
        !self.in_transaction && self.length < self.entries.len()
    }

    /// Redo forward to the next marker.
    pub fn redo(&mut self, plan: &mut Plan) -> Result<(), EditError> {
        if self.in_transaction {
            return Err(self.open_error());
        }
        if self.length >= self.entries.len() {
            return Err(EditError::NothingToRedo);
        }
        if let Entry::Marker(marker) = &self.entries[self.length] {
            log::debug!("redo {} \"{}\"", marker.id, marker.name);
        }
        self.length += 1;
        while self.length < self.entries.len() {
            match &self.entries[self.length] {
                Entry::Marker(_) => break,
                Entry::Action(action) => {
                    self.handler(action.kind)?.execute(plan, &action.command)?;
                }
            }
            self.length += 1;
        }
        Ok(())
    }

    fn open_error(&self) -> EditError {
        let open = self.open_marker().map(|(_, m)| m.name.clone()).unwrap_or_default();
        EditError::TransactionOpen(open)
    }

    // ── Inspection ───────────────────────────────────────────────────

    /// Name of the transaction the next `undo` would revert.
    pub fn undo_name(&self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        self.entries[..self.length].iter().rev().find_map(|entry| match entry {
            Entry::Marker(marker) => Some(marker.name.as_str()),
            Entry::Action(_) => None,
        })
    }

    /// Name of the transaction the next `redo` would replay.
    pub fn redo_name(&self) -> Option<&str> {
        if !self.can_redo() {
            return None;
        }
        match self.entries.get(self.length) {
            Some(Entry::Marker(marker)) => Some(marker.name.as_str()),
            _ => None,
        }
    }

    /// Committed transactions up to the cursor, oldest first. The open
    /// transaction, if any, is left out.
    pub fn history(&self) -> Vec<TransactionRecord> {
        let mut records: Vec<TransactionRecord> = Vec::new();
        for entry in &self.entries[..self.length] {
            match entry {
                Entry::Marker(marker) => records.push(TransactionRecord {
                    name: marker.name.clone(),
                    commands: Vec::new(),
                }),
                Entry::Action(action) => {
                    if let Some(record) = records.last_mut() {
                        record.commands.push(action.command.clone());
                    }
                }
            }
        }
        if self.in_transaction {
            records.pop();
        }
        records
    }

    /// Number of entries (markers and actions) including the redo tail.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.length
    }
}
