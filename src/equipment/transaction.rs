//! equipment::transaction
//!
//! Ordered journal of executed commands with rollback.
//!
//! # Status machine
//!
//! ```text
//! PRISTINE -> STARTED -> COMMITTED
//!                     \> FAILED ----------\> (rollback keeps FAILED)
//!          explicit rollback -> ROLLED_BACK
//!          any failing undo   -> FAILED_ROLLBACK
//! ```
//!
//! # Rollback cursor
//!
//! `rollback_cursor == -1` means nothing has been rolled back; otherwise it
//! is the index of the last record that *was* rolled back. The derived
//! `effect_len` (`records.len()` or the cursor) bounds the records whose
//! effects are currently applied - it is the single source of truth for
//! every rollback walk, so a partially rolled-back transaction resumes where
//! it stopped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fsops::FsOps;
use crate::undoable::UndoableCommand;

/// Sentinel cursor value: no record rolled back yet.
pub const NO_ROLLBACK: i64 = -1;

/// Status of a module equipment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Not started.
    Pristine,
    /// Started.
    Started,
    /// Committed.
    Committed,
    /// Rolled back.
    RolledBack,
    /// Failed.
    Failed,
    /// Failed during rollback.
    FailedRollback,
}

/// Errors from transaction bookkeeping and rollback.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// A closed transaction was asked to transition again.
    #[error("transaction already closed as {status:?}")]
    AlreadyClosed { status: TransactionStatus },

    /// An undo returned non-zero; the cursor points at the failing record.
    #[error("failed to undo {cmdline}: {stderr}")]
    UndoFailed { cmdline: String, stderr: String },
}

/// An ordered group of executed commands bound to one module commit id,
/// undone as a unit on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Commit id of the module definition when the transaction started.
    pub commit_id: String,

    /// Executed commands, in execution order.
    pub records: Vec<UndoableCommand>,

    pub status: TransactionStatus,

    /// Index of the last record rolled back, or [`NO_ROLLBACK`].
    pub rollback_cursor: i64,
}

impl Transaction {
    /// Start a fresh transaction.
    pub fn begin(commit_id: String) -> Self {
        Self {
            commit_id,
            records: Vec::new(),
            status: TransactionStatus::Started,
            rollback_cursor: NO_ROLLBACK,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records whose effects are currently applied.
    pub fn effect_len(&self) -> usize {
        if self.rollback_cursor == NO_ROLLBACK {
            self.records.len()
        } else {
            self.rollback_cursor as usize
        }
    }

    /// The records whose effects are currently applied.
    pub fn effect_records(&self) -> &[UndoableCommand] {
        &self.records[..self.effect_len()]
    }

    /// Mark the transaction committed; only a started transaction may
    /// commit.
    pub fn commit(&mut self) -> Result<(), TransactionError> {
        if self.status != TransactionStatus::Started {
            return Err(TransactionError::AlreadyClosed {
                status: self.status,
            });
        }
        self.status = TransactionStatus::Committed;
        Ok(())
    }

    /// Mark the transaction failed (its exec path raised); rollback follows.
    pub fn fail(&mut self) {
        self.status = TransactionStatus::Failed;
    }

    /// Undo every applied record, newest first.
    pub fn rollback(&mut self, fs: &FsOps) -> Result<(), TransactionError> {
        self.rollback_keeping(0, fs)
    }

    /// Undo applied records, newest first, until only `keeps` remain.
    ///
    /// A transaction rolled back after a forward failure keeps its `FAILED`
    /// status; an explicitly rolled back transaction becomes `ROLLED_BACK`.
    pub fn rollback_keeping(&mut self, keeps: usize, fs: &FsOps) -> Result<(), TransactionError> {
        if self.status != TransactionStatus::Failed {
            self.status = TransactionStatus::RolledBack;
        }
        while self.effect_len() > keeps {
            self.rollback_step(fs)?;
        }
        Ok(())
    }

    /// Undo the single newest applied record.
    ///
    /// Returns `Ok(false)` when nothing is left to undo. The manager uses
    /// this to interleave rollbacks with forward execution during sync.
    pub fn rollback_step(&mut self, fs: &FsOps) -> Result<bool, TransactionError> {
        let applied = self.effect_len();
        if applied == 0 {
            return Ok(false);
        }
        let index = applied - 1;
        let result = self.records[index].undo(fs);
        if !result.ok() {
            self.status = TransactionStatus::FailedRollback;
            return Err(TransactionError::UndoFailed {
                cmdline: result.cmdline,
                stderr: result.stderr.unwrap_or_default(),
            });
        }
        self.rollback_cursor = index as i64;
        Ok(true)
    }
}
