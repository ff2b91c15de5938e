//! docket-core: an ordered entity index with transactional mutation history.
//!
//! The crate provides four pieces that compose into an undoable keyed
//! store:
//!
//! - [`record`] — keyed records with named fields and an append-only
//!   sub-record list.
//! - [`index`] — [`OrderedIndex`], an unbalanced arena-backed binary
//!   search tree over record ids with successor-copy deletion.
//! - [`command`] — [`Command`], a closed sum of reversible mutations that
//!   re-resolve their target by id on every apply/revert.
//! - [`history`] — [`History`], owned undo/redo stacks with linear
//!   history semantics.
//!
//! [`snapshot`] rounds it out with a line-delimited JSON codec whose load
//! path replays the same insert/append operations used at runtime.
//!
//! Everything is single-threaded and synchronous: one logical actor
//! mutates the index at a time, and every operation runs to completion.
//!
//! # Conventions
//!
//! - **Errors**: per-module `thiserror` enums, propagated with `?`.
//! - **Logging**: `tracing` macros (`debug!` at mutation points).

pub mod command;
pub mod history;
pub mod index;
pub mod record;
pub mod snapshot;

pub use command::{ApplyError, Command};
pub use history::{History, HistoryError};
pub use index::{IndexError, OrderedIndex};
pub use record::{
    FieldPatch, FieldValue, ParseRecordIdError, Record, RecordId, SubList, SubListError, SubRecord,
};
pub use snapshot::SnapshotError;
