//! Reversible mutation commands.
//!
//! A command is a reified unit of change over one record: `apply` moves the
//! record to the "after" state and captures whatever is needed to restore
//! "before"; `revert` restores exactly that. The two variants form a closed
//! sum so every `apply`/`revert` site is checked for exhaustiveness.
//!
//! Commands never hold a reference into the tree. They address their target
//! by [`RecordId`] and re-resolve through the index on every apply/revert,
//! failing with [`ApplyError::TargetMissing`] when the record has been
//! removed in the meantime. Successor-copy deletion can overwrite a node's
//! contents in place, so id re-resolution is the only safe addressing mode.

use crate::index::OrderedIndex;
use crate::record::{FieldPatch, FieldValue, RecordId, SubListError, SubRecord};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Reason a command could not be applied or reverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    /// The target record was removed after this command was built.
    #[error("target record {0} no longer exists")]
    TargetMissing(RecordId),
    /// The target's sub-list is out of step with this command's capture.
    #[error("sub-record list is out of step with history: {0}")]
    SubList(#[from] SubListError),
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A reversible mutation over one record in an [`OrderedIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    UpdateFields(UpdateFields),
    AppendSubRecord(AppendSubRecord),
}

impl Command {
    /// Partial field update. Patches that failed the presence/range gate
    /// are simply absent from `patch`; untouched fields stay untouched on
    /// both apply and revert.
    #[must_use]
    pub const fn update_fields(target: RecordId, patch: Vec<FieldPatch>) -> Self {
        Self::UpdateFields(UpdateFields {
            target,
            patch,
            prior: Vec::new(),
            applied: false,
        })
    }

    /// Append one sub-record to the target's sub-list.
    #[must_use]
    pub const fn append_sub_record(target: RecordId, entry: SubRecord) -> Self {
        Self::AppendSubRecord(AppendSubRecord {
            target,
            entry,
            applied: false,
        })
    }

    /// The record this command addresses.
    #[must_use]
    pub const fn target(&self) -> RecordId {
        match self {
            Self::UpdateFields(cmd) => cmd.target,
            Self::AppendSubRecord(cmd) => cmd.target,
        }
    }

    /// Short kind tag for log lines.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UpdateFields(_) => "update-fields",
            Self::AppendSubRecord(_) => "append-sub-record",
        }
    }

    /// True between a successful apply and the matching revert.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        match self {
            Self::UpdateFields(cmd) => cmd.applied,
            Self::AppendSubRecord(cmd) => cmd.applied,
        }
    }

    /// Mutate the target to the "after" state, capturing the prior state.
    ///
    /// # Errors
    ///
    /// [`ApplyError::TargetMissing`] when the target id is no longer in the
    /// index. The index is unchanged on error.
    pub fn apply(&mut self, index: &mut OrderedIndex) -> Result<(), ApplyError> {
        debug_assert!(!self.is_applied(), "apply on an already-applied command");
        match self {
            Self::UpdateFields(cmd) => cmd.apply(index),
            Self::AppendSubRecord(cmd) => cmd.apply(index),
        }
    }

    /// Restore exactly the state captured by the last `apply`.
    ///
    /// # Errors
    ///
    /// [`ApplyError::TargetMissing`] when the target id is no longer in the
    /// index; [`ApplyError::SubList`] when the captured sub-record is no
    /// longer the tail. The index is unchanged on error.
    pub fn revert(&mut self, index: &mut OrderedIndex) -> Result<(), ApplyError> {
        debug_assert!(self.is_applied(), "revert on an unapplied command");
        match self {
            Self::UpdateFields(cmd) => cmd.revert(index),
            Self::AppendSubRecord(cmd) => cmd.revert(index),
        }
    }
}

// ---------------------------------------------------------------------------
// UpdateFields
// ---------------------------------------------------------------------------

/// Partial-update command: overwrite only the patched fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFields {
    target: RecordId,
    patch: Vec<FieldPatch>,
    /// Prior value (or absence) per patched field, captured on apply.
    prior: Vec<(String, Option<FieldValue>)>,
    applied: bool,
}

impl UpdateFields {
    fn apply(&mut self, index: &mut OrderedIndex) -> Result<(), ApplyError> {
        let record = index
            .find_mut(self.target)
            .ok_or(ApplyError::TargetMissing(self.target))?;
        self.prior = self
            .patch
            .iter()
            .map(|patch| (patch.name().to_string(), record.field(patch.name()).cloned()))
            .collect();
        for patch in &self.patch {
            record.set_field(patch.name(), patch.value().clone());
        }
        self.applied = true;
        Ok(())
    }

    fn revert(&mut self, index: &mut OrderedIndex) -> Result<(), ApplyError> {
        let record = index
            .find_mut(self.target)
            .ok_or(ApplyError::TargetMissing(self.target))?;
        // Reverse order, in case the patch names a field twice.
        for (name, prior) in self.prior.iter().rev() {
            match prior {
                Some(value) => {
                    record.set_field(name.clone(), value.clone());
                }
                None => {
                    record.clear_field(name);
                }
            }
        }
        self.applied = false;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AppendSubRecord
// ---------------------------------------------------------------------------

/// Append command: push one sub-record; revert pops exactly it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendSubRecord {
    target: RecordId,
    entry: SubRecord,
    applied: bool,
}

impl AppendSubRecord {
    fn apply(&mut self, index: &mut OrderedIndex) -> Result<(), ApplyError> {
        let record = index
            .find_mut(self.target)
            .ok_or(ApplyError::TargetMissing(self.target))?;
        record.entries_mut().append(self.entry.clone());
        self.applied = true;
        Ok(())
    }

    fn revert(&mut self, index: &mut OrderedIndex) -> Result<(), ApplyError> {
        let record = index
            .find_mut(self.target)
            .ok_or(ApplyError::TargetMissing(self.target))?;
        record.entries_mut().remove_last(&self.entry)?;
        self.applied = false;
        Ok(())
    }
}
