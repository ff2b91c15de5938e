//! Undo/redo history: two ordered stacks of commands.
//!
//! `execute` is the only entry point for mutating records through
//! commands. It applies the command, pushes it onto the undo stack, and
//! drops the whole redo stack, so history is linear: once a new command is
//! executed, the undone branch is gone for good.
//!
//! Every command in the undo stack is in the applied state; every command
//! in the redo stack is reverted. Commands move between the stacks on
//! undo/redo and are owned by exactly one stack at a time. A failed
//! revert/apply (target removed since) puts the command back, leaving both
//! stacks exactly as they were.

use crate::command::{ApplyError, Command};
use crate::index::OrderedIndex;
use crate::record::RecordId;
use tracing::debug;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors reported by history operations.
///
/// The two empty-stack variants are user-facing, non-fatal conditions, not
/// program errors: the caller reports them and carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// The undo stack is empty.
    #[error("nothing to undo")]
    NothingToUndo,
    /// The redo stack is empty.
    #[error("nothing to redo")]
    NothingToRedo,
    /// The command could not be re-applied or reverted.
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Owned undo/redo stacks over an [`OrderedIndex`]'s records.
#[derive(Debug, Default)]
pub struct History {
    undo: Vec<Command>,
    redo: Vec<Command>,
}

impl History {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Apply `cmd` and record it. Clears the redo stack on success.
    ///
    /// Returns the id of the mutated record for caller-side reporting.
    ///
    /// # Errors
    ///
    /// Propagates [`ApplyError`] from the wrapped mutation; neither stack
    /// changes on failure.
    pub fn execute(
        &mut self,
        mut cmd: Command,
        index: &mut OrderedIndex,
    ) -> Result<RecordId, ApplyError> {
        cmd.apply(index)?;
        let target = cmd.target();
        debug!(kind = cmd.kind(), %target, "executed command");
        if !self.redo.is_empty() {
            debug!(discarded = self.redo.len(), "new execution clears redo stack");
        }
        self.undo.push(cmd);
        self.redo.clear();
        Ok(target)
    }

    /// Revert the most recently applied command and move it to redo.
    ///
    /// # Errors
    ///
    /// [`HistoryError::NothingToUndo`] on an empty undo stack (no state
    /// change); [`HistoryError::Apply`] when the revert itself fails, in
    /// which case the command stays on the undo stack untouched.
    pub fn undo(&mut self, index: &mut OrderedIndex) -> Result<RecordId, HistoryError> {
        let mut cmd = self.undo.pop().ok_or(HistoryError::NothingToUndo)?;
        if let Err(err) = cmd.revert(index) {
            self.undo.push(cmd);
            return Err(err.into());
        }
        let target = cmd.target();
        debug!(kind = cmd.kind(), %target, "undid command");
        self.redo.push(cmd);
        Ok(target)
    }

    /// Re-apply the most recently undone command and move it back to undo.
    ///
    /// # Errors
    ///
    /// [`HistoryError::NothingToRedo`] on an empty redo stack (no state
    /// change); [`HistoryError::Apply`] when the re-apply fails, in which
    /// case the command stays on the redo stack untouched.
    pub fn redo(&mut self, index: &mut OrderedIndex) -> Result<RecordId, HistoryError> {
        let mut cmd = self.redo.pop().ok_or(HistoryError::NothingToRedo)?;
        if let Err(err) = cmd.apply(index) {
            self.redo.push(cmd);
            return Err(err.into());
        }
        let target = cmd.target();
        debug!(kind = cmd.kind(), %target, "redid command");
        self.undo.push(cmd);
        Ok(target)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{History, HistoryError};
    use crate::command::{ApplyError, Command};
    use crate::index::OrderedIndex;
    use crate::record::{FieldPatch, FieldValue, Record, RecordId, SubRecord};

    fn seeded() -> (OrderedIndex, History) {
        let mut index = OrderedIndex::new();
        index
            .insert(Record::new(RecordId(30)).with_field("name", FieldValue::Text("one".into())))
            .expect("fresh index");
        (index, History::new())
    }

    fn rename(to: &str) -> Command {
        Command::update_fields(
            RecordId(30),
            vec![FieldPatch::text("name", to).expect("non-empty")],
        )
    }

    #[test]
    fn empty_stacks_report_and_do_nothing() {
        let (mut index, mut history) = seeded();
        let before = index.find(RecordId(30)).unwrap().clone();
        assert_eq!(history.undo(&mut index), Err(HistoryError::NothingToUndo));
        assert_eq!(history.redo(&mut index), Err(HistoryError::NothingToRedo));
        assert_eq!(index.find(RecordId(30)).unwrap(), &before);
    }

    #[test]
    fn undo_then_redo_round_trips() {
        let (mut index, mut history) = seeded();
        history.execute(rename("two"), &mut index).unwrap();

        history.undo(&mut index).unwrap();
        assert_eq!(
            index.find(RecordId(30)).unwrap().field("name"),
            Some(&FieldValue::Text("one".into()))
        );
        assert!(history.can_redo());

        history.redo(&mut index).unwrap();
        assert_eq!(
            index.find(RecordId(30)).unwrap().field("name"),
            Some(&FieldValue::Text("two".into()))
        );
        assert!(!history.can_redo());
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn new_execution_discards_redo_branch() {
        let (mut index, mut history) = seeded();
        history.execute(rename("c1"), &mut index).unwrap();
        history.execute(rename("c2"), &mut index).unwrap();
        history.undo(&mut index).unwrap();
        history.execute(rename("c3"), &mut index).unwrap();

        // c2 is permanently discarded.
        assert_eq!(history.redo(&mut index), Err(HistoryError::NothingToRedo));
        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn append_undo_redo_scenario() {
        let (mut index, mut history) = seeded();
        history
            .execute(
                Command::append_sub_record(RecordId(30), SubRecord::new("A", "")),
                &mut index,
            )
            .unwrap();

        history.undo(&mut index).unwrap();
        assert!(index.find(RecordId(30)).unwrap().entries().is_empty());

        history.redo(&mut index).unwrap();
        let names: Vec<&str> = index
            .find(RecordId(30))
            .unwrap()
            .entries()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["A"]);
    }

    #[test]
    fn failed_undo_leaves_stacks_untouched() {
        let (mut index, mut history) = seeded();
        history.execute(rename("two"), &mut index).unwrap();
        index.remove(RecordId(30)).unwrap();

        let err = history.undo(&mut index).unwrap_err();
        assert_eq!(
            err,
            HistoryError::Apply(ApplyError::TargetMissing(RecordId(30)))
        );
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(history.redo_depth(), 0);

        // Re-inserting the target makes the same undo succeed.
        index
            .insert(Record::new(RecordId(30)).with_field("name", FieldValue::Text("two".into())))
            .unwrap();
        history.undo(&mut index).unwrap();
        assert_eq!(
            index.find(RecordId(30)).unwrap().field("name"),
            Some(&FieldValue::Text("one".into()))
        );
    }

    #[test]
    fn stack_states_track_applied_flags() {
        let (mut index, mut history) = seeded();
        history.execute(rename("two"), &mut index).unwrap();
        assert!(history.undo.iter().all(Command::is_applied));

        history.undo(&mut index).unwrap();
        assert!(history.redo.iter().all(|c| !c.is_applied()));
    }
}
