//! Records, field values, and the append-only sub-record list.
//!
//! A [`Record`] is a keyed bundle of named attributes plus an ordered list
//! of dependent [`SubRecord`]s (attendees, scan notes, and so on). The id
//! is immutable after creation; everything else is mutated through
//! commands so the change can be undone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// RecordId
// ---------------------------------------------------------------------------

/// Caller-chosen integer key, unique within one [`crate::OrderedIndex`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Error returned when parsing a [`RecordId`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid record id: '{got}'")]
pub struct ParseRecordIdError {
    pub got: String,
}

impl FromStr for RecordId {
    type Err = ParseRecordIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ParseRecordIdError { got: s.to_string() })
    }
}

// ---------------------------------------------------------------------------
// Field values and patches
// ---------------------------------------------------------------------------

/// A single named attribute value: free text or a bounded numeric level.
///
/// Serialized untagged, so snapshots carry plain JSON strings and integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Level(i64),
    Text(String),
}

impl FieldValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Level(_) => None,
        }
    }

    #[must_use]
    pub const fn as_level(&self) -> Option<i64> {
        match self {
            Self::Level(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One validated field overwrite inside an update command.
///
/// Construction is the partial-update gate: a patch only exists when the
/// supplied value is *present* — non-empty trimmed text, or a level inside
/// its valid range. Fields without a patch are untouched on both apply and
/// revert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPatch {
    name: String,
    value: FieldValue,
}

impl FieldPatch {
    /// Build a text patch, or `None` when the input trims to empty
    /// (the "press Enter to keep the current value" convention).
    #[must_use]
    pub fn text(name: impl Into<String>, value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            name: name.into(),
            value: FieldValue::Text(trimmed.to_string()),
        })
    }

    /// Build a level patch, or `None` when `value` falls outside `valid`.
    #[must_use]
    pub fn level(name: impl Into<String>, value: i64, valid: RangeInclusive<i64>) -> Option<Self> {
        if !valid.contains(&value) {
            return None;
        }
        Some(Self {
            name: name.into(),
            value: FieldValue::Level(value),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn value(&self) -> &FieldValue {
        &self.value
    }
}

// ---------------------------------------------------------------------------
// Sub-records
// ---------------------------------------------------------------------------

/// A dependent name/value pair owned by a record (e.g. attendee → phone).
/// Duplicates are permitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRecord {
    pub name: String,
    pub value: String,
}

impl SubRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Error returned by [`SubList::remove_last`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubListError {
    /// The list has no entries to remove.
    #[error("sub-record list is empty")]
    Empty,
    /// The expected entry is not the current tail.
    #[error("sub-record is not the current tail of the list")]
    NotTail,
}

/// Append-only, order-preserving list of [`SubRecord`]s.
///
/// `append` is amortized O(1). Removal exists only as the exact inverse of
/// the most recent append: [`SubList::remove_last`] checks identity against
/// the current tail and refuses anything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubList {
    items: Vec<SubRecord>,
}

impl SubList {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Append `item`, preserving insertion order.
    pub fn append(&mut self, item: SubRecord) {
        self.items.push(item);
    }

    /// Remove and return the tail entry, which must equal `expected`.
    ///
    /// # Errors
    ///
    /// [`SubListError::Empty`] when the list has no entries;
    /// [`SubListError::NotTail`] when `expected` is not the current tail.
    /// On error the list is unchanged.
    pub fn remove_last(&mut self, expected: &SubRecord) -> Result<SubRecord, SubListError> {
        let Some(tail) = self.items.pop() else {
            return Err(SubListError::Empty);
        };
        if tail != *expected {
            self.items.push(tail);
            return Err(SubListError::NotTail);
        }
        Ok(tail)
    }

    #[must_use]
    pub fn last(&self) -> Option<&SubRecord> {
        self.items.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SubRecord> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a SubList {
    type Item = &'a SubRecord;
    type IntoIter = std::slice::Iter<'a, SubRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A keyed entity: immutable id, mutable named fields, owned sub-list.
///
/// Tree links live in the index arena, not here, so a record can move
/// between nodes (successor-copy deletion) without touching its contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    #[serde(default)]
    fields: BTreeMap<String, FieldValue>,
    #[serde(default)]
    entries: SubList,
}

impl Record {
    #[must_use]
    pub const fn new(id: RecordId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
            entries: SubList::new(),
        }
    }

    /// Builder-style field initialization for record construction.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    #[must_use]
    pub const fn id(&self) -> RecordId {
        self.id
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Overwrite one field, returning the prior value if any.
    pub fn set_field(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(name.into(), value)
    }

    /// Remove one field, returning the prior value if any.
    pub fn clear_field(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub const fn entries(&self) -> &SubList {
        &self.entries
    }

    pub const fn entries_mut(&mut self) -> &mut SubList {
        &mut self.entries
    }
}
