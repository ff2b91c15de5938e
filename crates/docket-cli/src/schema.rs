//! Static descriptions of the two console front-ends.
//!
//! A [`Schema`] tells the shared REPL what a record is called, which
//! fields it carries, and which optional workflows (check-in queue, van
//! loading) the console exposes. Both consoles run the same loop in
//! [`crate::repl`]; everything domain-specific lives here.

use std::ops::RangeInclusive;

use docket_core::FieldPatch;

/// Parcels a van can hold at once.
pub const VAN_CAPACITY: usize = 5;

/// Status value assigned to a parcel at creation.
pub const STATUS_PENDING: &str = "pending";
/// Status of a parcel loaded onto the van.
pub const STATUS_IN_VAN: &str = "in-van";
/// Status of a parcel after the van run completes.
pub const STATUS_DELIVERED: &str = "delivered";

/// How one named field is entered and validated.
pub enum FieldKind {
    /// Free text; blank input means "no value".
    Text,
    /// Bounded integer level, lower numbers meaning higher priority.
    Level(RangeInclusive<i64>),
}

/// One prompted field of a record.
pub struct FieldSpec {
    pub name: &'static str,
    pub prompt: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Turn raw console input into a patch, or `None` when the input is
    /// blank (text) or unparseable/out-of-range (level).
    #[must_use]
    pub fn patch(&self, raw: &str) -> Option<FieldPatch> {
        match &self.kind {
            FieldKind::Text => FieldPatch::text(self.name, raw),
            FieldKind::Level(valid) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(|n| FieldPatch::level(self.name, n, valid.clone())),
        }
    }

    /// Message shown when input for this field is rejected.
    #[must_use]
    pub fn rejection_hint(&self) -> String {
        match &self.kind {
            FieldKind::Text => format!("A {} is required.", self.name),
            FieldKind::Level(valid) => {
                format!("Enter a number from {} to {}.", valid.start(), valid.end())
            }
        }
    }
}

/// Everything the REPL needs to run one console flavor.
pub struct Schema {
    /// What a record is called in messages ("event", "parcel").
    pub noun: &'static str,
    /// Prompt for the record's id at creation.
    pub id_prompt: &'static str,
    /// Prompted fields, in entry and display order.
    pub fields: &'static [FieldSpec],
    /// What a sub-record is called ("attendee", "scan").
    pub entry_noun: &'static str,
    pub entry_name_prompt: &'static str,
    pub entry_value_prompt: &'static str,
    /// Snapshot file name inside the data directory.
    pub snapshot_file: &'static str,
    /// Field used to order the `schedule` listing, if any.
    pub priority_field: Option<&'static str>,
    /// Whether records carry a delivery status driven by `load`/`deliver`.
    pub has_van: bool,
    /// Whether the console offers the walk-up check-in queue.
    pub has_check_in: bool,
}

/// Event-management console: events ranked by importance, with named
/// attendees and a walk-up check-in queue.
pub static EVENTS: Schema = Schema {
    noun: "event",
    id_prompt: "Event id",
    fields: &[
        FieldSpec {
            name: "name",
            prompt: "Event name",
            kind: FieldKind::Text,
        },
        FieldSpec {
            name: "category",
            prompt: "Category",
            kind: FieldKind::Text,
        },
        FieldSpec {
            name: "importance",
            prompt: "Importance (1 high .. 3 low)",
            kind: FieldKind::Level(1..=3),
        },
    ],
    entry_noun: "attendee",
    entry_name_prompt: "Attendee name",
    entry_value_prompt: "Contact number",
    snapshot_file: "events.jsonl",
    priority_field: Some("importance"),
    has_van: false,
    has_check_in: true,
};

/// Package-delivery console: parcels ranked by urgency, with scan notes
/// and a five-parcel van workflow.
pub static PARCELS: Schema = Schema {
    noun: "parcel",
    id_prompt: "Tracking number",
    fields: &[
        FieldSpec {
            name: "customer",
            prompt: "Customer name",
            kind: FieldKind::Text,
        },
        FieldSpec {
            name: "recipient",
            prompt: "Recipient name",
            kind: FieldKind::Text,
        },
        FieldSpec {
            name: "address",
            prompt: "Delivery address",
            kind: FieldKind::Text,
        },
        FieldSpec {
            name: "route",
            prompt: "Route code",
            kind: FieldKind::Text,
        },
        FieldSpec {
            name: "urgency",
            prompt: "Urgency (1 high .. 5 low)",
            kind: FieldKind::Level(1..=5),
        },
    ],
    entry_noun: "scan",
    entry_name_prompt: "Scan location",
    entry_value_prompt: "Scan note",
    snapshot_file: "parcels.jsonl",
    priority_field: Some("urgency"),
    has_van: true,
    has_check_in: false,
};
