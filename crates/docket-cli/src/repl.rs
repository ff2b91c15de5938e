//! Line-oriented console session shared by both front-ends.
//!
//! One [`Session`] owns the ordered index, the undo/redo history, and the
//! snapshot path. The loop reads a command word (plus an optional id
//! argument) per line and prompts for anything else it needs, so a whole
//! interaction can be scripted through stdin. The index is re-saved after
//! every successful mutation; the history lives only for the process.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, Local};
use docket_core::{
    snapshot, Command, FieldPatch, FieldValue, History, HistoryError, OrderedIndex, Record,
    RecordId, SubRecord,
};
use tracing::{debug, info};

use crate::output;
use crate::schema::{
    Schema, STATUS_DELIVERED, STATUS_IN_VAN, STATUS_PENDING, VAN_CAPACITY,
};

const STATUS_FIELD: &str = "status";

/// One walk-up arrival waiting to be processed, oldest first.
struct CheckIn {
    target: RecordId,
    name: String,
    at: DateTime<Local>,
}

/// An open console over one snapshot file.
pub struct Session<'a> {
    schema: &'a Schema,
    index: OrderedIndex,
    history: History,
    snapshot_path: PathBuf,
    check_ins: VecDeque<CheckIn>,
}

impl<'a> Session<'a> {
    /// Load the schema's snapshot from `data_dir`, or start empty when no
    /// snapshot exists yet.
    ///
    /// # Errors
    ///
    /// Fails when an existing snapshot cannot be read or parsed.
    pub fn open(schema: &'a Schema, data_dir: &Path) -> anyhow::Result<Self> {
        let snapshot_path = data_dir.join(schema.snapshot_file);
        let index = if snapshot_path.exists() {
            snapshot::load_from_path(&snapshot_path)
                .with_context(|| format!("loading {}", snapshot_path.display()))?
        } else {
            OrderedIndex::new()
        };
        info!(
            records = index.len(),
            file = %snapshot_path.display(),
            "session opened"
        );
        Ok(Self {
            schema,
            index,
            history: History::new(),
            snapshot_path,
            check_ins: VecDeque::new(),
        })
    }

    /// Run the console loop until `quit` or end of input.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors and on snapshot write failures; user mistakes
    /// (bad ids, invalid input) are reported on `out` instead.
    pub fn run<R: BufRead, W: Write>(mut self, mut input: R, mut out: W) -> anyhow::Result<()> {
        let input: &mut dyn BufRead = &mut input;
        let out: &mut dyn Write = &mut out;

        output::section(out, &format!("docket {} console", self.schema.noun))?;
        writeln!(out, "Type 'help' for commands.")?;
        loop {
            write!(out, "dk> ")?;
            out.flush()?;
            let Some(line) = read_line(input)? else { break };
            let mut words = line.split_whitespace();
            let Some(word) = words.next() else { continue };
            let arg = words.next();
            match word {
                "help" => self.help(out)?,
                "add" => self.add(input, out)?,
                "show" => self.show(arg, out)?,
                "list" => self.list(out)?,
                "schedule" => self.schedule(out)?,
                "update" => self.update(arg, input, out)?,
                "note" => self.note(arg, input, out)?,
                "remove" => self.remove(arg, out)?,
                "undo" => self.undo(out)?,
                "redo" => self.redo(out)?,
                "checkin" if self.schema.has_check_in => self.check_in(arg, input, out)?,
                "next" if self.schema.has_check_in => self.next_check_in(out)?,
                "peek" if self.schema.has_check_in => self.peek_check_in(out)?,
                "load" if self.schema.has_van => self.load_van(out)?,
                "deliver" if self.schema.has_van => self.deliver(out)?,
                "quit" | "exit" => break,
                other => writeln!(out, "Unknown command '{other}'. Type 'help'.")?,
            }
        }
        writeln!(out, "Bye.")?;
        Ok(())
    }

    fn help(&self, out: &mut dyn Write) -> io::Result<()> {
        let noun = self.schema.noun;
        output::section(out, "Commands")?;
        writeln!(out, "  add              create a new {noun}")?;
        writeln!(out, "  show <id>        display one {noun}")?;
        writeln!(out, "  list             all {noun}s in id order")?;
        if let Some(field) = self.schema.priority_field {
            writeln!(out, "  schedule         all {noun}s by {field}, then id")?;
        }
        writeln!(out, "  update <id>      change fields (Enter keeps current)")?;
        writeln!(out, "  note <id>        record a {}", self.schema.entry_noun)?;
        writeln!(out, "  remove <id>      delete a {noun}")?;
        writeln!(out, "  undo / redo      step through the change history")?;
        if self.schema.has_check_in {
            writeln!(out, "  checkin <id>     queue a walk-up arrival")?;
            writeln!(out, "  next / peek      process or inspect the queue head")?;
        }
        if self.schema.has_van {
            writeln!(
                out,
                "  load             load up to {VAN_CAPACITY} pending {noun}s onto the van"
            )?;
            writeln!(out, "  deliver          mark every loaded {noun} delivered")?;
        }
        writeln!(out, "  quit             save and leave")?;
        Ok(())
    }

    // ---- record CRUD ------------------------------------------------------

    fn add(&mut self, input: &mut dyn BufRead, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some(raw) = prompt(input, out, self.schema.id_prompt)? else {
            return Ok(());
        };
        let id = match raw.parse::<RecordId>() {
            Ok(id) => id,
            Err(err) => {
                writeln!(out, "{err}")?;
                return Ok(());
            }
        };
        if self.index.contains(id) {
            writeln!(out, "{} {id} already exists.", self.schema.noun)?;
            return Ok(());
        }

        let mut record = Record::new(id);
        for spec in self.schema.fields {
            let patch = loop {
                let Some(raw) = prompt(input, out, spec.prompt)? else {
                    return Ok(());
                };
                match spec.patch(&raw) {
                    Some(patch) => break patch,
                    None => writeln!(out, "{}", spec.rejection_hint())?,
                }
            };
            record.set_field(patch.name().to_string(), patch.value().clone());
        }
        if self.schema.has_van {
            record.set_field(STATUS_FIELD, FieldValue::Text(STATUS_PENDING.to_string()));
        }

        self.index.insert(record)?;
        self.persist()?;
        writeln!(out, "Added {} {id}.", self.schema.noun)?;
        Ok(())
    }

    fn show(&self, arg: Option<&str>, out: &mut dyn Write) -> io::Result<()> {
        let Some(id) = parse_id_arg(arg, out)? else {
            return Ok(());
        };
        match self.index.find(id) {
            None => writeln!(out, "No {} with id {id}.", self.schema.noun),
            Some(record) => self.render(record, out),
        }
    }

    fn render(&self, record: &Record, out: &mut dyn Write) -> io::Result<()> {
        output::section(out, &format!("{} {}", self.schema.noun, record.id()))?;
        for spec in self.schema.fields {
            if let Some(value) = record.field(spec.name) {
                output::kv(out, spec.name, value.to_string())?;
            }
        }
        if self.schema.has_van {
            if let Some(status) = record.field(STATUS_FIELD) {
                output::kv(out, STATUS_FIELD, status.to_string())?;
            }
        }
        if !record.entries().is_empty() {
            writeln!(out, "  {}s:", self.schema.entry_noun)?;
            for entry in record.entries() {
                writeln!(out, "    - {}: {}", entry.name, entry.value)?;
            }
        }
        Ok(())
    }

    fn list(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.index.is_empty() {
            return writeln!(out, "No {}s yet.", self.schema.noun);
        }
        for record in &self.index {
            writeln!(out, "  {:>8}  {}", record.id().0, self.headline(record))?;
        }
        writeln!(out, "({} {}s)", self.index.len(), self.schema.noun)
    }

    /// Listing ordered by the priority level (most urgent first), ties
    /// broken by id.
    fn schedule(&self, out: &mut dyn Write) -> io::Result<()> {
        let Some(field) = self.schema.priority_field else {
            return writeln!(out, "This console has no schedule view.");
        };
        let mut records: Vec<&Record> = self.index.iter().collect();
        records.sort_by_key(|r| {
            let level = r.field(field).and_then(FieldValue::as_level);
            (level.unwrap_or(i64::MAX), r.id())
        });
        output::section(out, &format!("By {field}"))?;
        for record in records {
            let level = record
                .field(field)
                .and_then(FieldValue::as_level)
                .map_or_else(|| "-".to_string(), |n| n.to_string());
            writeln!(
                out,
                "  [{level}] {:>8}  {}",
                record.id().0,
                self.headline(record)
            )?;
        }
        Ok(())
    }

    fn headline(&self, record: &Record) -> String {
        self.schema
            .fields
            .first()
            .and_then(|spec| record.field(spec.name))
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    fn update(
        &mut self,
        arg: Option<&str>,
        input: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let Some(id) = parse_id_arg(arg, out)? else {
            return Ok(());
        };
        if !self.index.contains(id) {
            writeln!(out, "No {} with id {id}.", self.schema.noun)?;
            return Ok(());
        }
        writeln!(out, "Press Enter to keep a current value.")?;

        let mut patch: Vec<FieldPatch> = Vec::new();
        for spec in self.schema.fields {
            let current = self
                .index
                .find(id)
                .and_then(|r| r.field(spec.name))
                .map(ToString::to_string)
                .unwrap_or_default();
            let label = format!("{} [{current}]", spec.prompt);
            let Some(raw) = prompt(input, out, &label)? else {
                return Ok(());
            };
            match spec.patch(&raw) {
                Some(p) => patch.push(p),
                // Blank means keep; anything else that failed the gate is
                // reported and dropped, same as keeping.
                None if raw.trim().is_empty() => {}
                None => writeln!(out, "{} Keeping the current value.", spec.rejection_hint())?,
            }
        }

        // An all-kept update still goes through the history, so undo walks
        // back over it like any other command.
        match self.history.execute(Command::update_fields(id, patch), &mut self.index) {
            Ok(target) => {
                self.persist()?;
                writeln!(out, "Updated {} {target}.", self.schema.noun)?;
            }
            Err(err) => writeln!(out, "Update failed: {err}")?,
        }
        Ok(())
    }

    fn note(
        &mut self,
        arg: Option<&str>,
        input: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let Some(id) = parse_id_arg(arg, out)? else {
            return Ok(());
        };
        if !self.index.contains(id) {
            writeln!(out, "No {} with id {id}.", self.schema.noun)?;
            return Ok(());
        }
        let Some(name) = prompt(input, out, self.schema.entry_name_prompt)? else {
            return Ok(());
        };
        if name.trim().is_empty() {
            writeln!(out, "A {} needs a name.", self.schema.entry_noun)?;
            return Ok(());
        }
        let Some(value) = prompt(input, out, self.schema.entry_value_prompt)? else {
            return Ok(());
        };

        let entry = SubRecord::new(name.trim(), value.trim());
        match self
            .history
            .execute(Command::append_sub_record(id, entry), &mut self.index)
        {
            Ok(target) => {
                self.persist()?;
                writeln!(
                    out,
                    "Recorded {} for {} {target}.",
                    self.schema.entry_noun, self.schema.noun
                )?;
            }
            Err(err) => writeln!(out, "Could not record {}: {err}", self.schema.entry_noun)?,
        }
        Ok(())
    }

    fn remove(&mut self, arg: Option<&str>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some(id) = parse_id_arg(arg, out)? else {
            return Ok(());
        };
        match self.index.remove(id) {
            Ok(record) => {
                self.persist()?;
                let entries = record.entries().len();
                writeln!(
                    out,
                    "Removed {} {id} ({entries} {}s).",
                    self.schema.noun, self.schema.entry_noun
                )?;
            }
            Err(err) => writeln!(out, "{err}")?,
        }
        Ok(())
    }

    // ---- history ----------------------------------------------------------

    fn undo(&mut self, out: &mut dyn Write) -> anyhow::Result<()> {
        match self.history.undo(&mut self.index) {
            Ok(id) => {
                self.persist()?;
                writeln!(out, "Undid last change to {} {id}.", self.schema.noun)?;
            }
            Err(HistoryError::NothingToUndo) => writeln!(out, "Nothing to undo.")?,
            Err(err) => writeln!(out, "Undo failed: {err}")?,
        }
        Ok(())
    }

    fn redo(&mut self, out: &mut dyn Write) -> anyhow::Result<()> {
        match self.history.redo(&mut self.index) {
            Ok(id) => {
                self.persist()?;
                writeln!(out, "Redid change to {} {id}.", self.schema.noun)?;
            }
            Err(HistoryError::NothingToRedo) => writeln!(out, "Nothing to redo.")?,
            Err(err) => writeln!(out, "Redo failed: {err}")?,
        }
        Ok(())
    }

    // ---- check-in queue (events) ------------------------------------------

    fn check_in(
        &mut self,
        arg: Option<&str>,
        input: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        let Some(id) = parse_id_arg(arg, out)? else {
            return Ok(());
        };
        if !self.index.contains(id) {
            return writeln!(out, "No {} with id {id}.", self.schema.noun);
        }
        let Some(name) = prompt(input, out, self.schema.entry_name_prompt)? else {
            return Ok(());
        };
        if name.trim().is_empty() {
            return writeln!(out, "A name is required to check in.");
        }
        self.check_ins.push_back(CheckIn {
            target: id,
            name: name.trim().to_string(),
            at: Local::now(),
        });
        debug!(%id, queued = self.check_ins.len(), "check-in queued");
        writeln!(
            out,
            "Checked in for {} {id}; {} waiting.",
            self.schema.noun,
            self.check_ins.len()
        )
    }

    fn next_check_in(&mut self, out: &mut dyn Write) -> io::Result<()> {
        match self.check_ins.pop_front() {
            None => writeln!(out, "The check-in queue is empty."),
            Some(arrival) => writeln!(
                out,
                "Now serving {} for {} {} (arrived {}).",
                arrival.name,
                self.schema.noun,
                arrival.target,
                arrival.at.format("%H:%M:%S")
            ),
        }
    }

    fn peek_check_in(&self, out: &mut dyn Write) -> io::Result<()> {
        match self.check_ins.front() {
            None => writeln!(out, "The check-in queue is empty."),
            Some(arrival) => writeln!(
                out,
                "Next up: {} for {} {} (arrived {}).",
                arrival.name,
                self.schema.noun,
                arrival.target,
                arrival.at.format("%H:%M:%S")
            ),
        }
    }

    // ---- van workflow (parcels) -------------------------------------------

    fn ids_with_status(&self, status: &str) -> Vec<RecordId> {
        self.index
            .iter()
            .filter(|r| {
                r.field(STATUS_FIELD).and_then(FieldValue::as_text) == Some(status)
            })
            .map(Record::id)
            .collect()
    }

    /// Load the most urgent pending parcels, up to the van's remaining
    /// capacity. Each load is an ordinary field update on the history, so
    /// it can be undone one parcel at a time.
    fn load_van(&mut self, out: &mut dyn Write) -> anyhow::Result<()> {
        let loaded = self.ids_with_status(STATUS_IN_VAN).len();
        let space = VAN_CAPACITY.saturating_sub(loaded);
        if space == 0 {
            writeln!(out, "The van is full ({VAN_CAPACITY} {}s).", self.schema.noun)?;
            return Ok(());
        }

        let priority = self.schema.priority_field;
        let mut pending: Vec<(i64, RecordId)> = self
            .index
            .iter()
            .filter(|r| {
                r.field(STATUS_FIELD).and_then(FieldValue::as_text) == Some(STATUS_PENDING)
            })
            .map(|r| {
                let level = priority
                    .and_then(|f| r.field(f))
                    .and_then(FieldValue::as_level)
                    .unwrap_or(i64::MAX);
                (level, r.id())
            })
            .collect();
        pending.sort_unstable();
        if pending.is_empty() {
            writeln!(out, "No pending {}s to load.", self.schema.noun)?;
            return Ok(());
        }

        for (_, id) in pending.into_iter().take(space) {
            let cmd = Command::update_fields(id, vec![status_patch(STATUS_IN_VAN)]);
            match self.history.execute(cmd, &mut self.index) {
                Ok(_) => writeln!(out, "  loaded {} {id}", self.schema.noun)?,
                Err(err) => writeln!(out, "  {id}: {err}")?,
            }
        }
        self.persist()?;
        writeln!(
            out,
            "Van holds {} of {VAN_CAPACITY} {}s.",
            self.ids_with_status(STATUS_IN_VAN).len(),
            self.schema.noun
        )?;
        Ok(())
    }

    /// Mark everything on the van delivered.
    fn deliver(&mut self, out: &mut dyn Write) -> anyhow::Result<()> {
        let on_van = self.ids_with_status(STATUS_IN_VAN);
        if on_van.is_empty() {
            writeln!(out, "The van is empty.")?;
            return Ok(());
        }
        for id in on_van {
            let cmd = Command::update_fields(id, vec![status_patch(STATUS_DELIVERED)]);
            match self.history.execute(cmd, &mut self.index) {
                Ok(_) => writeln!(out, "  delivered {} {id}", self.schema.noun)?,
                Err(err) => writeln!(out, "  {id}: {err}")?,
            }
        }
        self.persist()?;
        writeln!(out, "Van run complete.")?;
        Ok(())
    }

    // ---- persistence ------------------------------------------------------

    fn persist(&self) -> anyhow::Result<()> {
        snapshot::save_to_path(&self.index, &self.snapshot_path)
            .with_context(|| format!("saving {}", self.snapshot_path.display()))
    }
}

fn status_patch(value: &str) -> FieldPatch {
    FieldPatch::text(STATUS_FIELD, value)
        .map_or_else(|| unreachable!("status values are non-empty"), |p| p)
}

/// Read one line; `None` means end of input.
fn read_line(input: &mut dyn BufRead) -> io::Result<Option<String>> {
    let mut buf = String::new();
    if input.read_line(&mut buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(buf.trim_end_matches(['\r', '\n']).to_string()))
}

fn prompt(
    input: &mut dyn BufRead,
    out: &mut dyn Write,
    label: &str,
) -> io::Result<Option<String>> {
    write!(out, "{label}: ")?;
    out.flush()?;
    read_line(input)
}

fn parse_id_arg(arg: Option<&str>, out: &mut dyn Write) -> io::Result<Option<RecordId>> {
    let Some(raw) = arg else {
        writeln!(out, "An id argument is required.")?;
        return Ok(None);
    };
    match raw.parse::<RecordId>() {
        Ok(id) => Ok(Some(id)),
        Err(err) => {
            writeln!(out, "{err}")?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::schema::{self, Schema};
    use std::io::Cursor;
    use std::path::Path;
    use tempfile::TempDir;

    fn run_script(schema: &Schema, dir: &Path, script: &str) -> String {
        let session = Session::open(schema, dir).unwrap();
        let mut out = Vec::new();
        session.run(Cursor::new(script), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn add_update_undo_redo_round_trip() {
        let dir = TempDir::new().unwrap();
        let script = "add\n10\nRegatta\nrace\n2\n\
                      update 10\n\n\n1\n\
                      show 10\nundo\nshow 10\nredo\nshow 10\nquit\n";
        let out = run_script(&schema::EVENTS, dir.path(), script);

        assert!(out.contains("Added event 10."));
        assert!(out.contains("Updated event 10."));
        assert!(out.contains("Undid last change to event 10."));
        assert!(out.contains("Redid change to event 10."));

        let shows: Vec<&str> = out.matches("importance:").collect();
        assert_eq!(shows.len(), 3);
        let expected = |n: i64| format!("{:<12} {n}", "importance:");
        let first = out.find(&expected(1)).unwrap();
        let back = out[first + 1..].find(&expected(2)).unwrap();
        assert!(out[first + 1 + back..].contains(&expected(1)));
    }

    #[test]
    fn add_rejects_duplicate_ids_and_bad_levels() {
        let dir = TempDir::new().unwrap();
        // Second add reuses id 5; the importance prompt first gets 9, which
        // is re-prompted until a valid value arrives.
        let script = "add\n5\nGala\nparty\n9\n2\nadd\n5\nquit\n";
        let out = run_script(&schema::EVENTS, dir.path(), script);
        assert!(out.contains("Enter a number from 1 to 3."));
        assert!(out.contains("Added event 5."));
        assert!(out.contains("event 5 already exists."));
    }

    #[test]
    fn attendee_note_round_trips_through_undo() {
        let dir = TempDir::new().unwrap();
        let script = "add\n3\nFair\nmarket\n2\n\
                      note 3\nMarge\n555-0117\n\
                      show 3\nundo\nshow 3\nquit\n";
        let out = run_script(&schema::EVENTS, dir.path(), script);
        assert!(out.contains("Recorded attendee for event 3."));
        assert!(out.contains("- Marge: 555-0117"));
        // After the undo, the attendee line appears exactly once.
        assert_eq!(out.matches("- Marge: 555-0117").count(), 1);
    }

    #[test]
    fn check_in_queue_is_first_come_first_served() {
        let dir = TempDir::new().unwrap();
        let script = "add\n8\nExpo\nfair\n1\n\
                      checkin 8\nAda\ncheckin 8\nGrace\n\
                      peek\nnext\nnext\nnext\nquit\n";
        let out = run_script(&schema::EVENTS, dir.path(), script);
        assert!(out.contains("Next up: Ada"));
        let ada = out.find("Now serving Ada").unwrap();
        let grace = out.find("Now serving Grace").unwrap();
        assert!(ada < grace);
        assert!(out.contains("The check-in queue is empty."));
    }

    #[test]
    fn van_loads_by_urgency_and_delivery_is_undoable() {
        let dir = TempDir::new().unwrap();
        let script = "add\n7\nAda\nGrace\n12 Pike St\nnorth\n4\n\
                      add\n3\nBob\nEve\n9 Elm Ave\nnorth\n1\n\
                      load\ndeliver\nundo\nshow 7\nquit\n";
        let out = run_script(&schema::PARCELS, dir.path(), script);

        // Urgency 1 loads before urgency 4.
        let first = out.find("loaded parcel 3").unwrap();
        let second = out.find("loaded parcel 7").unwrap();
        assert!(first < second);
        assert!(out.contains("delivered parcel 3"));
        assert!(out.contains("delivered parcel 7"));

        // Parcel 7 was delivered last, so the undo puts it back on the van.
        assert!(out.contains("Undid last change to parcel 7."));
        let expected = format!("{:<12} {}", "status:", "in-van");
        assert!(out.contains(&expected));
    }

    #[test]
    fn van_capacity_caps_a_single_load() {
        let dir = TempDir::new().unwrap();
        let mut script = String::new();
        for id in 1..=6 {
            script.push_str(&format!("add\n{id}\nC{id}\nR{id}\nAddr {id}\nwest\n3\n"));
        }
        script.push_str("load\nquit\n");
        let out = run_script(&schema::PARCELS, dir.path(), &script);
        assert_eq!(out.matches("loaded parcel").count(), 5);
        assert!(out.contains("Van holds 5 of 5 parcels."));
        assert!(!out.contains("loaded parcel 6"));
    }

    #[test]
    fn snapshot_survives_reopening_the_session() {
        let dir = TempDir::new().unwrap();
        let first = "add\n21\nDerby\nrace\n2\nquit\n";
        run_script(&schema::EVENTS, dir.path(), first);

        let out = run_script(&schema::EVENTS, dir.path(), "list\nquit\n");
        assert!(out.contains("21  Derby"));
        assert!(out.contains("(1 events)"));
    }

    #[test]
    fn unknown_and_malformed_commands_are_reported() {
        let dir = TempDir::new().unwrap();
        let out = run_script(
            &schema::EVENTS,
            dir.path(),
            "frobnicate\nshow\nshow twelve\nquit\n",
        );
        assert!(out.contains("Unknown command 'frobnicate'."));
        assert!(out.contains("An id argument is required."));
        assert!(out.contains("invalid record id: 'twelve'"));
    }
}
