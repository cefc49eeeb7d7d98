use crate::error::InjectorError;
use crate::input::intent::{InputInjector, MovementIntent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use uuid::Uuid;

/// One line of the intent journal.
#[derive(Debug, Clone, Serialize)]
pub struct IntentJournalEntry {
    pub session_id: Uuid,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub intent: MovementIntent,
    /// How long the click of a recenter is held.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_ms: Option<u64>,
}

/// Appends intents as JSON lines for an out-of-process injector to consume.
pub struct JournalInjector<W: Write + Send = BufWriter<File>> {
    writer: W,
    session_id: Uuid,
    seq: u64,
    click_hold_ms: u64,
}

impl JournalInjector<BufWriter<File>> {
    pub fn open(path: &Path, click_hold_ms: u64) -> Result<Self, InjectorError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::with_writer(BufWriter::new(file), click_hold_ms))
    }
}

impl<W: Write + Send> JournalInjector<W> {
    pub fn with_writer(writer: W, click_hold_ms: u64) -> Self {
        Self {
            writer,
            session_id: Uuid::new_v4(),
            seq: 0,
            click_hold_ms,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> InputInjector for JournalInjector<W> {
    fn dispatch(&mut self, intent: MovementIntent) -> Result<(), InjectorError> {
        self.seq += 1;
        let entry = IntentJournalEntry {
            session_id: self.session_id,
            seq: self.seq,
            timestamp: Utc::now(),
            intent,
            hold_ms: matches!(intent, MovementIntent::Recenter { .. })
                .then_some(self.click_hold_ms),
        };
        serde_json::to_writer(&mut self.writer, &entry)?;
        self.writer.write_all(b"\n")?;
        // Consumers tail the file, so every line goes out immediately.
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), InjectorError> {
        self.writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "JournalInjector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_json_line_per_intent() {
        let mut journal = JournalInjector::with_writer(Vec::new(), 40);
        let session = journal.session_id();
        journal
            .dispatch(MovementIntent::Recenter { x: 0.2, y: 0.8 })
            .expect("dispatch");
        journal
            .dispatch(MovementIntent::DragMove { x: 0.25, y: 0.75 })
            .expect("dispatch");
        journal.dispatch(MovementIntent::ReleaseDrag).expect("dispatch");

        let bytes = journal.into_inner();
        let lines: Vec<serde_json::Value> = String::from_utf8(bytes)
            .expect("utf8")
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["type"], "recenter");
        assert_eq!(lines[0]["hold_ms"], 40);
        assert_eq!(lines[0]["session_id"], session.to_string());
        assert_eq!(lines[1]["type"], "drag_move");
        assert!(lines[1].get("hold_ms").is_none());
        assert_eq!(lines[2]["type"], "release_drag");
        assert_eq!(lines[2]["seq"], 3);
    }

    #[test]
    fn open_creates_parent_directories_and_appends() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state").join("intents.jsonl");
        {
            let mut journal = JournalInjector::open(&path, 40).expect("open");
            journal.dispatch(MovementIntent::ReleaseDrag).expect("dispatch");
        }
        {
            let mut journal = JournalInjector::open(&path, 40).expect("reopen");
            journal.dispatch(MovementIntent::ReleaseDrag).expect("dispatch");
        }
        let contents = std::fs::read_to_string(&path).expect("read");
        assert_eq!(contents.lines().count(), 2);
    }
}
