//! JSONL file writer for deliberation events.
//!
//! Each event is serialized as a single JSON line with a `type` field and
//! `timestamp`, appended to the file via a buffered writer.

use delib_application::{DeliberationProgress, ProgressError};
use delib_domain::{Consensus, Round};
use serde_json::{Value, json};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Transcript logger that writes one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every event and
/// on `Drop`.
pub struct JsonlTranscriptLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlTranscriptLogger {
    /// Create a new logger writing to the given path.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Returns `None` if the file cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create transcript directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not create transcript file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the transcript file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event, merging object payloads with `type` and `timestamp`.
    fn write_event(&self, event_type: &str, session_id: &str, payload: Value) -> std::io::Result<()> {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let record = match payload {
            Value::Object(mut map) => {
                map.insert("type".to_string(), Value::String(event_type.to_string()));
                map.insert("session_id".to_string(), Value::String(session_id.to_string()));
                map.insert("timestamp".to_string(), Value::String(timestamp));
                Value::Object(map)
            }
            other => json!({
                "type": event_type,
                "session_id": session_id,
                "timestamp": timestamp,
                "data": other,
            }),
        };

        let line = serde_json::to_string(&record)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{}", line)?;
        writer.flush()
    }

    fn log_best_effort(&self, event_type: &str, session_id: &str, payload: Value) {
        if let Err(e) = self.write_event(event_type, session_id, payload) {
            warn!(path = %self.path.display(), "Failed to write {event_type} event: {e}");
        }
    }
}

impl DeliberationProgress for JsonlTranscriptLogger {
    fn on_round_start(&self, session_id: &str, round: usize, participants: usize) {
        self.log_best_effort(
            "round_start",
            session_id,
            json!({"round": round, "participants": participants}),
        );
    }

    fn on_participant_complete(&self, session_id: &str, participant: &str, success: bool) {
        self.log_best_effort(
            "participant_complete",
            session_id,
            json!({"participant": participant, "success": success}),
        );
    }

    fn on_round_complete(&self, session_id: &str, round: &Round) -> Result<(), ProgressError> {
        let payload = serde_json::to_value(round).map_err(|e| ProgressError(e.to_string()))?;
        self.write_event("round_complete", session_id, payload)
            .map_err(|e| ProgressError(format!("{}: {}", self.path.display(), e)))
    }

    fn on_session_complete(&self, session_id: &str, consensus: &Consensus) {
        match serde_json::to_value(consensus) {
            Ok(payload) => self.log_best_effort("session_complete", session_id, payload),
            Err(e) => warn!("Could not serialize consensus for transcript: {e}"),
        }
    }
}

impl Drop for JsonlTranscriptLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delib_domain::{ConvergenceMetrics, ModelResponse};

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_transcript_writes_valid_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.transcript.jsonl");
        let logger = JsonlTranscriptLogger::new(&path).unwrap();

        logger.on_round_start("delib_1", 1, 2);
        logger.on_participant_complete("delib_1", "claude", true);
        let round = Round::new(
            1,
            vec![ModelResponse::new("claude", "claude-sonnet", "I approve")],
            1.0,
            ConvergenceMetrics::default(),
            1200,
        );
        logger.on_round_complete("delib_1", &round).unwrap();
        logger.on_session_complete("delib_1", &Consensus::no_rounds());
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 4);
        for line in &lines {
            assert_eq!(line["session_id"], "delib_1");
            assert!(line["timestamp"].is_string());
        }

        assert_eq!(lines[0]["type"], "round_start");
        assert_eq!(lines[0]["participants"], 2);
        assert_eq!(lines[1]["participant"], "claude");
        assert_eq!(lines[2]["type"], "round_complete");
        assert_eq!(lines[2]["number"], 1);
        assert_eq!(lines[2]["responses"][0]["content"], "I approve");
        assert_eq!(lines[3]["type"], "session_complete");
        assert_eq!(lines[3]["decision"], "UNDECIDED");
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/t.jsonl");
        let logger = JsonlTranscriptLogger::new(&path).unwrap();
        assert_eq!(logger.path(), path.as_path());
        assert!(path.exists());
    }

    #[test]
    fn test_non_object_payload_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.jsonl");
        let logger = JsonlTranscriptLogger::new(&path).unwrap();

        logger.write_event("note", "s", json!("just a string")).unwrap();
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines[0]["type"], "note");
        assert_eq!(lines[0]["data"], "just a string");
    }
}
