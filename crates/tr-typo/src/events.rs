// events.rs — Typo activity notifications.
//
// The reporting service emits a TypoActivity at every lifecycle point:
// a report arriving, a status change, a rejected event, a deletion.
// Sinks (JSONL log, future webhooks) subscribe through ActivitySink.
//
// Dispatch is synchronous and best-effort: a failing sink is logged and
// skipped, it never fails the request that produced the activity.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypoError;
use crate::lifecycle::{TypoEvent, TypoStatus};
use crate::typo::{TypoId, WorkspaceId};

/// Activity emitted by the reporting service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "activity", rename_all = "snake_case")]
pub enum TypoActivity {
    /// A new typo report was stored.
    Reported {
        typo_id: TypoId,
        workspace_id: WorkspaceId,
        page_url: String,
        timestamp: DateTime<Utc>,
    },

    /// A typo moved to a new status.
    StatusChanged {
        typo_id: TypoId,
        workspace_id: WorkspaceId,
        event: TypoEvent,
        from: TypoStatus,
        to: TypoStatus,
        timestamp: DateTime<Utc>,
    },

    /// An event did not apply to the typo's current status.
    TransitionRejected {
        typo_id: TypoId,
        workspace_id: WorkspaceId,
        event: TypoEvent,
        status: TypoStatus,
        timestamp: DateTime<Utc>,
    },

    /// A typo was deleted.
    Deleted {
        typo_id: TypoId,
        timestamp: DateTime<Utc>,
    },
}

impl TypoActivity {
    pub fn activity_type(&self) -> &str {
        match self {
            TypoActivity::Reported { .. } => "reported",
            TypoActivity::StatusChanged { .. } => "status_changed",
            TypoActivity::TransitionRejected { .. } => "transition_rejected",
            TypoActivity::Deleted { .. } => "deleted",
        }
    }

    pub fn typo_id(&self) -> TypoId {
        match self {
            TypoActivity::Reported { typo_id, .. }
            | TypoActivity::StatusChanged { typo_id, .. }
            | TypoActivity::TransitionRejected { typo_id, .. }
            | TypoActivity::Deleted { typo_id, .. } => *typo_id,
        }
    }
}

/// Receiver of typo activity.
pub trait ActivitySink: Send + Sync {
    /// Handle one activity. Errors are logged by the dispatcher.
    fn send(&self, activity: &TypoActivity) -> Result<(), TypoError>;
}

/// Appends activity as JSONL to a file.
pub struct LogSink {
    path: PathBuf,
    // Serializes appends from concurrent requests so lines never interleave.
    write_lock: Mutex<()>,
}

impl LogSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActivitySink for LogSink {
    fn send(&self, activity: &TypoActivity) -> Result<(), TypoError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| TypoError::Storage("activity log lock poisoned".to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| TypoError::IoError {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| TypoError::IoError {
                path: self.path.clone(),
                source,
            })?;

        let json = serde_json::to_string(activity)?;
        writeln!(file, "{}", json).map_err(|source| TypoError::IoError {
            path: self.path.clone(),
            source,
        })?;

        Ok(())
    }
}

/// Fans activity out to every registered sink.
#[derive(Default)]
pub struct EventDispatcher {
    sinks: Vec<Box<dyn ActivitySink>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn ActivitySink>) {
        self.sinks.push(sink);
    }

    pub fn with_sink(mut self, sink: Box<dyn ActivitySink>) -> Self {
        self.add_sink(sink);
        self
    }

    pub fn dispatch(&self, activity: &TypoActivity) {
        for sink in &self.sinks {
            if let Err(e) = sink.send(activity) {
                tracing::warn!(
                    activity = activity.activity_type(),
                    typo_id = activity.typo_id(),
                    "activity sink error: {}",
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn deleted(id: TypoId) -> TypoActivity {
        TypoActivity::Deleted {
            typo_id: id,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn activity_is_tagged_in_json() {
        let activity = TypoActivity::StatusChanged {
            typo_id: 4,
            workspace_id: 1,
            event: TypoEvent::Start,
            from: TypoStatus::Reported,
            to: TypoStatus::InProgress,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&activity).unwrap();
        assert!(json.contains("\"activity\":\"status_changed\""));
        assert!(json.contains("\"IN_PROGRESS\""));
        assert_eq!(activity.typo_id(), 4);
    }

    #[test]
    fn log_sink_appends_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("activity.jsonl");
        let sink = LogSink::new(&path);

        sink.send(&deleted(1)).unwrap();
        sink.send(&deleted(2)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: TypoActivity = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.typo_id(), 2);
    }

    struct FailingSink;

    impl ActivitySink for FailingSink {
        fn send(&self, _activity: &TypoActivity) -> Result<(), TypoError> {
            Err(TypoError::Storage("sink offline".to_string()))
        }
    }

    struct CountingSink(Arc<Mutex<usize>>);

    impl ActivitySink for CountingSink {
        fn send(&self, _activity: &TypoActivity) -> Result<(), TypoError> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn failing_sink_does_not_block_others() {
        let count = Arc::new(Mutex::new(0));
        let dispatcher = EventDispatcher::new()
            .with_sink(Box::new(FailingSink))
            .with_sink(Box::new(CountingSink(count.clone())));

        dispatcher.dispatch(&deleted(9));
        assert_eq!(*count.lock().unwrap(), 1);
    }
}
