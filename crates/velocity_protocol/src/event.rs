//! Progress event protocol.
//!
//! The discriminated union consumed by every frontend - web UI over
//! WebSocket, CLI JSON mode, test harnesses. The same bytes go to every
//! subscriber; emitters never format progress ad hoc.
//!
//! Ordering contract: events for a single device are totally ordered
//! (`device_start` precedes `device_complete`); `progress` counts completed
//! operations only; `summary` is emitted exactly once, last.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::mpsc::Sender;
use std::sync::Mutex;

use crate::job::JobId;

/// One event on the progress stream. Serialized with a `type` tag so
/// consumers can dispatch without knowing the full vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    JobStart {
        job_id: JobId,
        job_file: String,
    },
    DeviceStart {
        job_id: JobId,
        device_name: String,
        ip_address: String,
    },
    DeviceComplete {
        job_id: JobId,
        device_name: String,
        success: bool,
        message: String,
    },
    Progress {
        job_id: JobId,
        completed: usize,
        total: usize,
        percent: f64,
    },
    JobComplete {
        job_id: JobId,
        job_file: String,
    },
    Summary {
        job_id: JobId,
        devices_succeeded: usize,
        devices_failed: usize,
        captures_created: BTreeMap<String, usize>,
        execution_time_secs: f64,
    },
    Error {
        job_id: JobId,
        message: String,
    },
}

impl ProgressEvent {
    pub fn job_id(&self) -> &JobId {
        match self {
            ProgressEvent::JobStart { job_id, .. }
            | ProgressEvent::DeviceStart { job_id, .. }
            | ProgressEvent::DeviceComplete { job_id, .. }
            | ProgressEvent::Progress { job_id, .. }
            | ProgressEvent::JobComplete { job_id, .. }
            | ProgressEvent::Summary { job_id, .. }
            | ProgressEvent::Error { job_id, .. } => job_id,
        }
    }

    pub fn is_summary(&self) -> bool {
        matches!(self, ProgressEvent::Summary { .. })
    }
}

/// Sink for progress events. Implementations must be safe to call from
/// multiple worker threads; each sink serializes its own writes.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);
}

/// Writes one JSON object per line to the wrapped writer (stdout in CLI
/// JSON mode). Write errors are swallowed: progress must never take down
/// a collection run.
pub struct JsonLineSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> EventSink for JsonLineSink<W> {
    fn emit(&self, event: &ProgressEvent) {
        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(event) {
                let _ = writeln!(w, "{}", line);
                let _ = w.flush();
            }
        }
    }
}

/// Forwards events onto an mpsc channel; the receiving end fans out to
/// WebSocket clients or a test collector.
///
/// `Sender` is Send but not Sync; the mutex restores shared use from
/// worker threads.
pub struct ChannelSink {
    tx: Mutex<Sender<ProgressEvent>>,
}

impl ChannelSink {
    pub fn new(tx: Sender<ProgressEvent>) -> Self {
        Self { tx: Mutex::new(tx) }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &ProgressEvent) {
        if let Ok(tx) = self.tx.lock() {
            let _ = tx.send(event.clone());
        }
    }
}

/// Discards everything. Used by callers that only want the return value.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &ProgressEvent) {}
}
