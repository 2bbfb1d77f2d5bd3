//! The fan-out engine.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use velocity_archive::CaptureArchive;
use velocity_db::{AssetsDb, DbError};
use velocity_loader::{CaptureLoader, LoadReport};
use velocity_net::transport::{Credentials, DeviceConnector, SshTarget, TransportError};
use velocity_net::{CancellationToken, WorkerPool};
use velocity_protocol::paths::DataLayout;
use velocity_protocol::{CaptureType, EventSink, JobId, ProgressEvent};

use crate::jobs::CollectionJob;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("no work to do: selection and capture types produced no jobs")]
    NoJobs,

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Archive(#[from] velocity_archive::ArchiveError),

    #[error(transparent)]
    Loader(#[from] velocity_loader::LoaderError),
}

#[derive(Debug, Clone)]
pub struct CollectionOptions {
    /// Concurrent SSH sessions, clamped to 1..=20.
    pub max_workers: usize,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    /// Overall wall-clock cap for the run; items starting after the
    /// deadline complete as failed, like a cancellation.
    pub job_timeout: Option<Duration>,
    /// Hand captured files to the loader and archive after the pool drains.
    pub auto_load_db: bool,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            max_workers: 5,
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(15),
            job_timeout: None,
            auto_load_db: true,
        }
    }
}

/// A capture that reached disk, recorded for the load/archive phase.
#[derive(Debug, Clone)]
pub struct SucceededCapture {
    pub device_name: String,
    pub capture_type: CaptureType,
    pub capture_path: PathBuf,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct CollectionResult {
    pub job_id: Option<JobId>,
    pub devices_succeeded: usize,
    pub devices_failed: usize,
    pub captures_created: BTreeMap<String, usize>,
    pub failed_devices: Vec<(String, String)>,
    pub succeeded_captures: Vec<SucceededCapture>,
    pub execution_time_secs: f64,
    pub load_report: Option<LoadReport>,
    pub changes_detected: usize,
}

impl CollectionResult {
    pub fn success(&self) -> bool {
        self.devices_failed == 0
    }
}

/// One unit of pool work: a device under a specific job batch.
struct WorkItem {
    job_index: usize,
    device_name: String,
    ip: String,
}

/// Terminal state of one work item.
struct ItemResult {
    device_name: String,
    capture_type: CaptureType,
    success: bool,
    message: String,
    capture_path: Option<PathBuf>,
    captured_at: DateTime<Utc>,
}

pub struct Collector {
    connector: Arc<dyn DeviceConnector>,
    layout: DataLayout,
}

impl Collector {
    pub fn new(connector: Arc<dyn DeviceConnector>, layout: DataLayout) -> Self {
        Self { connector, layout }
    }

    /// Run the SSH fan-out. Synchronous: returns when every work item has a
    /// terminal state and the single `summary` event has been emitted.
    pub fn run_collection(
        &self,
        jobs: &[CollectionJob],
        credentials: &Credentials,
        options: &CollectionOptions,
        cancel: &CancellationToken,
        sink: Arc<dyn EventSink>,
    ) -> Result<CollectionResult, CollectorError> {
        if jobs.iter().all(|j| j.devices.is_empty()) {
            return Err(CollectorError::NoJobs);
        }
        let job_id = JobId::generate();
        let started = Instant::now();
        info!(job_id = %job_id, jobs = jobs.len(), "starting collection run");

        let mut items = Vec::new();
        for (job_index, job) in jobs.iter().enumerate() {
            for device in &job.devices {
                items.push(WorkItem {
                    job_index,
                    device_name: device.name.clone(),
                    ip: device.ip.clone(),
                });
            }
        }
        let total = items.len();

        // Per-job bookkeeping for job_start / job_complete events.
        let job_started: Vec<AtomicBool> = jobs.iter().map(|_| AtomicBool::new(false)).collect();
        let job_remaining: Vec<AtomicUsize> = jobs
            .iter()
            .map(|j| AtomicUsize::new(j.devices.len()))
            .collect();
        let job_names: Vec<String> = jobs.iter().map(|j| j.file_name()).collect();

        let shared = Arc::new(WorkerShared {
            jobs: jobs.to_vec(),
            job_started,
            job_remaining,
            job_names,
            connector: Arc::clone(&self.connector),
            layout: self.layout.clone(),
            credentials: credentials.clone(),
            options: options.clone(),
            cancel: cancel.clone(),
            sink: Arc::clone(&sink),
            job_id: job_id.clone(),
            completed: AtomicUsize::new(0),
            total,
            deadline: options.job_timeout.map(|t| started + t),
        });

        let pool = WorkerPool::new(options.max_workers);
        // The pool must not skip items on cancel: every started-or-pending
        // device still gets its terminal device_complete event, so the pool
        // runs under its own token and workers consult the caller's.
        let worker_shared = Arc::clone(&shared);
        let run = pool.run(items, &CancellationToken::new(), move |item| {
            worker_shared.process(item)
        });

        let mut result = CollectionResult {
            job_id: Some(job_id.clone()),
            ..Default::default()
        };
        for item in run.completed {
            if item.success {
                result.devices_succeeded += 1;
                *result
                    .captures_created
                    .entry(item.capture_type.as_str().to_string())
                    .or_insert(0) += 1;
                if let Some(path) = item.capture_path {
                    result.succeeded_captures.push(SucceededCapture {
                        device_name: item.device_name,
                        capture_type: item.capture_type,
                        capture_path: path,
                        captured_at: item.captured_at,
                    });
                }
            } else {
                result.devices_failed += 1;
                result
                    .failed_devices
                    .push((item.device_name, item.message));
            }
        }

        result.execution_time_secs = started.elapsed().as_secs_f64();
        sink.emit(&ProgressEvent::Summary {
            job_id,
            devices_succeeded: result.devices_succeeded,
            devices_failed: result.devices_failed,
            captures_created: result.captures_created.clone(),
            execution_time_secs: result.execution_time_secs,
        });

        info!(
            succeeded = result.devices_succeeded,
            failed = result.devices_failed,
            elapsed_secs = result.execution_time_secs,
            "collection run complete"
        );

        Ok(result)
    }

    /// Post-run loading: C5 over every captured type, then C4 over the
    /// tracked subset. Raw files on disk stay the source of truth - a
    /// failure here never corrupts captures. Cancelled or failed devices
    /// have no entry in `succeeded_captures`, so nothing is snapshotted
    /// for them.
    pub async fn load_and_archive(
        &self,
        result: &mut CollectionResult,
        loader: &CaptureLoader,
        archive: &CaptureArchive,
        assets: &AssetsDb,
    ) -> Result<(), CollectorError> {
        let mut types: Vec<CaptureType> = Vec::new();
        for capture in &result.succeeded_captures {
            if !types.contains(&capture.capture_type) {
                types.push(capture.capture_type);
            }
        }

        result.load_report = Some(loader.load_capture_types(&types).await?);

        for capture in &result.succeeded_captures {
            if !capture.capture_type.is_tracked() {
                continue;
            }
            let Some(device) = assets.find_device(&capture.device_name).await? else {
                warn!(device = %capture.device_name, "captured device missing from assets db");
                continue;
            };
            let outcome = archive
                .archive_file(
                    device.id,
                    capture.capture_type,
                    &capture.capture_path,
                    capture.captured_at,
                )
                .await?;
            if outcome.is_change() {
                result.changes_detected += 1;
            }
        }
        Ok(())
    }
}

/// State shared by all pool workers for one run.
struct WorkerShared {
    jobs: Vec<CollectionJob>,
    job_started: Vec<AtomicBool>,
    job_remaining: Vec<AtomicUsize>,
    job_names: Vec<String>,
    connector: Arc<dyn DeviceConnector>,
    layout: DataLayout,
    credentials: Credentials,
    options: CollectionOptions,
    cancel: CancellationToken,
    sink: Arc<dyn EventSink>,
    job_id: JobId,
    completed: AtomicUsize,
    total: usize,
    deadline: Option<Instant>,
}

impl WorkerShared {
    fn process(&self, item: WorkItem) -> ItemResult {
        let job = &self.jobs[item.job_index];
        if !self.job_started[item.job_index].swap(true, Ordering::SeqCst) {
            self.sink.emit(&ProgressEvent::JobStart {
                job_id: self.job_id.clone(),
                job_file: self.job_names[item.job_index].clone(),
            });
        }

        self.sink.emit(&ProgressEvent::DeviceStart {
            job_id: self.job_id.clone(),
            device_name: item.device_name.clone(),
            ip_address: item.ip.clone(),
        });

        let past_deadline = self
            .deadline
            .map(|d| Instant::now() >= d)
            .unwrap_or(false);
        let (success, message, capture_path) = if self.cancel.is_cancelled() {
            (false, "cancelled".to_string(), None)
        } else if past_deadline {
            (false, "job timeout exceeded".to_string(), None)
        } else {
            match self.collect_device(job, &item) {
                Ok(path) => (true, "ok".to_string(), Some(path)),
                Err(CollectFailure::Cancelled { partial }) => {
                    // Preserve whatever was captured before the abort.
                    (false, "cancelled".to_string(), partial)
                }
                Err(CollectFailure::Transport(err)) => (false, err.to_string(), None),
                Err(CollectFailure::Write(err)) => (false, err, None),
            }
        };

        self.sink.emit(&ProgressEvent::DeviceComplete {
            job_id: self.job_id.clone(),
            device_name: item.device_name.clone(),
            success,
            message: message.clone(),
        });

        // Progress counts completed operations, never started ones.
        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.sink.emit(&ProgressEvent::Progress {
            job_id: self.job_id.clone(),
            completed: done,
            total: self.total,
            percent: done as f64 * 100.0 / self.total as f64,
        });

        if self.job_remaining[item.job_index].fetch_sub(1, Ordering::SeqCst) == 1 {
            self.sink.emit(&ProgressEvent::JobComplete {
                job_id: self.job_id.clone(),
                job_file: self.job_names[item.job_index].clone(),
            });
        }

        ItemResult {
            device_name: item.device_name,
            capture_type: job.capture_type,
            success,
            message,
            capture_path,
            captured_at: Utc::now(),
        }
    }

    /// SSH to the device, run the job's command sequence under prompt
    /// counting, write the capture file. Cooperative cancellation between
    /// commands.
    fn collect_device(
        &self,
        job: &CollectionJob,
        item: &WorkItem,
    ) -> Result<PathBuf, CollectFailure> {
        let prompt = Regex::new(job.vendor.prompt_pattern())
            .map_err(|e| CollectFailure::Write(e.to_string()))?;

        let mut target = SshTarget::new(&item.ip, 22, self.credentials.clone());
        target.connect_timeout = self.options.connect_timeout;
        let mut session = self
            .connector
            .connect(&target)
            .map_err(CollectFailure::Transport)?;

        let mut output = String::new();
        let banner = session
            .read_until_prompts(&prompt, 1, self.options.command_timeout)
            .map_err(CollectFailure::Transport)?;
        output.push_str(&banner.output);

        for command in &job.commands {
            if self.cancel.is_cancelled() {
                session.close();
                let partial = self.write_capture(job, item, &output).ok();
                return Err(CollectFailure::Cancelled { partial });
            }
            session.send_line(command).map_err(CollectFailure::Transport)?;
            let chunk = session
                .read_until_prompts(&prompt, 1, self.options.command_timeout)
                .map_err(|err| {
                    // A timed-out command still flushes partial output.
                    if let Some(partial) = err.partial_output() {
                        output.push_str(partial);
                        let _ = self.write_capture(job, item, &output);
                    }
                    CollectFailure::Transport(err)
                })?;
            output.push_str(&chunk.output);
        }
        session.close();

        self.write_capture(job, item, &output)
            .map_err(CollectFailure::Write)
    }

    fn write_capture(
        &self,
        job: &CollectionJob,
        item: &WorkItem,
        output: &str,
    ) -> Result<PathBuf, String> {
        let path = self.layout.capture_file(job.capture_type, &item.device_name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(&path, output).map_err(|e| e.to_string())?;
        Ok(path)
    }
}

enum CollectFailure {
    Transport(TransportError),
    Cancelled { partial: Option<PathBuf> },
    Write(String),
}
