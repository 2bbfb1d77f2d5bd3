//! The fingerprint engine.

use chrono::Utc;
use regex::Regex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use velocity_net::transport::{
    strip_echo, Credentials, DeviceConnector, DeviceSession, SshTarget, TransportError,
};
use velocity_net::{CancellationToken, WorkerPool};
use velocity_protocol::inventory::SessionsFile;
use velocity_protocol::{EventSink, JobId, ProgressEvent, Vendor};
use velocity_templates::{filter_list, TemplateIndex};

use crate::fields::{resolve_fields, ExtractedFields};

#[derive(Debug, Clone)]
pub struct FingerprintOptions {
    pub max_workers: usize,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    /// Minimum template score for fingerprint-class parses.
    pub min_score: f64,
    /// Re-probe entries that are already fingerprinted.
    pub refresh: bool,
}

impl Default for FingerprintOptions {
    fn default() -> Self {
        Self {
            max_workers: 8,
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(15),
            min_score: 20.0,
            refresh: false,
        }
    }
}

/// Structured failure reason, three-tier: transport, specific auth/timeout
/// classes, catch-all with detail retained.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    Unreachable(String),
    AuthFailed(String),
    Timeout(String),
    NoTemplate { best_score: f64 },
    Other(String),
}

impl FailureReason {
    pub fn as_str(&self) -> String {
        match self {
            FailureReason::Unreachable(m) => format!("unreachable: {}", m),
            FailureReason::AuthFailed(m) => format!("auth failed: {}", m),
            FailureReason::Timeout(m) => format!("timeout: {}", m),
            FailureReason::NoTemplate { best_score } => {
                format!("no template above threshold (best score {:.1})", best_score)
            }
            FailureReason::Other(m) => m.clone(),
        }
    }
}

impl From<TransportError> for FailureReason {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Auth { .. } => FailureReason::AuthFailed(err.to_string()),
            TransportError::Connect { .. } => FailureReason::Unreachable(err.to_string()),
            TransportError::PromptTimeout { .. } => FailureReason::Timeout(err.to_string()),
            other => FailureReason::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FingerprintOutcome {
    pub name: String,
    pub ip: String,
    pub success: bool,
    pub vendor: Vendor,
    pub fields: ExtractedFields,
    pub commands_run: Vec<String>,
    pub best_template: Option<String>,
    pub failure: Option<FailureReason>,
}

#[derive(Debug, Clone, Default)]
pub struct FingerprintSummary {
    pub identified: usize,
    pub failed: usize,
    pub failed_devices: Vec<(String, String)>,
}

pub struct FingerprintEngine {
    connector: Arc<dyn DeviceConnector>,
    templates: Arc<TemplateIndex>,
}

impl FingerprintEngine {
    pub fn new(connector: Arc<dyn DeviceConnector>) -> Self {
        Self {
            connector,
            templates: Arc::new(TemplateIndex::builtin()),
        }
    }

    pub fn with_templates(connector: Arc<dyn DeviceConnector>, templates: TemplateIndex) -> Self {
        Self {
            connector,
            templates: Arc::new(templates),
        }
    }

    /// Fingerprint every unconfirmed inventory entry, updating the
    /// sessions file in place. Device-record persistence is the caller's
    /// concern (the CLI writes through the assets store).
    pub fn fingerprint_inventory(
        &self,
        inventory: &mut SessionsFile,
        credentials: &Credentials,
        options: &FingerprintOptions,
        sink: Arc<dyn EventSink>,
    ) -> (Vec<FingerprintOutcome>, FingerprintSummary) {
        let job_id = JobId::generate();
        let targets: Vec<(String, String)> = inventory
            .all_sessions()
            .filter(|s| options.refresh || !s.fingerprinted || s.device_type.is_empty())
            .map(|s| (s.name.clone(), s.ip.clone()))
            .collect();
        let total = targets.len();
        info!(job_id = %job_id, devices = total, "starting fingerprint pass");

        let pool = WorkerPool::new(options.max_workers);
        let connector = Arc::clone(&self.connector);
        let templates = Arc::clone(&self.templates);
        let credentials = credentials.clone();
        let options_cloned = options.clone();
        let completed = Arc::new(AtomicUsize::new(0));
        let worker_sink = Arc::clone(&sink);
        let worker_job_id = job_id.clone();

        let run = pool.run(targets, &CancellationToken::new(), move |(name, ip)| {
            worker_sink.emit(&ProgressEvent::DeviceStart {
                job_id: worker_job_id.clone(),
                device_name: name.clone(),
                ip_address: ip.clone(),
            });

            let outcome = fingerprint_device(
                connector.as_ref(),
                &templates,
                &name,
                &ip,
                &credentials,
                &options_cloned,
            );

            worker_sink.emit(&ProgressEvent::DeviceComplete {
                job_id: worker_job_id.clone(),
                device_name: name.clone(),
                success: outcome.success,
                message: match &outcome.failure {
                    Some(reason) => reason.as_str(),
                    None => outcome
                        .fields
                        .software_version
                        .clone()
                        .unwrap_or_else(|| "fingerprinted".to_string()),
                },
            });
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            worker_sink.emit(&ProgressEvent::Progress {
                job_id: worker_job_id.clone(),
                completed: done,
                total,
                percent: if total == 0 {
                    100.0
                } else {
                    done as f64 * 100.0 / total as f64
                },
            });
            outcome
        });

        let outcomes = run.completed;
        let mut summary = FingerprintSummary::default();
        let now = Utc::now().to_rfc3339();

        for outcome in &outcomes {
            if outcome.success {
                summary.identified += 1;
                if let Some(session) = inventory.session_mut(&outcome.name) {
                    if outcome.vendor != Vendor::Unknown {
                        session.device_type = outcome.vendor.as_str().to_string();
                        session.platform = outcome.vendor.as_str().to_string();
                        session.vendor = outcome.vendor.display_name().to_string();
                    }
                    if let Some(model) = &outcome.fields.model {
                        session.model = model.clone();
                    }
                    if let Some(version) = &outcome.fields.software_version {
                        session.software_version = version.clone();
                    }
                    session.fingerprinted = true;
                    session.fingerprint_timestamp = now.clone();
                }
            } else {
                summary.failed += 1;
                let reason = outcome
                    .failure
                    .as_ref()
                    .map(FailureReason::as_str)
                    .unwrap_or_else(|| "unknown".to_string());
                summary.failed_devices.push((outcome.name.clone(), reason));
            }
        }

        sink.emit(&ProgressEvent::Summary {
            job_id,
            devices_succeeded: summary.identified,
            devices_failed: summary.failed,
            captures_created: Default::default(),
            execution_time_secs: 0.0,
        });

        (outcomes, summary)
    }
}

/// Per-device command-selection state machine.
fn fingerprint_device(
    connector: &dyn DeviceConnector,
    templates: &TemplateIndex,
    name: &str,
    ip: &str,
    credentials: &Credentials,
    options: &FingerprintOptions,
) -> FingerprintOutcome {
    let mut outcome = FingerprintOutcome {
        name: name.to_string(),
        ip: ip.to_string(),
        success: false,
        vendor: Vendor::Unknown,
        fields: ExtractedFields::default(),
        commands_run: Vec::new(),
        best_template: None,
        failure: None,
    };

    let mut target = SshTarget::new(ip, 22, credentials.clone());
    target.connect_timeout = options.connect_timeout;

    let mut session = match connector.connect(&target) {
        Ok(session) => session,
        Err(err) => {
            outcome.failure = Some(err.into());
            return outcome;
        }
    };

    match probe_device(session.as_mut(), templates, options, &mut outcome) {
        Ok(()) => {}
        Err(err) => {
            // Keep whatever was extracted before the transport gave out.
            if outcome.failure.is_none() {
                outcome.failure = Some(err.into());
            }
        }
    }
    session.close();

    outcome.success = outcome.fields.any_extracted();
    if outcome.success {
        outcome.failure = None;
    } else if outcome.failure.is_none() {
        outcome.failure = Some(FailureReason::NoTemplate { best_score: 0.0 });
    }
    outcome
}

fn probe_device(
    session: &mut dyn DeviceSession,
    templates: &TemplateIndex,
    options: &FingerprintOptions,
    outcome: &mut FingerprintOutcome,
) -> Result<(), TransportError> {
    let generic_prompt = Regex::new(Vendor::Unknown.prompt_pattern())
        .map_err(|e| TransportError::Io(e.to_string()))?;

    // Generic probe; reads the login banner too.
    let probe = session.run_sequence(
        &["show version".to_string()],
        &generic_prompt,
        options.command_timeout,
    )?;
    outcome.commands_run.push("show version".to_string());
    outcome.vendor = Vendor::detect(&probe.output);
    debug!(device = %outcome.name, vendor = %outcome.vendor, "vendor detected");

    let prompt = Regex::new(outcome.vendor.prompt_pattern())
        .map_err(|e| TransportError::Io(e.to_string()))?;
    let mut paging_disabled = false;

    let mut best_score = 0.0_f64;
    let mut queue: Vec<String> = Vec::new();
    let process = |command: &str,
                       raw_output: &str,
                       outcome: &mut FingerprintOutcome,
                       queue: &mut Vec<String>,
                       best_score: &mut f64| {
        // Follow-up triggers: an HP ProCurve `show version` carries no
        // serial, so the image-stamp signature enqueues `show system info`.
        if command == "show version" && raw_output.to_lowercase().contains("image stamp") {
            let follow_up = "show system info".to_string();
            if !queue.contains(&follow_up) && !outcome.commands_run.contains(&follow_up) {
                queue.push(follow_up);
            }
        }

        let cleaned = strip_echo(raw_output, command, &prompt);
        let filters = filter_list(Some(outcome.vendor), command);
        match templates.find_best(&cleaned, &filters, options.min_score) {
            Ok(matched) => {
                debug!(
                    device = %outcome.name,
                    template = %matched.template,
                    score = matched.score,
                    "template accepted"
                );
                outcome.best_template = Some(matched.template.clone());
                outcome.fields.merge(resolve_fields(&matched.records));
                *best_score = best_score.max(matched.score);
            }
            Err(rejection) => {
                *best_score = best_score.max(rejection.best_score);
                warn!(
                    device = %outcome.name,
                    command,
                    best_template = ?rejection.best_template,
                    best_score = rejection.best_score,
                    min_score = rejection.min_score,
                    "no template above threshold"
                );
            }
        }
    };

    process(
        "show version",
        &probe.output,
        outcome,
        &mut queue,
        &mut best_score,
    );

    // Vendor-specific follow-ups, after the generic probe identified the
    // platform.
    for command in outcome.vendor.fingerprint_commands() {
        let command = command.to_string();
        if !outcome.commands_run.contains(&command) && !queue.contains(&command) {
            queue.push(command);
        }
    }

    while let Some(command) = queue.pop() {
        if outcome.fields.is_complete() {
            break;
        }
        if !paging_disabled {
            if let Some(paging) = outcome.vendor.paging_disable() {
                session.send_line(paging)?;
                session.read_until_prompts(&prompt, 1, options.command_timeout)?;
            }
            paging_disabled = true;
        }

        session.send_line(&command)?;
        let output = session.read_until_prompts(&prompt, 1, options.command_timeout)?;
        outcome.commands_run.push(command.clone());
        process(&command, &output.output, outcome, &mut queue, &mut best_score);
    }

    if !outcome.fields.any_extracted() {
        outcome.failure = Some(FailureReason::NoTemplate { best_score });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use velocity_protocol::inventory::{InventoryFolder, InventorySession};
    use velocity_protocol::{ChannelSink, NullSink};
    use velocity_testkit::{fixtures, MockConnector, MockDevice};

    fn inventory_of(names_ips: &[(&str, &str)]) -> SessionsFile {
        SessionsFile {
            folders: vec![InventoryFolder {
                folder_name: "lab".into(),
                sessions: names_ips
                    .iter()
                    .map(|(n, ip)| InventorySession::new(n, ip))
                    .collect(),
            }],
        }
    }

    fn creds() -> Credentials {
        Credentials::password("admin", "pw")
    }

    #[test]
    fn cisco_device_is_fully_identified() {
        let connector = MockConnector::new();
        connector.add_device(
            &["10.0.0.1"],
            MockDevice::new("sw1")
                .with_output(
                    "show version",
                    fixtures::cisco_show_version("sw1", "16.12.04", "FCW1111A1AA"),
                )
                .with_output("terminal length 0", ""),
        );

        let engine = FingerprintEngine::new(Arc::new(connector));
        let mut inventory = inventory_of(&[("sw1", "10.0.0.1")]);
        let (outcomes, summary) = engine.fingerprint_inventory(
            &mut inventory,
            &creds(),
            &FingerprintOptions::default(),
            Arc::new(NullSink),
        );

        assert_eq!(summary.identified, 1);
        assert_eq!(summary.failed, 0);
        let outcome = &outcomes[0];
        assert!(outcome.success);
        assert_eq!(outcome.vendor, Vendor::CiscoIos);
        assert_eq!(outcome.fields.software_version.as_deref(), Some("16.12.04"));
        assert_eq!(outcome.fields.serial.as_deref(), Some("FCW1111A1AA"));
        assert_eq!(outcome.fields.model.as_deref(), Some("WS-C3850-48T"));

        let session = inventory.session_mut("sw1").unwrap();
        assert_eq!(session.device_type, "cisco_ios");
        assert!(session.fingerprinted);
        assert!(!session.fingerprint_timestamp.is_empty());
    }

    #[test]
    fn hp_follow_up_command_recovers_serial() {
        let connector = MockConnector::new();
        connector.add_device(
            &["10.0.0.9"],
            MockDevice::new("access-sw9")
                .with_output("show version", fixtures::hp_show_version())
                .with_output("no page", "")
                .with_output(
                    "show system info",
                    fixtures::hp_show_system_info("access-sw9", "SG99XK0042"),
                ),
        );

        let engine = FingerprintEngine::new(Arc::new(connector));
        let mut inventory = inventory_of(&[("access-sw9", "10.0.0.9")]);
        let (outcomes, summary) = engine.fingerprint_inventory(
            &mut inventory,
            &creds(),
            &FingerprintOptions::default(),
            Arc::new(NullSink),
        );

        assert_eq!(summary.identified, 1);
        let outcome = &outcomes[0];
        assert_eq!(outcome.vendor, Vendor::HpProcurve);
        assert!(outcome.commands_run.contains(&"show system info".to_string()));
        assert_eq!(outcome.fields.serial.as_deref(), Some("SG99XK0042"));
        assert_eq!(outcome.fields.hostname.as_deref(), Some("access-sw9"));
    }

    #[test]
    fn partial_fleet_fingerprint_reports_failures() {
        let connector = MockConnector::new();
        for (name, ip) in [("sw1", "10.0.1.1"), ("sw2", "10.0.1.2"), ("sw3", "10.0.1.3")] {
            connector.add_device(
                &[ip],
                MockDevice::new(name)
                    .with_output(
                        "show version",
                        fixtures::cisco_show_version(name, "16.12.04", "FCW1111A1AA"),
                    )
                    .with_output("terminal length 0", ""),
            );
        }
        connector.add_device(&["10.0.1.4"], MockDevice::new("sw4").refusing_auth());
        connector.add_device(&["10.0.1.5"], MockDevice::new("sw5").failing_connects(99));

        let engine = FingerprintEngine::new(Arc::new(connector));
        let mut inventory = inventory_of(&[
            ("sw1", "10.0.1.1"),
            ("sw2", "10.0.1.2"),
            ("sw3", "10.0.1.3"),
            ("sw4", "10.0.1.4"),
            ("sw5", "10.0.1.5"),
        ]);

        let (tx, rx) = mpsc::channel();
        let (_, summary) = engine.fingerprint_inventory(
            &mut inventory,
            &creds(),
            &FingerprintOptions::default(),
            Arc::new(ChannelSink::new(tx)),
        );

        assert_eq!(summary.identified, 3);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.failed_devices.len(), 2);
        let reasons: Vec<&str> = summary
            .failed_devices
            .iter()
            .map(|(_, r)| r.as_str())
            .collect();
        assert!(reasons.iter().any(|r| r.contains("auth failed")));
        assert!(reasons.iter().any(|r| r.contains("unreachable")));

        // Failed devices keep empty device_type but stay in the inventory.
        assert_eq!(inventory.session_mut("sw4").unwrap().device_type, "");
        assert!(!inventory.session_mut("sw4").unwrap().fingerprinted);
        assert_eq!(inventory.session_count(), 5);

        // Progress percent is computed over completed devices and ends at 100.
        let events: Vec<_> = rx.try_iter().collect();
        let mut last_percent = 0.0;
        for event in &events {
            if let ProgressEvent::Progress { percent, .. } = event {
                assert!(*percent >= last_percent);
                last_percent = *percent;
            }
        }
        assert_eq!(last_percent, 100.0);
        assert!(events.last().unwrap().is_summary());
    }

    #[test]
    fn unknown_platform_is_a_no_template_failure() {
        let connector = MockConnector::new();
        connector.add_device(
            &["10.0.2.1"],
            MockDevice::new("mystery").with_output("show version", "permission denied to run commands\n"),
        );

        let engine = FingerprintEngine::new(Arc::new(connector));
        let mut inventory = inventory_of(&[("mystery", "10.0.2.1")]);
        let (outcomes, summary) = engine.fingerprint_inventory(
            &mut inventory,
            &creds(),
            &FingerprintOptions::default(),
            Arc::new(NullSink),
        );

        assert_eq!(summary.failed, 1);
        assert!(matches!(
            outcomes[0].failure,
            Some(FailureReason::NoTemplate { .. })
        ));
    }
}
