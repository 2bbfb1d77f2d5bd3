//! Scripted in-memory device transport.

use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use velocity_net::transport::{
    DeviceConnector, DeviceSession, SessionOutput, SshTarget, TransportError,
};

/// A scripted device, keyed by the host string the caller connects to.
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub hostname: String,
    pub prompt: String,
    pub banner: String,
    /// Exact command string to response body.
    pub outputs: HashMap<String, String>,
    /// Latency added to each command read.
    pub command_delay: Duration,
    /// Fail this many connect attempts before succeeding.
    pub fail_connects: usize,
    /// Refuse every connection (auth failure).
    pub refuse_auth: bool,
}

impl MockDevice {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            prompt: format!("{}#", hostname),
            banner: format!("Welcome to {}\n", hostname),
            outputs: HashMap::new(),
            command_delay: Duration::ZERO,
            fail_connects: 0,
            refuse_auth: false,
        }
    }

    pub fn with_output(mut self, command: &str, output: impl Into<String>) -> Self {
        self.outputs.insert(command.to_string(), output.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.command_delay = delay;
        self
    }

    pub fn failing_connects(mut self, count: usize) -> Self {
        self.fail_connects = count;
        self
    }

    pub fn refusing_auth(mut self) -> Self {
        self.refuse_auth = true;
        self
    }
}

#[derive(Default)]
struct ConnectorState {
    devices: HashMap<String, MockDevice>,
    connect_attempts: HashMap<String, usize>,
    remaining_failures: HashMap<String, usize>,
}

/// Shared scripted transport. Cloning shares the device table and counters.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<ConnectorState>>,
    open_sessions: Arc<AtomicUsize>,
    high_water: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device under one or more host keys (name and IP).
    pub fn add_device(&self, hosts: &[&str], device: MockDevice) {
        let mut state = self.state.lock().unwrap();
        for host in hosts {
            state
                .remaining_failures
                .insert(host.to_string(), device.fail_connects);
            state.devices.insert(host.to_string(), device.clone());
        }
    }

    pub fn connect_attempts(&self, host: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .connect_attempts
            .get(host)
            .copied()
            .unwrap_or(0)
    }

    /// Maximum concurrently open sessions observed.
    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }
}

impl DeviceConnector for MockConnector {
    fn connect(&self, target: &SshTarget) -> Result<Box<dyn DeviceSession>, TransportError> {
        let device = {
            let mut state = self.state.lock().unwrap();
            *state
                .connect_attempts
                .entry(target.host.clone())
                .or_insert(0) += 1;

            let Some(device) = state.devices.get(&target.host).cloned() else {
                return Err(TransportError::Connect {
                    host: target.host.clone(),
                    port: target.port,
                    message: "no route to host".to_string(),
                });
            };
            if device.refuse_auth {
                return Err(TransportError::Auth {
                    host: target.host.clone(),
                    username: target.credentials.username.clone(),
                    message: "permission denied".to_string(),
                });
            }
            let remaining = state
                .remaining_failures
                .entry(target.host.clone())
                .or_insert(0);
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TransportError::Connect {
                    host: target.host.clone(),
                    port: target.port,
                    message: "connection reset by peer".to_string(),
                });
            }
            device
        };

        let now = self.open_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);

        let mut chunks = VecDeque::new();
        chunks.push_back(format!("{}{}\n", device.banner, device.prompt));

        Ok(Box::new(MockSession {
            device,
            chunks,
            open_sessions: Arc::clone(&self.open_sessions),
            closed: false,
        }))
    }
}

struct MockSession {
    device: MockDevice,
    /// Output chunks, each ending with a prompt line.
    chunks: VecDeque<String>,
    open_sessions: Arc<AtomicUsize>,
    closed: bool,
}

impl MockSession {
    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open_sessions.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl DeviceSession for MockSession {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        let body = self
            .device
            .outputs
            .get(line)
            .cloned()
            .unwrap_or_else(|| format!("% Invalid input detected: '{}'\n", line));
        let mut body = body;
        if !body.is_empty() && !body.ends_with('\n') {
            body.push('\n');
        }
        self.chunks
            .push_back(format!("{}\n{}{}\n", line, body, self.device.prompt));
        Ok(())
    }

    fn read_until_prompts(
        &mut self,
        prompt: &Regex,
        expected_prompts: usize,
        timeout: Duration,
    ) -> Result<SessionOutput, TransportError> {
        if !self.device.command_delay.is_zero() {
            std::thread::sleep(self.device.command_delay);
        }

        let mut output = String::new();
        let mut seen = 0;
        while seen < expected_prompts {
            let Some(chunk) = self.chunks.pop_front() else {
                return Err(TransportError::PromptTimeout {
                    timeout,
                    seen,
                    expected: expected_prompts,
                    partial_output: output,
                });
            };
            seen += velocity_net::transport::count_prompts(&chunk, prompt);
            output.push_str(&chunk);
        }
        Ok(SessionOutput {
            output,
            prompts_seen: seen,
        })
    }

    fn close(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use velocity_net::transport::Credentials;

    fn target(host: &str) -> SshTarget {
        SshTarget::new(host, 22, Credentials::password("admin", "pw"))
    }

    #[test]
    fn scripted_outputs_flow_through_run_sequence() {
        let connector = MockConnector::new();
        connector.add_device(
            &["10.0.0.1"],
            MockDevice::new("sw1").with_output("show clock", "12:00:00 UTC"),
        );

        let mut session = connector.connect(&target("10.0.0.1")).unwrap();
        let prompt = Regex::new(r"sw1#\s*$").unwrap();
        let result = session
            .run_sequence(
                &["show clock".to_string()],
                &prompt,
                Duration::from_secs(1),
            )
            .unwrap();
        assert_eq!(result.prompts_seen, 2);
        assert!(result.output.contains("12:00:00 UTC"));
    }

    #[test]
    fn connect_failures_are_scripted() {
        let connector = MockConnector::new();
        connector.add_device(&["10.0.0.2"], MockDevice::new("sw2").failing_connects(2));

        assert!(connector.connect(&target("10.0.0.2")).is_err());
        assert!(connector.connect(&target("10.0.0.2")).is_err());
        assert!(connector.connect(&target("10.0.0.2")).is_ok());
        assert_eq!(connector.connect_attempts("10.0.0.2"), 3);
    }

    #[test]
    fn session_gauge_tracks_open_sessions() {
        let connector = MockConnector::new();
        connector.add_device(&["a"], MockDevice::new("a"));
        connector.add_device(&["b"], MockDevice::new("b"));

        let s1 = connector.connect(&target("a")).unwrap();
        let mut s2 = connector.connect(&target("b")).unwrap();
        assert_eq!(connector.open_sessions(), 2);
        assert_eq!(connector.high_water(), 2);
        s2.close();
        assert_eq!(connector.open_sessions(), 1);
        drop(s1);
        assert_eq!(connector.open_sessions(), 0);
        // close + drop must not double-decrement.
        drop(s2);
        assert_eq!(connector.open_sessions(), 0);
    }

    #[test]
    fn unknown_host_is_unreachable() {
        let connector = MockConnector::new();
        assert!(matches!(
            connector.connect(&target("203.0.113.9")),
            Err(TransportError::Connect { .. })
        ));
    }
}
