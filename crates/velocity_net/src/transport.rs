//! Device transport traits.
//!
//! All SSH work in the system goes through these two traits. The contract
//! mirrors interactive shell collection on network gear: one shell channel,
//! commands written in sequence, output read until the device prompt has
//! been seen an expected number of times (one for the login banner plus one
//! per command) or a timeout elapses. Partial output survives a timeout -
//! operators inspect truncated captures.

use regex::Regex;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {host}:{port} failed: {message}")]
    Connect {
        host: String,
        port: u16,
        message: String,
    },

    #[error("authentication failed for {username}@{host}: {message}")]
    Auth {
        host: String,
        username: String,
        message: String,
    },

    #[error("prompt not seen within {timeout:?} ({seen}/{expected} prompts)")]
    PromptTimeout {
        timeout: Duration,
        seen: usize,
        expected: usize,
        partial_output: String,
    },

    #[error("session I/O error: {0}")]
    Io(String),

    #[error("cancelled")]
    Cancelled,
}

impl TransportError {
    /// Output captured before the failure, when any survives.
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            TransportError::PromptTimeout { partial_output, .. } => Some(partial_output),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, TransportError::Auth { .. })
    }
}

/// Credential material for one device. Read-only after job start.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
    pub key_path: Option<std::path::PathBuf>,
}

impl Credentials {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
            key_path: None,
        }
    }

    /// Resolve from the CRED_N_USER / CRED_N_PASS environment pair.
    pub fn from_env(cred_id: u8) -> Option<Self> {
        let user = std::env::var(format!("CRED_{}_USER", cred_id)).ok()?;
        if user.is_empty() {
            return None;
        }
        let pass = std::env::var(format!("CRED_{}_PASS", cred_id)).unwrap_or_default();
        Some(Self {
            username: user,
            password: Some(pass),
            key_path: None,
        })
    }
}

/// One connection target.
#[derive(Debug, Clone)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
    pub connect_timeout: Duration,
}

impl SshTarget {
    pub fn new(host: impl Into<String>, port: u16, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            port,
            credentials,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Output of a completed command sequence.
#[derive(Debug, Clone)]
pub struct SessionOutput {
    /// Everything the device wrote, carriage returns normalized away.
    pub output: String,
    /// Prompts observed while reading.
    pub prompts_seen: usize,
}

/// Factory for device sessions. Implementations must be shareable across
/// worker threads.
pub trait DeviceConnector: Send + Sync {
    fn connect(&self, target: &SshTarget) -> Result<Box<dyn DeviceSession>, TransportError>;
}

/// An open interactive session with one device.
pub trait DeviceSession: Send {
    /// Send one line (command plus newline).
    fn send_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Read until `expected_prompts` matches of `prompt` have been seen in
    /// total for this call, or `timeout` elapses.
    fn read_until_prompts(
        &mut self,
        prompt: &Regex,
        expected_prompts: usize,
        timeout: Duration,
    ) -> Result<SessionOutput, TransportError>;

    /// Close the session. Errors on teardown are not interesting.
    fn close(&mut self);

    /// Run a command sequence under prompt counting: wait for the login
    /// prompt, send every command, then read until one prompt per command
    /// has arrived. Expected prompts = 1 + commands.len().
    fn run_sequence(
        &mut self,
        commands: &[String],
        prompt: &Regex,
        timeout: Duration,
    ) -> Result<SessionOutput, TransportError> {
        // Login banner up to the first prompt.
        let banner = self.read_until_prompts(prompt, 1, timeout)?;
        let mut combined = banner.output;
        let mut prompts_seen = banner.prompts_seen;

        for command in commands {
            self.send_line(command)?;
            let chunk = self.read_until_prompts(prompt, 1, timeout).map_err(|e| {
                // Preserve what we have: a truncated capture is still useful.
                match e {
                    TransportError::PromptTimeout {
                        timeout,
                        seen,
                        expected,
                        partial_output,
                    } => TransportError::PromptTimeout {
                        timeout,
                        seen: prompts_seen + seen,
                        expected: 1 + commands.len(),
                        partial_output: format!("{}{}", combined, partial_output),
                    },
                    other => other,
                }
            })?;
            combined.push_str(&chunk.output);
            prompts_seen += chunk.prompts_seen;
        }

        Ok(SessionOutput {
            output: combined,
            prompts_seen,
        })
    }
}

/// Count prompt matches in a buffer. Matches are counted per line so a
/// prompt string echoed inside command output does not double-count.
pub fn count_prompts(buffer: &str, prompt: &Regex) -> usize {
    buffer.lines().filter(|line| prompt.is_match(line)).count()
}

/// Strip the echoed command from the head of interactive output and the
/// trailing prompt line, leaving only the device's response.
pub fn strip_echo(output: &str, command: &str, prompt: &Regex) -> String {
    let mut lines: Vec<&str> = output.lines().collect();

    if let Some(first) = lines.first() {
        if first.trim_end().ends_with(command) {
            lines.remove(0);
        }
    }
    while let Some(last) = lines.last() {
        if last.trim().is_empty() || prompt.is_match(last) {
            lines.pop();
        } else {
            break;
        }
    }
    lines.join("\n")
}
