//! libssh2-backed device transport.
//!
//! Interactive shell mode only: network gear frequently restricts exec
//! channels, and paging control requires a PTY anyway. Reads poll the
//! channel with a short blocking timeout so cancellation and the
//! per-command deadline are both honored without a reader thread.

use regex::Regex;
use ssh2::{Channel, Session};
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::transport::{
    count_prompts, DeviceConnector, DeviceSession, SessionOutput, SshTarget, TransportError,
};

/// Poll granularity for channel reads. Short enough that cancellation and
/// timeouts feel immediate, long enough to stay off the CPU.
const READ_POLL_MS: u32 = 250;

#[derive(Debug, Default, Clone)]
pub struct Ssh2Connector;

impl Ssh2Connector {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceConnector for Ssh2Connector {
    fn connect(&self, target: &SshTarget) -> Result<Box<dyn DeviceSession>, TransportError> {
        let addr = format!("{}:{}", target.host, target.port);
        let mut last_err = String::from("no addresses resolved");
        let mut stream = None;

        let addrs = addr
            .to_socket_addrs()
            .map_err(|e| TransportError::Connect {
                host: target.host.clone(),
                port: target.port,
                message: e.to_string(),
            })?;
        for sock_addr in addrs {
            match TcpStream::connect_timeout(&sock_addr, target.connect_timeout) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_err = e.to_string(),
            }
        }
        let stream = stream.ok_or_else(|| TransportError::Connect {
            host: target.host.clone(),
            port: target.port,
            message: last_err,
        })?;

        let mut session = Session::new().map_err(|e| TransportError::Connect {
            host: target.host.clone(),
            port: target.port,
            message: e.to_string(),
        })?;
        session.set_tcp_stream(stream);
        session.set_timeout(target.connect_timeout.as_millis() as u32);
        session.handshake().map_err(|e| TransportError::Connect {
            host: target.host.clone(),
            port: target.port,
            message: format!("ssh handshake: {}", e),
        })?;

        let creds = &target.credentials;
        let auth_result = if let Some(key) = &creds.key_path {
            session.userauth_pubkey_file(&creds.username, None, key, None)
        } else {
            session.userauth_password(
                &creds.username,
                creds.password.as_deref().unwrap_or_default(),
            )
        };
        auth_result.map_err(|e| TransportError::Auth {
            host: target.host.clone(),
            username: creds.username.clone(),
            message: e.to_string(),
        })?;
        if !session.authenticated() {
            return Err(TransportError::Auth {
                host: target.host.clone(),
                username: creds.username.clone(),
                message: "server rejected all authentication methods".to_string(),
            });
        }

        let mut channel = session.channel_session().map_err(|e| TransportError::Io(e.to_string()))?;
        channel
            .request_pty("vt100", None, Some((200, 80, 0, 0)))
            .map_err(|e| TransportError::Io(format!("pty request: {}", e)))?;
        channel
            .shell()
            .map_err(|e| TransportError::Io(format!("shell request: {}", e)))?;

        debug!(host = %target.host, port = target.port, "ssh session established");

        Ok(Box::new(Ssh2Session { session, channel }))
    }
}

struct Ssh2Session {
    session: Session,
    channel: Channel,
}

impl DeviceSession for Ssh2Session {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        use std::io::Write;
        self.session.set_timeout(5_000);
        self.channel
            .write_all(format!("{}\n", line).as_bytes())
            .and_then(|_| self.channel.flush())
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    fn read_until_prompts(
        &mut self,
        prompt: &Regex,
        expected_prompts: usize,
        timeout: Duration,
    ) -> Result<SessionOutput, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut buffer = String::new();
        let mut chunk = [0u8; 8192];

        self.session.set_timeout(READ_POLL_MS);

        loop {
            let seen = count_prompts(&buffer, prompt);
            if seen >= expected_prompts {
                return Ok(SessionOutput {
                    output: buffer.replace("\r\n", "\n").replace('\r', "\n"),
                    prompts_seen: seen,
                });
            }
            if Instant::now() >= deadline {
                return Err(TransportError::PromptTimeout {
                    timeout,
                    seen,
                    expected: expected_prompts,
                    partial_output: buffer.replace("\r\n", "\n").replace('\r', "\n"),
                });
            }

            match self.channel.read(&mut chunk) {
                Ok(0) => {
                    // Channel closed; whatever arrived is the answer.
                    let seen = count_prompts(&buffer, prompt);
                    return Ok(SessionOutput {
                        output: buffer.replace("\r\n", "\n").replace('\r', "\n"),
                        prompts_seen: seen,
                    });
                }
                Ok(n) => {
                    buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    // Poll timeout; loop to re-check the deadline.
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => return Err(TransportError::Io(e.to_string())),
            }
        }
    }

    fn close(&mut self) {
        let _ = self.channel.send_eof();
        let _ = self.channel.close();
    }
}
