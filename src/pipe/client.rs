//! Blocking client for Audacity's scripting pipes.
//!
//! This module provides `PipeClient`, which owns the to/from channel pair,
//! frames commands with the platform EOL and reads back terminator-delimited
//! responses.

use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::pipe::framing::{read_response, write_command};
use crate::pipe::profile::PipeProfile;

/// Pause after every `do_command`, giving the editor time to settle before
/// the next command arrives.
pub const DEFAULT_COMMAND_DELAY: Duration = Duration::from_millis(400);

/// Pipe transport error types.
///
/// Each variant is terminal for the operation that produced it; nothing is
/// retried internally.
#[derive(Debug, Error)]
pub enum PipeError {
    /// A pipe endpoint does not exist, usually because Audacity is not
    /// running with mod-script-pipe enabled.
    #[error("Pipe endpoint not found: {} (is Audacity running with mod-script-pipe enabled?)", .path.display())]
    EndpointMissing {
        /// The endpoint that was checked
        path: PathBuf,
    },

    /// A read or write was attempted on a closed channel.
    #[error("Pipe is not connected")]
    NotConnected,

    /// `open` was called on a client that still holds a channel.
    #[error("Pipe is already connected")]
    AlreadyConnected,

    /// The peer closed its end before finishing a response.
    #[error("Pipe closed by peer before the response terminator")]
    PeerClosed,

    /// The response could not be decoded.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// No pipe profile exists for this operating system.
    #[error("Unsupported operating system: {0}")]
    UnsupportedPlatform(String),

    /// Starting the editor process failed.
    #[error("Failed to launch editor process: {0}")]
    LaunchFailed(#[source] std::io::Error),

    /// I/O error during communication.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that can carry script commands to the editor.
///
/// `PipeClient` is the real implementation; the sequencer is written against
/// this trait so it can be driven by a recording fake in tests.
pub trait ScriptTransport {
    /// Send a command and return its response.
    fn do_command(&mut self, command: &str) -> Result<String, PipeError>;

    /// Send a command without waiting for a response.
    fn send(&mut self, command: &str) -> Result<(), PipeError>;
}

/// Client for the editor's scripting pipes.
///
/// Both halves are owned exclusively by this client. Either may be open or
/// closed independently, which is what lets `close` be called at any point
/// without erroring.
///
/// # Connection Lifecycle
///
/// - `new()` - Unconnected client for a profile
/// - `open()` / `connect()` - Verify both endpoints exist, then open them
/// - `write()` / `read()` / `do_command()` - Strictly alternating exchange
/// - `close()` / `Drop` - Release both halves
/// - `session()` - Scoped open + close around a closure
///
/// # Example
///
/// ```ignore
/// let mut client = PipeClient::connect(PipeProfile::detect()?)?;
/// let reply = client.do_command("Select: Start=0 End=0 Track=1")?;
/// ```
pub struct PipeClient {
    profile: PipeProfile,
    /// Commands go out here.
    writer: Option<File>,
    /// Responses come in here.
    reader: Option<BufReader<File>>,
    /// Set by a timed `write`, consumed by the next `read`.
    sent_at: Option<Instant>,
    last_round_trip: Option<Duration>,
    command_delay: Duration,
}

impl PipeClient {
    /// Create an unconnected client.
    pub fn new(profile: PipeProfile) -> Self {
        Self {
            profile,
            writer: None,
            reader: None,
            sent_at: None,
            last_round_trip: None,
            command_delay: DEFAULT_COMMAND_DELAY,
        }
    }

    /// Create a client and open both pipes.
    ///
    /// # Errors
    ///
    /// See [`PipeClient::open`].
    pub fn connect(profile: PipeProfile) -> Result<Self, PipeError> {
        let mut client = Self::new(profile);
        client.open()?;
        Ok(client)
    }

    /// Open the write and read channels.
    ///
    /// Both endpoints are checked before either is opened. If the read side
    /// fails to open, the already-opened write side is dropped before the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `PipeError::AlreadyConnected` if either half is still open
    /// - `PipeError::EndpointMissing` naming the first missing endpoint
    /// - `PipeError::Io` if an endpoint exists but cannot be opened
    pub fn open(&mut self) -> Result<(), PipeError> {
        if self.writer.is_some() || self.reader.is_some() {
            return Err(PipeError::AlreadyConnected);
        }

        for path in [self.profile.write_path(), self.profile.read_path()] {
            if !path.exists() {
                tracing::error!(
                    "{} does not exist. Ensure Audacity is running with mod-script-pipe.",
                    path.display()
                );
                return Err(PipeError::EndpointMissing {
                    path: path.to_path_buf(),
                });
            }
        }

        let writer = OpenOptions::new()
            .write(true)
            .open(self.profile.write_path())?;
        debug!("Opened to-pipe {}", self.profile.write_path().display());

        let reader = File::open(self.profile.read_path())?;
        debug!("Opened from-pipe {}", self.profile.read_path().display());

        self.writer = Some(writer);
        self.reader = Some(BufReader::new(reader));
        info!("Communication pipes with Audacity opened");

        Ok(())
    }

    /// Release both channels. Closing a closed or never-opened client is a no-op.
    pub fn close(&mut self) {
        let was_open = self.writer.is_some() || self.reader.is_some();

        self.writer = None;
        self.reader = None;
        self.sent_at = None;

        if was_open {
            info!("Communication pipes with Audacity closed");
        }
    }

    /// Open the pipes, run `f`, and close them on every exit path.
    ///
    /// The pipes are closed when `f` returns `Ok`, returns `Err`, or panics.
    ///
    /// # Errors
    ///
    /// Returns the error from `open`, or whatever `f` returns.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let reply = client.session(|client| client.do_command("SelectAll"))?;
    /// assert!(!client.is_open());
    /// ```
    pub fn session<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut PipeClient) -> Result<T, E>,
        E: From<PipeError>,
    {
        self.open()?;
        let guard = SessionGuard { client: self };
        let result = f(&mut *guard.client);
        drop(guard);
        result
    }

    /// True when both halves are open.
    pub fn is_open(&self) -> bool {
        self.writer.is_some() && self.reader.is_some()
    }

    /// True when the write half is open.
    pub fn is_write_open(&self) -> bool {
        self.writer.is_some()
    }

    /// True when the read half is open.
    pub fn is_read_open(&self) -> bool {
        self.reader.is_some()
    }

    pub fn profile(&self) -> &PipeProfile {
        &self.profile
    }

    /// Round-trip time of the last timed `write` + `read` pair.
    pub fn last_round_trip(&self) -> Option<Duration> {
        self.last_round_trip
    }

    /// Set the pause applied after each `do_command`.
    ///
    /// Default is 400ms.
    pub fn set_command_delay(&mut self, delay: Duration) {
        self.command_delay = delay;
    }

    /// Send one command line.
    ///
    /// With `timer` set, the send instant is recorded and the next `read`
    /// reports the round-trip time.
    ///
    /// # Errors
    ///
    /// Returns `PipeError::NotConnected` if the write half is closed, or
    /// `PipeError::Io` if the write fails.
    pub fn write(&mut self, command: &str, timer: bool) -> Result<(), PipeError> {
        let writer = self.writer.as_mut().ok_or(PipeError::NotConnected)?;

        write_command(writer, command, self.profile.command_eol())?;

        if timer {
            self.sent_at = Some(Instant::now());
        }

        Ok(())
    }

    /// Read one response. Blocks until the terminator arrives.
    ///
    /// # Errors
    ///
    /// Returns `PipeError::NotConnected` if the read half is closed, plus
    /// any error from [`read_response`].
    pub fn read(&mut self) -> Result<String, PipeError> {
        let reader = self.reader.as_mut().ok_or(PipeError::NotConnected)?;

        let response = read_response(reader, self.profile.response_eol())?;

        if let Some(sent_at) = self.sent_at.take() {
            let elapsed = sent_at.elapsed();
            debug!("Response received after {:?}", elapsed);
            self.last_round_trip = Some(elapsed);
        }

        Ok(response)
    }

    /// Write a command, read its response, then pause for the command delay.
    ///
    /// The pause stands in for an acknowledgment the protocol does not have;
    /// a slow enough peer can still fall out of step.
    pub fn do_command(&mut self, command: &str) -> Result<String, PipeError> {
        debug!("Sending command to Audacity: {}", command);
        self.write(command, true)?;

        let response = self.read()?;
        debug!("Received response from Audacity: {}", response);

        if !self.command_delay.is_zero() {
            std::thread::sleep(self.command_delay);
        }

        Ok(response)
    }
}

impl ScriptTransport for PipeClient {
    fn do_command(&mut self, command: &str) -> Result<String, PipeError> {
        PipeClient::do_command(self, command)
    }

    fn send(&mut self, command: &str) -> Result<(), PipeError> {
        debug!("Sending command to Audacity without reply: {}", command);
        self.write(command, false)
    }
}

impl Drop for PipeClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Closes the client when dropped, including during unwinding.
struct SessionGuard<'a> {
    client: &'a mut PipeClient,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.client.close();
    }
}
