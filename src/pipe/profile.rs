//! Platform profile for the scripting pipes.
//!
//! Everything that differs between operating systems (pipe locations, line
//! terminator, how to launch the editor) is resolved once into a
//! [`PipeProfile`] and handed to the client.

use std::path::{Path, PathBuf};

use crate::pipe::client::PipeError;
use crate::pipe::framing::RESPONSE_TERMINATOR;

/// Overrides the detected to-pipe path.
pub const ENV_PIPE_TO: &str = "NOVA_PIPE_TO";
/// Overrides the detected from-pipe path.
pub const ENV_PIPE_FROM: &str = "NOVA_PIPE_FROM";

const WINDOWS_TO_PIPE: &str = r"\\.\pipe\ToSrvPipe";
const WINDOWS_FROM_PIPE: &str = r"\\.\pipe\FromSrvPipe";
const WINDOWS_EOL: &str = "\r\n\0";
const WINDOWS_EXECUTABLE: &str = r"C:\Program Files\Audacity\Audacity.exe";

const UNIX_PIPE_PREFIX: &str = "/tmp/audacity_script_pipe";
const UNIX_EOL: &str = "\n";

/// How to find and start the editor process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    /// Case-insensitive substring matched against running process names.
    pub process_name: String,
    /// Program to execute.
    pub program: String,
    /// Arguments passed to `program`.
    pub args: Vec<String>,
}

impl LaunchCommand {
    fn new(process_name: &str, program: &str, args: &[&str]) -> Self {
        Self {
            process_name: process_name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Immutable description of how to talk to the editor on one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeProfile {
    write_path: PathBuf,
    read_path: PathBuf,
    command_eol: &'static str,
    response_eol: &'static str,
    launch: LaunchCommand,
}

impl PipeProfile {
    /// Resolve the profile for the host operating system.
    ///
    /// `NOVA_PIPE_TO` / `NOVA_PIPE_FROM` replace the detected pipe paths when
    /// both are set.
    ///
    /// # Errors
    ///
    /// Returns `PipeError::UnsupportedPlatform` on anything other than
    /// Windows, Linux or macOS.
    pub fn detect() -> Result<Self, PipeError> {
        let profile = Self::for_os(std::env::consts::OS)?;

        Ok(profile.with_overrides(
            std::env::var(ENV_PIPE_TO).ok(),
            std::env::var(ENV_PIPE_FROM).ok(),
        ))
    }

    /// Apply `NOVA_PIPE_TO` / `NOVA_PIPE_FROM` values. A lone override is
    /// ignored: one pipe moved without the other cannot pair up.
    pub fn with_overrides(self, to: Option<String>, from: Option<String>) -> Self {
        match (to, from) {
            (Some(to), Some(from)) => {
                tracing::info!("Using pipe overrides: {} / {}", to, from);
                self.with_paths(to, from)
            }
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!(
                    "Only one of {} / {} is set; ignoring the override",
                    ENV_PIPE_TO,
                    ENV_PIPE_FROM
                );
                self
            }
            (None, None) => self,
        }
    }

    /// Profile for a named OS, as reported by `std::env::consts::OS`.
    pub fn for_os(os: &str) -> Result<Self, PipeError> {
        match os {
            "windows" => Ok(Self {
                write_path: PathBuf::from(WINDOWS_TO_PIPE),
                read_path: PathBuf::from(WINDOWS_FROM_PIPE),
                command_eol: WINDOWS_EOL,
                response_eol: RESPONSE_TERMINATOR,
                launch: LaunchCommand::new("audacity", WINDOWS_EXECUTABLE, &[]),
            }),
            "linux" | "macos" => {
                let uid = current_uid();
                let launch = if os == "linux" {
                    LaunchCommand::new("audacity", "audacity", &[])
                } else {
                    LaunchCommand::new("audacity", "open", &["-a", "Audacity"])
                };
                Ok(Self {
                    write_path: PathBuf::from(format!("{}.to.{}", UNIX_PIPE_PREFIX, uid)),
                    read_path: PathBuf::from(format!("{}.from.{}", UNIX_PIPE_PREFIX, uid)),
                    command_eol: UNIX_EOL,
                    response_eol: RESPONSE_TERMINATOR,
                    launch,
                })
            }
            other => Err(PipeError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Same profile with explicit pipe locations.
    pub fn with_paths(mut self, write_path: impl Into<PathBuf>, read_path: impl Into<PathBuf>) -> Self {
        self.write_path = write_path.into();
        self.read_path = read_path.into();
        self
    }

    /// Path of the channel commands are written to.
    pub fn write_path(&self) -> &Path {
        &self.write_path
    }

    /// Path of the channel responses are read from.
    pub fn read_path(&self) -> &Path {
        &self.read_path
    }

    /// Appended to every outbound command.
    pub fn command_eol(&self) -> &'static str {
        self.command_eol
    }

    /// Line that ends a response.
    pub fn response_eol(&self) -> &'static str {
        self.response_eol
    }

    pub fn launch(&self) -> &LaunchCommand {
        &self.launch
    }
}

/// Real user ID of the current process; Audacity suffixes its pipe names with it.
#[cfg(unix)]
pub fn current_uid() -> u32 {
    nix::unistd::getuid().as_raw()
}

#[cfg(not(unix))]
pub fn current_uid() -> u32 {
    0
}
