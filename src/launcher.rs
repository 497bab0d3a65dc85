//! Finding or starting the Audacity process.
//!
//! The pipes only exist while Audacity runs with mod-script-pipe loaded, so a
//! session starts by making sure the process is up. Detection shells out to
//! the platform's process lister (`pgrep` or `tasklist`) instead of walking
//! the process table directly.

use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::{debug, info};

use crate::pipe::{LaunchCommand, PipeError};

/// Time Audacity needs after spawn before its pipes appear.
pub const DEFAULT_WARM_UP: Duration = Duration::from_secs(3);

/// Outcome of [`Launcher::ensure_running`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorProcess {
    AlreadyRunning { pid: u32 },
    Launched { pid: u32 },
}

impl EditorProcess {
    pub fn pid(&self) -> u32 {
        match *self {
            EditorProcess::AlreadyRunning { pid } | EditorProcess::Launched { pid } => pid,
        }
    }
}

/// Starts the editor when it is not already running.
#[derive(Debug, Clone)]
pub struct Launcher {
    command: LaunchCommand,
    warm_up: Duration,
}

impl Launcher {
    pub fn new(command: LaunchCommand) -> Self {
        Self {
            command,
            warm_up: DEFAULT_WARM_UP,
        }
    }

    /// Override the post-spawn wait.
    pub fn with_warm_up(mut self, warm_up: Duration) -> Self {
        self.warm_up = warm_up;
        self
    }

    /// Return the running editor's PID, spawning it first if needed.
    ///
    /// A freshly spawned process is given `warm_up` to create its pipes.
    ///
    /// # Errors
    ///
    /// Returns `PipeError::LaunchFailed` if the process cannot be spawned.
    pub fn ensure_running(&self) -> Result<EditorProcess, PipeError> {
        info!("Checking if {} is running", self.command.process_name);

        // Reuse a running instance
        if let Some(pid) = find_process(&self.command.process_name) {
            info!("Audacity is already running with pid: {}", pid);
            return Ok(EditorProcess::AlreadyRunning { pid });
        }

        info!("Launching {} {:?}", self.command.program, self.command.args);
        let child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(PipeError::LaunchFailed)?;

        let pid = child.id();
        debug!("Audacity process started with pid: {}", pid);

        // Audacity creates its pipes only after loading mod-script-pipe
        if !self.warm_up.is_zero() {
            std::thread::sleep(self.warm_up);
        }

        Ok(EditorProcess::Launched { pid })
    }
}

/// PID of the first running process whose name contains `name`
/// (case-insensitive). Lister failures count as "not running".
pub fn find_process(name: &str) -> Option<u32> {
    let output = list_processes(name)?;
    let listing = String::from_utf8_lossy(&output);

    if cfg!(windows) {
        parse_tasklist_csv(&listing, name)
    } else {
        parse_pgrep(&listing)
    }
}

fn list_processes(name: &str) -> Option<Vec<u8>> {
    let result = if cfg!(windows) {
        Command::new("tasklist").args(["/FO", "CSV", "/NH"]).output()
    } else {
        Command::new("pgrep").args(["-i", "-l", name]).output()
    };

    match result {
        Ok(output) => Some(output.stdout),
        Err(e) => {
            debug!("Process lister unavailable: {}", e);
            None
        }
    }
}

/// First PID from `pgrep -l` output (`<pid> <name>` per line).
pub fn parse_pgrep(listing: &str) -> Option<u32> {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .find_map(|pid| pid.parse().ok())
}

/// First PID from `tasklist /FO CSV /NH` output whose image name contains `name`.
pub fn parse_tasklist_csv(listing: &str, name: &str) -> Option<u32> {
    let needle = name.to_lowercase();

    listing.lines().find_map(|line| {
        let mut fields = line.split("\",\"").map(|f| f.trim_matches('"'));
        let image = fields.next()?;
        let pid = fields.next()?;

        if image.to_lowercase().contains(&needle) {
            pid.trim().parse().ok()
        } else {
            None
        }
    })
}
