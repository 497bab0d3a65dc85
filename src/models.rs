//! Script command models.
//!
//! Commands are rendered as `Verb: Key1=Value1 Key2=Value2`, the form
//! Audacity's scripting interface accepts over the pipe.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scripting verbs issued by the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Import2,
    SaveProject2,
    Select,
    SelCursorToNextClipBoundary,
    SelectAll,
    SelectTracks,
    RemoveTracks,
    Cut,
    Paste,
    Delete,
    Export2,
    Reverb,
    Echo,
    Delay,
    Exit,
}

impl Verb {
    /// Name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Import2 => "Import2",
            Verb::SaveProject2 => "SaveProject2",
            Verb::Select => "Select",
            Verb::SelCursorToNextClipBoundary => "SelCursorToNextClipBoundary",
            Verb::SelectAll => "SelectAll",
            Verb::SelectTracks => "SelectTracks",
            Verb::RemoveTracks => "RemoveTracks",
            Verb::Cut => "Cut",
            Verb::Paste => "Paste",
            Verb::Delete => "Delete",
            Verb::Export2 => "Export2",
            Verb::Reverb => "Reverb",
            Verb::Echo => "Echo",
            Verb::Delay => "Delay",
            Verb::Exit => "Exit",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A path that cannot be carried inside a quoted parameter value.
#[derive(Debug, Error)]
#[error("{} contains a quote or line break", .0.display())]
pub struct UnquotablePath(pub PathBuf);

/// One command line: a verb plus ordered `Key=Value` parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptCommand {
    verb: Verb,
    params: Vec<(String, String)>,
}

impl ScriptCommand {
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            params: Vec::new(),
        }
    }

    /// Append a `key=value` parameter.
    pub fn param(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a boolean parameter, spelled `True` / `False`.
    pub fn flag(self, key: &str, value: bool) -> Self {
        self.param(key, if value { "True" } else { "False" })
    }

    /// Append a double-quoted file name with forward slashes.
    ///
    /// The protocol has no escaping, so a quote or line break in the name
    /// would end the value or the command early; such paths are rejected.
    pub fn path(self, key: &str, path: &Path) -> Result<Self, UnquotablePath> {
        let normalized = path.to_string_lossy().replace('\\', "/");
        if normalized.contains(['"', '\n', '\r', '\0']) {
            return Err(UnquotablePath(path.to_path_buf()));
        }
        Ok(self.param(key, format!("\"{}\"", normalized)))
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Render the wire line, without the EOL.
    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ScriptCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb.as_str())?;

        for (i, (key, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { ": " } else { " " };
            write!(f, "{}{}={}", sep, key, value)?;
        }

        Ok(())
    }
}

impl From<Verb> for ScriptCommand {
    fn from(verb: Verb) -> Self {
        ScriptCommand::new(verb)
    }
}

/// Built-in effects applied to the current selection.
///
/// Defaults match Audacity's own factory presets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    Reverb {
        #[serde(default = "defaults::room_size")]
        room_size: f64,
        /// Pre-delay in milliseconds.
        #[serde(default = "defaults::pre_delay")]
        pre_delay: f64,
        #[serde(default = "defaults::reverberance")]
        reverberance: f64,
        #[serde(default = "defaults::hf_damping")]
        hf_damping: f64,
        /// dB
        #[serde(default = "defaults::wet_gain")]
        wet_gain: f64,
        /// dB
        #[serde(default = "defaults::dry_gain")]
        dry_gain: f64,
        #[serde(default)]
        wet_only: bool,
    },
    Echo {
        /// Seconds between repeats.
        #[serde(default = "defaults::echo_delay")]
        delay: f64,
        /// Amplitude factor applied to each repeat.
        #[serde(default = "defaults::echo_decay")]
        decay: f64,
    },
    Delay {
        /// Per-echo gain change in dB.
        #[serde(default = "defaults::delay_gain")]
        decay_db: f64,
        /// Seconds between echoes.
        #[serde(default = "defaults::delay_time")]
        delay: f64,
        #[serde(default = "defaults::delay_count")]
        count: u32,
    },
}

mod defaults {
    pub fn room_size() -> f64 {
        75.0
    }
    pub fn pre_delay() -> f64 {
        10.0
    }
    pub fn reverberance() -> f64 {
        50.0
    }
    pub fn hf_damping() -> f64 {
        50.0
    }
    pub fn wet_gain() -> f64 {
        -1.0
    }
    pub fn dry_gain() -> f64 {
        -1.0
    }
    pub fn echo_delay() -> f64 {
        1.0
    }
    pub fn echo_decay() -> f64 {
        0.5
    }
    pub fn delay_gain() -> f64 {
        -6.0
    }
    pub fn delay_time() -> f64 {
        0.3
    }
    pub fn delay_count() -> u32 {
        5
    }
}

impl Effect {
    /// Reverb with factory settings.
    pub fn reverb() -> Self {
        Effect::Reverb {
            room_size: defaults::room_size(),
            pre_delay: defaults::pre_delay(),
            reverberance: defaults::reverberance(),
            hf_damping: defaults::hf_damping(),
            wet_gain: defaults::wet_gain(),
            dry_gain: defaults::dry_gain(),
            wet_only: false,
        }
    }

    /// Echo with factory settings.
    pub fn echo() -> Self {
        Effect::Echo {
            delay: defaults::echo_delay(),
            decay: defaults::echo_decay(),
        }
    }

    /// Delay with factory settings.
    pub fn delay() -> Self {
        Effect::Delay {
            decay_db: defaults::delay_gain(),
            delay: defaults::delay_time(),
            count: defaults::delay_count(),
        }
    }

    pub fn to_command(&self) -> ScriptCommand {
        match *self {
            Effect::Reverb {
                room_size,
                pre_delay,
                reverberance,
                hf_damping,
                wet_gain,
                dry_gain,
                wet_only,
            } => ScriptCommand::new(Verb::Reverb)
                .param("RoomSize", room_size)
                .param("Delay", pre_delay)
                .param("Reverberance", reverberance)
                .param("HfDamping", hf_damping)
                .param("WetGain", wet_gain)
                .param("DryGain", dry_gain)
                .flag("WetOnly", wet_only),
            Effect::Echo { delay, decay } => ScriptCommand::new(Verb::Echo)
                .param("Delay", delay)
                .param("Decay", decay),
            // Delay is a Nyquist effect, so its keys follow Nyquist control names.
            Effect::Delay {
                decay_db,
                delay,
                count,
            } => ScriptCommand::new(Verb::Delay)
                .param("dgain", decay_db)
                .param("delay", delay)
                .param("number", count),
        }
    }
}
