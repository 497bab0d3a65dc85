//! Batch audio-editing sequencer.
//!
//! `AudioEditor` turns high-level edits (import, move a clip, export) into the
//! ordered script commands Audacity expects, and sends them through a
//! [`ScriptTransport`]. The first failing command aborts the sequence; edits
//! already applied in the editor are left as they are.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::models::{Effect, ScriptCommand, UnquotablePath, Verb};
use crate::pipe::{PipeError, ScriptTransport};
use crate::scenario::Scenario;

/// Sequencer error types.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Track index outside the tracks imported so far.
    #[error("Invalid track number: {track} (have {total} tracks)")]
    InvalidTrack { track: usize, total: usize },

    #[error("File does not exist: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Path is not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("Directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to list {}: {source}", .path.display())]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File name holds a quote or line break the command line cannot carry.
    #[error("Invalid path: {0}")]
    InvalidPath(#[from] UnquotablePath),

    #[error(transparent)]
    Pipe(#[from] PipeError),
}

/// Fixed pauses inserted around slow editor operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorTimings {
    /// Wait after `Export2` so the file is fully written.
    pub export_settle: Duration,
}

impl Default for EditorTimings {
    fn default() -> Self {
        Self {
            export_settle: Duration::from_secs(5),
        }
    }
}

impl EditorTimings {
    /// No pauses at all; for fakes that answer instantly.
    pub fn immediate() -> Self {
        Self {
            export_settle: Duration::ZERO,
        }
    }
}

/// High-level editing session over a script transport.
///
/// Keeps count of the tracks it has imported so track indices can be checked
/// before a command reaches the editor.
pub struct AudioEditor<'a, T: ScriptTransport> {
    transport: &'a mut T,
    total_tracks: usize,
    timings: EditorTimings,
}

impl<'a, T: ScriptTransport> AudioEditor<'a, T> {
    pub fn new(transport: &'a mut T) -> Self {
        Self::with_timings(transport, EditorTimings::default())
    }

    pub fn with_timings(transport: &'a mut T, timings: EditorTimings) -> Self {
        Self {
            transport,
            total_tracks: 0,
            timings,
        }
    }

    /// Tracks imported through this editor.
    pub fn total_tracks(&self) -> usize {
        self.total_tracks
    }

    fn run(&mut self, command: ScriptCommand) -> Result<String, EditorError> {
        debug!("Issuing {}", command.verb());
        Ok(self.transport.do_command(&command.to_line())?)
    }

    /// Import one audio file as a new track; returns its track index.
    pub fn import_audio(&mut self, input: &Path) -> Result<usize, EditorError> {
        check_file_path(input)?;
        self.run(ScriptCommand::new(Verb::Import2).path("Filename", input)?)?;

        self.total_tracks += 1;
        debug!("Imported {} as track {}", input.display(), self.total_tracks - 1);
        Ok(self.total_tracks - 1)
    }

    /// Import every file in `input_dir` whose extension is in `extensions`,
    /// in file-name order. Returns the new track indices.
    pub fn import_audio_batch(
        &mut self,
        input_dir: &Path,
        extensions: &[String],
    ) -> Result<Vec<usize>, EditorError> {
        let files = files_by_extension(input_dir, extensions)?;
        info!("Importing {} recordings from {}", files.len(), input_dir.display());

        files.iter().map(|file| self.import_audio(file)).collect()
    }

    /// Select `start..end` seconds on one track.
    pub fn select_audio(&mut self, track: usize, start: f64, end: f64) -> Result<(), EditorError> {
        if track >= self.total_tracks {
            return Err(EditorError::InvalidTrack {
                track,
                total: self.total_tracks,
            });
        }

        self.run(
            ScriptCommand::new(Verb::Select)
                .param("Start", start)
                .param("End", end)
                .param("Track", track),
        )?;
        Ok(())
    }

    pub fn select_cursor_to_next_clip_boundary(&mut self) -> Result<(), EditorError> {
        self.run(Verb::SelCursorToNextClipBoundary.into())?;
        Ok(())
    }

    pub fn select_all(&mut self) -> Result<(), EditorError> {
        self.run(Verb::SelectAll.into())?;
        Ok(())
    }

    /// Replace the track selection with `count` tracks starting at `track`.
    pub fn select_tracks(&mut self, track: usize, count: usize) -> Result<(), EditorError> {
        self.run(
            ScriptCommand::new(Verb::SelectTracks)
                .param("Mode", "Set")
                .param("Track", track)
                .param("TrackCount", count),
        )?;
        Ok(())
    }

    /// Remove the selected tracks.
    ///
    /// The local track count is not adjusted; callers that remove tracks
    /// mid-session should not rely on `select_audio` bounds afterwards.
    pub fn remove_tracks(&mut self) -> Result<(), EditorError> {
        self.run(Verb::RemoveTracks.into())?;
        Ok(())
    }

    pub fn cut_audio(&mut self) -> Result<(), EditorError> {
        self.run(Verb::Cut.into())?;
        Ok(())
    }

    pub fn paste_audio(&mut self) -> Result<(), EditorError> {
        self.run(Verb::Paste.into())?;
        Ok(())
    }

    pub fn delete_audio(&mut self) -> Result<(), EditorError> {
        self.run(Verb::Delete.into())?;
        Ok(())
    }

    /// Cut the first clip of `track` and paste it at every destination.
    pub fn move_audio_clip(
        &mut self,
        track: usize,
        destinations: &[f64],
        duration: f64,
    ) -> Result<(), EditorError> {
        self.select_audio(track, 0.0, 0.0)?;
        self.select_cursor_to_next_clip_boundary()?;
        self.cut_audio()?;

        for &start in destinations {
            self.select_audio(track, start, start + duration)?;
            self.paste_audio()?;
        }

        Ok(())
    }

    /// Apply an effect to the current selection.
    pub fn apply_effect(&mut self, effect: &Effect) -> Result<(), EditorError> {
        self.run(effect.to_command())?;
        Ok(())
    }

    pub fn save_project(
        &mut self,
        output: &Path,
        add_to_history: bool,
        compress: bool,
    ) -> Result<(), EditorError> {
        self.run(
            ScriptCommand::new(Verb::SaveProject2)
                .path("Filename", output)?
                .flag("AddToHistory", add_to_history)
                .flag("Compress", compress),
        )?;
        Ok(())
    }

    /// Export the mix; the format follows the file extension.
    pub fn export_audio(&mut self, output: &Path) -> Result<(), EditorError> {
        self.run(ScriptCommand::new(Verb::Export2).path("Filename", output)?)?;
        info!("Exported {}", output.display());

        if !self.timings.export_settle.is_zero() {
            std::thread::sleep(self.timings.export_settle);
        }
        Ok(())
    }

    /// Ask the editor to quit. No response is read: the peer goes away.
    pub fn stop(&mut self) -> Result<(), EditorError> {
        self.transport.send(&ScriptCommand::from(Verb::Exit).to_line())?;
        info!("Sent Exit to Audacity");
        Ok(())
    }

    /// Run a whole scenario: soundtrack, recordings, placements, effects,
    /// optional project save, export.
    pub fn render_scenario(&mut self, scenario: &Scenario) -> Result<(), EditorError> {
        info!("Rendering scenario '{}'", scenario.name);

        self.import_audio(&scenario.soundtrack)?;
        self.import_audio_batch(&scenario.recordings, &scenario.extensions)?;

        for placement in &scenario.placements {
            self.move_audio_clip(placement.track, &placement.destinations, placement.duration)?;
        }

        if !scenario.effects.is_empty() {
            self.select_all()?;
            for effect in &scenario.effects {
                self.apply_effect(effect)?;
            }
        }

        if let Some(project) = &scenario.project {
            self.save_project(project, false, false)?;
        }

        self.export_audio(&scenario.export)
    }
}

fn check_file_path(path: &Path) -> Result<(), EditorError> {
    if !path.exists() {
        return Err(EditorError::MissingFile(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(EditorError::NotAFile(path.to_path_buf()));
    }
    Ok(())
}

fn check_dir_path(path: &Path) -> Result<(), EditorError> {
    if !path.exists() {
        return Err(EditorError::MissingDirectory(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(EditorError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Files directly inside `dir` whose extension matches one of `extensions`
/// (compared case-insensitively, with leading dot), sorted by path.
pub fn files_by_extension(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, EditorError> {
    check_dir_path(dir)?;

    let list_err = |source| EditorError::ListDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(list_err)? {
        let path = entry.map_err(list_err)?.path();
        // Skip subdirectories and anything else that is not a regular file
        if !path.is_file() {
            continue;
        }

        // Compare without the leading dot, ignoring case
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                extensions
                    .iter()
                    .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false);

        if matches {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Placement;
    use pretty_assertions::assert_eq;

    /// Records every command and answers with a canned reply.
    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<String>,
        fail_on: Option<String>,
    }

    impl ScriptTransport for RecordingTransport {
        fn do_command(&mut self, command: &str) -> Result<String, PipeError> {
            if self.fail_on.as_deref().is_some_and(|verb| command.starts_with(verb)) {
                return Err(PipeError::PeerClosed);
            }
            self.sent.push(command.to_string());
            Ok("BatchCommand finished: OK".to_string())
        }

        fn send(&mut self, command: &str) -> Result<(), PipeError> {
            self.sent.push(command.to_string());
            Ok(())
        }
    }

    fn recordings_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.m4a", "a.M4A", "notes.txt", "c.wav"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.m4a")).unwrap();
        dir
    }

    #[test]
    fn test_import_counts_tracks() {
        let dir = recordings_dir();
        let mut transport = RecordingTransport::default();
        let mut editor = AudioEditor::with_timings(&mut transport, EditorTimings::immediate());

        let first = editor.import_audio(&dir.path().join("b.m4a")).unwrap();
        let second = editor.import_audio(&dir.path().join("c.wav")).unwrap();

        assert_eq!((first, second), (0, 1));
        assert_eq!(editor.total_tracks(), 2);
        assert!(transport.sent[0].starts_with("Import2: Filename=\""));
    }

    #[test]
    fn test_import_missing_file_sends_nothing() {
        let mut transport = RecordingTransport::default();
        let mut editor = AudioEditor::new(&mut transport);

        let err = editor.import_audio(Path::new("/no/such/file.m4a")).unwrap_err();

        assert!(matches!(err, EditorError::MissingFile(_)));
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn test_import_directory_as_file_rejected() {
        let dir = recordings_dir();
        let mut transport = RecordingTransport::default();
        let mut editor = AudioEditor::new(&mut transport);

        let err = editor.import_audio(dir.path()).unwrap_err();
        assert!(matches!(err, EditorError::NotAFile(_)));
    }

    #[test]
    fn test_quoted_file_name_rejected_before_sending() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad\"name.m4a");
        std::fs::write(&input, b"").unwrap();

        let mut transport = RecordingTransport::default();
        let mut editor = AudioEditor::with_timings(&mut transport, EditorTimings::immediate());

        let err = editor.import_audio(&input).unwrap_err();
        assert!(matches!(err, EditorError::InvalidPath(_)));
        assert_eq!(editor.total_tracks(), 0);

        let err = editor.export_audio(&dir.path().join("out\".wav")).unwrap_err();
        assert!(matches!(err, EditorError::InvalidPath(_)));

        let err = editor
            .save_project(&dir.path().join("p\".aup3"), false, false)
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidPath(_)));

        assert!(transport.sent.is_empty());
    }

    #[test]
    fn test_files_by_extension_filters_and_sorts() {
        let dir = recordings_dir();
        let files = files_by_extension(dir.path(), &[".m4a".to_string()]).unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.M4A", "b.m4a"]);
    }

    #[test]
    fn test_timings_hold_only_export_settle() {
        assert_eq!(EditorTimings::default().export_settle, Duration::from_secs(5));
        assert_eq!(EditorTimings::immediate().export_settle, Duration::ZERO);
    }

    #[test]
    fn test_files_by_extension_missing_dir() {
        let err = files_by_extension(Path::new("/no/such/dir"), &[".m4a".to_string()]).unwrap_err();
        assert!(matches!(err, EditorError::MissingDirectory(_)));
    }

    #[test]
    fn test_select_rejects_unknown_track() {
        let mut transport = RecordingTransport::default();
        let mut editor = AudioEditor::new(&mut transport);

        let err = editor.select_audio(0, 0.0, 1.0).unwrap_err();

        assert!(matches!(err, EditorError::InvalidTrack { track: 0, total: 0 }));
        assert_eq!(err.to_string(), "Invalid track number: 0 (have 0 tracks)");
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn test_move_audio_clip_sequence() {
        let dir = recordings_dir();
        let mut transport = RecordingTransport::default();
        let mut editor = AudioEditor::with_timings(&mut transport, EditorTimings::immediate());
        editor.import_audio(&dir.path().join("a.M4A")).unwrap();
        editor.import_audio(&dir.path().join("b.m4a")).unwrap();

        editor.move_audio_clip(1, &[30.0, 90.5], 10.0).unwrap();

        assert_eq!(
            transport.sent[2..],
            [
                "Select: Start=0 End=0 Track=1",
                "SelCursorToNextClipBoundary",
                "Cut",
                "Select: Start=30 End=40 Track=1",
                "Paste",
                "Select: Start=90.5 End=100.5 Track=1",
                "Paste",
            ]
        );
    }

    #[test]
    fn test_simple_commands() {
        let mut transport = RecordingTransport::default();
        let mut editor = AudioEditor::with_timings(&mut transport, EditorTimings::immediate());

        editor.select_all().unwrap();
        editor.select_tracks(2, 3).unwrap();
        editor.remove_tracks().unwrap();
        editor.delete_audio().unwrap();
        editor.apply_effect(&Effect::echo()).unwrap();
        editor.save_project(Path::new("/tmp/nova.aup3"), false, true).unwrap();
        editor.export_audio(Path::new("/tmp/voices.aiff")).unwrap();
        editor.stop().unwrap();

        assert_eq!(
            transport.sent,
            vec![
                "SelectAll",
                "SelectTracks: Mode=Set Track=2 TrackCount=3",
                "RemoveTracks",
                "Delete",
                "Echo: Delay=1 Decay=0.5",
                "SaveProject2: Filename=\"/tmp/nova.aup3\" AddToHistory=False Compress=True",
                "Export2: Filename=\"/tmp/voices.aiff\"",
                "Exit",
            ]
        );
    }

    #[test]
    fn test_render_scenario_order() {
        let dir = recordings_dir();
        let soundtrack = dir.path().join("c.wav");
        let scenario = Scenario {
            name: "seascape".to_string(),
            soundtrack: soundtrack.clone(),
            recordings: dir.path().to_path_buf(),
            extensions: vec![".m4a".to_string()],
            placements: vec![Placement {
                track: 2,
                destinations: vec![60.0],
                duration: 5.0,
            }],
            effects: vec![Effect::reverb()],
            export: PathBuf::from("/tmp/voices.aiff"),
            project: None,
        };

        let mut transport = RecordingTransport::default();
        let mut editor = AudioEditor::with_timings(&mut transport, EditorTimings::immediate());
        editor.render_scenario(&scenario).unwrap();
        assert_eq!(editor.total_tracks(), 3);

        let verbs: Vec<&str> = transport
            .sent
            .iter()
            .map(|c| c.split(':').next().unwrap())
            .collect();
        assert_eq!(
            verbs,
            vec![
                "Import2",
                "Import2",
                "Import2",
                "Select",
                "SelCursorToNextClipBoundary",
                "Cut",
                "Select",
                "Paste",
                "SelectAll",
                "Reverb",
                "Export2",
            ]
        );
        assert!(transport.sent[0].contains("c.wav"));
        assert!(transport.sent[1].ends_with("a.M4A\""));
    }

    #[test]
    fn test_first_failure_aborts_sequence() {
        let dir = recordings_dir();
        let mut transport = RecordingTransport {
            fail_on: Some("Cut".to_string()),
            ..Default::default()
        };
        let mut editor = AudioEditor::with_timings(&mut transport, EditorTimings::immediate());
        editor.import_audio(&dir.path().join("a.M4A")).unwrap();

        let err = editor.move_audio_clip(0, &[10.0], 1.0).unwrap_err();

        assert!(matches!(err, EditorError::Pipe(PipeError::PeerClosed)));
        assert_eq!(transport.sent.last().unwrap(), "SelCursorToNextClipBoundary");
    }
}
