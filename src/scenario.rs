//! Scenario files.
//!
//! A scenario bundles one batch job: the soundtrack, the directory of voice
//! recordings, where each recording lands on the timeline, and where the mix
//! is exported. Scenarios are JSON files read with serde.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::Effect;

/// Where a recording track's clip is copied to on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Track index of the imported recording (the soundtrack is track 0).
    pub track: usize,
    /// Start offsets in seconds; the clip is pasted at each.
    pub destinations: Vec<f64>,
    /// Clip length in seconds.
    pub duration: f64,
}

/// One batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub soundtrack: PathBuf,
    pub recordings: PathBuf,
    /// Extensions (with leading dot) picked up from `recordings`.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub placements: Vec<Placement>,
    /// Applied to the whole project after placement.
    #[serde(default)]
    pub effects: Vec<Effect>,
    pub export: PathBuf,
    /// When set, the project is saved here before exporting.
    #[serde(default)]
    pub project: Option<PathBuf>,
}

fn default_extensions() -> Vec<String> {
    vec![".m4a".to_string()]
}

impl Scenario {
    /// Parse a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        let scenario: Scenario = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid scenario file {}", path.display()))?;
        scenario.validate()?;

        tracing::info!("Loaded scenario '{}' from {}", scenario.name, path.display());
        Ok(scenario)
    }

    /// Load by path, or by bare name from the user scenario directory.
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        Self::resolve_in(scenario_dir().as_deref(), name_or_path)
    }

    /// Load by path, or by bare name as `<dir>/<name>.json`.
    pub fn resolve_in(dir: Option<&Path>, name_or_path: &str) -> Result<Self> {
        // An existing file always wins over a bare name
        let direct = Path::new(name_or_path);
        if direct.is_file() {
            return Self::load(direct);
        }

        let candidate = dir.map(|dir| dir.join(format!("{}.json", name_or_path)));
        if let Some(candidate) = candidate.as_deref().filter(|c| c.is_file()) {
            return Self::load(candidate);
        }

        match candidate {
            Some(candidate) => bail!(
                "Scenario '{}' not found (looked for {} and {})",
                name_or_path,
                direct.display(),
                candidate.display()
            ),
            None => bail!("Scenario '{}' not found", name_or_path),
        }
    }

    /// Reject scenarios that cannot be sequenced.
    pub fn validate(&self) -> Result<()> {
        for placement in &self.placements {
            if placement.track == 0 {
                bail!("Placement targets track 0, which holds the soundtrack");
            }
            if placement.duration.is_nan() || placement.duration <= 0.0 {
                bail!(
                    "Placement for track {} has non-positive duration {}",
                    placement.track,
                    placement.duration
                );
            }
            if let Some(start) = placement.destinations.iter().find(|s| **s < 0.0) {
                bail!(
                    "Placement for track {} has negative destination {}",
                    placement.track,
                    start
                );
            }
        }

        if let Some(ext) = self.extensions.iter().find(|e| !e.starts_with('.')) {
            bail!("Extension '{}' must start with a dot", ext);
        }

        Ok(())
    }
}

/// `<config>/nova/scenarios`, e.g. `~/.config/nova/scenarios` on Linux.
pub fn scenario_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("nova").join("scenarios"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SEASCAPE: &str = r#"{
        "name": "seascape",
        "soundtrack": "/srv/nova/audio/soundscape.mp3",
        "recordings": "/srv/nova/audio/recordings",
        "placements": [
            { "track": 1, "destinations": [5.0], "duration": 10.0 },
            { "track": 2, "destinations": [30.0, 90.0], "duration": 10.0 }
        ],
        "effects": [ { "kind": "reverb", "room_size": 90.0 } ],
        "export": "/srv/nova/out/voices.aiff"
    }"#;

    #[test]
    fn test_parse_with_defaults() {
        let scenario: Scenario = serde_json::from_str(SEASCAPE).unwrap();

        assert_eq!(scenario.name, "seascape");
        assert_eq!(scenario.extensions, vec![".m4a"]);
        assert_eq!(scenario.placements.len(), 2);
        assert_eq!(scenario.placements[1].destinations, vec![30.0, 90.0]);
        assert!(scenario.project.is_none());
        assert!(matches!(
            scenario.effects[0],
            Effect::Reverb { room_size, reverberance, .. } if room_size == 90.0 && reverberance == 50.0
        ));
        scenario.validate().unwrap();
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seascape.json");
        std::fs::write(&path, SEASCAPE).unwrap();

        let scenario = Scenario::load(&path).unwrap();
        assert_eq!(scenario.export, PathBuf::from("/srv/nova/out/voices.aiff"));

        let resolved = Scenario::resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(resolved, scenario);
    }

    #[test]
    fn test_load_reports_path_on_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Scenario::load(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid scenario file"));
    }

    #[test]
    fn test_resolve_bare_name_from_scenario_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seascape.json"), SEASCAPE).unwrap();

        let scenario = Scenario::resolve_in(Some(dir.path()), "seascape").unwrap();
        assert_eq!(scenario.name, "seascape");

        let err = Scenario::resolve_in(Some(dir.path()), "forest").unwrap_err();
        assert!(err.to_string().contains("forest.json"));

        let err = Scenario::resolve_in(None, "seascape").unwrap_err();
        assert_eq!(err.to_string(), "Scenario 'seascape' not found");
    }

    #[test]
    fn test_resolve_unknown_name() {
        let err = Scenario::resolve("no-such-scenario-anywhere").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_validate_rejects_soundtrack_track() {
        let mut scenario: Scenario = serde_json::from_str(SEASCAPE).unwrap();
        scenario.placements[0].track = 0;
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_duration() {
        let mut scenario: Scenario = serde_json::from_str(SEASCAPE).unwrap();
        scenario.placements[0].duration = 0.0;
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bare_extension() {
        let mut scenario: Scenario = serde_json::from_str(SEASCAPE).unwrap();
        scenario.extensions = vec!["wav".to_string()];
        assert!(scenario.validate().is_err());
    }
}
