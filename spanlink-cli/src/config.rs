//! Settings file and command-line overrides

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use spanlink_core::import::DEFAULT_CHUNK_LEN;
use spanlink_core::{OverlapPolicy, ProjectConfig, SplitStrategy};

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub project_name: String,
    pub labels: Vec<String>,
    pub relation_types: Vec<String>,
    pub overlap: OverlapPolicy,
    /// One of `as_is`, `paragraph`, `sentence`, `length`
    pub split: String,
    pub fixed_length: usize,
    /// Terminal rows per text line; the extra rows hold relation arcs
    pub line_height: u16,
    /// Where projects, exports and logs go; defaults to the config directory
    pub data_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let project = ProjectConfig::default();
        Self {
            project_name: project.name,
            labels: project.labels,
            relation_types: project.relation_types,
            overlap: OverlapPolicy::Allow,
            split: SplitStrategy::Sentence.name().to_string(),
            fixed_length: DEFAULT_CHUNK_LEN,
            line_height: 3,
            data_dir: None,
        }
    }
}

impl Settings {
    /// Read settings from `path`.
    ///
    /// A missing file gives the defaults. A file that cannot be parsed also
    /// gives the defaults, plus a notice for the status bar.
    pub fn load(path: &Path) -> (Self, Option<String>) {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return (Self::default(), None),
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => (settings, None),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "config unreadable, using defaults");
                (
                    Self::default(),
                    Some(format!("Ignoring {}: {}", path.display(), err)),
                )
            }
        }
    }

    pub fn project_config(&self) -> ProjectConfig {
        ProjectConfig::new(&self.project_name, &self.labels, &self.relation_types)
            .with_overlap(self.overlap)
    }

    /// Unknown strategy names fall back to sentence splitting
    pub fn split_strategy(&self) -> SplitStrategy {
        SplitStrategy::from_name(&self.split, self.fixed_length).unwrap_or_default()
    }

    pub fn line_height(&self) -> u16 {
        self.line_height.clamp(1, 5)
    }

    pub fn data_dir(&self, config_dir: &Path) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| config_dir.to_path_buf())
    }
}

/// Default config directory (`~/.spanlink`)
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".spanlink"))
}
