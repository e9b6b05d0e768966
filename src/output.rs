//! Where rendered files go and what they are called.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CallbenchError, Result};

/// Base name of the rendered announcement.
const OUTPUT_STEM: &str = "ansage";

/// Base name of the temporary synthesized voice.
const VOICE_STEM: &str = "voice";

/// How output files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingStrategy {
    /// `ansage_2026-10-16_09-30-00.wav`. Every run keeps its files.
    #[default]
    Timestamped,
    /// `ansage.wav`. Each run overwrites the previous one.
    Fixed,
}

/// The three files one render touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPaths {
    pub dir: PathBuf,
    pub voice: PathBuf,
    pub wav: PathBuf,
    pub mp3: PathBuf,
}

/// Output directory plus naming strategy, resolved once at startup.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    dir: PathBuf,
    naming: NamingStrategy,
}

impl OutputLayout {
    pub fn new(dir: impl Into<PathBuf>, naming: NamingStrategy) -> Self {
        Self { dir: dir.into(), naming }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn naming(&self) -> NamingStrategy {
        self.naming
    }

    /// Create the output directory if needed and pick this run's file names.
    pub fn prepare(&self) -> Result<RenderPaths> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            CallbenchError::Configuration(format!(
                "cannot create output folder {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let suffix = match self.naming {
            NamingStrategy::Timestamped => {
                format!("_{}", Local::now().format("%Y-%m-%d_%H-%M-%S"))
            }
            NamingStrategy::Fixed => String::new(),
        };
        let paths = RenderPaths {
            dir: self.dir.clone(),
            voice: self.dir.join(format!("{}{}.wav", VOICE_STEM, suffix)),
            wav: self.dir.join(format!("{}{}.wav", OUTPUT_STEM, suffix)),
            mp3: self.dir.join(format!("{}{}.mp3", OUTPUT_STEM, suffix)),
        };
        debug!(?paths, "output paths");
        Ok(paths)
    }
}

/// `<downloads>/<app_name>`, falling back to `~/Downloads/<app_name>`.
pub fn default_output_dir(app_name: &str) -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(app_name)
}

/// Reveal `dir` in the host file browser. Failure is logged, not raised.
pub fn open_folder(dir: &Path) {
    if let Err(e) = open::that(dir) {
        warn!(dir = %dir.display(), "could not open output folder: {}", e);
    }
}
