//! Settings — resolved once at startup and handed to each component.
//!
//! Every field has a default, so an empty JSON object (or no file at all) is
//! a valid configuration:
//!
//! ```json
//! {
//!   "api_base": "https://api.openai.com/v1",
//!   "model": "gpt-4o-mini-tts",
//!   "output_dir": "/home/me/Downloads/Callbench",
//!   "key_source": "keyring",
//!   "key_env_var": "OPENAI_API_KEY",
//!   "naming": "timestamped",
//!   "open_folder": true
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    credentials::{EnvKeySource, KeySource, KEY_NAME},
    error::{CallbenchError, Result},
    output::{default_output_dir, NamingStrategy, OutputLayout},
    synth::{OpenAiSpeech, DEFAULT_API_BASE, DEFAULT_MODEL},
};

/// Application name; also the output folder name.
pub const APP_NAME: &str = "Callbench";

/// Where the API key comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// OS credential store, prompting and saving when empty.
    Keyring,
    /// Environment variable named by `key_env_var`.
    Env,
}

impl Default for KeyStrategy {
    fn default() -> Self {
        if cfg!(feature = "keyring") {
            KeyStrategy::Keyring
        } else {
            KeyStrategy::Env
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base: String,
    pub model: String,
    /// `None` → `<downloads>/Callbench`.
    pub output_dir: Option<PathBuf>,
    pub key_source: KeyStrategy,
    pub key_env_var: String,
    pub naming: NamingStrategy,
    /// Reveal the output folder after a successful render.
    pub open_folder: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            output_dir: None,
            key_source: KeyStrategy::default(),
            key_env_var: KEY_NAME.to_string(),
            naming: NamingStrategy::default(),
            open_folder: true,
        }
    }
}

impl Settings {
    /// Parse a JSON settings file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            CallbenchError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            CallbenchError::Configuration(format!("invalid settings in {}: {}", path.display(), e))
        })
    }

    /// Settings from `path` when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| default_output_dir(APP_NAME))
    }

    pub fn output_layout(&self) -> OutputLayout {
        OutputLayout::new(self.output_dir(), self.naming)
    }

    pub fn synthesizer(&self) -> OpenAiSpeech {
        OpenAiSpeech::new(&self.api_base, &self.model)
    }

    /// Build the configured key source.
    pub fn key_source(&self) -> Result<Box<dyn KeySource>> {
        match self.key_source {
            KeyStrategy::Env => Ok(Box::new(EnvKeySource::new(&self.key_env_var))),
            #[cfg(feature = "keyring")]
            KeyStrategy::Keyring => Ok(Box::new(crate::credentials::KeyringKeySource::default())),
            #[cfg(not(feature = "keyring"))]
            KeyStrategy::Keyring => Err(CallbenchError::Configuration(
                "built without credential-store support; use key_source \"env\"".to_string(),
            )),
        }
    }
}
