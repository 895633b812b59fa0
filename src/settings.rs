//! Episode configuration
//!
//! Loaded from a JSON file when one is supplied, with logged fallback to
//! defaults. Spawn rates and budgets stay compile-time constants in
//! [`crate::consts`]; settings only cover the knobs an episode driver
//! actually varies.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_EPISODE_STEPS;

/// Which layout `reset()` produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LayoutMode {
    /// The fixed tournament starting layout
    Fixed,
    /// Budgeted procedural generation
    #[default]
    Randomized,
}

/// Per-environment settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvSettings {
    pub layout: LayoutMode,
    /// Time budget per episode, in steps
    pub episode_steps: u32,
    /// Base RNG seed for field generation
    pub seed: u64,
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self {
            layout: LayoutMode::default(),
            episode_steps: DEFAULT_EPISODE_STEPS,
            seed: 0,
        }
    }
}

impl EnvSettings {
    /// Load settings from a JSON file, falling back to defaults when the
    /// file is missing or malformed
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("loaded settings from {}", path.display());
                    settings
                }
                Err(err) => {
                    log::warn!(
                        "invalid settings file {}: {err}; using defaults",
                        path.display()
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!("could not read {}: {err}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, json)
    }
}
