use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::app::App;

pub const DARK_MODE: &str = "dark";
pub const REDUCE_MOTION: &str = "reduce-anim";
pub const ONBOARDING_SEEN: &str = "onboarding-seen";

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid preferences file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write preferences: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub dark_mode: bool,
    pub reduce_motion: bool,
    pub onboarding_seen: bool,
}

/// Small key/value file of string flags.
pub struct PreferenceStore {
    path: Option<PathBuf>,
    values: Mutex<BTreeMap<String, String>>,
}

impl PreferenceStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PrefsError> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            toml::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: Some(path),
            values: Mutex::new(values),
        })
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), PrefsError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, toml::to_string(&*values)?)?;
        }
        Ok(())
    }

    pub fn load(&self) -> Preferences {
        let flag = |key: &str| self.get(key).as_deref() == Some("1");
        Preferences {
            dark_mode: flag(DARK_MODE),
            reduce_motion: flag(REDUCE_MOTION),
            onboarding_seen: self.get(ONBOARDING_SEEN).is_some(),
        }
    }
}

fn flag_value(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}

impl App {
    pub fn set_dark_mode(&self, on: bool) {
        self.write_pref(DARK_MODE, flag_value(on));
        self.state().prefs.dark_mode = on;
    }

    pub fn set_reduce_motion(&self, on: bool) {
        self.write_pref(REDUCE_MOTION, flag_value(on));
        self.state().prefs.reduce_motion = on;
    }

    pub fn finish_onboarding(&self) {
        self.write_pref(ONBOARDING_SEEN, "1");
        self.state().prefs.onboarding_seen = true;
    }

    pub fn should_show_onboarding(&self) -> bool {
        !self.state().prefs.onboarding_seen
    }

    // Preference writes never fail the toggle itself.
    fn write_pref(&self, key: &str, value: &str) {
        if let Err(e) = self.prefs.set(key, value) {
            tracing::warn!("Failed to save preference {}: {}", key, e);
        }
    }
}
