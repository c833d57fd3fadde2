//! Audio settings and the sound catalog
//!
//! Persisted in LocalStorage by the host's options screen; the manager only
//! reads them at construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::audio::{AudioError, SoundGroup};
use crate::consts::*;

/// Maps a sound id to the asset it is loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResolver {
    dir: String,
    extension: String,
}

impl SourceResolver {
    pub fn new(dir: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    /// `<dir>/<id>.<extension>`
    pub fn locator(&self, id: &str) -> String {
        let dir = self.dir.trim_end_matches('/');
        if dir.is_empty() {
            format!("{}.{}", id, self.extension)
        } else {
            format!("{}/{}.{}", dir, id, self.extension)
        }
    }
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_DIR, DEFAULT_ASSET_EXTENSION)
    }
}

/// Every sound the game knows about, for preloading and named groups
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundCatalog {
    /// Background tracks
    pub music: Vec<String>,
    /// One-shot or looping effects
    pub effects: Vec<String>,
    /// Interchangeable variants played one at a time
    pub groups: BTreeMap<String, Vec<String>>,
}

impl SoundCatalog {
    /// All ids, music first, each once
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        let all = self
            .music
            .iter()
            .chain(&self.effects)
            .chain(self.groups.values().flatten());
        for id in all {
            if !ids.contains(&id.as_str()) {
                ids.push(id);
            }
        }
        ids
    }

    /// Groups with at least one member; empty ones are skipped with a warning
    pub fn sound_groups(&self) -> Vec<SoundGroup> {
        self.groups
            .iter()
            .filter_map(|(name, members)| match SoundGroup::new(name.as_str(), members.iter().cloned()) {
                Ok(group) => Some(group),
                Err(err) => {
                    log::warn!("Skipping catalog group: {}", err);
                    None
                }
            })
            .collect()
    }

    /// Catalog used by the demo game
    pub fn demo() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(
            "hit".to_string(),
            (1..=4).map(|i| format!("hit{i}")).collect(),
        );
        Self {
            music: vec!["menu".into(), "gameplay".into(), "victory".into()],
            effects: vec!["click".into(), "select".into(), "unlock".into()],
            groups,
        }
    }
}

/// Audio preferences and asset layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Background music volume (0.0 - 1.0)
    pub music_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Discrete steps per fade-out
    pub fade_steps: u32,
    /// Fade-out length when none is given (ms)
    pub default_fade_ms: u32,
    /// Directory holding the audio assets
    pub asset_dir: String,
    /// File extension of the audio assets
    pub asset_extension: String,
    pub catalog: SoundCatalog,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            music_volume: DEFAULT_MUSIC_VOLUME,
            sfx_volume: DEFAULT_SFX_VOLUME,
            fade_steps: FADE_STEPS,
            default_fade_ms: DEFAULT_FADE_MS,
            asset_dir: DEFAULT_ASSET_DIR.to_string(),
            asset_extension: DEFAULT_ASSET_EXTENSION.to_string(),
            catalog: SoundCatalog::demo(),
        }
    }
}

impl AudioSettings {
    /// LocalStorage key
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "arcade_audio_settings";

    pub fn from_json(json: &str) -> Result<Self, AudioError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, AudioError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn resolver(&self) -> SourceResolver {
        SourceResolver::new(self.asset_dir.as_str(), self.asset_extension.as_str())
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded audio settings from LocalStorage");
                        return settings;
                    }
                    Err(err) => log::warn!("Ignoring stored audio settings: {}", err),
                }
            }
        }

        log::info!("Using default audio settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = self.to_json() {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Audio settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_follows_asset_convention() {
        let resolver = SourceResolver::default();
        assert_eq!(resolver.locator("menu"), "audio/menu.mp3");

        let resolver = SourceResolver::new("sfx/", "ogg");
        assert_eq!(resolver.locator("hit1"), "sfx/hit1.ogg");

        let resolver = SourceResolver::new("", "wav");
        assert_eq!(resolver.locator("click"), "click.wav");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = AudioSettings::from_json(r#"{"music_volume": 0.25}"#).unwrap();
        assert_eq!(settings.music_volume, 0.25);
        assert_eq!(settings.sfx_volume, DEFAULT_SFX_VOLUME);
        assert_eq!(settings.fade_steps, FADE_STEPS);
        assert_eq!(settings.resolver().locator("menu"), "audio/menu.mp3");
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = AudioSettings::from_json("{ nope").unwrap_err();
        assert!(matches!(err, AudioError::Settings(_)));
    }

    #[test]
    fn test_settings_survive_json() {
        let mut settings = AudioSettings::default();
        settings.sfx_volume = 0.5;
        settings.asset_extension = "ogg".into();
        let json = settings.to_json().unwrap();
        assert_eq!(AudioSettings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_catalog_ids_are_unique() {
        let mut catalog = SoundCatalog::demo();
        catalog.effects.push("hit2".into());
        let ids = catalog.ids();
        assert_eq!(ids.iter().filter(|id| **id == "hit2").count(), 1);
        assert_eq!(ids[0], "menu");
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_empty_catalog_group_skipped() {
        let mut catalog = SoundCatalog::default();
        catalog.groups.insert("ghost".into(), Vec::new());
        catalog.groups.insert("step".into(), vec!["step1".into()]);
        let groups = catalog.sound_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name(), "step");
    }
}
