//! Arcade Audio - background music and sound effects for browser games
//!
//! Core modules:
//! - `audio`: Playback state machine, fade engine, random sound groups
//! - `platform`: Browser backend (HtmlAudioElement) and a headless backend
//! - `settings`: Volume defaults, asset locations and the sound catalog

pub mod audio;
pub mod platform;
pub mod settings;

pub use audio::{AudioError, AudioManager, MusicState, SoundGroup};
pub use settings::{AudioSettings, SoundCatalog, SourceResolver};

/// Audio configuration constants
pub mod consts {
    /// Number of discrete volume steps in a fade-out
    pub const FADE_STEPS: u32 = 20;
    /// Fade-out duration when the caller doesn't pick one (ms)
    pub const DEFAULT_FADE_MS: u32 = 1000;

    /// Default background music volume
    pub const DEFAULT_MUSIC_VOLUME: f32 = 0.7;
    /// Default sound effect volume
    pub const DEFAULT_SFX_VOLUME: f32 = 1.0;

    /// Asset layout: `audio/<id>.mp3`
    pub const DEFAULT_ASSET_DIR: &str = "audio";
    pub const DEFAULT_ASSET_EXTENSION: &str = "mp3";
}

/// Clamp a volume to [0, 1]; NaN counts as silence
#[inline]
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}
