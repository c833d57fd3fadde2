//! Audio error types

use thiserror::Error;

/// Errors raised by audio backends and configuration
///
/// Playback calls on [`AudioManager`](super::AudioManager) never return these;
/// start failures are logged where they surface.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The backend couldn't create a resource for a source locator
    #[error("failed to load '{source_locator}': {reason}")]
    Load {
        source_locator: String,
        reason: String,
    },

    /// The platform rejected a play/resume request
    #[error("playback start rejected: {reason}")]
    Start { reason: String },

    /// The platform couldn't register a repeating timer
    #[error("failed to schedule timer: {reason}")]
    Timer { reason: String },

    /// A browser object (window, document) is missing
    #[error("browser API unavailable: {0}")]
    Unavailable(&'static str),

    /// A sound group was built with no members
    #[error("sound group '{0}' has no members")]
    EmptyGroup(String),

    /// Settings JSON was malformed
    #[error("invalid audio settings: {0}")]
    Settings(#[from] serde_json::Error),
}

impl AudioError {
    pub fn start(reason: impl Into<String>) -> Self {
        AudioError::Start {
            reason: reason.into(),
        }
    }

    pub fn load(source_locator: impl Into<String>, reason: impl Into<String>) -> Self {
        AudioError::Load {
            source_locator: source_locator.into(),
            reason: reason.into(),
        }
    }

    pub fn timer(reason: impl Into<String>) -> Self {
        AudioError::Timer {
            reason: reason.into(),
        }
    }
}
