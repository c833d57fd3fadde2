//! Audio playback: background music slot, effect sounds and fades
//!
//! Platform specifics live behind [`AudioBackend`]; see `crate::platform`.

pub mod backend;
pub mod error;
pub mod fade;
pub mod group;
pub mod manager;

pub use backend::{AudioBackend, Settle, Tick, Voice};
pub use error::AudioError;
pub use fade::{Fade, FadePlan, FadeStep};
pub use group::SoundGroup;
pub use manager::{AudioManager, MusicState};
