//! Platform abstraction layer
//!
//! - `web`: HtmlAudioElement voices, `setInterval` timers, gesture and
//!   visibility hooks (wasm32 only)
//! - `headless`: simulated playback on a manual clock (native runs, tests)

pub mod headless;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use headless::{HeadlessBackend, HeadlessVoice};
