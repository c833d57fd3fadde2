//! Platform abstraction for playable resources and wall-clock timers
//!
//! Single-threaded by construction: voices and callbacks are not `Send`.
//! Callbacks handed to a backend must never be invoked synchronously from
//! inside the call that registered them.

use super::AudioError;

/// Receives the outcome of an asynchronous play request
pub type Settle = Box<dyn FnOnce(Result<(), AudioError>)>;

/// Repeating timer callback
pub type Tick = Box<dyn FnMut()>;

/// A playable audio resource bound to one source locator
pub trait Voice {
    /// Request playback from the current position.
    ///
    /// Returns immediately; `settle` runs later with the platform's verdict.
    fn start(&self, settle: Settle);

    /// Halt playback, keeping the position
    fn pause(&self);

    /// Seek back to the beginning
    fn rewind(&self);

    fn is_paused(&self) -> bool;

    /// True once a non-looping voice played through to its end
    fn has_ended(&self) -> bool;

    fn set_looping(&self, looping: bool);

    fn volume(&self) -> f32;

    fn set_volume(&self, volume: f32);

    /// Drop the underlying source so the platform can free it
    fn release(&self);

    /// Playing right now (not paused, not ended)
    fn is_active(&self) -> bool {
        !self.is_paused() && !self.has_ended()
    }
}

/// Creates voices and schedules repeating timers
pub trait AudioBackend {
    type Voice: Voice;
    type Interval;

    /// Create a voice for `source_locator` and start buffering it
    fn load(&mut self, source_locator: &str) -> Result<Self::Voice, AudioError>;

    /// Call `tick` every `period_ms` of wall-clock time until cleared
    fn set_interval(&mut self, period_ms: u32, tick: Tick) -> Result<Self::Interval, AudioError>;

    fn clear_interval(&mut self, interval: Self::Interval);
}
