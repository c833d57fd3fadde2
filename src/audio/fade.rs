//! Linear fade-out in fixed discrete steps
//!
//! The fade owns its timer handle, so "fading" and "a timer is scheduled"
//! are the same fact.

/// Schedule for one fade-out: equal volume decrements at equal intervals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadePlan {
    pub start_volume: f32,
    /// Volume removed per tick
    pub step: f32,
    pub steps_done: u32,
    pub steps_total: u32,
    pub step_interval_ms: u32,
}

/// Outcome of one fade tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FadeStep {
    /// Apply this volume and keep ticking
    Lower(f32),
    /// Last step: volume is zero, stop the track
    Done,
}

impl FadePlan {
    pub fn new(start_volume: f32, duration_ms: u32, steps: u32) -> Self {
        let steps_total = steps.max(1);
        Self {
            start_volume,
            step: start_volume / steps_total as f32,
            steps_done: 0,
            steps_total,
            step_interval_ms: (duration_ms / steps_total).max(1),
        }
    }

    /// Advance one tick from the voice's live volume
    ///
    /// Works from the live value so a volume change mid-fade is respected.
    pub fn advance(&mut self, live_volume: f32) -> FadeStep {
        self.steps_done += 1;
        if self.steps_done >= self.steps_total {
            FadeStep::Done
        } else {
            FadeStep::Lower((live_volume - self.step).max(0.0))
        }
    }

    pub fn is_complete(&self) -> bool {
        self.steps_done >= self.steps_total
    }
}

/// Fade state of the background slot
#[derive(Debug)]
pub enum Fade<I> {
    Idle,
    Fading {
        plan: FadePlan,
        interval: I,
        /// Distinguishes this fade's ticks from a stale timer's
        serial: u64,
    },
}

impl<I> Fade<I> {
    pub fn is_fading(&self) -> bool {
        matches!(self, Fade::Fading { .. })
    }

    /// Leave the fading state, handing back the timer to clear
    pub fn take_interval(&mut self) -> Option<I> {
        match std::mem::replace(self, Fade::Idle) {
            Fade::Fading { interval, .. } => Some(interval),
            Fade::Idle => None,
        }
    }
}

impl<I> Default for Fade<I> {
    fn default() -> Self {
        Fade::Idle
    }
}
