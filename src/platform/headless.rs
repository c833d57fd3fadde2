//! Headless backend: simulated voices on a manual clock
//!
//! Nothing is audible. Voices track position, volume and play state, and
//! repeating timers fire only when [`HeadlessBackend::advance`] moves the
//! clock. Start requests settle on the next clock movement, never inside
//! `start` itself.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::{Rc, Weak};

use crate::audio::{AudioBackend, AudioError, Settle, Tick, Voice};

#[derive(Debug)]
struct VoiceState {
    source: String,
    position_ms: u64,
    duration_ms: Option<u64>,
    paused: bool,
    ended: bool,
    looping: bool,
    volume: f32,
    start_count: u32,
    released: bool,
}

impl VoiceState {
    fn advance(&mut self, dt_ms: u64) {
        if self.paused || self.ended || self.released {
            return;
        }
        self.position_ms += dt_ms;
        if let Some(duration) = self.duration_ms.filter(|d| *d > 0) {
            if self.position_ms >= duration {
                if self.looping {
                    self.position_ms %= duration;
                } else {
                    self.position_ms = duration;
                    self.ended = true;
                    self.paused = true;
                }
            }
        }
    }
}

struct TimerSlot {
    period_ms: u64,
    due_ms: u64,
    /// None while the callback is running
    tick: Option<Tick>,
}

#[derive(Default)]
struct World {
    now_ms: u64,
    voices: Vec<Rc<RefCell<VoiceState>>>,
    timers: BTreeMap<u64, TimerSlot>,
    next_timer_id: u64,
    pending: Vec<(Settle, Result<(), AudioError>)>,
    durations: HashMap<String, u64>,
    rejected: HashSet<String>,
    unloadable: HashSet<String>,
    timers_unavailable: bool,
}

/// A simulated voice; clones share state
#[derive(Clone)]
pub struct HeadlessVoice {
    state: Rc<RefCell<VoiceState>>,
    world: Weak<RefCell<World>>,
}

impl HeadlessVoice {
    pub fn source(&self) -> String {
        self.state.borrow().source.clone()
    }

    pub fn position_ms(&self) -> u64 {
        self.state.borrow().position_ms
    }

    pub fn is_looping(&self) -> bool {
        self.state.borrow().looping
    }

    /// Number of play requests received, successful or not
    pub fn start_count(&self) -> u32 {
        self.state.borrow().start_count
    }

    pub fn is_released(&self) -> bool {
        self.state.borrow().released
    }
}

impl Voice for HeadlessVoice {
    fn start(&self, settle: Settle) {
        let Some(world) = self.world.upgrade() else {
            settle(Err(AudioError::start("backend dropped")));
            return;
        };

        let outcome = {
            let mut state = self.state.borrow_mut();
            state.start_count += 1;
            if state.released {
                Err(AudioError::start("source released"))
            } else if world.borrow().rejected.contains(&state.source) {
                Err(AudioError::start(format!("playback of {} rejected", state.source)))
            } else {
                state.paused = false;
                state.ended = false;
                Ok(())
            }
        };
        world.borrow_mut().pending.push((settle, outcome));
    }

    fn pause(&self) {
        self.state.borrow_mut().paused = true;
    }

    fn rewind(&self) {
        let mut state = self.state.borrow_mut();
        state.position_ms = 0;
        state.ended = false;
    }

    fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn has_ended(&self) -> bool {
        self.state.borrow().ended
    }

    fn set_looping(&self, looping: bool) {
        self.state.borrow_mut().looping = looping;
    }

    fn volume(&self) -> f32 {
        self.state.borrow().volume
    }

    fn set_volume(&self, volume: f32) {
        self.state.borrow_mut().volume = volume;
    }

    fn release(&self) {
        let mut state = self.state.borrow_mut();
        state.released = true;
        state.paused = true;
    }
}

/// Backend over simulated time; clones share the same world
#[derive(Clone, Default)]
pub struct HeadlessBackend {
    world: Rc<RefCell<World>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give voices loaded from `source` a finite length
    pub fn set_duration(&self, source: &str, duration_ms: u64) {
        self.world
            .borrow_mut()
            .durations
            .insert(source.to_owned(), duration_ms);
    }

    /// Reject every play request for `source`, like an autoplay block
    pub fn reject_starts(&self, source: &str) {
        self.world.borrow_mut().rejected.insert(source.to_owned());
    }

    /// Make loading `source` fail
    pub fn fail_loads(&self, source: &str) {
        self.world.borrow_mut().unloadable.insert(source.to_owned());
    }

    /// Make `set_interval` fail
    pub fn disable_timers(&self) {
        self.world.borrow_mut().timers_unavailable = true;
    }

    pub fn now_ms(&self) -> u64 {
        self.world.borrow().now_ms
    }

    /// Most recent voice created for `source`
    pub fn voice(&self, source: &str) -> Option<HeadlessVoice> {
        let world = self.world.borrow();
        world
            .voices
            .iter()
            .rev()
            .find(|v| v.borrow().source == source)
            .map(|state| HeadlessVoice {
                state: Rc::clone(state),
                world: Rc::downgrade(&self.world),
            })
    }

    pub fn voice_count(&self) -> usize {
        self.world.borrow().voices.len()
    }

    pub fn active_timers(&self) -> usize {
        self.world.borrow().timers.len()
    }

    /// Deliver queued play outcomes
    pub fn settle_pending(&self) {
        let pending = std::mem::take(&mut self.world.borrow_mut().pending);
        for (settle, outcome) in pending {
            settle(outcome);
        }
    }

    /// Move the clock forward, firing due timers in order
    pub fn advance(&self, ms: u64) {
        self.settle_pending();
        let target = self.now_ms() + ms;

        loop {
            let next = {
                let world = self.world.borrow();
                world
                    .timers
                    .iter()
                    .filter(|(_, slot)| slot.due_ms <= target)
                    .min_by_key(|(id, slot)| (slot.due_ms, **id))
                    .map(|(id, slot)| (*id, slot.due_ms))
            };
            let Some((id, due_ms)) = next else {
                break;
            };

            let tick = {
                let mut world = self.world.borrow_mut();
                world.step_voices_to(due_ms);
                world.timers.get_mut(&id).and_then(|slot| slot.tick.take())
            };
            let Some(mut tick) = tick else {
                break;
            };

            tick();

            let mut world = self.world.borrow_mut();
            // Cleared from inside its own callback: drop it
            if let Some(slot) = world.timers.get_mut(&id) {
                slot.due_ms += slot.period_ms;
                slot.tick = Some(tick);
            }
        }

        self.world.borrow_mut().step_voices_to(target);
        self.settle_pending();
    }
}

impl World {
    fn step_voices_to(&mut self, to_ms: u64) {
        let dt = to_ms.saturating_sub(self.now_ms);
        if dt == 0 {
            return;
        }
        for voice in &self.voices {
            voice.borrow_mut().advance(dt);
        }
        self.now_ms = to_ms;
    }
}

impl AudioBackend for HeadlessBackend {
    type Voice = HeadlessVoice;
    type Interval = u64;

    fn load(&mut self, source_locator: &str) -> Result<HeadlessVoice, AudioError> {
        let mut world = self.world.borrow_mut();
        if world.unloadable.contains(source_locator) {
            return Err(AudioError::load(source_locator, "no such asset"));
        }
        let state = Rc::new(RefCell::new(VoiceState {
            source: source_locator.to_owned(),
            position_ms: 0,
            duration_ms: world.durations.get(source_locator).copied(),
            paused: true,
            ended: false,
            looping: false,
            volume: 1.0,
            start_count: 0,
            released: false,
        }));
        world.voices.push(Rc::clone(&state));
        Ok(HeadlessVoice {
            state,
            world: Rc::downgrade(&self.world),
        })
    }

    fn set_interval(&mut self, period_ms: u32, tick: Tick) -> Result<u64, AudioError> {
        let mut world = self.world.borrow_mut();
        if world.timers_unavailable {
            return Err(AudioError::timer("timers disabled"));
        }
        let period_ms = u64::from(period_ms.max(1));
        world.next_timer_id += 1;
        let id = world.next_timer_id;
        let due_ms = world.now_ms + period_ms;
        world.timers.insert(
            id,
            TimerSlot {
                period_ms,
                due_ms,
                tick: Some(tick),
            },
        );
        Ok(id)
    }

    fn clear_interval(&mut self, interval: u64) {
        self.world.borrow_mut().timers.remove(&interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_timer_fires_each_period() {
        let mut backend = HeadlessBackend::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        backend
            .set_interval(50, Box::new(move || c.set(c.get() + 1)))
            .unwrap();

        backend.advance(49);
        assert_eq!(count.get(), 0);
        backend.advance(1);
        assert_eq!(count.get(), 1);
        backend.advance(200);
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn test_cleared_timer_stops() {
        let mut backend = HeadlessBackend::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let id = backend
            .set_interval(10, Box::new(move || c.set(c.get() + 1)))
            .unwrap();
        backend.advance(30);
        backend.clear_interval(id);
        backend.advance(100);
        assert_eq!(count.get(), 3);
        assert_eq!(backend.active_timers(), 0);
    }

    #[test]
    fn test_timer_can_clear_itself() {
        let backend = HeadlessBackend::new();
        let count = Rc::new(Cell::new(0));
        let id_cell = Rc::new(Cell::new(0u64));

        let c = Rc::clone(&count);
        let own_id = Rc::clone(&id_cell);
        let mut inner = backend.clone();
        let id = backend
            .clone()
            .set_interval(
                10,
                Box::new(move || {
                    c.set(c.get() + 1);
                    if c.get() == 2 {
                        inner.clear_interval(own_id.get());
                    }
                }),
            )
            .unwrap();
        id_cell.set(id);

        backend.advance(100);
        assert_eq!(count.get(), 2);
        assert_eq!(backend.active_timers(), 0);
    }

    #[test]
    fn test_voice_plays_to_end_unless_looping() {
        let mut backend = HeadlessBackend::new();
        backend.set_duration("a.mp3", 100);
        let voice = backend.load("a.mp3").unwrap();
        voice.start(Box::new(|r| assert!(r.is_ok())));
        backend.advance(60);
        assert_eq!(voice.position_ms(), 60);
        assert!(voice.is_active());

        backend.advance(60);
        assert!(voice.has_ended());
        assert!(voice.is_paused());

        voice.rewind();
        voice.set_looping(true);
        voice.start(Box::new(|_| {}));
        backend.advance(250);
        assert!(voice.is_active());
        assert_eq!(voice.position_ms(), 50);
    }

    #[test]
    fn test_rejected_start_stays_paused() {
        let mut backend = HeadlessBackend::new();
        backend.reject_starts("blocked.mp3");
        let voice = backend.load("blocked.mp3").unwrap();

        let failed = Rc::new(Cell::new(false));
        let f = Rc::clone(&failed);
        voice.start(Box::new(move |r| f.set(r.is_err())));
        // Settles later, not inside start()
        assert!(!failed.get());
        backend.settle_pending();
        assert!(failed.get());
        assert!(voice.is_paused());
        assert_eq!(voice.start_count(), 1);
    }

    #[test]
    fn test_unloadable_source() {
        let mut backend = HeadlessBackend::new();
        backend.fail_loads("missing.mp3");
        assert!(matches!(
            backend.load("missing.mp3"),
            Err(AudioError::Load { .. })
        ));
        assert_eq!(backend.voice_count(), 0);
    }
}
