//! Audio manager: one background track, any number of effect sounds
//!
//! Playback is gated until the first user gesture (browser autoplay policy).
//! The manager is a cheap clonable handle; UI code keeps a clone instead of
//! reaching for a global.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::backend::{AudioBackend, Tick, Voice};
use super::fade::{Fade, FadePlan, FadeStep};
use super::group::SoundGroup;
use crate::clamp_volume;
use crate::settings::{AudioSettings, SoundCatalog, SourceResolver};

/// Background music state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicState {
    /// No track, or the track played through to its end
    Stopped,
    Playing,
    Paused,
    /// A fade-out is running; ends in `Stopped`
    Fading,
}

/// A registered voice plus the generation of its latest play request
struct Sound<V> {
    voice: V,
    /// Bumped by every start and halt; older start outcomes are stale
    generation: Rc<Cell<u64>>,
}

impl<V: Voice> Sound<V> {
    fn new(voice: V) -> Self {
        Self {
            voice,
            generation: Rc::new(Cell::new(0)),
        }
    }

    /// Fire-and-forget start; failures are only logged and counted
    fn start(&self, id: &str, kind: &'static str, failures: &Rc<Cell<u32>>) {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let latest = Rc::clone(&self.generation);
        let failures = Rc::clone(failures);
        let id = id.to_owned();
        self.voice.start(Box::new(move |outcome| {
            if let Err(err) = outcome {
                if latest.get() == generation {
                    failures.set(failures.get() + 1);
                    log::warn!("Failed to play {} '{}': {}", kind, id, err);
                } else {
                    log::debug!("Ignoring outdated start failure for '{}': {}", id, err);
                }
            }
        }));
    }

    /// Pause and rewind
    fn halt(&self) {
        self.generation.set(self.generation.get() + 1);
        self.voice.pause();
        self.voice.rewind();
    }
}

struct Inner<B: AudioBackend> {
    backend: B,
    resolver: SourceResolver,
    sounds: HashMap<String, Sound<B::Voice>>,
    groups: HashMap<String, SoundGroup>,
    /// Autoplay gate; never goes back to false
    enabled: bool,
    current_track: Option<String>,
    music_volume: f32,
    sfx_volume: f32,
    fade: Fade<B::Interval>,
    fade_serial: u64,
    fade_steps: u32,
    default_fade_ms: u32,
    rng: Pcg32,
    /// Start failures that were still current when they settled
    start_failures: Rc<Cell<u32>>,
}

impl<B: AudioBackend> Inner<B> {
    fn preload(&mut self, id: &str, source_locator: &str) -> bool {
        if self.sounds.contains_key(id) {
            return true;
        }
        match self.backend.load(source_locator) {
            Ok(voice) => {
                self.sounds.insert(id.to_owned(), Sound::new(voice));
                log::debug!("Loaded '{}' from {}", id, source_locator);
                true
            }
            Err(err) => {
                log::warn!("Could not load sound '{}': {}", id, err);
                false
            }
        }
    }

    fn ensure_loaded(&mut self, id: &str) -> bool {
        if self.sounds.contains_key(id) {
            return true;
        }
        let source_locator = self.resolver.locator(id);
        self.preload(id, &source_locator)
    }

    fn current_sound(&self) -> Option<&Sound<B::Voice>> {
        self.current_track
            .as_ref()
            .and_then(|id| self.sounds.get(id))
    }

    fn cancel_fade(&mut self) {
        if let Some(interval) = self.fade.take_interval() {
            self.backend.clear_interval(interval);
        }
    }

    fn stop_music(&mut self) {
        if let Some(id) = self.current_track.take() {
            if let Some(sound) = self.sounds.get(&id) {
                sound.halt();
            }
            log::debug!("Music '{}' stopped", id);
        }
        self.cancel_fade();
    }

    fn play_sound(&mut self, id: &str, looping: bool, volume: Option<f32>) {
        if !self.enabled {
            return;
        }
        let volume = volume.map(clamp_volume).unwrap_or(self.sfx_volume);
        if !self.ensure_loaded(id) {
            return;
        }
        let Some(sound) = self.sounds.get(id) else {
            return;
        };
        sound.voice.rewind();
        sound.voice.set_looping(looping);
        sound.voice.set_volume(volume);
        sound.start(id, "sound", &self.start_failures);
    }

    fn is_group_active(&self, group: &SoundGroup) -> bool {
        group
            .members()
            .iter()
            .any(|id| self.sounds.get(id).is_some_and(|s| s.voice.is_active()))
    }

    /// One timer tick of the fade identified by `serial`
    fn fade_tick(&mut self, serial: u64) {
        let Fade::Fading {
            plan,
            serial: active,
            ..
        } = &mut self.fade
        else {
            return;
        };
        if *active != serial {
            // A timer from an earlier fade outlived its clear_interval
            return;
        }

        let voice = self
            .current_track
            .as_ref()
            .and_then(|id| self.sounds.get(id))
            .map(|sound| &sound.voice);
        let Some(voice) = voice else {
            self.cancel_fade();
            return;
        };

        match plan.advance(voice.volume()) {
            FadeStep::Lower(volume) => voice.set_volume(volume),
            FadeStep::Done => {
                voice.set_volume(0.0);
                log::info!("Fade-out finished");
                self.stop_music();
            }
        }
    }
}

impl<B: AudioBackend> Drop for Inner<B> {
    fn drop(&mut self) {
        self.cancel_fade();
    }
}

/// Owns the sound registry, the background slot and the fade timer
pub struct AudioManager<B: AudioBackend> {
    inner: Rc<RefCell<Inner<B>>>,
}

impl<B: AudioBackend> Clone for AudioManager<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<B: AudioBackend + 'static> AudioManager<B> {
    /// Create a disabled manager with volumes and catalog groups from `settings`
    pub fn new(backend: B, settings: &AudioSettings) -> Self {
        Self::with_seed(backend, settings, rand::random())
    }

    /// Same as [`AudioManager::new`] with a fixed seed for group selection
    pub fn with_seed(backend: B, settings: &AudioSettings, seed: u64) -> Self {
        let groups = settings
            .catalog
            .sound_groups()
            .into_iter()
            .map(|group| (group.name().to_owned(), group))
            .collect();

        let inner = Inner {
            backend,
            resolver: settings.resolver(),
            sounds: HashMap::new(),
            groups,
            enabled: false,
            current_track: None,
            music_volume: clamp_volume(settings.music_volume),
            sfx_volume: clamp_volume(settings.sfx_volume),
            fade: Fade::Idle,
            fade_serial: 0,
            fade_steps: settings.fade_steps,
            default_fade_ms: settings.default_fade_ms,
            rng: Pcg32::seed_from_u64(seed),
            start_failures: Rc::new(Cell::new(0)),
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// Open the autoplay gate (first user gesture). Idempotent.
    pub fn enable(&self) {
        let mut inner = self.inner.borrow_mut();
        if !inner.enabled {
            inner.enabled = true;
            log::info!("Audio enabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.borrow().enabled
    }

    /// Register `id` with an explicit source; no-op if already registered
    pub fn preload(&self, id: &str, source_locator: &str) {
        self.inner.borrow_mut().preload(id, source_locator);
    }

    /// Register `id` at its conventional asset location
    pub fn preload_id(&self, id: &str) {
        self.inner.borrow_mut().ensure_loaded(id);
    }

    /// Preload every id the catalog mentions
    pub fn preload_catalog(&self, catalog: &SoundCatalog) {
        let mut inner = self.inner.borrow_mut();
        for id in catalog.ids() {
            inner.ensure_loaded(id);
        }
        log::info!("Preloaded {} sounds", inner.sounds.len());
    }

    /// Make `id` the background track
    ///
    /// Replaying the track that is already playing is a no-op, so callers may
    /// invoke this every frame. `volume` defaults to the music volume.
    pub fn play_music(&self, id: &str, looping: bool, volume: Option<f32>) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        if !inner.enabled {
            log::debug!("Audio gated, ignoring music '{}'", id);
            return;
        }
        let volume = volume.map(clamp_volume).unwrap_or(inner.music_volume);

        match inner.current_track.as_deref() {
            Some(current) if current != id => inner.stop_music(),
            Some(_) => {
                if inner.current_sound().is_some_and(|s| s.voice.is_active()) {
                    return;
                }
            }
            None => {}
        }

        if !inner.ensure_loaded(id) {
            return;
        }
        inner.current_track = Some(id.to_owned());
        inner.cancel_fade();

        let Some(sound) = inner.sounds.get(id) else {
            return;
        };
        sound.voice.set_looping(looping);
        sound.voice.set_volume(volume);
        sound.voice.rewind();
        sound.start(id, "music", &inner.start_failures);
        log::debug!("Music '{}' started (loop={}, volume={:.2})", id, looping, volume);
    }

    /// Start `id` only if the background slot is empty
    ///
    /// Returns whether `id` is the current track afterwards. Never replaces a
    /// track someone else started.
    pub fn start_music_if_idle(&self, id: &str, looping: bool, volume: Option<f32>) -> bool {
        {
            let inner = self.inner.borrow();
            if !inner.enabled {
                return false;
            }
            if let Some(current) = inner.current_track.as_deref() {
                return current == id;
            }
        }
        self.play_music(id, looping, volume);
        self.current_track().as_deref() == Some(id)
    }

    /// Stop and rewind the background track; always cancels a fade
    pub fn stop_music(&self) {
        self.inner.borrow_mut().stop_music();
    }

    pub fn pause_music(&self) {
        let inner = self.inner.borrow();
        if let Some(sound) = inner.current_sound() {
            // A pending start is outdated even if the voice never got going
            sound.generation.set(sound.generation.get() + 1);
            if !sound.voice.is_paused() {
                sound.voice.pause();
                log::info!("Music paused");
            }
        }
    }

    pub fn resume_music(&self) {
        let inner = self.inner.borrow();
        if let (Some(id), Some(sound)) = (inner.current_track.as_deref(), inner.current_sound()) {
            if sound.voice.is_paused() {
                sound.start(id, "music", &inner.start_failures);
                log::info!("Music resumed");
            }
        }
    }

    /// Fade the background track to silence, then stop it
    ///
    /// Ignored while another fade runs; the running fade keeps its schedule.
    /// `duration_ms` defaults to the configured fade length.
    pub fn fade_out_music(&self, duration_ms: Option<u32>) {
        let weak = Rc::downgrade(&self.inner);
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;

        if inner.fade.is_fading() {
            log::debug!("Fade already running");
            return;
        }
        let Some(start_volume) = inner.current_sound().map(|s| s.voice.volume()) else {
            return;
        };

        let duration_ms = duration_ms.unwrap_or(inner.default_fade_ms);
        let plan = FadePlan::new(start_volume, duration_ms, inner.fade_steps);
        inner.fade_serial += 1;
        let serial = inner.fade_serial;

        let tick: Tick = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().fade_tick(serial);
            }
        });

        match inner.backend.set_interval(plan.step_interval_ms, tick) {
            Ok(interval) => {
                inner.fade = Fade::Fading {
                    plan,
                    interval,
                    serial,
                };
                log::info!(
                    "Fading out music over {}ms ({} steps)",
                    duration_ms,
                    plan.steps_total
                );
            }
            Err(err) => {
                log::warn!("Fade timer unavailable ({}), stopping music", err);
                inner.stop_music();
            }
        }
    }

    /// Play an effect from the start; replaying restarts it
    pub fn play_sound(&self, id: &str, looping: bool, volume: Option<f32>) {
        self.inner.borrow_mut().play_sound(id, looping, volume);
    }

    /// Play one random member of `group` unless any member is still playing
    pub fn play_random_sound(&self, group: &SoundGroup, looping: bool, volume: Option<f32>) {
        let mut inner = self.inner.borrow_mut();
        if !inner.enabled {
            return;
        }
        if inner.is_group_active(group) {
            log::debug!("Group '{}' still playing, skipped", group.name());
            return;
        }
        let id = group.pick(&mut inner.rng).to_owned();
        inner.play_sound(&id, looping, volume);
    }

    /// Play a random member of a group declared in the catalog
    pub fn play_group(&self, name: &str, looping: bool, volume: Option<f32>) {
        let group = self.inner.borrow().groups.get(name).cloned();
        match group {
            Some(group) => self.play_random_sound(&group, looping, volume),
            None => log::warn!("Unknown sound group '{}'", name),
        }
    }

    /// Halt and rewind one effect; it stays registered
    pub fn stop_sound(&self, id: &str) {
        let inner = self.inner.borrow();
        if !inner.enabled {
            return;
        }
        if let Some(sound) = inner.sounds.get(id) {
            sound.halt();
        }
    }

    /// Stop every registered sound except the background track
    pub fn stop_all_sounds(&self) {
        let inner = self.inner.borrow();
        if !inner.enabled {
            return;
        }
        let current = inner.current_track.as_deref();
        for (id, sound) in &inner.sounds {
            if Some(id.as_str()) != current {
                sound.halt();
            }
        }
    }

    /// Set the music volume (clamped to [0, 1]); applies to the current track now
    pub fn set_music_volume(&self, volume: f32) {
        let mut inner = self.inner.borrow_mut();
        inner.music_volume = clamp_volume(volume);
        if let Some(sound) = inner.current_sound() {
            sound.voice.set_volume(inner.music_volume);
        }
    }

    /// Set the effect volume (clamped to [0, 1]) for future plays
    pub fn set_sfx_volume(&self, volume: f32) {
        self.inner.borrow_mut().sfx_volume = clamp_volume(volume);
    }

    /// Release every resource and forget all playback state
    ///
    /// The gate stays open. Safe to call repeatedly.
    pub fn cleanup(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.cancel_fade();
        let released = inner.sounds.len();
        for (_, sound) in inner.sounds.drain() {
            sound.halt();
            sound.voice.release();
        }
        inner.current_track = None;
        if released > 0 {
            log::info!("Audio cleaned up ({} sounds released)", released);
        }
    }

    pub fn current_track(&self) -> Option<String> {
        self.inner.borrow().current_track.clone()
    }

    pub fn music_state(&self) -> MusicState {
        let inner = self.inner.borrow();
        let Some(sound) = inner.current_sound() else {
            return MusicState::Stopped;
        };
        if inner.fade.is_fading() {
            MusicState::Fading
        } else if sound.voice.has_ended() {
            MusicState::Stopped
        } else if sound.voice.is_paused() {
            MusicState::Paused
        } else {
            MusicState::Playing
        }
    }

    pub fn is_fading(&self) -> bool {
        self.inner.borrow().fade.is_fading()
    }

    pub fn music_volume(&self) -> f32 {
        self.inner.borrow().music_volume
    }

    pub fn sfx_volume(&self) -> f32 {
        self.inner.borrow().sfx_volume
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.inner.borrow().sounds.contains_key(id)
    }

    pub fn loaded_count(&self) -> usize {
        self.inner.borrow().sounds.len()
    }

    /// Play requests that failed while still the latest for their sound
    pub fn start_failures(&self) -> u32 {
        self.inner.borrow().start_failures.get()
    }
}
