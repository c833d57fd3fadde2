//! Browser backend: HtmlAudioElement voices and `setInterval` timers
//!
//! Play promises are awaited on the local executor; the manager only hears
//! about them through the settle callback.

use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{AddEventListenerOptions, HtmlAudioElement, VisibilityState};

use crate::audio::{AudioBackend, AudioError, AudioManager, Settle, SoundGroup, Tick, Voice};
use crate::settings::AudioSettings;

/// Events that count as a user gesture for autoplay purposes
const GESTURE_EVENTS: [&str; 3] = ["click", "keydown", "touchstart"];

fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}

/// One `<audio>` element
#[derive(Clone)]
pub struct WebVoice {
    element: HtmlAudioElement,
}

impl Voice for WebVoice {
    fn start(&self, settle: Settle) {
        match self.element.play() {
            Ok(promise) => spawn_local(async move {
                let outcome = JsFuture::from(promise)
                    .await
                    .map(|_| ())
                    .map_err(|e| AudioError::start(describe(&e)));
                settle(outcome);
            }),
            Err(e) => {
                let err = AudioError::start(describe(&e));
                spawn_local(async move { settle(Err(err)) });
            }
        }
    }

    fn pause(&self) {
        let _ = self.element.pause();
    }

    fn rewind(&self) {
        self.element.set_current_time(0.0);
    }

    fn is_paused(&self) -> bool {
        self.element.paused()
    }

    fn has_ended(&self) -> bool {
        self.element.ended()
    }

    fn set_looping(&self, looping: bool) {
        self.element.set_loop(looping);
    }

    fn volume(&self) -> f32 {
        self.element.volume() as f32
    }

    fn set_volume(&self, volume: f32) {
        self.element.set_volume(f64::from(volume));
    }

    fn release(&self) {
        let _ = self.element.remove_attribute("src");
        self.element.load();
    }
}

/// A scheduled `setInterval`; owns the JS callback until cleared
pub struct WebInterval {
    handle: i32,
    _callback: Closure<dyn FnMut()>,
}

pub struct WebBackend {
    window: web_sys::Window,
}

impl WebBackend {
    pub fn new() -> Result<Self, AudioError> {
        let window = web_sys::window().ok_or_else(|| AudioError::Unavailable("window"))?;
        Ok(Self { window })
    }
}

impl AudioBackend for WebBackend {
    type Voice = WebVoice;
    type Interval = WebInterval;

    fn load(&mut self, source_locator: &str) -> Result<WebVoice, AudioError> {
        let element = HtmlAudioElement::new_with_src(source_locator)
            .map_err(|e| AudioError::load(source_locator, describe(&e)))?;
        element.set_preload("auto");
        Ok(WebVoice { element })
    }

    fn set_interval(&mut self, period_ms: u32, tick: Tick) -> Result<WebInterval, AudioError> {
        let callback = Closure::wrap(tick);
        let timeout = i32::try_from(period_ms).unwrap_or(i32::MAX);
        let handle = self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                timeout,
            )
            .map_err(|e| AudioError::timer(describe(&e)))?;
        Ok(WebInterval {
            handle,
            _callback: callback,
        })
    }

    fn clear_interval(&mut self, interval: WebInterval) {
        self.window.clear_interval_with_handle(interval.handle);
    }
}

/// Build a manager for this page and open its gate on the first gesture
pub fn create_manager(settings: &AudioSettings) -> Result<AudioManager<WebBackend>, AudioError> {
    let backend = WebBackend::new()?;
    let seed = js_sys::Date::now() as u64;
    let audio = AudioManager::with_seed(backend, settings, seed);
    enable_on_first_gesture(&audio)?;
    Ok(audio)
}

/// Subscribe once to the first user gesture and call `enable()`
pub fn enable_on_first_gesture(audio: &AudioManager<WebBackend>) -> Result<(), AudioError> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| AudioError::Unavailable("document"))?;

    let options = AddEventListenerOptions::new();
    options.set_once(true);

    for event in GESTURE_EVENTS {
        let audio = audio.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            audio.enable();
        });
        let _ = document.add_event_listener_with_callback_and_add_event_listener_options(
            event,
            closure.as_ref().unchecked_ref(),
            &options,
        );
        closure.forget();
    }
    Ok(())
}

/// Pause music while the tab is hidden, release everything on page hide
pub fn setup_auto_pause(audio: &AudioManager<WebBackend>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };

    // Visibility change (tab switch, minimize)
    {
        let audio = audio.clone();
        let paused_by_us = Rc::new(Cell::new(false));
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if document_clone.visibility_state() == VisibilityState::Hidden {
                if audio.music_state() == crate::MusicState::Playing {
                    audio.pause_music();
                    paused_by_us.set(true);
                    log::info!("Music paused (tab hidden)");
                }
            } else if paused_by_us.replace(false) {
                audio.resume_music();
            }
        });
        let _ = document.add_event_listener_with_callback(
            "visibilitychange",
            closure.as_ref().unchecked_ref(),
        );
        closure.forget();
    }

    // Page going away
    {
        let audio = audio.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            audio.cleanup();
        });
        let _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

/// Handle exported to the page's UI scripts
#[wasm_bindgen]
pub struct GameAudio {
    audio: AudioManager<WebBackend>,
}

#[wasm_bindgen]
impl GameAudio {
    /// Open the autoplay gate from a page gesture handler
    pub fn enable(&self) {
        self.audio.enable();
    }

    #[wasm_bindgen(js_name = isEnabled)]
    pub fn is_enabled(&self) -> bool {
        self.audio.is_enabled()
    }

    /// Register a sound; without `src` it is looked up in the asset directory
    pub fn preload(&self, id: &str, src: Option<String>) {
        match src {
            Some(src) => self.audio.preload(id, &src),
            None => self.audio.preload_id(id),
        }
    }

    #[wasm_bindgen(js_name = playMusic)]
    pub fn play_music(&self, id: &str, looping: Option<bool>, volume: Option<f32>) {
        self.audio.play_music(id, looping.unwrap_or(true), volume);
    }

    #[wasm_bindgen(js_name = stopMusic)]
    pub fn stop_music(&self) {
        self.audio.stop_music();
    }

    #[wasm_bindgen(js_name = pauseMusic)]
    pub fn pause_music(&self) {
        self.audio.pause_music();
    }

    #[wasm_bindgen(js_name = resumeMusic)]
    pub fn resume_music(&self) {
        self.audio.resume_music();
    }

    #[wasm_bindgen(js_name = currentTrack)]
    pub fn current_track(&self) -> Option<String> {
        self.audio.current_track()
    }

    #[wasm_bindgen(js_name = fadeOutMusic)]
    pub fn fade_out_music(&self, duration_ms: Option<u32>) {
        self.audio.fade_out_music(duration_ms);
    }

    #[wasm_bindgen(js_name = playSound)]
    pub fn play_sound(&self, id: &str, looping: Option<bool>, volume: Option<f32>) {
        self.audio.play_sound(id, looping.unwrap_or(false), volume);
    }

    #[wasm_bindgen(js_name = playGroup)]
    pub fn play_group(&self, name: &str) {
        self.audio.play_group(name, false, None);
    }

    /// Play one of `prefix1..=prefixN` unless one of them is still playing
    #[wasm_bindgen(js_name = playRandomSound)]
    pub fn play_random_sound(
        &self,
        prefix: &str,
        count: u32,
        looping: Option<bool>,
        volume: Option<f32>,
    ) -> Result<(), JsValue> {
        let group = SoundGroup::numbered(prefix, count as usize)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.audio
            .play_random_sound(&group, looping.unwrap_or(false), volume);
        Ok(())
    }

    #[wasm_bindgen(js_name = stopSound)]
    pub fn stop_sound(&self, id: &str) {
        self.audio.stop_sound(id);
    }

    #[wasm_bindgen(js_name = stopAllSounds)]
    pub fn stop_all_sounds(&self) {
        self.audio.stop_all_sounds();
    }

    #[wasm_bindgen(js_name = setMusicVolume)]
    pub fn set_music_volume(&self, volume: f32) {
        self.audio.set_music_volume(volume);
    }

    #[wasm_bindgen(js_name = setSfxVolume)]
    pub fn set_sfx_volume(&self, volume: f32) {
        self.audio.set_sfx_volume(volume);
    }

    pub fn cleanup(&self) {
        self.audio.cleanup();
    }
}

impl GameAudio {
    pub fn new(audio: AudioManager<WebBackend>) -> Self {
        Self { audio }
    }

    pub fn manager(&self) -> &AudioManager<WebBackend> {
        &self.audio
    }
}
