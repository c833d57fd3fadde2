//! Arcade Audio entry point
//!
//! On the web: wires the audio manager into the page and exports it to the
//! UI scripts. Natively: runs a scripted session on the headless backend.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_audio {
    use std::cell::Cell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;

    use arcade_audio::AudioSettings;
    use arcade_audio::platform::web::{self, GameAudio};

    /// Title music, started by the first click after the gate opens
    const TITLE_TRACK: &str = "menu";

    fn setup_title_music(audio: &arcade_audio::AudioManager<web::WebBackend>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let audio = audio.clone();
        let done = Rc::new(Cell::new(false));
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if done.get() || !audio.is_enabled() {
                return;
            }
            // Whatever the page started first keeps the slot
            audio.start_music_if_idle(TITLE_TRACK, true, None);
            done.set(true);
        });
        let _ = document.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    pub fn run() -> Result<GameAudio, JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Arcade Audio starting...");

        let settings = AudioSettings::load();
        let audio = web::create_manager(&settings).map_err(|e| JsValue::from_str(&e.to_string()))?;
        audio.preload_catalog(&settings.catalog);

        web::setup_auto_pause(&audio);
        setup_title_music(&audio);

        log::info!("Audio ready, waiting for first interaction");
        Ok(GameAudio::new(audio))
    }
}

/// Create the page's audio handle
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = initAudio)]
pub fn init_audio() -> Result<arcade_audio::platform::web::GameAudio, JsValue> {
    wasm_audio::run()
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Arcade Audio (native) starting...");
    log::info!("Native mode has no audio output - running a headless session");

    run_headless_session();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is init_audio, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn run_headless_session() {
    use arcade_audio::platform::HeadlessBackend;
    use arcade_audio::{AudioManager, AudioSettings, MusicState};

    let settings = AudioSettings::load();
    let backend = HeadlessBackend::new();
    let audio = AudioManager::with_seed(backend.clone(), &settings, 1);
    audio.preload_catalog(&settings.catalog);

    // Nothing plays before the first gesture
    audio.play_music("menu", true, None);
    println!("before gesture: {:?}", audio.music_state());

    audio.enable();
    audio.play_music("menu", true, None);
    backend.advance(2_000);
    println!("menu: {:?} at {}ms", audio.music_state(), backend.now_ms());

    audio.play_sound("click", false, None);
    for _ in 0..3 {
        audio.play_group("hit", false, None);
        backend.advance(250);
        audio.stop_all_sounds();
    }

    audio.play_music("gameplay", true, None);
    audio.fade_out_music(None);
    while audio.music_state() == MusicState::Fading {
        backend.advance(50);
    }
    println!(
        "after fade: {:?} ({}ms elapsed)",
        audio.music_state(),
        backend.now_ms()
    );

    audio.cleanup();
    println!("✓ Headless session finished ({} sounds loaded)", audio.loaded_count());
}
