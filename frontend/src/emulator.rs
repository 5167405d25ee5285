use std::time::{Duration, Instant};

use agate_core::gba::AUDIO_SAMPLE_RATE;
use agate_core::prelude::*;
use sdl2::event::Event;
use sdl2::keyboard::Scancode;

use crate::input::KeyMap;
use crate::video::Video;
use crate::{audio, overlay, video};

/// Block frame pacing on the audio queue until it drains below roughly two
/// frames' worth of stereo samples.
const AUDIO_LOW_WATER_BYTES: u32 = (AUDIO_SAMPLE_RATE / 60) * 2 * 2 * 2;

pub fn run(gba: &mut Gba, key_map: &KeyMap, scale: u32, show_overlay: bool) {
    let sdl_context = match sdl2::init() {
        Ok(ctx) => ctx,
        Err(e) => {
            log::error!("SDL init failed: {e}");
            return;
        }
    };
    let sdl_video = match sdl_context.video() {
        Ok(v) => v,
        Err(e) => {
            log::error!("SDL video init failed: {e}");
            return;
        }
    };

    let mut video = match Video::new(&sdl_video, "agate", scale) {
        Ok(v) => v,
        Err(e) => {
            log::error!("window creation failed: {e}");
            return;
        }
    };

    let audio_out = sdl_context
        .audio()
        .ok()
        .and_then(|subsystem| audio::init(&subsystem));
    if audio_out.is_none() {
        log::warn!("no audio device; pacing by wall clock");
    }

    let mut event_pump = match sdl_context.event_pump() {
        Ok(p) => p,
        Err(e) => {
            log::error!("SDL event pump failed: {e}");
            return;
        }
    };

    let mut overlay_on = show_overlay;
    let mut frame = [0u16; SCREEN_WIDTH * SCREEN_HEIGHT];
    let mut audio_buf = [0i16; 4096];
    let mut screenshot_index = 0u32;

    // Smoothed frame rate for the overlay.
    let mut fps = 60.0f32;
    let mut last_frame = Instant::now();

    'main: loop {
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => break 'main,

                Event::KeyDown {
                    scancode: Some(sc),
                    repeat: false,
                    ..
                } => match sc {
                    Scancode::Escape => break 'main,
                    Scancode::F1 => overlay_on = !overlay_on,
                    Scancode::F12 => {
                        let path = format!("agate-{screenshot_index:03}.png");
                        screenshot_index += 1;
                        match video::save_screenshot(&path, gba.framebuffer()) {
                            Ok(()) => log::info!("screenshot saved to {path}"),
                            Err(e) => log::error!("screenshot failed: {e}"),
                        }
                    }
                    _ => {
                        if let Some(key) = key_map.get(sc) {
                            gba.set_key(key, true);
                        }
                    }
                },

                Event::KeyUp {
                    scancode: Some(sc), ..
                } => {
                    if let Some(key) = key_map.get(sc) {
                        gba.set_key(key, false);
                    }
                }

                _ => {}
            }
        }

        gba.run_frame();

        // Move every buffered audio sample into the SDL queue.
        if let Some(out) = &audio_out {
            loop {
                let n = gba.pop_audio(&mut audio_buf);
                if n == 0 {
                    break;
                }
                out.queue(&audio_buf[..n]);
            }
        }

        frame.copy_from_slice(gba.framebuffer());
        if overlay_on {
            let now = Instant::now();
            let dt = now.duration_since(last_frame).as_secs_f32().max(1e-4);
            fps = fps * 0.9 + (1.0 / dt) * 0.1;
            overlay::draw_fps(&mut frame, SCREEN_WIDTH, &format!("{fps:.1}"));
        }
        last_frame = Instant::now();

        if let Err(e) = video.present(&frame) {
            log::error!("present failed: {e}");
            break 'main;
        }

        // Pacing: let the audio queue drain to its low-water mark, or fall
        // back to a fixed frame sleep without a device.
        match &audio_out {
            Some(out) => {
                while out.queued_bytes() > AUDIO_LOW_WATER_BYTES {
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
            None => std::thread::sleep(Duration::from_millis(16)),
        }
    }
}
