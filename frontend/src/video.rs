use std::fs::File;
use std::io::BufWriter;

use agate_core::prelude::{SCREEN_HEIGHT, SCREEN_WIDTH};
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};

pub struct Video {
    canvas: Canvas<Window>,
    texture_creator: TextureCreator<WindowContext>,
    // BGR555 staging bytes for the streaming texture.
    staging: Vec<u8>,
}

impl Video {
    /// Create the window and renderer at an integer scale of the native
    /// 240x160 resolution.
    pub fn new(sdl_video: &sdl2::VideoSubsystem, title: &str, scale: u32) -> Result<Self, String> {
        let window = sdl_video
            .window(
                title,
                SCREEN_WIDTH as u32 * scale,
                SCREEN_HEIGHT as u32 * scale,
            )
            .position_centered()
            .build()
            .map_err(|e| e.to_string())?;

        let canvas = window
            .into_canvas()
            .accelerated()
            .build()
            .map_err(|e| e.to_string())?;

        let texture_creator = canvas.texture_creator();

        Ok(Self {
            canvas,
            texture_creator,
            staging: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT * 2],
        })
    }

    /// Upload a BGR555 frame (the console's native pixel format) and
    /// present it.
    pub fn present(&mut self, frame: &[u16]) -> Result<(), String> {
        for (bytes, px) in self.staging.chunks_exact_mut(2).zip(frame) {
            bytes.copy_from_slice(&px.to_le_bytes());
        }

        let mut texture = self
            .texture_creator
            .create_texture_streaming(
                PixelFormatEnum::BGR555,
                SCREEN_WIDTH as u32,
                SCREEN_HEIGHT as u32,
            )
            .map_err(|e| e.to_string())?;

        texture
            .update(None, &self.staging, SCREEN_WIDTH * 2)
            .map_err(|e| e.to_string())?;

        self.canvas.clear();
        self.canvas.copy(&texture, None, None)?;
        self.canvas.present();
        Ok(())
    }
}

/// Write the frame out as an RGB24 PNG.
pub fn save_screenshot(path: &str, frame: &[u16]) -> Result<(), String> {
    let mut rgb = Vec::with_capacity(SCREEN_WIDTH * SCREEN_HEIGHT * 3);
    for &px in frame {
        // 5-bit channels widened to 8 bits.
        for ch in [px & 0x1F, (px >> 5) & 0x1F, (px >> 10) & 0x1F] {
            rgb.push(((ch << 3) | (ch >> 2)) as u8);
        }
    }

    let file = File::create(path).map_err(|e| e.to_string())?;
    let mut encoder = png::Encoder::new(
        BufWriter::new(file),
        SCREEN_WIDTH as u32,
        SCREEN_HEIGHT as u32,
    );
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header().map_err(|e| e.to_string())?;
    writer
        .write_image_data(&rgb)
        .map_err(|e| e.to_string())
}
