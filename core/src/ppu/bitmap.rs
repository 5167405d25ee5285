//! Bitmap modes 3, 4, and 5 — all render on the BG2 layer.

use super::{Layer, Ppu, SCREEN_WIDTH, read16};

// Mode 4/5 second page offset, selected by DISPCNT bit 4.
const PAGE_OFFSET: usize = 0xA000;

const MODE5_WIDTH: usize = 160;
const MODE5_HEIGHT: usize = 128;

impl Ppu {
    fn frame_base(&self) -> usize {
        if self.dispcnt & (1 << 4) != 0 {
            PAGE_OFFSET
        } else {
            0
        }
    }

    /// Mode 3: 240x160, one 15-bit color per pixel, single buffer.
    pub(crate) fn render_mode3(&mut self, line: usize, vram: &[u8]) {
        for x in 0..SCREEN_WIDTH {
            if self.win_mask[x] & (1 << 2) == 0 {
                continue;
            }
            let color = read16(vram, (line * SCREEN_WIDTH + x) * 2);
            self.plot(x, color, Layer::Bg(2));
        }
    }

    /// Mode 4: 240x160, 8-bit palette indices, page flipped.
    pub(crate) fn render_mode4(&mut self, line: usize, vram: &[u8], palette: &[u8]) {
        let base = self.frame_base();
        for x in 0..SCREEN_WIDTH {
            if self.win_mask[x] & (1 << 2) == 0 {
                continue;
            }
            let color_idx = vram[base + line * SCREEN_WIDTH + x] as usize;
            if color_idx == 0 {
                continue;
            }
            self.plot(x, read16(palette, color_idx * 2), Layer::Bg(2));
        }
    }

    /// Mode 5: 160x128 direct color, page flipped. Pixels outside the
    /// reduced frame fall through to lower layers.
    pub(crate) fn render_mode5(&mut self, line: usize, vram: &[u8]) {
        if line >= MODE5_HEIGHT {
            return;
        }
        let base = self.frame_base();
        for x in 0..MODE5_WIDTH {
            if self.win_mask[x] & (1 << 2) == 0 {
                continue;
            }
            let color = read16(vram, base + (line * MODE5_WIDTH + x) * 2);
            self.plot(x, color, Layer::Bg(2));
        }
    }
}
