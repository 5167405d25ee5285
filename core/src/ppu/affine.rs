//! Affine (rotation/scaling) background rendering.
//!
//! Texture coordinates walk across the scanline in 8.8 fixed point from the
//! internal reference point, stepping by PA/PC per pixel. Map entries are
//! single bytes, tiles are always 8bpp, and there are no flip bits.

use super::{Layer, Ppu, SCREEN_WIDTH, read16, vram_fold};

impl Ppu {
    pub(crate) fn render_bg_affine(&mut self, bg: usize, vram: &[u8], palette: &[u8]) {
        let aff = bg - 2;
        let bgcnt = self.bg_cnt[bg];

        let char_base = (((bgcnt >> 2) & 3) as usize) * 0x4000;
        let screen_base = (((bgcnt >> 8) & 0x1F) as usize) * 0x800;
        let wrap = bgcnt & (1 << 13) != 0;

        // Map side length in tiles: 16, 32, 64, 128.
        let tiles = 16usize << ((bgcnt >> 14) & 3);
        let size_px = (tiles * 8) as i32;

        let pa = self.bg_pa[aff] as i32;
        let pc = self.bg_pc[aff] as i32;
        let mut px = self.bg_ref_x[aff];
        let mut py = self.bg_ref_y[aff];

        let layer = Layer::Bg(bg as u8);
        let layer_bit = 1u8 << bg;

        for screen_x in 0..SCREEN_WIDTH {
            let mut tx = px >> 8;
            let mut ty = py >> 8;
            px += pa;
            py += pc;

            if self.win_mask[screen_x] & layer_bit == 0 {
                continue;
            }

            if wrap {
                tx = tx.rem_euclid(size_px);
                ty = ty.rem_euclid(size_px);
            } else if tx < 0 || tx >= size_px || ty < 0 || ty >= size_px {
                continue;
            }
            let (tx, ty) = (tx as usize, ty as usize);

            let map_addr = vram_fold(screen_base + (ty / 8) * tiles + tx / 8);
            let tile_num = vram[map_addr] as usize;

            let tile_addr = vram_fold(char_base + tile_num * 64 + (ty % 8) * 8 + tx % 8);
            let color_idx = vram[tile_addr] as usize;
            if color_idx == 0 {
                continue;
            }

            self.plot(screen_x, read16(palette, color_idx * 2), layer);
        }
    }
}
