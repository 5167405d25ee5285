//! Regular (text-mode) tiled background rendering.

use super::{Layer, Ppu, SCREEN_WIDTH, read16, vram_fold};

impl Ppu {
    /// Render one scanline of a regular tiled background into the scratch.
    pub(crate) fn render_bg_regular(
        &mut self,
        bg: usize,
        line: usize,
        vram: &[u8],
        palette: &[u8],
    ) {
        let bgcnt = self.bg_cnt[bg];

        let char_base = (((bgcnt >> 2) & 3) as usize) * 0x4000;
        let screen_base = (((bgcnt >> 8) & 0x1F) as usize) * 0x800;
        let color_256 = bgcnt & (1 << 7) != 0;
        let screen_size = (bgcnt >> 14) & 3;

        // 0 = 256x256, 1 = 512x256, 2 = 256x512, 3 = 512x512 pixels.
        let map_width: usize = if screen_size & 1 != 0 { 512 } else { 256 };
        let map_height: usize = if screen_size & 2 != 0 { 512 } else { 256 };

        let hofs = (self.bg_hofs[bg] & 0x1FF) as usize;
        let vofs = (self.bg_vofs[bg] & 0x1FF) as usize;

        // Mosaic quantizes the sampled coordinates to the block's top-left.
        let mosaic = bgcnt & (1 << 6) != 0;
        let (mos_h, mos_v) = if mosaic {
            (
                (self.mosaic & 0xF) as usize + 1,
                ((self.mosaic >> 4) & 0xF) as usize + 1,
            )
        } else {
            (1, 1)
        };

        let sample_line = line - line % mos_v;
        let map_y = (sample_line + vofs) % map_height;
        let tile_row = map_y / 8;
        let pixel_y = map_y % 8;

        // Screen blocks are 32x32 tiles; wider/taller maps arrange 2 or 2x2
        // blocks after the first.
        let sbb_width = if map_width > 256 { 2 } else { 1 };

        let layer = Layer::Bg(bg as u8);
        let layer_bit = 1u8 << bg;

        for screen_x in 0..SCREEN_WIDTH {
            if self.win_mask[screen_x] & layer_bit == 0 {
                continue;
            }

            let sample_x = screen_x - screen_x % mos_h;
            let map_x = (sample_x + hofs) % map_width;
            let tile_col = map_x / 8;
            let pixel_x = map_x % 8;

            let sbb_x = tile_col / 32;
            let sbb_y = tile_row / 32;
            let block_offset = sbb_y * sbb_width + sbb_x;

            let local_col = tile_col % 32;
            let local_row = tile_row % 32;

            let map_addr = screen_base + block_offset * 0x800 + (local_row * 32 + local_col) * 2;
            let tile_entry = read16(vram, vram_fold(map_addr));

            let tile_num = (tile_entry & 0x3FF) as usize;
            let h_flip = tile_entry & (1 << 10) != 0;
            let v_flip = tile_entry & (1 << 11) != 0;
            let pal_num = ((tile_entry >> 12) & 0xF) as usize;

            let ty = if v_flip { 7 - pixel_y } else { pixel_y };
            let tx = if h_flip { 7 - pixel_x } else { pixel_x };

            if color_256 {
                // 8bpp: 64 bytes per tile, one byte per pixel.
                let tile_addr = vram_fold(char_base + tile_num * 64 + ty * 8 + tx);
                let color_idx = vram[tile_addr] as usize;
                if color_idx == 0 {
                    continue;
                }
                self.plot(screen_x, read16(palette, color_idx * 2), layer);
            } else {
                // 4bpp: 32 bytes per tile, two pixels per byte, low nibble
                // is the left pixel.
                let tile_addr = vram_fold(char_base + tile_num * 32 + ty * 4 + tx / 2);
                let byte = vram[tile_addr];
                let color_idx = if tx & 1 != 0 {
                    (byte >> 4) as usize
                } else {
                    (byte & 0xF) as usize
                };
                if color_idx == 0 {
                    continue;
                }
                let color = read16(palette, (pal_num * 16 + color_idx) * 2);
                self.plot(screen_x, color, layer);
            }
        }
    }
}
