//! Sprite (OBJ) rendering.
//!
//! All 128 OAM entries are walked for each scanline, highest index first so
//! lower-numbered sprites come out on top. The result is a per-column line
//! of sprite pixels with their priorities, composited against the
//! backgrounds by the main scanline loop.

use super::{NO_OBJ, ObjPixel, Ppu, SCREEN_WIDTH, read16, vram_fold};

/// OBJ tile data starts at this VRAM offset; each tile number addresses a
/// 32-byte unit.
const OBJ_CHAR_BASE: usize = 0x10000;

/// (width, height) by shape then size bits.
const SIZE_TABLE: [[(i32, i32); 4]; 3] = [
    [(8, 8), (16, 16), (32, 32), (64, 64)],   // square
    [(16, 8), (32, 8), (32, 16), (64, 32)],   // horizontal
    [(8, 16), (8, 32), (16, 32), (32, 64)],   // vertical
];

impl Ppu {
    pub(crate) fn render_obj_line(&mut self, vram: &[u8], palette: &[u8], oam: &[u8], line: usize) {
        self.obj_line.fill(ObjPixel {
            color: 0,
            priority: NO_OBJ,
            semi: false,
        });

        let one_dimensional = self.dispcnt & (1 << 6) != 0;
        let bitmap_mode = (self.dispcnt & 7) >= 3;
        let line = line as i32;

        for i in (0..128usize).rev() {
            let attr0 = read16(oam, i * 8);
            let attr1 = read16(oam, i * 8 + 2);
            let attr2 = read16(oam, i * 8 + 4);

            let affine = attr0 & (1 << 8) != 0;
            let double_or_disable = attr0 & (1 << 9) != 0;
            if !affine && double_or_disable {
                continue;
            }
            let obj_mode = (attr0 >> 10) & 3;
            if obj_mode == 2 {
                // OBJ-window sprites contribute no visible pixels.
                continue;
            }

            let shape = ((attr0 >> 14) & 3) as usize;
            if shape == 3 {
                continue;
            }
            let size = ((attr1 >> 14) & 3) as usize;
            let (w, h) = SIZE_TABLE[shape][size];

            // Bounding box; affine double-size sprites render into 2w x 2h.
            let (bw, bh) = if affine && double_or_disable {
                (w * 2, h * 2)
            } else {
                (w, h)
            };

            // Y is 8-bit with values past the screen wrapping negative;
            // X is 9-bit signed.
            let mut y = (attr0 & 0xFF) as i32;
            if y >= 160 {
                y -= 256;
            }
            let mut x0 = (attr1 & 0x1FF) as i32;
            if x0 >= 256 {
                x0 -= 512;
            }

            let row = line - y;
            if row < 0 || row >= bh {
                continue;
            }

            let color_256 = attr0 & (1 << 13) != 0;
            let tile_num = (attr2 & 0x3FF) as i32;
            let priority = ((attr2 >> 10) & 3) as u8;
            let pal_num = ((attr2 >> 12) & 0xF) as i32;
            let semi = obj_mode == 1;

            // Affine parameter group, shared by four OAM entries.
            let params = if affine {
                let group = (((attr1 >> 9) & 0x1F) as usize) * 32;
                Some([
                    read16(oam, group + 6) as i16 as i32,
                    read16(oam, group + 14) as i16 as i32,
                    read16(oam, group + 22) as i16 as i32,
                    read16(oam, group + 30) as i16 as i32,
                ])
            } else {
                None
            };

            for sx in 0..bw {
                let screen_x = x0 + sx;
                if !(0..SCREEN_WIDTH as i32).contains(&screen_x) {
                    continue;
                }

                // Texture coordinates within the w x h sprite.
                let (tex_x, tex_y) = if let Some([pa, pb, pc, pd]) = params {
                    let dx = sx - bw / 2;
                    let dy = row - bh / 2;
                    let tx = ((pa * dx + pb * dy) >> 8) + w / 2;
                    let ty = ((pc * dx + pd * dy) >> 8) + h / 2;
                    if !(0..w).contains(&tx) || !(0..h).contains(&ty) {
                        continue;
                    }
                    (tx, ty)
                } else {
                    let tx = if attr1 & (1 << 12) != 0 { w - 1 - sx } else { sx };
                    let ty = if attr1 & (1 << 13) != 0 {
                        h - 1 - row
                    } else {
                        row
                    };
                    (tx, ty)
                };

                // Resolve the tile: 1D lays the sprite's tiles out
                // row-major; 2D steps 32 tile slots per tile row.
                let bpp_step = if color_256 { 2 } else { 1 };
                let row_stride = if one_dimensional {
                    (w / 8) * bpp_step
                } else {
                    32
                };
                let tile_index = tile_num + (tex_y / 8) * row_stride + (tex_x / 8) * bpp_step;

                // In bitmap modes the low OBJ tile space overlaps the frame
                // buffer and is not addressable.
                if bitmap_mode && tile_index < 512 {
                    continue;
                }

                let (px, py) = ((tex_x % 8) as usize, (tex_y % 8) as usize);
                let color_idx = if color_256 {
                    let addr = vram_fold(OBJ_CHAR_BASE + tile_index as usize * 32 + py * 8 + px);
                    vram[addr] as usize
                } else {
                    let addr =
                        vram_fold(OBJ_CHAR_BASE + tile_index as usize * 32 + py * 4 + px / 2);
                    if px & 1 != 0 {
                        (vram[addr] >> 4) as usize
                    } else {
                        (vram[addr] & 0xF) as usize
                    }
                };
                if color_idx == 0 {
                    continue;
                }

                let pal_offset = if color_256 {
                    0x200 + color_idx * 2
                } else {
                    0x200 + (pal_num as usize * 16 + color_idx) * 2
                };

                self.obj_line[screen_x as usize] = ObjPixel {
                    color: read16(palette, pal_offset),
                    priority,
                    semi,
                };
            }
        }
    }
}
