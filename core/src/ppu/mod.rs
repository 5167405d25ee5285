//! PPU: scanline renderer for the six display modes.
//!
//! Each visible line is built in a 240-pixel scratch buffer: backdrop first,
//! then every enabled layer back-to-front (priority 3 down to 0, higher BG
//! numbers before lower, sprites after the backgrounds of their priority),
//! then the color-effect stage, then a copy into the framebuffer row.
//! Alongside the scratch the compositor tracks, per column, which layer owns
//! the top pixel and which pixel/layer sits directly beneath it — exactly
//! the inputs the blend stage needs.

mod affine;
mod background;
mod bitmap;
mod effects;
mod sprites;

pub const SCREEN_WIDTH: usize = 240;
pub const SCREEN_HEIGHT: usize = 160;

pub const VDRAW_LINES: u16 = 160;
pub const TOTAL_LINES: u16 = 228;

// DISPSTAT bits
pub const DISPSTAT_VBLANK: u16 = 1 << 0;
pub const DISPSTAT_HBLANK: u16 = 1 << 1;
pub const DISPSTAT_VCOUNT: u16 = 1 << 2;
pub const DISPSTAT_VBLANK_IRQ: u16 = 1 << 3;
pub const DISPSTAT_HBLANK_IRQ: u16 = 1 << 4;
pub const DISPSTAT_VCOUNT_IRQ: u16 = 1 << 5;

// DISPCNT bits
const DISPCNT_FORCED_BLANK: u16 = 1 << 7;
const DISPCNT_OBJ_ENABLE: u16 = 1 << 12;
const DISPCNT_WIN0_ENABLE: u16 = 1 << 13;
const DISPCNT_WIN1_ENABLE: u16 = 1 << 14;

const WHITE: u16 = 0x7FFF;

// Window mask bits: BG0-3, OBJ, color effects.
const WIN_OBJ: u8 = 1 << 4;
const WIN_EFFECTS: u8 = 1 << 5;
const WIN_ALL: u8 = 0x3F;

/// Identity of the layer that produced a pixel, used by the blend stage to
/// match BLDCNT first/second target bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Layer {
    Bg(u8),
    Obj,
    Backdrop,
}

impl Layer {
    /// Bit position in BLDCNT's first-target field (second targets are the
    /// same bits shifted up by 8).
    fn target_bit(self) -> u16 {
        match self {
            Layer::Bg(n) => 1 << n,
            Layer::Obj => 1 << 4,
            Layer::Backdrop => 1 << 5,
        }
    }
}

/// One sprite-line pixel. `priority == NO_OBJ` marks an empty column.
#[derive(Clone, Copy)]
pub(crate) struct ObjPixel {
    color: u16,
    priority: u8,
    semi: bool,
}

const NO_OBJ: u8 = 0xFF;

const EMPTY_OBJ: ObjPixel = ObjPixel {
    color: 0,
    priority: NO_OBJ,
    semi: false,
};

pub struct Ppu {
    pub dispcnt: u16,
    pub dispstat: u16,
    pub vcount: u16,

    pub bg_cnt: [u16; 4],
    pub bg_hofs: [u16; 4],
    pub bg_vofs: [u16; 4],

    // Affine parameters and reference points for BG2/BG3.
    pub bg_pa: [i16; 2],
    pub bg_pb: [i16; 2],
    pub bg_pc: [i16; 2],
    pub bg_pd: [i16; 2],
    /// Internal reference points: walk by PB/PD per scanline.
    pub bg_ref_x: [i32; 2],
    pub bg_ref_y: [i32; 2],
    /// Latched (guest-written) reference points, reloaded at V-blank start.
    pub bg_ref_x_latch: [i32; 2],
    pub bg_ref_y_latch: [i32; 2],

    pub win_h: [u16; 2],
    pub win_v: [u16; 2],
    pub winin: u16,
    pub winout: u16,

    pub bldcnt: u16,
    pub bldalpha: u16,
    pub bldy: u16,
    pub mosaic: u16,

    pub framebuffer: Box<[u16; SCREEN_WIDTH * SCREEN_HEIGHT]>,

    // Per-scanline working state.
    scanline: [u16; SCREEN_WIDTH],
    top_layer: [Layer; SCREEN_WIDTH],
    second: [u16; SCREEN_WIDTH],
    second_layer: [Layer; SCREEN_WIDTH],
    obj_line: [ObjPixel; SCREEN_WIDTH],
    win_mask: [u8; SCREEN_WIDTH],
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            dispcnt: 0,
            dispstat: 0,
            vcount: 0,
            bg_cnt: [0; 4],
            bg_hofs: [0; 4],
            bg_vofs: [0; 4],
            bg_pa: [0; 2],
            bg_pb: [0; 2],
            bg_pc: [0; 2],
            bg_pd: [0; 2],
            bg_ref_x: [0; 2],
            bg_ref_y: [0; 2],
            bg_ref_x_latch: [0; 2],
            bg_ref_y_latch: [0; 2],
            win_h: [0; 2],
            win_v: [0; 2],
            winin: 0,
            winout: 0,
            bldcnt: 0,
            bldalpha: 0,
            bldy: 0,
            mosaic: 0,
            framebuffer: Box::new([0; SCREEN_WIDTH * SCREEN_HEIGHT]),
            scanline: [0; SCREEN_WIDTH],
            top_layer: [Layer::Backdrop; SCREEN_WIDTH],
            second: [0; SCREEN_WIDTH],
            second_layer: [Layer::Backdrop; SCREEN_WIDTH],
            obj_line: [EMPTY_OBJ; SCREEN_WIDTH],
            win_mask: [WIN_ALL; SCREEN_WIDTH],
        }
    }

    pub fn set_hblank(&mut self, active: bool) {
        if active {
            self.dispstat |= DISPSTAT_HBLANK;
        } else {
            self.dispstat &= !DISPSTAT_HBLANK;
        }
    }

    pub fn set_vblank(&mut self, active: bool) {
        if active {
            self.dispstat |= DISPSTAT_VBLANK;
        } else {
            self.dispstat &= !DISPSTAT_VBLANK;
        }
    }

    pub fn increment_vcount(&mut self) {
        self.vcount += 1;
        if self.vcount >= TOTAL_LINES {
            self.vcount = 0;
        }
    }

    /// Compare V-count against the DISPSTAT target, updating the match flag.
    /// Returns true when the match IRQ should be raised.
    pub fn vcount_match(&mut self) -> bool {
        let target = (self.dispstat >> 8) & 0xFF;
        let matched = self.vcount == target;
        if matched {
            self.dispstat |= DISPSTAT_VCOUNT;
        } else {
            self.dispstat &= !DISPSTAT_VCOUNT;
        }
        matched && self.dispstat & DISPSTAT_VCOUNT_IRQ != 0
    }

    /// Reload the affine internal reference points from their latches.
    /// Happens at every V-blank start.
    pub fn reload_affine_refs(&mut self) {
        self.bg_ref_x = self.bg_ref_x_latch;
        self.bg_ref_y = self.bg_ref_y_latch;
    }

    fn bg_enabled(&self, bg: usize) -> bool {
        self.dispcnt & (1 << (8 + bg)) != 0
    }

    fn bg_priority(&self, bg: usize) -> u8 {
        (self.bg_cnt[bg] & 3) as u8
    }

    /// Write a layer pixel into the scratch, pushing the previous pixel into
    /// the second-tracking slot for the blend stage.
    fn plot(&mut self, x: usize, color: u16, layer: Layer) {
        self.second[x] = self.scanline[x];
        self.second_layer[x] = self.top_layer[x];
        self.scanline[x] = color;
        self.top_layer[x] = layer;
    }

    /// Render the scanline `vcount` into the framebuffer.
    pub fn render_scanline(&mut self, vram: &[u8], palette: &[u8], oam: &[u8]) {
        let line = self.vcount as usize;
        if line >= SCREEN_HEIGHT {
            return;
        }

        // Forced blank overrides everything with white.
        if self.dispcnt & DISPCNT_FORCED_BLANK != 0 {
            self.scanline.fill(WHITE);
            self.copy_to_framebuffer(line);
            return;
        }

        // Backdrop: palette entry 0 everywhere.
        let backdrop = read16(palette, 0);
        self.scanline.fill(backdrop);
        self.top_layer.fill(Layer::Backdrop);
        self.second.fill(backdrop);
        self.second_layer.fill(Layer::Backdrop);

        self.compute_window_masks(line);

        if self.dispcnt & DISPCNT_OBJ_ENABLE != 0 {
            self.render_obj_line(vram, palette, oam, line);
        } else {
            self.obj_line.fill(EMPTY_OBJ);
        }

        let mode = self.dispcnt & 7;

        for priority in (0..4u8).rev() {
            for bg in (0..4usize).rev() {
                if !self.bg_enabled(bg) || self.bg_priority(bg) != priority {
                    continue;
                }
                match (mode, bg) {
                    (0, _) | (1, 0) | (1, 1) => {
                        self.render_bg_regular(bg, line, vram, palette);
                    }
                    (1, 2) | (2, 2) | (2, 3) => {
                        self.render_bg_affine(bg, vram, palette);
                    }
                    (3, 2) => self.render_mode3(line, vram),
                    (4, 2) => self.render_mode4(line, vram, palette),
                    (5, 2) => self.render_mode5(line, vram),
                    _ => {}
                }
            }

            // Sprites sit on top of same-priority backgrounds.
            for x in 0..SCREEN_WIDTH {
                let obj = self.obj_line[x];
                if obj.priority == priority && self.win_mask[x] & WIN_OBJ != 0 {
                    self.plot(x, obj.color, Layer::Obj);
                }
            }
        }

        self.apply_effects();
        self.copy_to_framebuffer(line);
        self.walk_affine_refs(mode);
    }

    fn copy_to_framebuffer(&mut self, line: usize) {
        let row = line * SCREEN_WIDTH;
        self.framebuffer[row..row + SCREEN_WIDTH].copy_from_slice(&self.scanline);
    }

    /// Step the internal affine reference points by PB/PD after a rendered
    /// scanline.
    fn walk_affine_refs(&mut self, mode: u16) {
        for aff in 0..2 {
            let bg = aff + 2;
            let affine_mode = matches!((mode, bg), (1, 2) | (2, 2) | (2, 3));
            if affine_mode && self.bg_enabled(bg) {
                self.bg_ref_x[aff] += self.bg_pb[aff] as i32;
                self.bg_ref_y[aff] += self.bg_pd[aff] as i32;
            }
        }
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

/// Little-endian 16-bit read from a memory slice.
pub(crate) fn read16(mem: &[u8], offset: usize) -> u16 {
    u16::from(mem[offset]) | (u16::from(mem[offset + 1]) << 8)
}

/// VRAM is 96 KiB mirrored into a 128 KiB window: offsets past 0x18000 fold
/// back by 0x8000.
pub(crate) fn vram_fold(offset: usize) -> usize {
    let offset = offset & 0x1FFFF;
    if offset >= 0x18000 {
        offset - 0x8000
    } else {
        offset
    }
}
