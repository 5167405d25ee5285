//! The assembled system and its frame scheduler.
//!
//! `Gba` owns the CPU and the Bus (which in turn owns every peripheral and
//! memory region); `run_frame` drives the fixed 228-scanline cadence that
//! interleaves CPU execution, timers, audio, rendering, DMA triggers, and
//! interrupt delivery in hardware order.

use crate::bus::Bus;
use crate::cart::CartridgeError;
use crate::cpu::Cpu;
use crate::dma;
use crate::irq::{IRQ_HBLANK, IRQ_KEYPAD, IRQ_VBLANK, IRQ_VCOUNT};
use crate::joypad::Key;
use crate::ppu::{
    DISPSTAT_HBLANK_IRQ, DISPSTAT_VBLANK_IRQ, SCREEN_HEIGHT, SCREEN_WIDTH, TOTAL_LINES,
    VDRAW_LINES,
};

/// 16.78 MHz core clock.
pub const CPU_FREQ: u32 = 1 << 24;

pub const CYCLES_PER_PIXEL: u32 = 4;
pub const HDRAW_CYCLES: u32 = 240 * CYCLES_PER_PIXEL; // 960
pub const HBLANK_CYCLES: u32 = 68 * CYCLES_PER_PIXEL; // 272
pub const SCANLINE_CYCLES: u32 = HDRAW_CYCLES + HBLANK_CYCLES; // 1232
pub const FRAME_CYCLES: u64 = TOTAL_LINES as u64 * SCANLINE_CYCLES as u64; // 280896

/// Audio output rate produced by the APU mixer.
pub const AUDIO_SAMPLE_RATE: u32 = 32768;

pub struct Gba {
    pub cpu: Cpu,
    pub bus: Bus,
    pub total_cycles: u64,
    pub frame_complete: bool,
}

impl Gba {
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            bus: Bus::new(),
            total_cycles: 0,
            frame_complete: false,
        }
    }

    /// Load a cartridge image.
    pub fn load_rom(&mut self, rom: Vec<u8>) -> Result<(), CartridgeError> {
        self.bus.cart.load_rom(rom)
    }

    /// Load a BIOS image; execution will begin at the reset vector.
    pub fn load_bios(&mut self, data: &[u8]) {
        self.bus.load_bios(data);
    }

    /// Start without a BIOS: registers get the post-BIOS state, SWIs run
    /// through the high-level services, and the fabricated IRQ trampoline
    /// lands at the 0x18 vector.
    pub fn skip_bios(&mut self) {
        self.bus.install_hle_trampoline();
        self.cpu.skip_bios();
    }

    /// The finished 240x160 BGR555 frame.
    pub fn framebuffer(&self) -> &[u16; SCREEN_WIDTH * SCREEN_HEIGHT] {
        &self.bus.ppu.framebuffer
    }

    /// Latch a pad key state and evaluate the keypad interrupt condition.
    pub fn set_key(&mut self, key: Key, pressed: bool) {
        if pressed {
            self.bus.joypad.press(key);
        } else {
            self.bus.joypad.release(key);
        }
        if self.bus.joypad.irq_condition_met() {
            self.bus.irq.request(IRQ_KEYPAD);
        }
    }

    /// Pop buffered stereo audio; returns the number of i16 values written.
    pub fn pop_audio(&mut self, out: &mut [i16]) -> usize {
        self.bus.apu.pop_samples(out)
    }

    /// Run one full frame: 228 scanlines of 1232 cycles.
    pub fn run_frame(&mut self) {
        self.frame_complete = false;

        for _ in 0..TOTAL_LINES {
            // H-draw: CPU, timers, and audio advance through the visible
            // portion of the line.
            self.cpu.run(&mut self.bus, HDRAW_CYCLES);
            self.bus.tick_timers(HDRAW_CYCLES);
            self.bus.apu.tick(HDRAW_CYCLES);

            self.bus.ppu.set_hblank(true);

            if self.bus.ppu.vcount < VDRAW_LINES {
                self.bus.render_scanline();
                dma::on_hblank(&mut self.bus);
            }

            if self.bus.ppu.dispstat & DISPSTAT_HBLANK_IRQ != 0 {
                self.bus.irq.request(IRQ_HBLANK);
            }

            // H-blank.
            self.cpu.run(&mut self.bus, HBLANK_CYCLES);
            self.bus.tick_timers(HBLANK_CYCLES);
            self.bus.apu.tick(HBLANK_CYCLES);

            self.bus.ppu.set_hblank(false);
            self.bus.ppu.increment_vcount();

            if self.bus.ppu.vcount_match() {
                self.bus.irq.request(IRQ_VCOUNT);
            }

            if self.bus.ppu.vcount == VDRAW_LINES {
                // V-blank edge: flag, IRQ, DMA, affine reference reload.
                self.bus.ppu.set_vblank(true);
                if self.bus.ppu.dispstat & DISPSTAT_VBLANK_IRQ != 0 {
                    self.bus.irq.request(IRQ_VBLANK);
                }
                dma::on_vblank(&mut self.bus);
                self.bus.ppu.reload_affine_refs();
                self.frame_complete = true;
            }

            if self.bus.ppu.vcount == 0 {
                self.bus.ppu.set_vblank(false);
            }

            self.total_cycles += SCANLINE_CYCLES as u64;
        }
    }
}

impl Default for Gba {
    fn default() -> Self {
        Self::new()
    }
}
