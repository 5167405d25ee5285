//! I/O register dispatch for the 1 KiB window at 0x04000000.
//!
//! Every register falls into one of four categories: pure storage (the
//! `io_regs` backing array), subsystem-sourced reads (VCOUNT, timer
//! counters, KEYINPUT), subsystem-effecting writes (scroll, DMA control,
//! HALTCNT), and read-only/write-only halves. Reads and writes are
//! byte-granular; the bus composes halfword and word accesses from them, so
//! every register has defined behavior at every width and alignment.

use crate::bus::{Bus, IO_SIZE};
use crate::dma;

// Register offsets within the window.
const REG_DISPCNT: u32 = 0x00;
const REG_DISPSTAT: u32 = 0x04;
const REG_VCOUNT: u32 = 0x06;
const REG_KEYINPUT: u32 = 0x130;
const REG_KEYCNT: u32 = 0x132;
const REG_IE: u32 = 0x200;
const REG_IF: u32 = 0x202;
const REG_WAITCNT: u32 = 0x204;
const REG_IME: u32 = 0x208;
const REG_POSTFLG: u32 = 0x300;
const REG_HALTCNT: u32 = 0x301;

// DMA register blocks are 12 bytes each from 0xB0; CNT_H occupies the last
// two bytes of each block.
const DMA_BASE: [u32; 4] = [0xB0, 0xBC, 0xC8, 0xD4];
const DMA_CNT_H_HI: [u32; 4] = [0xBB, 0xC7, 0xD3, 0xDF];

/// Replace the low or high byte of a 16-bit register.
fn set_byte(reg: &mut u16, high: bool, val: u8) {
    if high {
        *reg = (*reg & 0x00FF) | ((val as u16) << 8);
    } else {
        *reg = (*reg & 0xFF00) | val as u16;
    }
}

fn byte_of(val: u16, high: bool) -> u8 {
    if high { (val >> 8) as u8 } else { val as u8 }
}

impl Bus {
    pub(crate) fn io_read8(&mut self, addr: u32) -> u8 {
        let offset = addr & 0x3FF;
        let high = offset & 1 != 0;

        match offset {
            REG_DISPCNT | 0x01 => byte_of(self.ppu.dispcnt, high),
            REG_DISPSTAT | 0x05 => byte_of(self.ppu.dispstat, high),
            REG_VCOUNT | 0x07 => byte_of(self.ppu.vcount, high),
            0x08..=0x0F => {
                let bg = ((offset - 0x08) >> 1) as usize;
                byte_of(self.ppu.bg_cnt[bg], high)
            }

            // SOUNDCNT_X low byte carries live channel-active flags.
            0x84 => self.apu.read_soundcnt_x() as u8,

            // Timer counters read live; controls come from the timer state.
            0x100 | 0x101 | 0x104 | 0x105 | 0x108 | 0x109 | 0x10C | 0x10D => {
                let idx = ((offset - 0x100) / 4) as usize;
                byte_of(self.timers[idx].read_counter(), high)
            }
            0x102 | 0x103 | 0x106 | 0x107 | 0x10A | 0x10B | 0x10E | 0x10F => {
                let idx = ((offset - 0x102) / 4) as usize;
                byte_of(self.timers[idx].control, high)
            }

            REG_KEYINPUT | 0x131 => byte_of(self.joypad.keyinput, high),
            REG_KEYCNT | 0x133 => byte_of(self.joypad.keycnt, high),

            REG_IE | 0x201 => byte_of(self.irq.ie, high),
            REG_IF | 0x203 => byte_of(self.irq.irf, high),
            REG_IME => self.irq.ime as u8,
            0x209 => 0,

            _ => self.io_regs[offset as usize],
        }
    }

    pub(crate) fn io_write8(&mut self, addr: u32, val: u8) {
        let offset = addr & 0x3FF;
        let high = offset & 1 != 0;

        match offset {
            REG_DISPCNT | 0x01 => {
                self.io_regs[offset as usize] = val;
                set_byte(&mut self.ppu.dispcnt, high, val);
            }
            REG_DISPSTAT => {
                // Bits 0-2 (V-blank/H-blank/V-count flags) are read-only.
                self.ppu.dispstat = (self.ppu.dispstat & 0xFF07) | ((val & 0xF8) as u16);
                self.io_regs[offset as usize] = self.ppu.dispstat as u8;
            }
            0x05 => {
                self.io_regs[offset as usize] = val;
                set_byte(&mut self.ppu.dispstat, true, val);
            }
            REG_VCOUNT | 0x07 => {
                // Read-only.
            }

            0x08..=0x0F => {
                self.io_regs[offset as usize] = val;
                let bg = ((offset - 0x08) >> 1) as usize;
                set_byte(&mut self.ppu.bg_cnt[bg], high, val);
            }

            // Scroll registers, write-only: BGnHOFS/BGnVOFS pairs.
            0x10..=0x1F => {
                self.io_regs[offset as usize] = val;
                let rel = offset - 0x10;
                let bg = (rel >> 2) as usize;
                let reg = if rel & 2 != 0 {
                    &mut self.ppu.bg_vofs[bg]
                } else {
                    &mut self.ppu.bg_hofs[bg]
                };
                set_byte(reg, high, val);
            }

            // Affine parameters PA-PD for BG2/BG3.
            0x20..=0x27 | 0x30..=0x37 => {
                self.io_regs[offset as usize] = val;
                let aff = ((offset >> 4) - 2) as usize;
                let base = if aff == 0 { 0x20 } else { 0x30 };
                let lo = (offset & !1) as usize;
                let value =
                    i16::from_le_bytes([self.io_regs[lo], self.io_regs[lo + 1]]);
                match (lo as u32 - base) >> 1 {
                    0 => self.ppu.bg_pa[aff] = value,
                    1 => self.ppu.bg_pb[aff] = value,
                    2 => self.ppu.bg_pc[aff] = value,
                    _ => self.ppu.bg_pd[aff] = value,
                }
            }

            // Affine reference points: 28-bit sign-extended; a write lands
            // in both the latch and the internal walking copy.
            0x28..=0x2F | 0x38..=0x3F => {
                self.io_regs[offset as usize] = val;
                let aff = ((offset >> 4) - 2) as usize;
                let lo = (offset & !3) as usize;
                let raw = u32::from_le_bytes([
                    self.io_regs[lo],
                    self.io_regs[lo + 1],
                    self.io_regs[lo + 2],
                    self.io_regs[lo + 3],
                ]);
                let value = ((raw << 4) as i32) >> 4;
                if offset & 4 == 0 {
                    self.ppu.bg_ref_x_latch[aff] = value;
                    self.ppu.bg_ref_x[aff] = value;
                } else {
                    self.ppu.bg_ref_y_latch[aff] = value;
                    self.ppu.bg_ref_y[aff] = value;
                }
            }

            // Windows.
            0x40..=0x43 => {
                self.io_regs[offset as usize] = val;
                let w = ((offset - 0x40) >> 1) as usize;
                set_byte(&mut self.ppu.win_h[w], high, val);
            }
            0x44..=0x47 => {
                self.io_regs[offset as usize] = val;
                let w = ((offset - 0x44) >> 1) as usize;
                set_byte(&mut self.ppu.win_v[w], high, val);
            }
            0x48 | 0x49 => {
                self.io_regs[offset as usize] = val;
                set_byte(&mut self.ppu.winin, high, val);
            }
            0x4A | 0x4B => {
                self.io_regs[offset as usize] = val;
                set_byte(&mut self.ppu.winout, high, val);
            }

            0x4C | 0x4D => {
                self.io_regs[offset as usize] = val;
                set_byte(&mut self.ppu.mosaic, high, val);
            }

            // Blending.
            0x50 | 0x51 => {
                self.io_regs[offset as usize] = val;
                set_byte(&mut self.ppu.bldcnt, high, val);
            }
            0x52 | 0x53 => {
                self.io_regs[offset as usize] = val;
                set_byte(&mut self.ppu.bldalpha, high, val);
            }
            0x54 | 0x55 => {
                self.io_regs[offset as usize] = val;
                set_byte(&mut self.ppu.bldy, high, val);
            }

            // Sound: channel, control, wave RAM, and FIFO registers.
            0x60..=0xA7 => {
                self.io_regs[offset as usize] = val;
                self.apu.write_register(offset, val);
            }

            // DMA CNT_H high bytes: reconstruct the control word, latch
            // SAD/DAD/count from the backing store, then let the rising
            // edge of the enable bit arm (and possibly run) the channel.
            0xBB | 0xC7 | 0xD3 | 0xDF => {
                self.io_regs[offset as usize] = val;
                let ch = DMA_CNT_H_HI.iter().position(|&o| o == offset).unwrap();
                let control =
                    self.io_regs[(offset - 1) as usize] as u16 | ((val as u16) << 8);

                let base = DMA_BASE[ch] as usize;
                let dc = &mut self.dma.channels[ch];
                dc.source_latch = u32::from_le_bytes([
                    self.io_regs[base],
                    self.io_regs[base + 1],
                    self.io_regs[base + 2],
                    self.io_regs[base + 3],
                ]);
                dc.dest_latch = u32::from_le_bytes([
                    self.io_regs[base + 4],
                    self.io_regs[base + 5],
                    self.io_regs[base + 6],
                    self.io_regs[base + 7],
                ]);
                dc.count =
                    self.io_regs[base + 8] as u16 | ((self.io_regs[base + 9] as u16) << 8);

                if self.dma.write_control(ch, control) {
                    dma::execute(self, ch);
                }
            }
            // Remaining DMA bytes (SAD/DAD/CNT_L/CNT_H low) are storage;
            // they get latched when CNT_H completes.
            0xB0..=0xDE => {
                self.io_regs[offset as usize] = val;
            }

            // Timer reload registers: act once the 16-bit value completes.
            0x100 | 0x101 | 0x104 | 0x105 | 0x108 | 0x109 | 0x10C | 0x10D => {
                self.io_regs[offset as usize] = val;
                if high {
                    let lo = (offset & !1) as usize;
                    let reload =
                        self.io_regs[lo] as u16 | ((self.io_regs[lo + 1] as u16) << 8);
                    let idx = (lo as u32 - 0x100) as usize / 4;
                    self.timers[idx].write_reload(reload);
                }
            }
            0x102 | 0x103 | 0x106 | 0x107 | 0x10A | 0x10B | 0x10E | 0x10F => {
                self.io_regs[offset as usize] = val;
                if high {
                    let lo = (offset & !1) as usize;
                    let control =
                        self.io_regs[lo] as u16 | ((self.io_regs[lo + 1] as u16) << 8);
                    let idx = (lo as u32 - 0x102) as usize / 4;
                    self.timers[idx].write_control(control);
                }
            }

            REG_KEYINPUT | 0x131 => {
                // Read-only.
            }
            REG_KEYCNT | 0x133 => {
                self.io_regs[offset as usize] = val;
                set_byte(&mut self.joypad.keycnt, high, val);
            }

            REG_IE | 0x201 => {
                self.io_regs[offset as usize] = val;
                set_byte(&mut self.irq.ie, high, val);
            }
            // IF: writing 1 bits clears those request flags. The backing
            // store is left alone; IF always reads from the controller.
            REG_IF => self.irq.acknowledge(val as u16),
            0x203 => self.irq.acknowledge((val as u16) << 8),

            REG_WAITCNT | 0x205 => {
                self.io_regs[offset as usize] = val;
            }

            REG_IME => {
                self.io_regs[offset as usize] = val & 1;
                self.irq.ime = val & 1 != 0;
            }
            0x209 => {
                self.io_regs[offset as usize] = 0;
            }

            REG_POSTFLG => {
                self.io_regs[offset as usize] = val;
            }
            // HALTCNT: any write suspends the CPU until the next IRQ.
            REG_HALTCNT => {
                self.io_regs[offset as usize] = val;
                self.request_halt();
            }

            _ => {
                if (offset as usize) < IO_SIZE {
                    self.io_regs[offset as usize] = val;
                }
            }
        }
    }
}
