//! DMA controller: four channels with latched source/dest/count and four
//! start timings (immediate, V-blank, H-blank, FIFO refill).
//!
//! Transfers are atomic with respect to the CPU: once a channel fires, every
//! unit moves before the CPU resumes.

use crate::bus::Bus;
use crate::irq::IRQ_DMA0;

// CNT_H high-byte offsets in the I/O window, per channel; the enable bit is
// mirrored out on completion so reads see it cleared.
const CNT_H_HI: [u32; 4] = [0xBB, 0xC7, 0xD3, 0xDF];

// Start timing selector values.
const TIMING_IMMEDIATE: u8 = 0;
const TIMING_VBLANK: u8 = 1;
const TIMING_HBLANK: u8 = 2;
const TIMING_SPECIAL: u8 = 3;

#[derive(Clone, Copy, Default)]
pub struct DmaChannel {
    /// Values most recently written to SAD/DAD/CNT_L; copied into the
    /// working registers on the enable rising edge.
    pub source_latch: u32,
    pub dest_latch: u32,
    pub count: u16,

    // Working registers.
    pub source: u32,
    pub dest: u32,

    pub control: u16,
    pub src_adjust: u8,
    pub dest_adjust: u8,
    pub repeat: bool,
    pub transfer_32: bool,
    pub timing: u8,
    pub irq_on_done: bool,
    pub enabled: bool,
}

pub struct DmaController {
    pub channels: [DmaChannel; 4],
}

impl DmaController {
    pub fn new() -> Self {
        Self {
            channels: [DmaChannel::default(); 4],
        }
    }

    /// CNT_H write. On the enable rising edge the source and destination
    /// latches are loaded into the working registers; returns true when the
    /// channel must execute immediately.
    pub fn write_control(&mut self, ch: usize, val: u16) -> bool {
        let dc = &mut self.channels[ch];
        let was_enabled = dc.enabled;

        dc.control = val;
        dc.dest_adjust = ((val >> 5) & 3) as u8;
        dc.src_adjust = ((val >> 7) & 3) as u8;
        dc.repeat = val & (1 << 9) != 0;
        dc.transfer_32 = val & (1 << 10) != 0;
        dc.timing = ((val >> 12) & 3) as u8;
        dc.irq_on_done = val & (1 << 14) != 0;
        dc.enabled = val & (1 << 15) != 0;

        if !was_enabled && dc.enabled {
            dc.source = dc.source_latch;
            dc.dest = dc.dest_latch;
            return dc.timing == TIMING_IMMEDIATE;
        }
        false
    }
}

impl Default for DmaController {
    fn default() -> Self {
        Self::new()
    }
}

/// V-blank trigger: run every enabled channel with V-blank timing.
pub fn on_vblank(bus: &mut Bus) {
    for ch in 0..4 {
        let dc = &bus.dma.channels[ch];
        if dc.enabled && dc.timing == TIMING_VBLANK {
            execute(bus, ch);
        }
    }
}

/// H-blank trigger: run every enabled channel with H-blank timing.
pub fn on_hblank(bus: &mut Bus) {
    for ch in 0..4 {
        let dc = &bus.dma.channels[ch];
        if dc.enabled && dc.timing == TIMING_HBLANK {
            execute(bus, ch);
        }
    }
}

/// FIFO refill trigger: FIFO A refills through channel 1, FIFO B through
/// channel 2. Special timing is only valid on those channels.
pub fn on_fifo(bus: &mut Bus, fifo_id: usize) {
    let ch = fifo_id + 1;
    let dc = &bus.dma.channels[ch];
    if dc.enabled && dc.timing == TIMING_SPECIAL {
        execute(bus, ch);
    }
}

/// Run one channel to completion.
pub fn execute(bus: &mut Bus, ch: usize) {
    let mut dc = bus.dma.channels[ch];
    if !dc.enabled {
        return;
    }

    // Zero count means the channel maximum.
    let mut count = dc.count as u32;
    if count == 0 {
        count = if ch == 3 { 0x10000 } else { 0x4000 };
    }

    // FIFO refill forces 4 words, 32-bit units, fixed destination.
    let is_fifo = dc.timing == TIMING_SPECIAL && (ch == 1 || ch == 2);
    if is_fifo {
        count = 4;
    }
    let use_32 = is_fifo || dc.transfer_32;
    let step = if use_32 { 4 } else { 2 };

    // Address bus widths: channel 0 source and channels 0-2 dest are
    // 27-bit, the rest 28-bit.
    let src_mask = if ch == 0 { 0x07FF_FFFF } else { 0x0FFF_FFFF };
    let dst_mask = if ch == 3 { 0x0FFF_FFFF } else { 0x07FF_FFFF };
    dc.source &= src_mask;
    dc.dest &= dst_mask;

    // An EEPROM-bound burst sizes the chip before any bits arrive.
    if bus.cart.is_eeprom_access(dc.dest) || bus.cart.is_eeprom_access(dc.source) {
        bus.cart.eeprom_dma_burst(count);
    }

    for _ in 0..count {
        if use_32 {
            let val = bus.read32(dc.source);
            bus.write32(dc.dest, val);
        } else {
            let val = bus.read16(dc.source);
            bus.write16(dc.dest, val);
        }

        // 0 = increment, 1 = decrement, 2 = fixed, 3 = prohibited (fixed).
        match dc.src_adjust {
            0 => dc.source = dc.source.wrapping_add(step),
            1 => dc.source = dc.source.wrapping_sub(step),
            _ => {}
        }

        if !is_fifo {
            // 0 = increment, 1 = decrement, 2 = fixed,
            // 3 = increment now, reload after the block.
            match dc.dest_adjust {
                0 | 3 => dc.dest = dc.dest.wrapping_add(step),
                1 => dc.dest = dc.dest.wrapping_sub(step),
                _ => {}
            }
        }
    }

    if dc.dest_adjust == 3 && !is_fifo {
        dc.dest = dc.dest_latch;
    }

    if dc.irq_on_done {
        bus.irq.request(IRQ_DMA0 << ch);
    }

    if dc.repeat && dc.timing != TIMING_IMMEDIATE {
        // Repeating channel: stay armed for the next trigger.
    } else {
        dc.enabled = false;
        dc.control &= !(1 << 15);
        bus.io_regs[CNT_H_HI[ch] as usize] &= !0x80;
    }

    bus.dma.channels[ch] = dc;
}
