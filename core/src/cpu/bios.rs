//! High-level emulation of the BIOS SWI services.
//!
//! With no BIOS image loaded, SWIs never reach the 0x08 vector: the CPU
//! dispatches here instead, with R0-R3 holding the arguments exactly as the
//! real BIOS expects, and results written back into the same registers.
//! All memory traffic goes through the bus so the hardware model stays
//! consistent (VRAM byte-write rules included).
//!
//! References: GBATEK "BIOS Functions", Tonc's BIOS reference.

use super::{Cpu, REG_PC};
use crate::bus::Bus;

/// First quarter of the BIOS sine table: sin(i * 2pi / 256) in 1.14 fixed
/// point for i = 0..=64. The other quadrants fold onto this one.
const SIN_QUARTER: [i16; 65] = [
    0, 402, 804, 1205, 1606, 2006, 2404, 2801, //
    3196, 3590, 3981, 4370, 4756, 5139, 5520, 5897, //
    6270, 6639, 7005, 7366, 7723, 8076, 8423, 8765, //
    9102, 9434, 9760, 10080, 10394, 10702, 11003, 11297, //
    11585, 11866, 12140, 12406, 12665, 12916, 13160, 13395, //
    13623, 13842, 14053, 14256, 14449, 14635, 14811, 14978, //
    15137, 15286, 15426, 15557, 15679, 15791, 15893, 15986, //
    16069, 16143, 16207, 16261, 16305, 16340, 16364, 16379, //
    16384,
];

/// 1.14 sine of a 16-bit angle (full circle = 0x10000).
fn bios_sin(angle: u16) -> i32 {
    let idx = (angle >> 8) as usize;
    let val = match idx {
        0..=64 => SIN_QUARTER[idx],
        65..=128 => SIN_QUARTER[128 - idx],
        129..=192 => -SIN_QUARTER[idx - 128],
        _ => -SIN_QUARTER[256 - idx],
    };
    val as i32
}

fn bios_cos(angle: u16) -> i32 {
    bios_sin(angle.wrapping_add(0x4000))
}

/// Dispatch one BIOS call by SWI number.
pub(crate) fn execute(cpu: &mut Cpu, bus: &mut Bus, swi: u32) {
    match swi {
        0x00 => soft_reset(cpu),
        0x01 => register_ram_reset(cpu, bus),
        0x02 => cpu.halted = true,
        0x03 => {
            // Stop (deep sleep): treated as Halt.
            cpu.halted = true;
        }
        0x04 => intr_wait(cpu, bus),
        0x05 => {
            // VBlankIntrWait = IntrWait(1, 1).
            cpu.regs[0] = 1;
            cpu.regs[1] = 1;
            intr_wait(cpu, bus);
        }
        0x06 => div(cpu),
        0x07 => {
            // DivArm: Div with swapped arguments.
            cpu.regs.swap(0, 1);
            div(cpu);
        }
        0x08 => sqrt(cpu),
        0x09 => arctan(cpu),
        0x0A => arctan2(cpu),
        0x0B => cpu_set(cpu, bus),
        0x0C => cpu_fast_set(cpu, bus),
        0x0D => cpu.regs[0] = 0xBAAE_187F, // GetBiosChecksum
        0x0E => bg_affine_set(cpu, bus),
        0x0F => obj_affine_set(cpu, bus),
        0x10 => bit_unpack(cpu, bus),
        // The WRAM decompression variants share the halfword-buffered
        // writers; byte-exact output either way.
        0x11 | 0x12 => lz77_uncomp(cpu, bus),
        0x13 => huff_uncomp(cpu, bus),
        0x14 | 0x15 => rl_uncomp(cpu, bus),
        0x16 => diff8_unfilter_wram(cpu, bus),
        0x17 => diff8_unfilter_vram(cpu, bus),
        0x18 => diff16_unfilter(cpu, bus),
        0x19 => sound_bias(cpu, bus),
        0x1A..=0x1E | 0x28 | 0x29 => {
            // SoundDriver* services: accepted as no-ops in HLE.
        }
        0x1F => midi_key2freq(cpu, bus),
        _ => {
            log::warn!("unimplemented SWI 0x{swi:02X} at PC=0x{:08X}", cpu.regs[REG_PC]);
        }
    }
}

/// SWI 0x00 SoftReset: back to the post-BIOS state at the ROM entry point.
fn soft_reset(cpu: &mut Cpu) {
    log::info!("SWI SoftReset");
    cpu.skip_bios();
}

/// SWI 0x01 RegisterRamReset: clear memory/IO regions by flag bits.
fn register_ram_reset(cpu: &mut Cpu, bus: &mut Bus) {
    let flags = cpu.regs[0];

    if flags & 0x01 != 0 {
        bus.ewram.fill(0);
    }
    if flags & 0x02 != 0 {
        // IWRAM except the top 512 bytes (stack area).
        bus.iwram[..0x7E00].fill(0);
    }
    if flags & 0x04 != 0 {
        bus.palette_ram.fill(0);
    }
    if flags & 0x08 != 0 {
        bus.vram.fill(0);
    }
    if flags & 0x10 != 0 {
        bus.oam.fill(0);
    }
    if flags & 0x20 != 0 {
        // Serial I/O registers.
        bus.io_regs[0x120..0x130].fill(0);
    }
    if flags & 0x40 != 0 {
        // Sound registers.
        bus.io_regs[0x60..0xB0].fill(0);
    }
    if flags & 0x80 != 0 {
        // Remaining I/O: display, DMA, timers, keypad, interrupts; DISPCNT
        // comes back in forced blank.
        bus.io_regs[0x00..0x60].fill(0);
        bus.io_regs[0x00] = 0x80;
        bus.ppu.dispcnt = 0x80;
        bus.io_regs[0xB0..0xE0].fill(0);
        bus.io_regs[0x100..0x110].fill(0);
        bus.io_regs[0x130..0x134].fill(0);
        bus.io_regs[0x200..0x20C].fill(0);
    }
}

/// SWI 0x04 IntrWait: optionally discard stale flags in the BIOS interrupt
/// check word, then halt until an interrupt arrives.
fn intr_wait(cpu: &mut Cpu, bus: &mut Bus) {
    let discard = cpu.regs[0];
    let mask = cpu.regs[1];

    if discard & 1 != 0 {
        let flags = bus.read32(0x0300_7FF8);
        bus.write32(0x0300_7FF8, flags & !mask);
    }

    cpu.halted = true;
}

/// SWI 0x06 Div: R0/R1 -> quotient, remainder, |quotient|. Division by
/// zero returns the sign of the numerator as the quotient and the numerator
/// as the remainder, matching documented hardware behavior.
fn div(cpu: &mut Cpu) {
    let num = cpu.regs[0] as i32;
    let den = cpu.regs[1] as i32;

    if den == 0 {
        log::warn!("SWI Div: division by zero (numerator {num})");
        cpu.regs[0] = if num < 0 { -1i32 as u32 } else { 1 };
        cpu.regs[1] = num as u32;
        cpu.regs[3] = 1;
        return;
    }

    let quot = num.wrapping_div(den);
    let rem = num.wrapping_rem(den);

    cpu.regs[0] = quot as u32;
    cpu.regs[1] = rem as u32;
    cpu.regs[3] = quot.unsigned_abs();
}

/// SWI 0x08 Sqrt: integer square root, bit-by-bit.
fn sqrt(cpu: &mut Cpu) {
    let mut val = cpu.regs[0];
    let mut result = 0u32;
    let mut bit = 1u32 << 30;

    while bit > val {
        bit >>= 2;
    }
    while bit != 0 {
        if val >= result + bit {
            val -= result + bit;
            result = (result >> 1) + bit;
        } else {
            result >>= 1;
        }
        bit >>= 2;
    }

    cpu.regs[0] = result;
}

/// SWI 0x09 ArcTan: the BIOS polynomial approximation over 1.14 fixed
/// point, range [-pi/4, pi/4].
fn arctan(cpu: &mut Cpu) {
    let r0 = cpu.regs[0] as u16 as i16 as i32;

    let a = -(r0.wrapping_mul(r0)) >> 14;
    let mut r = ((0xA9 * a) >> 14) + 0x390;
    r = ((r * a) >> 14) - 23173; // 0xFFFFA57B
    r = ((r * a) >> 14) + 0x3276;
    r = (r * r0) >> 14;

    cpu.regs[0] = r as i16 as u32;
}

/// SWI 0x0A ArcTan2: full-circle angle of (x, y), mapped to [0, 0xFFFF].
fn arctan2(cpu: &mut Cpu) {
    let x = cpu.regs[0] as u16 as i16;
    let y = cpu.regs[1] as u16 as i16;

    if x == 0 && y == 0 {
        cpu.regs[0] = 0;
        return;
    }

    let mut angle = (y as f64).atan2(x as f64);
    if angle < 0.0 {
        angle += 2.0 * std::f64::consts::PI;
    }

    let mut result = (angle * 65536.0 / (2.0 * std::f64::consts::PI)) as u32;
    if result >= 0x10000 {
        result = 0;
    }
    cpu.regs[0] = result & 0xFFFF;
}

/// SWI 0x0B CpuSet: memcpy/memset in 16- or 32-bit units.
/// Control word: bits 20:0 count, bit 24 fill, bit 26 word size.
fn cpu_set(cpu: &mut Cpu, bus: &mut Bus) {
    let mut src = cpu.regs[0];
    let mut dst = cpu.regs[1];
    let control = cpu.regs[2];

    let fill = control & (1 << 24) != 0;
    let count = control & 0x1F_FFFF;

    if control & (1 << 26) != 0 {
        src &= !3;
        dst &= !3;
        let fill_val = bus.read32(src);
        for _ in 0..count {
            let val = if fill { fill_val } else { bus.read32(src) };
            bus.write32(dst, val);
            if !fill {
                src = src.wrapping_add(4);
            }
            dst = dst.wrapping_add(4);
        }
    } else {
        src &= !1;
        dst &= !1;
        let fill_val = bus.read16(src);
        for _ in 0..count {
            let val = if fill { fill_val } else { bus.read16(src) };
            bus.write16(dst, val);
            if !fill {
                src = src.wrapping_add(2);
            }
            dst = dst.wrapping_add(2);
        }
    }
}

/// SWI 0x0C CpuFastSet: 32-bit only, count rounded up to 8 words.
fn cpu_fast_set(cpu: &mut Cpu, bus: &mut Bus) {
    let mut src = cpu.regs[0] & !3;
    let mut dst = cpu.regs[1] & !3;
    let control = cpu.regs[2];

    let fill = control & (1 << 24) != 0;
    let count = (control & 0x1F_FFFF).div_ceil(8) * 8;

    let fill_val = bus.read32(src);
    for _ in 0..count {
        let val = if fill { fill_val } else { bus.read32(src) };
        bus.write32(dst, val);
        if !fill {
            src = src.wrapping_add(4);
        }
        dst = dst.wrapping_add(4);
    }
}

/// SWI 0x0E BgAffineSet: 20-byte source records (center, display offset,
/// scales, angle) to 16-byte destination records (PA-PD, start point).
fn bg_affine_set(cpu: &mut Cpu, bus: &mut Bus) {
    let mut src = cpu.regs[0];
    let mut dst = cpu.regs[1];
    let count = cpu.regs[2];

    for _ in 0..count {
        let center_x = bus.read32(src) as i32;
        let center_y = bus.read32(src + 4) as i32;
        let disp_x = bus.read16(src + 8) as i16 as i32;
        let disp_y = bus.read16(src + 10) as i16 as i32;
        let scale_x = bus.read16(src + 12) as i16 as i32;
        let scale_y = bus.read16(src + 14) as i16 as i32;
        let angle = bus.read16(src + 16);
        src = src.wrapping_add(20);

        let sin = bios_sin(angle);
        let cos = bios_cos(angle);

        let pa = (scale_x * cos) >> 14;
        let pb = (scale_x * -sin) >> 14;
        let pc = (scale_y * sin) >> 14;
        let pd = (scale_y * cos) >> 14;

        let start_x = center_x - (pa * disp_x + pb * disp_y);
        let start_y = center_y - (pc * disp_x + pd * disp_y);

        bus.write16(dst, pa as u16);
        bus.write16(dst + 2, pb as u16);
        bus.write16(dst + 4, pc as u16);
        bus.write16(dst + 6, pd as u16);
        bus.write32(dst + 8, start_x as u32);
        bus.write32(dst + 12, start_y as u32);
        dst = dst.wrapping_add(16);
    }
}

/// SWI 0x0F ObjAffineSet: like BgAffineSet but parameters only, written
/// with a caller-chosen stride (2 for packed, 8 for OAM interleave).
fn obj_affine_set(cpu: &mut Cpu, bus: &mut Bus) {
    let mut src = cpu.regs[0];
    let mut dst = cpu.regs[1];
    let count = cpu.regs[2];
    let stride = cpu.regs[3];

    for _ in 0..count {
        let scale_x = bus.read16(src) as i16 as i32;
        let scale_y = bus.read16(src + 2) as i16 as i32;
        let angle = bus.read16(src + 4);
        src = src.wrapping_add(8);

        let sin = bios_sin(angle);
        let cos = bios_cos(angle);

        bus.write16(dst, ((scale_x * cos) >> 14) as u16);
        bus.write16(dst.wrapping_add(stride), ((scale_x * -sin) >> 14) as u16);
        bus.write16(dst.wrapping_add(stride * 2), ((scale_y * sin) >> 14) as u16);
        bus.write16(dst.wrapping_add(stride * 3), ((scale_y * cos) >> 14) as u16);

        dst = dst.wrapping_add(stride * 4);
    }
}

/// SWI 0x10 BitUnPack: widen packed 1/2/4/8-bit units to 1-32 bits with an
/// offset, streaming 32-bit words to the destination.
fn bit_unpack(cpu: &mut Cpu, bus: &mut Bus) {
    let src = cpu.regs[0];
    let mut dst = cpu.regs[1];
    let info = cpu.regs[2];

    let src_len = bus.read16(info) as u32;
    let src_width = bus.read8(info + 2) as u32;
    let dest_width = bus.read8(info + 3) as u32;
    let offset_raw = bus.read32(info + 4);

    let add_to_zero = offset_raw & (1 << 31) != 0;
    let offset = offset_raw & 0x7FFF_FFFF;

    if !matches!(src_width, 1 | 2 | 4 | 8) || dest_width == 0 {
        log::warn!("SWI BitUnPack: bad widths src={src_width} dest={dest_width}");
        return;
    }

    let src_mask = (1u32 << src_width) - 1;
    let mut out_word = 0u32;
    let mut out_bits = 0u32;

    for byte_idx in 0..src_len {
        let src_byte = bus.read8(src.wrapping_add(byte_idx)) as u32;

        let mut bit_pos = 0;
        while bit_pos < 8 {
            let mut val = (src_byte >> bit_pos) & src_mask;
            if val != 0 || add_to_zero {
                val = val.wrapping_add(offset);
            }
            if dest_width < 32 {
                val &= (1 << dest_width) - 1;
            }

            out_word |= val << out_bits;
            out_bits += dest_width;

            if out_bits >= 32 {
                bus.write32(dst, out_word);
                dst = dst.wrapping_add(4);
                out_word = 0;
                out_bits = 0;
            }
            bit_pos += src_width;
        }
    }

    if out_bits > 0 {
        bus.write32(dst, out_word);
    }
}

/// Halfword-buffered byte sink: collects pairs so VRAM (which drops plain
/// byte writes) still receives every decompressed byte.
struct HalfwordSink {
    dst: u32,
    written: u32,
    pending: u16,
    have_low: bool,
}

impl HalfwordSink {
    fn new(dst: u32) -> Self {
        Self {
            dst,
            written: 0,
            pending: 0,
            have_low: false,
        }
    }

    fn push(&mut self, bus: &mut Bus, val: u8) {
        if self.have_low {
            self.pending |= (val as u16) << 8;
            bus.write16(self.dst.wrapping_add(self.written - 1), self.pending);
            self.have_low = false;
        } else {
            self.pending = val as u16;
            self.have_low = true;
        }
        self.written += 1;
    }

    /// Read back a byte of already-produced output (LZ77 back-references).
    fn read_back(&self, bus: &mut Bus, distance: u32) -> u8 {
        let addr = self.dst.wrapping_add(self.written).wrapping_sub(distance);
        if self.have_low && distance == 1 {
            // Still sitting in the buffer, not yet in memory.
            self.pending as u8
        } else {
            bus.read8(addr)
        }
    }

    fn flush(&mut self, bus: &mut Bus) {
        if self.have_low {
            bus.write16(self.dst.wrapping_add(self.written - 1), self.pending);
        }
    }
}

/// SWI 0x11/0x12 LZ77UnComp: header gives the decompressed size; flag bytes
/// select literal bytes or (length, distance) back-references, MSB first.
fn lz77_uncomp(cpu: &mut Cpu, bus: &mut Bus) {
    let mut src = cpu.regs[0];
    let dst = cpu.regs[1];

    let header = bus.read32(src);
    let decomp_size = header >> 8;
    src = src.wrapping_add(4);

    let mut out = HalfwordSink::new(dst);

    while out.written < decomp_size {
        let flags = bus.read8(src);
        src = src.wrapping_add(1);

        for block in (0..8).rev() {
            if out.written >= decomp_size {
                break;
            }

            if flags >> block & 1 != 0 {
                let byte1 = bus.read8(src) as u32;
                let byte2 = bus.read8(src.wrapping_add(1)) as u32;
                src = src.wrapping_add(2);

                let length = (byte1 >> 4) + 3;
                let distance = ((byte1 & 0x0F) << 8 | byte2) + 1;

                for _ in 0..length {
                    if out.written >= decomp_size {
                        break;
                    }
                    let val = out.read_back(bus, distance);
                    out.push(bus, val);
                }
            } else {
                let val = bus.read8(src);
                src = src.wrapping_add(1);
                out.push(bus, val);
            }
        }
    }

    out.flush(bus);
}

/// SWI 0x13 HuffUnComp: tree-encoded 4- or 8-bit symbols, bitstream read
/// LSB-first from 32-bit words.
fn huff_uncomp(cpu: &mut Cpu, bus: &mut Bus) {
    let src = cpu.regs[0];
    let dst = cpu.regs[1];

    let header = bus.read32(src);
    let mut bit_width = header & 0x0F;
    if bit_width == 0 {
        bit_width = 8;
    }
    let decomp_size = header >> 8;

    let tree_size_byte = bus.read8(src + 4) as u32;
    let tree_offset = src + 5;
    let data_offset = src + 4 + (tree_size_byte + 1) * 2;

    let mut bytes_written = 0u32;
    let mut out_word = 0u32;
    let mut out_bits = 0u32;

    let mut bit_pos = 0u32;
    let mut current_data = bus.read32(data_offset);
    let mut data_addr = data_offset + 4;

    while bytes_written < decomp_size {
        let mut node_addr = tree_offset;
        let mut node = bus.read8(node_addr);

        loop {
            let bit = current_data >> bit_pos & 1;
            bit_pos += 1;
            if bit_pos >= 32 {
                current_data = bus.read32(data_addr);
                data_addr = data_addr.wrapping_add(4);
                bit_pos = 0;
            }

            // Node byte: bits 5:0 child offset (in node pairs, relative to
            // the pair after this node), bit 7 / bit 6 mark the left/right
            // child as a leaf.
            let child_base = (node_addr & !1) + ((node as u32 & 0x3F) + 1) * 2;
            let is_leaf;
            if bit == 0 {
                node_addr = child_base;
                is_leaf = node & 0x80 != 0;
            } else {
                node_addr = child_base + 1;
                is_leaf = node & 0x40 != 0;
            }

            if is_leaf {
                let symbol = bus.read8(node_addr) as u32;
                out_word |= symbol << out_bits;
                out_bits += bit_width;

                if out_bits >= 32 {
                    bus.write32(dst.wrapping_add(bytes_written), out_word);
                    bytes_written += 4;
                    out_word = 0;
                    out_bits = 0;
                }
                break;
            }
            node = bus.read8(node_addr);
        }
    }
}

/// SWI 0x14/0x15 RLUnComp: flag byte selects a literal run or a repeated
/// byte run.
fn rl_uncomp(cpu: &mut Cpu, bus: &mut Bus) {
    let mut src = cpu.regs[0];
    let dst = cpu.regs[1];

    let header = bus.read32(src);
    let decomp_size = header >> 8;
    src = src.wrapping_add(4);

    let mut out = HalfwordSink::new(dst);

    while out.written < decomp_size {
        let flag = bus.read8(src);
        src = src.wrapping_add(1);

        if flag & 0x80 != 0 {
            let run_len = (flag as u32 & 0x7F) + 3;
            let val = bus.read8(src);
            src = src.wrapping_add(1);
            for _ in 0..run_len {
                if out.written >= decomp_size {
                    break;
                }
                out.push(bus, val);
            }
        } else {
            let run_len = (flag as u32 & 0x7F) + 1;
            for _ in 0..run_len {
                if out.written >= decomp_size {
                    break;
                }
                let val = bus.read8(src);
                src = src.wrapping_add(1);
                out.push(bus, val);
            }
        }
    }

    out.flush(bus);
}

/// SWI 0x16 Diff8bitUnFilterWram: running-sum undo of an 8-bit delta
/// filter, byte writes.
fn diff8_unfilter_wram(cpu: &mut Cpu, bus: &mut Bus) {
    let mut src = cpu.regs[0];
    let mut dst = cpu.regs[1];

    let header = bus.read32(src);
    let decomp_size = header >> 8;
    src = src.wrapping_add(4);

    if decomp_size == 0 {
        return;
    }

    let mut prev = bus.read8(src);
    src = src.wrapping_add(1);
    bus.write8(dst, prev);
    dst = dst.wrapping_add(1);

    for _ in 1..decomp_size {
        prev = prev.wrapping_add(bus.read8(src));
        src = src.wrapping_add(1);
        bus.write8(dst, prev);
        dst = dst.wrapping_add(1);
    }
}

/// SWI 0x17 Diff8bitUnFilterVram: same filter, halfword-buffered writes.
fn diff8_unfilter_vram(cpu: &mut Cpu, bus: &mut Bus) {
    let mut src = cpu.regs[0];
    let dst = cpu.regs[1];

    let header = bus.read32(src);
    let decomp_size = header >> 8;
    src = src.wrapping_add(4);

    if decomp_size == 0 {
        return;
    }

    let mut out = HalfwordSink::new(dst);
    let mut prev = bus.read8(src);
    src = src.wrapping_add(1);
    out.push(bus, prev);

    for _ in 1..decomp_size {
        prev = prev.wrapping_add(bus.read8(src));
        src = src.wrapping_add(1);
        out.push(bus, prev);
    }

    out.flush(bus);
}

/// SWI 0x18 Diff16bitUnFilter: 16-bit delta undo.
fn diff16_unfilter(cpu: &mut Cpu, bus: &mut Bus) {
    let mut src = cpu.regs[0];
    let mut dst = cpu.regs[1];

    let header = bus.read32(src);
    let decomp_size = header >> 8;
    src = src.wrapping_add(4);

    if decomp_size < 2 {
        return;
    }

    let mut prev = bus.read16(src);
    src = src.wrapping_add(2);
    bus.write16(dst, prev);
    dst = dst.wrapping_add(2);

    for _ in 1..decomp_size / 2 {
        prev = prev.wrapping_add(bus.read16(src));
        src = src.wrapping_add(2);
        bus.write16(dst, prev);
        dst = dst.wrapping_add(2);
    }
}

/// SWI 0x19 SoundBias: R0 selects the target level; applied instantly (the
/// hardware ramp is inaudible), preserving the resolution bits.
fn sound_bias(cpu: &mut Cpu, bus: &mut Bus) {
    let target: u16 = if cpu.regs[0] != 0 { 0x200 } else { 0x000 };
    bus.apu.soundbias = (bus.apu.soundbias & 0xC000) | target;
    bus.io_regs[0x88] = bus.apu.soundbias as u8;
    bus.io_regs[0x89] = (bus.apu.soundbias >> 8) as u8;
}

/// SWI 0x1F MidiKey2Freq: freq / 2^((180 - key - fine/256) / 12) using the
/// WaveData frequency at offset 4.
fn midi_key2freq(cpu: &mut Cpu, bus: &mut Bus) {
    let wave_freq = bus.read32(cpu.regs[0] + 4);
    let key = cpu.regs[1];
    let fine = cpu.regs[2];

    let exponent = (180.0 - key as f32 - fine as f32 / 256.0) / 12.0;
    let result = wave_freq as f32 / exponent.exp2();

    cpu.regs[0] = result.clamp(0.0, u32::MAX as f32) as u32;
}
