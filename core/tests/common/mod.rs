#![allow(dead_code)]

use agate_core::cpu::{FLAG_T, REG_PC};
use agate_core::prelude::*;

/// System in the post-BIOS state with no cartridge: test programs are
/// poked straight into work RAM.
pub fn setup() -> Gba {
    let mut gba = Gba::new();
    gba.skip_bios();
    gba
}

/// Write an ARM program at `addr` and aim the CPU at it.
pub fn load_arm(gba: &mut Gba, addr: u32, words: &[u32]) {
    for (i, &word) in words.iter().enumerate() {
        gba.bus.write32(addr + i as u32 * 4, word);
    }
    gba.cpu.regs[REG_PC] = addr;
    gba.cpu.cpsr &= !FLAG_T;
    gba.cpu.flush_pipeline();
}

/// Write a Thumb program at `addr` and aim the CPU at it in Thumb state.
pub fn load_thumb(gba: &mut Gba, addr: u32, halfwords: &[u16]) {
    for (i, &half) in halfwords.iter().enumerate() {
        gba.bus.write16(addr + i as u32 * 2, half);
    }
    gba.cpu.regs[REG_PC] = addr;
    gba.cpu.cpsr |= FLAG_T;
    gba.cpu.flush_pipeline();
}

/// Execute `n` instructions. The pipeline refill after `load_*` is stepped
/// through first so callers count real instructions.
pub fn step_instructions(gba: &mut Gba, n: usize) {
    gba.cpu.step(&mut gba.bus);
    for _ in 0..n {
        gba.cpu.step(&mut gba.bus);
    }
}

/// A minimal ROM image with a valid header, entry code at 0xC0, and an
/// optional save-type magic string.
pub fn test_rom(code: &[u32], magic: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x400];
    rom[0xA0..0xAC].copy_from_slice(b"AGATE TEST\0\0");
    rom[0xAC..0xB0].copy_from_slice(b"ATST");
    rom[0x100..0x100 + magic.len()].copy_from_slice(magic);
    // Entry point: branch over the header to 0xC0.
    rom[0..4].copy_from_slice(&0xEA00002Eu32.to_le_bytes());
    for (i, &word) in code.iter().enumerate() {
        let at = 0xC0 + i * 4;
        rom[at..at + 4].copy_from_slice(&word.to_le_bytes());
    }
    rom
}
