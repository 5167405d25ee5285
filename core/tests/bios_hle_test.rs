mod common;

use common::{load_arm, setup, step_instructions};

const CODE: u32 = 0x0200_0000;
const SCRATCH: u32 = 0x0200_4000;

/// Run a single SWI instruction with pre-seeded registers.
fn run_swi(gba: &mut agate_core::prelude::Gba, swi: u32, regs: &[(usize, u32)]) {
    load_arm(gba, CODE, &[0xEF00_0000 | (swi << 16)]);
    for &(i, v) in regs {
        gba.cpu.regs[i] = v;
    }
    step_instructions(gba, 1);
}

#[test]
fn test_div() {
    let mut gba = setup();
    run_swi(&mut gba, 0x06, &[(0, 100), (1, 9)]);
    assert_eq!(gba.cpu.regs[0], 11);
    assert_eq!(gba.cpu.regs[1], 1);
    assert_eq!(gba.cpu.regs[3], 11);

    let mut gba = setup();
    run_swi(&mut gba, 0x06, &[(0, (-7i32) as u32), (1, 2)]);
    assert_eq!(gba.cpu.regs[0] as i32, -3);
    assert_eq!(gba.cpu.regs[1] as i32, -1);
    assert_eq!(gba.cpu.regs[3], 3);
}

#[test]
fn test_div_by_zero_returns_sign_and_numerator() {
    let mut gba = setup();
    run_swi(&mut gba, 0x06, &[(0, 42), (1, 0)]);
    assert_eq!(gba.cpu.regs[0], 1);
    assert_eq!(gba.cpu.regs[1], 42);

    let mut gba = setup();
    run_swi(&mut gba, 0x06, &[(0, (-42i32) as u32), (1, 0)]);
    assert_eq!(gba.cpu.regs[0] as i32, -1);
    assert_eq!(gba.cpu.regs[1] as i32, -42);
}

#[test]
fn test_div_arm_swaps_operands() {
    let mut gba = setup();
    run_swi(&mut gba, 0x07, &[(0, 9), (1, 100)]);
    assert_eq!(gba.cpu.regs[0], 11);
}

#[test]
fn test_sqrt() {
    for (input, expected) in [(144u32, 12u32), (2, 1), (0, 0), (1 << 30, 1 << 15)] {
        let mut gba = setup();
        run_swi(&mut gba, 0x08, &[(0, input)]);
        assert_eq!(gba.cpu.regs[0], expected, "sqrt({input})");
    }
}

#[test]
fn test_arctan2_quadrants() {
    // (x, y) -> angle in [0, 0x10000).
    let cases = [
        ((0x1000u32, 0u32), 0x0000u32),
        ((0, 0x1000), 0x4000),
        ((0x1000, 0x1000), 0x2000),
    ];
    for ((x, y), expected) in cases {
        let mut gba = setup();
        run_swi(&mut gba, 0x0A, &[(0, x), (1, y)]);
        let angle = gba.cpu.regs[0];
        assert!(
            angle.abs_diff(expected) <= 1,
            "atan2({x},{y}) = {angle:#X}, expected about {expected:#X}"
        );
    }
}

#[test]
fn test_halt_and_intr_wait() {
    let mut gba = setup();
    run_swi(&mut gba, 0x02, &[]);
    assert!(gba.cpu.halted);

    let mut gba = setup();
    run_swi(&mut gba, 0x05, &[]); // VBlankIntrWait
    assert!(gba.cpu.halted);
}

#[test]
fn test_get_bios_checksum() {
    let mut gba = setup();
    run_swi(&mut gba, 0x0D, &[]);
    assert_eq!(gba.cpu.regs[0], 0xBAAE_187F);
}

#[test]
fn test_cpu_set_copy_and_fill() {
    let mut gba = setup();
    for i in 0..4u32 {
        gba.bus.write32(SCRATCH + i * 4, 0x1000 + i);
    }
    // 32-bit copy of 4 words.
    run_swi(
        &mut gba,
        0x0B,
        &[(0, SCRATCH), (1, SCRATCH + 0x100), (2, 4 | (1 << 26))],
    );
    for i in 0..4u32 {
        assert_eq!(gba.bus.read32(SCRATCH + 0x100 + i * 4), 0x1000 + i);
    }

    // 16-bit fill of 8 halfwords from the first source halfword.
    let mut gba = setup();
    gba.bus.write16(SCRATCH, 0xBEEF);
    run_swi(
        &mut gba,
        0x0B,
        &[(0, SCRATCH), (1, SCRATCH + 0x100), (2, 8 | (1 << 24))],
    );
    for i in 0..8u32 {
        assert_eq!(gba.bus.read16(SCRATCH + 0x100 + i * 2), 0xBEEF);
    }
}

#[test]
fn test_cpu_fast_set_rounds_count_up() {
    let mut gba = setup();
    gba.bus.write32(SCRATCH, 0xAAAA_5555);
    // Fill with count 3: rounded up to 8 words.
    run_swi(
        &mut gba,
        0x0C,
        &[(0, SCRATCH), (1, SCRATCH + 0x100), (2, 3 | (1 << 24))],
    );
    for i in 0..8u32 {
        assert_eq!(gba.bus.read32(SCRATCH + 0x100 + i * 4), 0xAAAA_5555);
    }
}

#[test]
fn test_lz77_literals_round_trip() {
    let mut gba = setup();
    // Header: type 1, decompressed size 8; then a zero flag byte and 8
    // literal bytes.
    let original: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];
    let mut stream = vec![0x10u8, 8, 0, 0, 0x00];
    stream.extend_from_slice(&original);
    for (i, &b) in stream.iter().enumerate() {
        gba.bus.write8(SCRATCH + i as u32, b);
    }

    run_swi(&mut gba, 0x11, &[(0, SCRATCH), (1, SCRATCH + 0x100)]);
    for (i, &b) in original.iter().enumerate() {
        assert_eq!(gba.bus.read8(SCRATCH + 0x100 + i as u32), b);
    }
}

#[test]
fn test_lz77_back_reference() {
    let mut gba = setup();
    // 'A' literal, then a (length 7, distance 1) reference: "AAAAAAAA".
    let stream = [0x10u8, 8, 0, 0, 0x40, b'A', 0x40, 0x00];
    for (i, &b) in stream.iter().enumerate() {
        gba.bus.write8(SCRATCH + i as u32, b);
    }

    run_swi(&mut gba, 0x12, &[(0, SCRATCH), (1, SCRATCH + 0x100)]);
    for i in 0..8u32 {
        assert_eq!(gba.bus.read8(SCRATCH + 0x100 + i), b'A');
    }
}

#[test]
fn test_rl_uncomp() {
    let mut gba = setup();
    // Literal run [9, 8], then a compressed run of six 7s.
    let stream = [0x30u8, 8, 0, 0, 0x01, 9, 8, 0x83, 7];
    for (i, &b) in stream.iter().enumerate() {
        gba.bus.write8(SCRATCH + i as u32, b);
    }

    run_swi(&mut gba, 0x14, &[(0, SCRATCH), (1, SCRATCH + 0x100)]);
    let expected = [9u8, 8, 7, 7, 7, 7, 7, 7];
    for (i, &b) in expected.iter().enumerate() {
        assert_eq!(gba.bus.read8(SCRATCH + 0x100 + i as u32), b);
    }
}

#[test]
fn test_diff8_unfilter() {
    let mut gba = setup();
    // Deltas 10, +1, +1, +253 (wraps): 10, 11, 12, 9.
    let stream = [0x80u8, 4, 0, 0, 10, 1, 1, 253];
    for (i, &b) in stream.iter().enumerate() {
        gba.bus.write8(SCRATCH + i as u32, b);
    }

    run_swi(&mut gba, 0x16, &[(0, SCRATCH), (1, SCRATCH + 0x100)]);
    for (i, &b) in [10u8, 11, 12, 9].iter().enumerate() {
        assert_eq!(gba.bus.read8(SCRATCH + 0x100 + i as u32), b);
    }
}

#[test]
fn test_diff16_unfilter() {
    let mut gba = setup();
    gba.bus.write32(SCRATCH, (6 << 8) | 0x81); // size 6
    gba.bus.write16(SCRATCH + 4, 1000);
    gba.bus.write16(SCRATCH + 6, 100);
    gba.bus.write16(SCRATCH + 8, 0xFF9C); // -100

    run_swi(&mut gba, 0x18, &[(0, SCRATCH), (1, SCRATCH + 0x100)]);
    assert_eq!(gba.bus.read16(SCRATCH + 0x100), 1000);
    assert_eq!(gba.bus.read16(SCRATCH + 0x102), 1100);
    assert_eq!(gba.bus.read16(SCRATCH + 0x104), 1000);
}

#[test]
fn test_bg_affine_set_strides() {
    let mut gba = setup();
    // Two identity entries: scale 1.0, angle 0, center and display at 0.
    for entry in 0..2u32 {
        let src = SCRATCH + entry * 20;
        gba.bus.write32(src, 0); // center x (19.8)
        gba.bus.write32(src + 4, 0); // center y
        gba.bus.write16(src + 8, 0); // disp x
        gba.bus.write16(src + 10, 0); // disp y
        gba.bus.write16(src + 12, 0x0100); // scale x
        gba.bus.write16(src + 14, 0x0100); // scale y
        gba.bus.write16(src + 16, 0); // angle
    }

    run_swi(&mut gba, 0x0E, &[(0, SCRATCH), (1, SCRATCH + 0x100), (2, 2)]);

    // 20-byte source records, 16-byte destination records.
    for entry in 0..2u32 {
        let dst = SCRATCH + 0x100 + entry * 16;
        assert_eq!(gba.bus.read16(dst), 0x0100); // PA
        assert_eq!(gba.bus.read16(dst + 2), 0); // PB
        assert_eq!(gba.bus.read16(dst + 4), 0); // PC
        assert_eq!(gba.bus.read16(dst + 6), 0x0100); // PD
        assert_eq!(gba.bus.read32(dst + 8), 0); // start x
        assert_eq!(gba.bus.read32(dst + 12), 0); // start y
    }
}

#[test]
fn test_obj_affine_set_with_oam_stride() {
    let mut gba = setup();
    // Scale 2.0, angle 0 — PA/PD = 0x200 at a stride of 8.
    gba.bus.write16(SCRATCH, 0x0200);
    gba.bus.write16(SCRATCH + 2, 0x0200);
    gba.bus.write16(SCRATCH + 4, 0);

    run_swi(
        &mut gba,
        0x0F,
        &[(0, SCRATCH), (1, SCRATCH + 0x100), (2, 1), (3, 8)],
    );

    assert_eq!(gba.bus.read16(SCRATCH + 0x100), 0x0200); // PA
    assert_eq!(gba.bus.read16(SCRATCH + 0x108), 0); // PB
    assert_eq!(gba.bus.read16(SCRATCH + 0x110), 0); // PC
    assert_eq!(gba.bus.read16(SCRATCH + 0x118), 0x0200); // PD
}

#[test]
fn test_bit_unpack_1bpp_to_4bpp() {
    let mut gba = setup();
    // Source: one byte 0b10110001, 1-bit units to 4-bit units.
    gba.bus.write8(SCRATCH, 0xB1);
    // Info block: length 1, src width 1, dest width 4, offset 0.
    gba.bus.write16(SCRATCH + 8, 1);
    gba.bus.write8(SCRATCH + 10, 1);
    gba.bus.write8(SCRATCH + 11, 4);
    gba.bus.write32(SCRATCH + 12, 0);

    run_swi(
        &mut gba,
        0x10,
        &[(0, SCRATCH), (1, SCRATCH + 0x100), (2, SCRATCH + 8)],
    );

    // LSB-first: bits 1,0,0,0,1,1,0,1 widen to one word of nibbles.
    assert_eq!(gba.bus.read32(SCRATCH + 0x100), 0x1011_0001);
}

#[test]
fn test_soft_reset_lands_at_rom_entry() {
    let mut gba = setup();
    run_swi(&mut gba, 0x00, &[]);
    assert_eq!(gba.cpu.regs[15], 0x0800_0000);
}
