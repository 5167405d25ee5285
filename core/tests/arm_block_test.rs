mod common;

use agate_core::cpu::REG_PC;
use common::{load_arm, setup, step_instructions};

const CODE: u32 = 0x0200_0000;
const DATA: u32 = 0x0300_1000;

#[test]
fn test_stmia_ldmia_round_trip() {
    let mut gba = setup();
    // STMIA R0!, {R1, R2} ; LDMIA R3, {R4, R5}
    load_arm(&mut gba, CODE, &[0xE8A00006, 0xE8930030]);
    gba.cpu.regs[0] = DATA;
    gba.cpu.regs[1] = 0x1111;
    gba.cpu.regs[2] = 0x2222;
    gba.cpu.regs[3] = DATA;
    step_instructions(&mut gba, 2);

    // Ascending registers land at ascending addresses.
    assert_eq!(gba.bus.read32(DATA), 0x1111);
    assert_eq!(gba.bus.read32(DATA + 4), 0x2222);
    assert_eq!(gba.cpu.regs[0], DATA + 8); // writeback
    assert_eq!(gba.cpu.regs[4], 0x1111);
    assert_eq!(gba.cpu.regs[5], 0x2222);
}

#[test]
fn test_stmdb_ldmdb() {
    let mut gba = setup();
    // STMDB R0!, {R1, R2}: full-descending push.
    load_arm(&mut gba, CODE, &[0xE9200006]);
    gba.cpu.regs[0] = DATA;
    gba.cpu.regs[1] = 0xAA;
    gba.cpu.regs[2] = 0xBB;
    step_instructions(&mut gba, 1);

    assert_eq!(gba.cpu.regs[0], DATA - 8);
    assert_eq!(gba.bus.read32(DATA - 8), 0xAA);
    assert_eq!(gba.bus.read32(DATA - 4), 0xBB);
}

#[test]
fn test_stm_base_first_in_list_stores_original() {
    let mut gba = setup();
    // STMIA R0!, {R0, R1}: R0 is the first register stored, so memory
    // receives the original base.
    load_arm(&mut gba, CODE, &[0xE8A00003]);
    gba.cpu.regs[0] = DATA;
    gba.cpu.regs[1] = 7;
    step_instructions(&mut gba, 1);

    assert_eq!(gba.bus.read32(DATA), DATA);
    assert_eq!(gba.cpu.regs[0], DATA + 8);
}

#[test]
fn test_stm_base_not_first_stores_written_back() {
    let mut gba = setup();
    // STMIA R1!, {R0, R1}: R1 is not the first register stored, so memory
    // receives the updated base.
    load_arm(&mut gba, CODE, &[0xE8A10003]);
    gba.cpu.regs[0] = 7;
    gba.cpu.regs[1] = DATA;
    step_instructions(&mut gba, 1);

    assert_eq!(gba.bus.read32(DATA), 7);
    assert_eq!(gba.bus.read32(DATA + 4), DATA + 8);
}

#[test]
fn test_ldm_base_in_list_suppresses_writeback() {
    let mut gba = setup();
    gba.bus.write32(DATA, 0x1234);
    gba.bus.write32(DATA + 4, 0x5678);

    // LDMIA R0!, {R0, R1}: the loaded R0 wins over the writeback.
    load_arm(&mut gba, CODE, &[0xE8B00003]);
    gba.cpu.regs[0] = DATA;
    step_instructions(&mut gba, 1);

    assert_eq!(gba.cpu.regs[0], 0x1234);
    assert_eq!(gba.cpu.regs[1], 0x5678);
}

#[test]
fn test_ldm_with_pc_branches() {
    let mut gba = setup();
    gba.bus.write32(DATA, 0x0200_0200);

    // LDMIA R0, {R15}
    load_arm(&mut gba, CODE, &[0xE890_8000]);
    gba.bus.write32(0x0200_0200, 0xE3A00042); // MOV R0, #0x42
    gba.cpu.regs[0] = DATA;

    step_instructions(&mut gba, 1);
    assert_eq!(gba.cpu.regs[REG_PC], 0x0200_0200);

    gba.cpu.step(&mut gba.bus); // refill
    gba.cpu.step(&mut gba.bus);
    assert_eq!(gba.cpu.regs[0], 0x42);
}

#[test]
fn test_empty_rlist_transfers_r15_and_steps_base_by_0x40() {
    let mut gba = setup();
    // STMIA R0!, {} — the ARM7TDMI quirk: R15 goes out, base moves 0x40.
    load_arm(&mut gba, CODE, &[0xE8A00000]);
    gba.cpu.regs[0] = DATA;
    step_instructions(&mut gba, 1);

    assert_eq!(gba.bus.read32(DATA), CODE + 12); // PC + 4 at store time
    assert_eq!(gba.cpu.regs[0], DATA + 0x40);
}
