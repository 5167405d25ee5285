mod common;

use agate_core::cpu::{FLAG_I, FLAG_T, Mode, REG_LR, REG_PC, REG_SP};
use agate_core::irq::IRQ_TIMER0;
use common::{load_arm, setup, step_instructions};

const CODE: u32 = 0x0200_0000;

#[test]
fn test_pc_reads_two_fetches_ahead() {
    let mut gba = setup();
    // MOV R0, PC: the visible PC is the executing address + 8.
    load_arm(&mut gba, CODE, &[0xE1A0000F]);
    step_instructions(&mut gba, 1);
    assert_eq!(gba.cpu.regs[0], CODE + 8);
}

#[test]
fn test_branch_refills_from_target() {
    let mut gba = setup();
    // B +8 (skips one) ; MOV R0, #1 ; MOV R0, #2
    load_arm(&mut gba, CODE, &[0xEA000000, 0xE3A00001, 0xE3A00002]);
    step_instructions(&mut gba, 1);

    // After the branch the PC sits at the target; the next step is the
    // 2-cycle refill, then execution continues there.
    assert_eq!(gba.cpu.regs[REG_PC], CODE + 8);
    let refill = gba.cpu.step(&mut gba.bus);
    assert_eq!(refill, 2);
    assert_eq!(gba.cpu.regs[REG_PC], CODE + 16);

    gba.cpu.step(&mut gba.bus);
    assert_eq!(gba.cpu.regs[0], 2);
}

#[test]
fn test_bl_links_return_address() {
    let mut gba = setup();
    // BL +8
    load_arm(&mut gba, CODE, &[0xEB000000]);
    step_instructions(&mut gba, 1);

    assert_eq!(gba.cpu.regs[REG_PC], CODE + 8);
    assert_eq!(gba.cpu.regs[REG_LR], CODE + 4);
}

#[test]
fn test_run_cycles_match_step_sum() {
    // The reported cycle total of run() equals the sum of individual step
    // returns over the same instruction stream.
    let program = [0xE3A00001u32, 0xE2800001, 0xE2800001, 0xEAFFFFFB]; // loop
    let mut a = setup();
    load_arm(&mut a, CODE, &program);
    let mut b = setup();
    load_arm(&mut b, CODE, &program);

    let total = a.cpu.run(&mut a.bus, 100);

    let mut stepped = 0;
    while stepped < 100 {
        stepped += b.cpu.step(&mut b.bus);
    }
    assert_eq!(total, stepped);
    assert_eq!(a.cpu.regs[0], b.cpu.regs[0]);
}

#[test]
fn test_mode_switch_banks_sp_lr() {
    let mut gba = setup();
    gba.cpu.switch_mode(Mode::Supervisor);
    gba.cpu.regs[REG_SP] = 0x100;
    gba.cpu.regs[REG_LR] = 0x200;

    gba.cpu.switch_mode(Mode::Irq);
    gba.cpu.regs[REG_SP] = 0x300;
    gba.cpu.regs[REG_LR] = 0x400;

    // Returning to SVC restores its bank; IRQ's values survive in theirs.
    gba.cpu.switch_mode(Mode::Supervisor);
    assert_eq!(gba.cpu.regs[REG_SP], 0x100);
    assert_eq!(gba.cpu.regs[REG_LR], 0x200);

    gba.cpu.switch_mode(Mode::Irq);
    assert_eq!(gba.cpu.regs[REG_SP], 0x300);
    assert_eq!(gba.cpu.regs[REG_LR], 0x400);
}

#[test]
fn test_fiq_banks_r8_to_r12() {
    let mut gba = setup();
    gba.cpu.switch_mode(Mode::System);
    for i in 8..13 {
        gba.cpu.regs[i] = i as u32;
    }

    gba.cpu.switch_mode(Mode::Fiq);
    for i in 8..13 {
        gba.cpu.regs[i] = 0xF00 + i as u32;
    }

    gba.cpu.switch_mode(Mode::System);
    for i in 8..13 {
        assert_eq!(gba.cpu.regs[i], i as u32);
    }

    gba.cpu.switch_mode(Mode::Fiq);
    for i in 8..13 {
        assert_eq!(gba.cpu.regs[i], 0xF00 + i as u32);
    }
}

#[test]
fn test_irq_entry_state() {
    let mut gba = setup();
    // Two NOPs, then an idle loop.
    load_arm(&mut gba, CODE, &[0xE1A00000, 0xE1A00000, 0xEAFFFFFE]);

    // Arm an interrupt source.
    gba.bus.write16(0x0400_0200, IRQ_TIMER0); // IE
    gba.bus.write32(0x0400_0208, 1); // IME

    // Execute one instruction, then make the IRQ pending.
    step_instructions(&mut gba, 1);
    gba.bus.irq.request(IRQ_TIMER0);

    let old_cpsr = gba.cpu.cpsr;
    let resume = CODE + 4; // the next instruction that did not run

    gba.cpu.run(&mut gba.bus, 1); // samples the IRQ before stepping

    assert_eq!(gba.cpu.mode(), Mode::Irq);
    assert!(gba.cpu.cpsr & FLAG_I != 0);
    assert!(gba.cpu.cpsr & FLAG_T == 0);
    assert_eq!(gba.cpu.spsr(), old_cpsr);
    // SUBS PC, LR, #4 must land on the interrupted instruction.
    assert_eq!(gba.cpu.regs[REG_LR], resume + 4);
}

#[test]
fn test_irq_masked_by_cpsr_i() {
    let mut gba = setup();
    load_arm(&mut gba, CODE, &[0xE1A00000, 0xEAFFFFFE]);
    gba.cpu.cpsr |= FLAG_I;

    gba.bus.write16(0x0400_0200, IRQ_TIMER0);
    gba.bus.write32(0x0400_0208, 1);
    gba.bus.irq.request(IRQ_TIMER0);

    gba.cpu.run(&mut gba.bus, 16);
    assert_ne!(gba.cpu.mode(), Mode::Irq);
}

#[test]
fn test_halt_consumes_remaining_cycles() {
    let mut gba = setup();
    load_arm(&mut gba, CODE, &[0xE1A00000, 0xEAFFFFFE]);

    // HALTCNT write suspends the CPU from the next boundary on.
    gba.bus.write8(0x0400_0301, 0);
    let consumed = gba.cpu.run(&mut gba.bus, 1000);
    assert_eq!(consumed, 1000);
    assert!(gba.cpu.halted);
}

#[test]
fn test_halt_wakes_on_irq() {
    let mut gba = setup();
    load_arm(&mut gba, CODE, &[0xE1A00000, 0xEAFFFFFE]);
    gba.bus.write16(0x0400_0200, IRQ_TIMER0);
    gba.bus.write32(0x0400_0208, 1);

    gba.cpu.halted = true;
    gba.cpu.run(&mut gba.bus, 100);
    assert!(gba.cpu.halted); // nothing pending

    gba.bus.irq.request(IRQ_TIMER0);
    gba.cpu.run(&mut gba.bus, 100);
    assert!(!gba.cpu.halted);
    assert_eq!(gba.cpu.mode(), Mode::Irq);
}

#[test]
fn test_undefined_instruction_is_a_noop() {
    let mut gba = setup();
    // An undefined-pattern word, then a normal MOV.
    load_arm(&mut gba, CODE, &[0xE7F000F0, 0xE3A00005]);
    step_instructions(&mut gba, 2);
    assert_eq!(gba.cpu.regs[0], 5);
}
