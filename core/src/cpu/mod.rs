//! ARM7TDMI interpreter: dual ARM/Thumb decode, banked registers, exception
//! entry, and the two-slot prefetch pipeline.

mod alu;
mod arm;
pub(crate) mod bios;
mod thumb;

use crate::bus::Bus;

pub const REG_SP: usize = 13;
pub const REG_LR: usize = 14;
pub const REG_PC: usize = 15;

// CPSR flag masks.
pub const FLAG_N: u32 = 1 << 31;
pub const FLAG_Z: u32 = 1 << 30;
pub const FLAG_C: u32 = 1 << 29;
pub const FLAG_V: u32 = 1 << 28;
pub const FLAG_I: u32 = 1 << 7;
pub const FLAG_F: u32 = 1 << 6;
pub const FLAG_T: u32 = 1 << 5;

const MODE_MASK: u32 = 0x1F;

/// CPU modes as encoded in CPSR bits 0-4.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    User = 0x10,
    Fiq = 0x11,
    Irq = 0x12,
    Supervisor = 0x13,
    Abort = 0x17,
    Undefined = 0x1B,
    System = 0x1F,
}

impl Mode {
    pub fn from_bits(bits: u32) -> Mode {
        match bits & MODE_MASK {
            0x11 => Mode::Fiq,
            0x12 => Mode::Irq,
            0x13 => Mode::Supervisor,
            0x17 => Mode::Abort,
            0x1B => Mode::Undefined,
            0x1F => Mode::System,
            _ => Mode::User,
        }
    }

    /// SPSR slot for privileged modes; USR/SYS have none.
    fn spsr_index(self) -> Option<usize> {
        match self {
            Mode::Fiq => Some(0),
            Mode::Supervisor => Some(1),
            Mode::Abort => Some(2),
            Mode::Irq => Some(3),
            Mode::Undefined => Some(4),
            Mode::User | Mode::System => None,
        }
    }
}

/// Saved SP/LR pairs per mode, plus the FIQ-only R8-R12 shadow set and the
/// user copies displaced while FIQ is active.
#[derive(Default)]
struct RegisterBanks {
    usr_sp_lr: [u32; 2],
    fiq_sp_lr: [u32; 2],
    svc_sp_lr: [u32; 2],
    abt_sp_lr: [u32; 2],
    irq_sp_lr: [u32; 2],
    und_sp_lr: [u32; 2],
    fiq_r8_r12: [u32; 5],
    usr_r8_r12: [u32; 5],
}

impl RegisterBanks {
    fn sp_lr(&mut self, mode: Mode) -> &mut [u32; 2] {
        match mode {
            Mode::User | Mode::System => &mut self.usr_sp_lr,
            Mode::Fiq => &mut self.fiq_sp_lr,
            Mode::Supervisor => &mut self.svc_sp_lr,
            Mode::Abort => &mut self.abt_sp_lr,
            Mode::Irq => &mut self.irq_sp_lr,
            Mode::Undefined => &mut self.und_sp_lr,
        }
    }
}

/// Two-slot prefetch queue. Slot 0 is the instruction about to execute,
/// slot 1 the next fetch. Any branch, T-bit change, or PC write invalidates
/// the queue; the next step refills it at a 2-cycle charge.
#[derive(Clone, Copy)]
pub enum Pipeline {
    Valid([u32; 2]),
    Invalid,
}

pub struct Cpu {
    pub regs: [u32; 16],
    pub cpsr: u32,
    spsr: [u32; 5],
    banks: RegisterBanks,
    pipeline: Pipeline,
    pub halted: bool,
    // Guest undefined encodings are reported once, then silently skipped.
    undefined_reported: bool,
}

impl Cpu {
    /// Power-on state: SVC mode, ARM state, IRQs and FIQs masked, PC at the
    /// BIOS entry vector.
    pub fn new() -> Self {
        let mut cpu = Self {
            regs: [0; 16],
            cpsr: Mode::Supervisor as u32 | FLAG_I | FLAG_F,
            spsr: [0; 5],
            banks: RegisterBanks::default(),
            pipeline: Pipeline::Invalid,
            halted: false,
            undefined_reported: false,
        };
        cpu.regs[REG_SP] = 0x0300_7FE0;
        cpu
    }

    pub fn mode(&self) -> Mode {
        Mode::from_bits(self.cpsr)
    }

    pub fn thumb(&self) -> bool {
        self.cpsr & FLAG_T != 0
    }

    pub(crate) fn flag(&self, mask: u32) -> bool {
        self.cpsr & mask != 0
    }

    pub(crate) fn set_flag(&mut self, mask: u32, on: bool) {
        if on {
            self.cpsr |= mask;
        } else {
            self.cpsr &= !mask;
        }
    }

    pub(crate) fn set_nz(&mut self, result: u32) {
        self.set_flag(FLAG_N, result & 0x8000_0000 != 0);
        self.set_flag(FLAG_Z, result == 0);
    }

    /// Current mode's SPSR, or CPSR in USR/SYS (which have none).
    pub fn spsr(&self) -> u32 {
        match self.mode().spsr_index() {
            Some(i) => self.spsr[i],
            None => self.cpsr,
        }
    }

    pub fn set_spsr(&mut self, val: u32) {
        if let Some(i) = self.mode().spsr_index() {
            self.spsr[i] = val;
        }
    }

    /// Restore CPSR from SPSR, banking into the target mode first. Used by
    /// the exception-return forms (data processing with Rd=PC and S set,
    /// LDM with the S bit and PC in the list).
    pub(crate) fn restore_cpsr_from_spsr(&mut self) {
        if let Some(i) = self.mode().spsr_index() {
            let spsr = self.spsr[i];
            let target = Mode::from_bits(spsr);
            if target != self.mode() {
                self.switch_mode(target);
            }
            self.cpsr = spsr;
        }
    }

    pub fn flush_pipeline(&mut self) {
        self.pipeline = Pipeline::Invalid;
    }

    /// Switch mode with full register banking: the outgoing mode's SP/LR
    /// (plus R8-R12 for FIQ) go to its bank, the incoming mode's come back.
    pub fn switch_mode(&mut self, new_mode: Mode) {
        let old_mode = self.mode();
        if old_mode == new_mode {
            return;
        }

        if old_mode == Mode::Fiq {
            let mut visible = [0u32; 5];
            visible.copy_from_slice(&self.regs[8..13]);
            self.banks.fiq_r8_r12 = visible;
            self.regs[8..13].copy_from_slice(&self.banks.usr_r8_r12);
        }
        *self.banks.sp_lr(old_mode) = [self.regs[REG_SP], self.regs[REG_LR]];

        if new_mode == Mode::Fiq {
            let mut visible = [0u32; 5];
            visible.copy_from_slice(&self.regs[8..13]);
            self.banks.usr_r8_r12 = visible;
            self.regs[8..13].copy_from_slice(&self.banks.fiq_r8_r12);
        }
        let [sp, lr] = *self.banks.sp_lr(new_mode);
        self.regs[REG_SP] = sp;
        self.regs[REG_LR] = lr;

        self.cpsr = (self.cpsr & !MODE_MASK) | new_mode as u32;
    }

    /// Check an ARM condition code against the current flags. 0xF (the
    /// historically reserved encoding) executes unconditionally on ARMv4.
    pub fn condition_passed(&self, cond: u32) -> bool {
        let n = self.flag(FLAG_N);
        let z = self.flag(FLAG_Z);
        let c = self.flag(FLAG_C);
        let v = self.flag(FLAG_V);

        match cond & 0xF {
            0x0 => z,
            0x1 => !z,
            0x2 => c,
            0x3 => !c,
            0x4 => n,
            0x5 => !n,
            0x6 => v,
            0x7 => !v,
            0x8 => c && !z,
            0x9 => !c || z,
            0xA => n == v,
            0xB => n != v,
            0xC => !z && (n == v),
            0xD => z || (n != v),
            _ => true,
        }
    }

    /// Address of the next instruction that would execute. While the
    /// pipeline is valid, PC runs two fetches ahead of it.
    fn next_exec_addr(&self) -> u32 {
        let fetch_width = if self.thumb() { 2 } else { 4 };
        match self.pipeline {
            Pipeline::Valid(_) => self.regs[REG_PC] - 2 * fetch_width,
            Pipeline::Invalid => self.regs[REG_PC],
        }
    }

    /// IRQ exception entry: bank to IRQ mode, save CPSR, mask IRQs, force
    /// ARM state, vector to 0x18. LR_irq is set so the standard
    /// `SUBS PC, LR, #4` return resumes at the interrupted instruction.
    pub fn enter_irq(&mut self) {
        let old_cpsr = self.cpsr;
        let return_addr = self.next_exec_addr();

        self.switch_mode(Mode::Irq);
        self.spsr[Mode::Irq.spsr_index().unwrap()] = old_cpsr;
        self.regs[REG_LR] = return_addr.wrapping_add(4);
        self.cpsr |= FLAG_I;
        self.cpsr &= !FLAG_T;
        self.regs[REG_PC] = 0x0000_0018;
        self.flush_pipeline();
    }

    /// SWI: exception entry through the 0x08 vector with a real BIOS, or a
    /// direct dispatch into the high-level BIOS services without one.
    pub fn software_interrupt(&mut self, bus: &mut Bus, comment: u32) {
        if !bus.bios_loaded() {
            bios::execute(self, bus, comment);
            return;
        }

        let old_cpsr = self.cpsr;
        let thumb = self.thumb();

        self.switch_mode(Mode::Supervisor);
        self.spsr[Mode::Supervisor.spsr_index().unwrap()] = old_cpsr;
        // LR_svc = the instruction after the SWI.
        self.regs[REG_LR] = self.regs[REG_PC] - if thumb { 2 } else { 4 };
        self.cpsr |= FLAG_I;
        self.cpsr &= !FLAG_T;
        self.regs[REG_PC] = 0x0000_0008;
        self.flush_pipeline();
    }

    /// Set the register state the BIOS would leave behind, for starting
    /// directly at the ROM entry point.
    pub fn skip_bios(&mut self) {
        self.cpsr = Mode::System as u32;

        self.switch_mode(Mode::Irq);
        self.regs[REG_SP] = 0x0300_7FA0;
        self.switch_mode(Mode::Supervisor);
        self.regs[REG_SP] = 0x0300_7FE0;
        self.switch_mode(Mode::System);
        self.regs[REG_SP] = 0x0300_7F00;

        self.regs[REG_PC] = 0x0800_0000;
        self.flush_pipeline();
    }

    pub(crate) fn report_undefined(&mut self, kind: &str, instr: u32) {
        if !self.undefined_reported {
            self.undefined_reported = true;
            log::warn!(
                "undefined {kind} instruction 0x{instr:08X} near 0x{:08X}; continuing as no-op",
                self.next_exec_addr()
            );
        }
    }

    /// Execute one instruction; returns the cycles consumed. An invalid
    /// pipeline refills instead (two fetches, 2 cycles).
    ///
    /// Ordering matters: the instruction executes against the current
    /// pipeline, and the queue only advances afterwards if the instruction
    /// left it valid. A branch or PC write marks it invalid, so the next
    /// step refills from the new PC.
    pub fn step(&mut self, bus: &mut Bus) -> u32 {
        let thumb = self.thumb();
        bus.fetch_pc = self.regs[REG_PC];

        let Pipeline::Valid(slots) = self.pipeline else {
            let pc = self.regs[REG_PC];
            if thumb {
                let s0 = bus.read16(pc) as u32;
                let s1 = bus.read16(pc.wrapping_add(2)) as u32;
                self.pipeline = Pipeline::Valid([s0, s1]);
                self.regs[REG_PC] = pc.wrapping_add(4);
            } else {
                let s0 = bus.read32(pc);
                let s1 = bus.read32(pc.wrapping_add(4));
                self.pipeline = Pipeline::Valid([s0, s1]);
                self.regs[REG_PC] = pc.wrapping_add(8);
            }
            return 2;
        };

        let cycles = if thumb {
            thumb::execute(self, bus, slots[0] as u16)
        } else {
            let instr = slots[0];
            if self.condition_passed(instr >> 28) {
                arm::execute(self, bus, instr)
            } else {
                1
            }
        };

        if let Pipeline::Valid(slots) = &mut self.pipeline {
            slots[0] = slots[1];
            let pc = self.regs[REG_PC];
            bus.fetch_pc = pc;
            if thumb {
                slots[1] = bus.read16(pc) as u32;
                self.regs[REG_PC] = pc.wrapping_add(2);
            } else {
                slots[1] = bus.read32(pc);
                self.regs[REG_PC] = pc.wrapping_add(4);
            }
        }

        cycles
    }

    fn irq_pending(&self, bus: &Bus) -> bool {
        !self.flag(FLAG_I) && bus.irq.pending()
    }

    /// Run until at least `cycles` cycles have accumulated; returns the
    /// exact total. A halted CPU consumes the whole budget unless a pending
    /// IRQ wakes it. IRQs are sampled between instructions.
    pub fn run(&mut self, bus: &mut Bus, cycles: u32) -> u32 {
        let mut executed = 0;

        while executed < cycles {
            if bus.take_halt_request() {
                self.halted = true;
            }

            if self.halted {
                if self.irq_pending(bus) {
                    self.halted = false;
                    self.enter_irq();
                } else {
                    executed = cycles;
                    break;
                }
            } else if self.irq_pending(bus) {
                self.enter_irq();
            }

            executed += self.step(bus);
        }

        executed
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
