//! Memory bus: address decoding over the nine regions, width-specific
//! access rules, mirroring, BIOS read protection, and open-bus defaults.
//!
//! The bus owns every memory region and every peripheral. Co-components get
//! borrowed views per call (the PPU sees VRAM/palette/OAM slices, the DMA
//! engine drives `read`/`write` directly), which replaces the pointer web a
//! C implementation would thread through every subsystem.

use crate::apu::Apu;
use crate::cart::Cartridge;
use crate::dma::{self, DmaController};
use crate::irq::InterruptController;
use crate::joypad::Joypad;
use crate::ppu::Ppu;
use crate::timer::{self, Timer};

pub const BIOS_SIZE: usize = 0x4000;
pub const EWRAM_SIZE: usize = 0x40000;
pub const IWRAM_SIZE: usize = 0x8000;
pub const IO_SIZE: usize = 0x400;
pub const PALETTE_SIZE: usize = 0x400;
pub const VRAM_SIZE: usize = 0x18000;
pub const OAM_SIZE: usize = 0x400;

/// ARM machine code installed at the IRQ vector when no BIOS image is
/// loaded: save R0-R3+R12+LR, fetch the guest handler pointer from
/// 0x03FFFFFC, call it with LDR PC, restore, return with SUBS PC, LR, #4.
const IRQ_TRAMPOLINE: [u32; 6] = [
    0xE92D500F, // stmfd sp!, {r0-r3, r12, lr}
    0xE3A00301, // mov   r0, #0x04000000
    0xE28FE000, // add   lr, pc, #0
    0xE510F004, // ldr   pc, [r0, #-4]
    0xE8BD500F, // ldmfd sp!, {r0-r3, r12, lr}
    0xE25EF004, // subs  pc, lr, #4
];

pub struct Bus {
    pub(crate) bios: [u8; BIOS_SIZE],
    pub(crate) ewram: [u8; EWRAM_SIZE],
    pub(crate) iwram: [u8; IWRAM_SIZE],
    pub(crate) io_regs: [u8; IO_SIZE],
    pub(crate) palette_ram: [u8; PALETTE_SIZE],
    pub(crate) vram: [u8; VRAM_SIZE],
    pub(crate) oam: [u8; OAM_SIZE],

    /// Last value seen on the bus, returned for unmapped reads.
    open_bus: u32,
    /// Last word fetched from BIOS while the CPU was executing inside it;
    /// out-of-BIOS reads of the BIOS region return this.
    last_bios_word: u32,
    bios_loaded: bool,
    /// Current CPU fetch address, updated every instruction step; gates the
    /// BIOS read protection without a CPU back-pointer.
    pub(crate) fetch_pc: u32,
    /// Set by a HALTCNT write; the CPU picks it up between instructions.
    halt_requested: bool,

    pub ppu: Ppu,
    pub apu: Apu,
    pub dma: DmaController,
    pub timers: [Timer; 4],
    pub irq: InterruptController,
    pub joypad: Joypad,
    pub cart: Cartridge,
}

impl Bus {
    pub fn new() -> Self {
        Self {
            bios: [0; BIOS_SIZE],
            ewram: [0; EWRAM_SIZE],
            iwram: [0; IWRAM_SIZE],
            io_regs: [0; IO_SIZE],
            palette_ram: [0; PALETTE_SIZE],
            vram: [0; VRAM_SIZE],
            oam: [0; OAM_SIZE],
            open_bus: 0,
            last_bios_word: 0,
            bios_loaded: false,
            fetch_pc: 0,
            halt_requested: false,
            ppu: Ppu::new(),
            apu: Apu::new(),
            dma: DmaController::new(),
            timers: [Timer::new(); 4],
            irq: InterruptController::new(),
            joypad: Joypad::new(),
            cart: Cartridge::new(),
        }
    }

    /// Load a 16 KiB BIOS image. Short images are accepted with a warning
    /// (the remainder stays zero).
    pub fn load_bios(&mut self, data: &[u8]) {
        let n = data.len().min(BIOS_SIZE);
        if data.len() != BIOS_SIZE {
            log::warn!("BIOS size mismatch: expected {BIOS_SIZE} bytes, got {}", data.len());
        }
        self.bios[..n].copy_from_slice(&data[..n]);
        self.bios_loaded = true;
        log::info!("BIOS loaded: {n} bytes");
    }

    pub fn bios_loaded(&self) -> bool {
        self.bios_loaded
    }

    /// Install the fabricated IRQ trampoline at the 0x18 vector for
    /// high-level BIOS mode.
    pub fn install_hle_trampoline(&mut self) {
        for (i, word) in IRQ_TRAMPOLINE.iter().enumerate() {
            let off = 0x18 + i * 4;
            self.bios[off..off + 4].copy_from_slice(&word.to_le_bytes());
        }
    }

    pub(crate) fn request_halt(&mut self) {
        self.halt_requested = true;
    }

    pub(crate) fn take_halt_request(&mut self) -> bool {
        std::mem::take(&mut self.halt_requested)
    }

    /// Tick the timers (which may raise IRQs and clock FIFO samples), then
    /// service any FIFO refill DMA the APU requested.
    pub fn tick_timers(&mut self, cycles: u32) {
        {
            let Bus {
                timers, irq, apu, ..
            } = self;
            timer::tick(timers, cycles, irq, apu);
        }
        let requests = self.apu.take_fifo_dma_requests();
        for (fifo_id, requested) in requests.into_iter().enumerate() {
            if requested {
                dma::on_fifo(self, fifo_id);
            }
        }
    }

    /// Render the current scanline, handing the PPU its memory views.
    pub fn render_scanline(&mut self) {
        let Bus {
            ppu,
            vram,
            palette_ram,
            oam,
            ..
        } = self;
        ppu.render_scanline(&vram[..], &palette_ram[..], &oam[..]);
    }

    fn vram_offset(addr: u32) -> usize {
        let offset = (addr & 0x1FFFF) as usize;
        if offset >= VRAM_SIZE {
            offset - 0x8000
        } else {
            offset
        }
    }

    pub fn read8(&mut self, addr: u32) -> u8 {
        match addr >> 24 {
            0x00 => {
                if (addr as usize) < BIOS_SIZE {
                    // BIOS is readable only while the CPU is executing
                    // inside it; otherwise the last fetched word leaks out.
                    if self.fetch_pc >= BIOS_SIZE as u32 + 8 {
                        return (self.last_bios_word >> ((addr & 3) * 8)) as u8;
                    }
                    let aligned = (addr & !3) as usize;
                    self.last_bios_word = u32::from_le_bytes(
                        self.bios[aligned..aligned + 4].try_into().unwrap(),
                    );
                    self.bios[addr as usize]
                } else {
                    0
                }
            }
            0x02 => self.ewram[(addr as usize) & (EWRAM_SIZE - 1)],
            0x03 => self.iwram[(addr as usize) & (IWRAM_SIZE - 1)],
            0x04 => {
                if (addr & 0xFF_FFFF) < IO_SIZE as u32 {
                    self.io_read8(addr)
                } else {
                    0
                }
            }
            0x05 => self.palette_ram[(addr as usize) & (PALETTE_SIZE - 1)],
            0x06 => self.vram[Self::vram_offset(addr)],
            0x07 => self.oam[(addr as usize) & (OAM_SIZE - 1)],
            0x08..=0x0D => self.cart.read_rom8(addr),
            0x0E | 0x0F => self.cart.read_backup8(addr),
            _ => self.open_bus as u8,
        }
    }

    pub fn read16(&mut self, addr: u32) -> u16 {
        let addr = addr & !1;

        // EEPROM carts answer halfword reads in the top wait-state window.
        if self.cart.is_eeprom_access(addr) {
            return self.cart.eeprom_read_bit();
        }

        let val = u16::from(self.read8(addr)) | (u16::from(self.read8(addr + 1)) << 8);
        self.open_bus = val as u32 | ((val as u32) << 16);
        val
    }

    pub fn read32(&mut self, addr: u32) -> u32 {
        let addr = addr & !3;
        let val = u32::from(self.read8(addr))
            | (u32::from(self.read8(addr + 1)) << 8)
            | (u32::from(self.read8(addr + 2)) << 16)
            | (u32::from(self.read8(addr + 3)) << 24);
        self.open_bus = val;
        val
    }

    pub fn write8(&mut self, addr: u32, val: u8) {
        match addr >> 24 {
            0x02 => self.ewram[(addr as usize) & (EWRAM_SIZE - 1)] = val,
            0x03 => self.iwram[(addr as usize) & (IWRAM_SIZE - 1)] = val,
            0x04 => {
                if (addr & 0xFF_FFFF) < IO_SIZE as u32 {
                    self.io_write8(addr, val);
                }
            }
            0x05 => {
                // 8-bit palette writes duplicate the byte across the
                // containing halfword.
                let offset = (addr as usize) & (PALETTE_SIZE - 1) & !1;
                self.palette_ram[offset] = val;
                self.palette_ram[offset + 1] = val;
            }
            0x06 => {
                // Same duplication rule for VRAM.
                let offset = Self::vram_offset(addr) & !1;
                self.vram[offset] = val;
                self.vram[offset + 1] = val;
            }
            0x07 => {
                // 8-bit OAM writes are dropped.
            }
            0x0E | 0x0F => self.cart.write_backup8(addr, val),
            _ => {}
        }
    }

    pub fn write16(&mut self, addr: u32, val: u16) {
        let addr = addr & !1;

        // Palette/VRAM/OAM take halfword writes directly; going through
        // write8 would invoke the byte-write quirks. The EEPROM window
        // consumes one serial bit per halfword.
        match addr >> 24 {
            0x05 => {
                let offset = (addr as usize) & (PALETTE_SIZE - 1);
                self.palette_ram[offset..offset + 2].copy_from_slice(&val.to_le_bytes());
            }
            0x06 => {
                let offset = Self::vram_offset(addr);
                self.vram[offset..offset + 2].copy_from_slice(&val.to_le_bytes());
            }
            0x07 => {
                let offset = (addr as usize) & (OAM_SIZE - 1);
                self.oam[offset..offset + 2].copy_from_slice(&val.to_le_bytes());
            }
            0x0D if self.cart.is_eeprom_access(addr) => {
                self.cart.eeprom_write_bit(val);
            }
            _ => {
                self.write8(addr, val as u8);
                self.write8(addr + 1, (val >> 8) as u8);
            }
        }
    }

    pub fn write32(&mut self, addr: u32, val: u32) {
        let addr = addr & !3;
        match addr >> 24 {
            0x05 | 0x06 | 0x07 => {
                self.write16(addr, val as u16);
                self.write16(addr + 2, (val >> 16) as u16);
            }
            _ => {
                self.write8(addr, val as u8);
                self.write8(addr + 1, (val >> 8) as u8);
                self.write8(addr + 2, (val >> 16) as u8);
                self.write8(addr + 3, (val >> 24) as u8);
            }
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}
