//! Cartridge flash backup chip (64 KiB Sanyo / 128 KiB Macronix).
//!
//! Commands are issued through a two-step unlock sequence (0xAA at 0x5555,
//! 0x55 at 0x2AAA) followed by a command byte at 0x5555:
//!
//! | Command | Effect |
//! |---------|--------|
//! | 0x90    | Autoselect: reads at 0x0000/0x0001 return manufacturer/device |
//! | 0xF0    | Reset to ready |
//! | 0x80    | Arm erase; a second unlock then selects chip (0x10) or 4 KiB sector (0x30) erase |
//! | 0xA0    | Byte program: the next write ANDs into the addressed cell |
//! | 0xB0    | Bank switch (128 KiB parts): the next write at 0x0000 selects bank 0/1 |

// Device IDs reported in autoselect state.
const MACRONIX_MANUFACTURER: u8 = 0xC2;
const MACRONIX_DEVICE_128K: u8 = 0x09;
const SANYO_MANUFACTURER: u8 = 0x62;
const SANYO_DEVICE_64K: u8 = 0x13;

const BANK_SIZE: usize = 0x10000;
const SECTOR_SIZE: usize = 0x1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FlashState {
    Ready,
    Cmd1,
    Cmd2,
    Autoselect,
    /// 0x80 received; waiting for the second unlock sequence.
    EraseArm,
    EraseCmd1,
    EraseCmd2,
    Program,
    BankSelect,
}

pub struct FlashChip {
    data: Vec<u8>,
    state: FlashState,
    bank: usize,
    banked: bool,
    manufacturer: u8,
    device: u8,
}

impl FlashChip {
    pub fn new(is_128k: bool) -> Self {
        let (manufacturer, device, size) = if is_128k {
            (MACRONIX_MANUFACTURER, MACRONIX_DEVICE_128K, 2 * BANK_SIZE)
        } else {
            (SANYO_MANUFACTURER, SANYO_DEVICE_64K, BANK_SIZE)
        };
        Self {
            data: vec![0xFF; size],
            state: FlashState::Ready,
            bank: 0,
            banked: is_128k,
            manufacturer,
            device,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn load(&mut self, data: &[u8]) {
        let n = data.len().min(self.data.len());
        self.data[..n].copy_from_slice(&data[..n]);
    }

    fn cell(&self, addr: usize) -> usize {
        self.bank * BANK_SIZE + addr
    }

    pub fn read(&self, addr: u32) -> u8 {
        let addr = (addr & 0xFFFF) as usize;

        if self.state == FlashState::Autoselect {
            return match addr {
                0x0000 => self.manufacturer,
                0x0001 => self.device,
                _ => 0,
            };
        }

        self.data[self.cell(addr)]
    }

    pub fn write(&mut self, addr: u32, val: u8) {
        let addr = (addr & 0xFFFF) as usize;

        self.state = match self.state {
            FlashState::Ready => {
                if addr == 0x5555 && val == 0xAA {
                    FlashState::Cmd1
                } else {
                    FlashState::Ready
                }
            }

            FlashState::Cmd1 => {
                if addr == 0x2AAA && val == 0x55 {
                    FlashState::Cmd2
                } else {
                    FlashState::Ready
                }
            }

            FlashState::Cmd2 => {
                if addr == 0x5555 {
                    match val {
                        0x90 => FlashState::Autoselect,
                        0xF0 => FlashState::Ready,
                        0x80 => FlashState::EraseArm,
                        0xA0 => FlashState::Program,
                        0xB0 if self.banked => FlashState::BankSelect,
                        _ => FlashState::Ready,
                    }
                } else {
                    FlashState::Ready
                }
            }

            FlashState::Autoselect => {
                if val == 0xF0 {
                    FlashState::Ready
                } else {
                    FlashState::Autoselect
                }
            }

            FlashState::EraseArm => {
                if addr == 0x5555 && val == 0xAA {
                    FlashState::EraseCmd1
                } else {
                    FlashState::Ready
                }
            }

            FlashState::EraseCmd1 => {
                if addr == 0x2AAA && val == 0x55 {
                    FlashState::EraseCmd2
                } else {
                    FlashState::Ready
                }
            }

            FlashState::EraseCmd2 => {
                if addr == 0x5555 && val == 0x10 {
                    // Chip erase
                    self.data.fill(0xFF);
                    log::debug!("flash: chip erase");
                } else if val == 0x30 {
                    // 4 KiB sector erase at the sector-aligned address
                    let sector = self.cell(addr & !(SECTOR_SIZE - 1));
                    self.data[sector..sector + SECTOR_SIZE].fill(0xFF);
                    log::debug!("flash: sector erase at 0x{sector:05X}");
                }
                FlashState::Ready
            }

            FlashState::Program => {
                // Programming can only clear bits in the cell.
                let cell = self.cell(addr);
                self.data[cell] &= val;
                FlashState::Ready
            }

            FlashState::BankSelect => {
                if addr == 0x0000 {
                    self.bank = (val & 1) as usize;
                }
                FlashState::Ready
            }
        };
    }
}
