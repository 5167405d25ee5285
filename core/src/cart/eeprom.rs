//! Serial EEPROM backup (512 B or 8 KiB).
//!
//! The chip sits behind the 0x0D000000 window and is driven one bit at a
//! time through 16-bit DMA transfers: writes feed bit 0 of each halfword
//! into the request stream, reads clock response bits out.
//!
//! Request format (MSB first):
//!   `1 1` + address + `0`                      — read request
//!   `1 0` + address + 64 data bits + `0`       — write request
//!
//! The address is 6 bits on 512 B parts and 14 bits on 8 KiB parts. The
//! part size is fixed by the length of the first DMA burst that reaches the
//! chip (9 halfwords = 6-bit addressing, 17 = 14-bit). A read response is
//! 68 bits: four dummy zeros, then the 64 data bits MSB first.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EepromState {
    Idle,
    /// Collecting the second start bit.
    Start,
    /// Collecting address bits; `read` records the request type.
    Address { read: bool, bits: u8 },
    /// Collecting the 64 data bits of a write request.
    WriteData { bits: u8 },
    /// Waiting for the terminating zero bit of a write request.
    WriteStop,
    /// Waiting for the terminating zero bit of a read request.
    ReadStop,
}

pub struct Eeprom {
    data: Vec<u8>,
    addr_bits: u8,
    state: EepromState,
    addr: u16,
    write_buf: u64,
    /// Read response shifter: bits remaining, current payload.
    read_bits: u8,
    read_buf: u64,
}

impl Eeprom {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            addr_bits: 0,
            state: EepromState::Idle,
            addr: 0,
            write_buf: 0,
            read_bits: 0,
            read_buf: 0,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn load(&mut self, data: &[u8]) {
        match data.len() {
            0x200 => self.configure(6),
            0x2000 => self.configure(14),
            _ => return,
        }
        self.data.copy_from_slice(data);
    }

    fn configure(&mut self, addr_bits: u8) {
        if self.addr_bits == 0 {
            self.addr_bits = addr_bits;
            let size = if addr_bits == 6 { 0x200 } else { 0x2000 };
            self.data = vec![0xFF; size];
            log::info!("EEPROM sized at {} bytes", size);
        }
    }

    /// Called with the unit count of a DMA burst targeting the chip before
    /// the transfer runs. The first burst fixes the address width.
    pub fn on_dma_burst(&mut self, units: u32) {
        if self.addr_bits != 0 {
            return;
        }
        match units {
            9 | 73 => self.configure(6),
            17 | 81 => self.configure(14),
            _ => {}
        }
    }

    fn block_offset(&self, addr: u16) -> usize {
        let mask = (self.data.len() / 8).saturating_sub(1);
        (addr as usize & mask) * 8
    }

    pub fn write_bit(&mut self, bit: u16) {
        let bit = bit & 1;
        // Unsized chips default to the large part; real carts are always
        // sized by the first DMA burst before data arrives.
        if self.addr_bits == 0 {
            self.configure(14);
        }

        self.state = match self.state {
            EepromState::Idle => {
                if bit == 1 {
                    EepromState::Start
                } else {
                    EepromState::Idle
                }
            }

            EepromState::Start => {
                self.addr = 0;
                EepromState::Address {
                    read: bit == 1,
                    bits: 0,
                }
            }

            EepromState::Address { read, bits } => {
                self.addr = (self.addr << 1) | bit;
                let bits = bits + 1;
                if bits < self.addr_bits {
                    EepromState::Address { read, bits }
                } else if read {
                    EepromState::ReadStop
                } else {
                    self.write_buf = 0;
                    EepromState::WriteData { bits: 0 }
                }
            }

            EepromState::WriteData { bits } => {
                self.write_buf = (self.write_buf << 1) | bit as u64;
                let bits = bits + 1;
                if bits < 64 {
                    EepromState::WriteData { bits }
                } else {
                    EepromState::WriteStop
                }
            }

            EepromState::WriteStop => {
                let off = self.block_offset(self.addr);
                self.data[off..off + 8].copy_from_slice(&self.write_buf.to_be_bytes());
                EepromState::Idle
            }

            EepromState::ReadStop => {
                let off = self.block_offset(self.addr);
                let mut block = [0u8; 8];
                block.copy_from_slice(&self.data[off..off + 8]);
                self.read_buf = u64::from_be_bytes(block);
                self.read_bits = 68;
                EepromState::Idle
            }
        };
    }

    pub fn read_bit(&mut self) -> u16 {
        if self.read_bits == 0 {
            // Idle reads report ready.
            return 1;
        }
        self.read_bits -= 1;
        if self.read_bits >= 64 {
            // Four leading dummy bits.
            0
        } else {
            ((self.read_buf >> self.read_bits) & 1) as u16
        }
    }
}

impl Default for Eeprom {
    fn default() -> Self {
        Self::new()
    }
}
