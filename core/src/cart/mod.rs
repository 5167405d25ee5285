//! Cartridge: ROM image, header fields, and the backup (save) backend.
//!
//! The backup type is detected by scanning the ROM for the library version
//! strings the manufacturer toolchains embed (`FLASH1M_V*`, `FLASH_V*`,
//! `FLASH512_V*`, `SRAM_V*`, `EEPROM_V*`).

mod eeprom;
mod flash;

pub use eeprom::Eeprom;
pub use flash::FlashChip;

/// Largest addressable ROM: 32 MiB.
pub const MAX_ROM_SIZE: usize = 0x0200_0000;

const SRAM_SIZE: usize = 0x8000;

/// Errors that can occur when loading a cartridge image.
#[derive(Debug)]
pub enum CartridgeError {
    /// The image exceeds the 32 MiB address space.
    Oversize(usize),
    /// The image is too small to contain a cartridge header.
    Undersize(usize),
}

impl std::fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Oversize(size) => {
                write!(f, "ROM too large: {size} bytes (maximum {MAX_ROM_SIZE})")
            }
            Self::Undersize(size) => write!(f, "ROM too small: {size} bytes"),
        }
    }
}

impl std::error::Error for CartridgeError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveType {
    None,
    Sram,
    Flash64,
    Flash128,
    Eeprom,
}

enum Backup {
    None,
    Sram(Box<[u8; SRAM_SIZE]>),
    Flash(FlashChip),
    Eeprom(Eeprom),
}

pub struct Cartridge {
    rom: Vec<u8>,
    title: String,
    game_code: String,
    save_type: SaveType,
    backup: Backup,
}

impl Cartridge {
    pub fn new() -> Self {
        Self {
            rom: Vec::new(),
            title: String::new(),
            game_code: String::new(),
            save_type: SaveType::None,
            backup: Backup::None,
        }
    }

    /// Take ownership of a raw ROM image: parse the header, detect the
    /// backup type, and set up the backup backend.
    pub fn load_rom(&mut self, rom: Vec<u8>) -> Result<(), CartridgeError> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(CartridgeError::Oversize(rom.len()));
        }
        if rom.len() < 0xB0 {
            return Err(CartridgeError::Undersize(rom.len()));
        }

        // Header: 12-byte ASCII title at 0xA0, 4-byte game code at 0xAC.
        self.title = ascii_field(&rom[0xA0..0xAC]);
        self.game_code = ascii_field(&rom[0xAC..0xB0]);

        self.save_type = detect_save_type(&rom);
        self.backup = match self.save_type {
            SaveType::None => Backup::None,
            SaveType::Sram => Backup::Sram(Box::new([0; SRAM_SIZE])),
            SaveType::Flash64 => Backup::Flash(FlashChip::new(false)),
            SaveType::Flash128 => Backup::Flash(FlashChip::new(true)),
            SaveType::Eeprom => Backup::Eeprom(Eeprom::new()),
        };

        log::info!(
            "ROM loaded: \"{}\" [{}] ({} KB), save type {:?}",
            self.title,
            self.game_code,
            rom.len() / 1024,
            self.save_type
        );

        self.rom = rom;
        Ok(())
    }

    pub fn loaded(&self) -> bool {
        !self.rom.is_empty()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn game_code(&self) -> &str {
        &self.game_code
    }

    pub fn save_type(&self) -> SaveType {
        self.save_type
    }

    /// ROM byte read; the image mirrors across the three wait-state windows.
    pub fn read_rom8(&self, addr: u32) -> u8 {
        let offset = (addr & 0x01FF_FFFF) as usize;
        if offset < self.rom.len() {
            self.rom[offset]
        } else {
            0
        }
    }

    /// True when halfword accesses at `addr` talk to the EEPROM chip rather
    /// than ROM: the top wait-state window with an EEPROM backend.
    pub fn is_eeprom_access(&self, addr: u32) -> bool {
        matches!(self.backup, Backup::Eeprom(_)) && (addr >> 24) == 0x0D
    }

    pub fn eeprom_read_bit(&mut self) -> u16 {
        match &mut self.backup {
            Backup::Eeprom(e) => e.read_bit(),
            _ => 1,
        }
    }

    pub fn eeprom_write_bit(&mut self, val: u16) {
        if let Backup::Eeprom(e) = &mut self.backup {
            e.write_bit(val);
        }
    }

    pub fn eeprom_dma_burst(&mut self, units: u32) {
        if let Backup::Eeprom(e) = &mut self.backup {
            e.on_dma_burst(units);
        }
    }

    /// Backup-region byte read (0x0E/0x0F).
    pub fn read_backup8(&self, addr: u32) -> u8 {
        let offset = addr & 0xFFFF;
        match &self.backup {
            Backup::Sram(sram) => sram[(offset & 0x7FFF) as usize],
            Backup::Flash(flash) => flash.read(offset),
            _ => 0,
        }
    }

    /// Backup-region byte write (0x0E/0x0F).
    pub fn write_backup8(&mut self, addr: u32, val: u8) {
        let offset = addr & 0xFFFF;
        match &mut self.backup {
            Backup::Sram(sram) => sram[(offset & 0x7FFF) as usize] = val,
            Backup::Flash(flash) => flash.write(offset, val),
            _ => {}
        }
    }

    /// Raw backup contents for save-file persistence, or `None` when the
    /// cartridge has no backup hardware.
    pub fn backup_data(&self) -> Option<Vec<u8>> {
        match &self.backup {
            Backup::None => None,
            Backup::Sram(sram) => Some(sram.to_vec()),
            Backup::Flash(flash) => Some(flash.data().to_vec()),
            Backup::Eeprom(eeprom) => {
                if eeprom.data().is_empty() {
                    None
                } else {
                    Some(eeprom.data().to_vec())
                }
            }
        }
    }

    /// Restore backup contents from a previously written save file.
    pub fn load_backup_data(&mut self, data: &[u8]) {
        match &mut self.backup {
            Backup::None => {}
            Backup::Sram(sram) => {
                let n = data.len().min(SRAM_SIZE);
                sram[..n].copy_from_slice(&data[..n]);
            }
            Backup::Flash(flash) => flash.load(data),
            Backup::Eeprom(eeprom) => eeprom.load(data),
        }
    }
}

impl Default for Cartridge {
    fn default() -> Self {
        Self::new()
    }
}

fn ascii_field(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| if b.is_ascii_graphic() { b as char } else { '_' })
        .collect()
}

fn detect_save_type(rom: &[u8]) -> SaveType {
    // The magic strings are word-aligned in real carts, but a linear scan is
    // cheap and catches trimmed images too.
    for window in rom.windows(10) {
        if window.starts_with(b"FLASH1M_V") {
            return SaveType::Flash128;
        }
        if window.starts_with(b"FLASH512_V") || window.starts_with(b"FLASH_V") {
            return SaveType::Flash64;
        }
        if window.starts_with(b"SRAM_V") {
            return SaveType::Sram;
        }
        if window.starts_with(b"EEPROM_V") {
            return SaveType::Eeprom;
        }
    }
    SaveType::None
}
