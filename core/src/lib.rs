pub mod apu;
pub mod bus;
pub mod cart;
pub mod cpu;
pub mod dma;
pub mod gba;
pub mod io;
pub mod irq;
pub mod joypad;
pub mod ppu;
pub mod timer;

pub mod prelude {
    pub use crate::bus::Bus;
    pub use crate::cart::{Cartridge, CartridgeError, SaveType};
    pub use crate::cpu::Cpu;
    pub use crate::gba::Gba;
    pub use crate::joypad::Key;
    pub use crate::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};
}
