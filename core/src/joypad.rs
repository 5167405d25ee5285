//! Keypad state: the active-LOW 10-bit key bitmap (KEYINPUT) and the
//! keypad interrupt configuration (KEYCNT).

/// The ten pad inputs, in KEYINPUT bit order.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    A = 0,
    B = 1,
    Select = 2,
    Start = 3,
    Right = 4,
    Left = 5,
    Up = 6,
    Down = 7,
    R = 8,
    L = 9,
}

impl Key {
    pub fn mask(self) -> u16 {
        1 << self as u16
    }
}

const ALL_KEYS: u16 = 0x03FF;

// KEYCNT bits
const KEYCNT_IRQ_ENABLE: u16 = 1 << 14;
const KEYCNT_IRQ_AND: u16 = 1 << 15;

pub struct Joypad {
    /// KEYINPUT (0x04000130): 0 = pressed, 1 = released.
    pub keyinput: u16,
    /// KEYCNT (0x04000132): key mask (bits 0-9), IRQ enable (bit 14),
    /// AND/OR condition select (bit 15).
    pub keycnt: u16,
}

impl Joypad {
    pub fn new() -> Self {
        Self {
            keyinput: ALL_KEYS,
            keycnt: 0,
        }
    }

    pub fn press(&mut self, key: Key) {
        self.keyinput &= !key.mask();
    }

    pub fn release(&mut self, key: Key) {
        self.keyinput |= key.mask();
    }

    /// Evaluate the KEYCNT interrupt condition against the current pad state.
    /// OR mode fires when any selected key is down; AND mode requires all of
    /// them down at once.
    pub fn irq_condition_met(&self) -> bool {
        if self.keycnt & KEYCNT_IRQ_ENABLE == 0 {
            return false;
        }
        let selected = self.keycnt & ALL_KEYS;
        if selected == 0 {
            return false;
        }
        let pressed = !self.keyinput & ALL_KEYS;
        if self.keycnt & KEYCNT_IRQ_AND != 0 {
            pressed & selected == selected
        } else {
            pressed & selected != 0
        }
    }
}

impl Default for Joypad {
    fn default() -> Self {
        Self::new()
    }
}
