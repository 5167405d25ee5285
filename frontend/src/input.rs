use std::collections::HashMap;

use agate_core::prelude::Key;
use sdl2::keyboard::Scancode;

use crate::config::Config;

/// Maps SDL scancodes to pad keys.
pub struct KeyMap {
    map: HashMap<Scancode, Key>,
}

impl KeyMap {
    pub fn get(&self, scancode: Scancode) -> Option<Key> {
        self.map.get(&scancode).copied()
    }
}

const DEFAULT_BINDINGS: &[(Key, Scancode)] = &[
    (Key::A, Scancode::Z),
    (Key::B, Scancode::X),
    (Key::Start, Scancode::Return),
    (Key::Select, Scancode::RShift),
    (Key::Up, Scancode::Up),
    (Key::Down, Scancode::Down),
    (Key::Left, Scancode::Left),
    (Key::Right, Scancode::Right),
    (Key::L, Scancode::A),
    (Key::R, Scancode::S),
];

fn key_by_name(name: &str) -> Option<Key> {
    match name {
        "a" => Some(Key::A),
        "b" => Some(Key::B),
        "start" => Some(Key::Start),
        "select" => Some(Key::Select),
        "up" => Some(Key::Up),
        "down" => Some(Key::Down),
        "left" => Some(Key::Left),
        "right" => Some(Key::Right),
        "l" => Some(Key::L),
        "r" => Some(Key::R),
        _ => None,
    }
}

/// Build the key map: defaults first, then config overrides by SDL scancode
/// name (e.g. `a = "Q"` rebinds the A button).
pub fn build_key_map(config: &Config) -> KeyMap {
    let mut map = HashMap::new();
    for &(key, scancode) in DEFAULT_BINDINGS {
        map.insert(scancode, key);
    }

    for (action, scancode_name) in &config.keys {
        let Some(key) = key_by_name(action.as_str()) else {
            log::warn!("config: unknown pad key \"{action}\"");
            continue;
        };
        let Some(scancode) = Scancode::from_name(scancode_name) else {
            log::warn!("config: unknown scancode \"{scancode_name}\" for \"{action}\"");
            continue;
        };
        map.retain(|_, v| *v != key);
        map.insert(scancode, key);
    }

    KeyMap { map }
}
