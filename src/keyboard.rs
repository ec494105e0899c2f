use std::fmt::Display;

use log::warn;

pub const KEY_COUNT: usize = 16;

/// The 16 key hexadecimal keypad, keys are addressed by their value 0x0 to 0xF.
pub struct Keyboard {
    pressed_keys: [bool; KEY_COUNT],
    /// The last key that went from released to pressed and has not been consumed yet.
    fresh_press: Option<u8>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self {
            pressed_keys: [false; KEY_COUNT],
            fresh_press: None,
        }
    }

    pub fn is_pressed(&self, key: u8) -> bool {
        self.pressed_keys
            .get(key as usize)
            .copied()
            .unwrap_or(false)
    }

    pub fn key_down(&mut self, key: u8) {
        let Some(state) = self.pressed_keys.get_mut(key as usize) else {
            warn!("Ignoring press of unknown key {:#x}", key);
            return;
        };

        if !*state {
            self.fresh_press = Some(key);
        }
        *state = true;
    }

    pub fn key_up(&mut self, key: u8) {
        match self.pressed_keys.get_mut(key as usize) {
            Some(state) => *state = false,
            None => warn!("Ignoring release of unknown key {:#x}", key),
        }
    }

    pub fn clear(&mut self) {
        self.pressed_keys = [false; KEY_COUNT];
        self.fresh_press = None
    }

    /// Returns and forgets the most recent fresh press.
    pub fn take_fresh_press(&mut self) -> Option<u8> {
        self.fresh_press.take()
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Keyboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pressed_keys.map(|k| if k { "o" } else { " " }).join(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::assert_none;

    #[test]
    fn test_is_pressed() {
        let mut keyboard = Keyboard::new();

        let key: u8 = 0x4;
        keyboard.pressed_keys[key as usize] = true;

        assert!(keyboard.is_pressed(key));
        assert!(!keyboard.is_pressed(0x5));
    }

    #[test]
    fn test_key_down_up() {
        let mut keyboard = Keyboard::new();

        let key: u8 = 0xA;
        keyboard.key_down(key);

        assert!(keyboard.pressed_keys[key as usize]);
        assert_eq!(keyboard.fresh_press, Some(key));

        keyboard.key_up(key);
        assert!(!keyboard.is_pressed(key));
    }

    #[test]
    fn test_held_key_is_not_a_fresh_press() {
        let mut keyboard = Keyboard::new();

        keyboard.key_down(0x3);
        assert_eq!(keyboard.take_fresh_press(), Some(0x3));

        keyboard.key_down(0x3);
        assert_none!(keyboard.take_fresh_press());

        keyboard.key_up(0x3);
        keyboard.key_down(0x3);
        assert_eq!(keyboard.take_fresh_press(), Some(0x3));
    }

    #[test]
    fn test_out_of_range_keys_are_ignored() {
        let mut keyboard = Keyboard::new();

        keyboard.key_down(0x10);
        keyboard.key_up(0xFF);

        assert!(!keyboard.is_pressed(0x10));
        assert_none!(keyboard.take_fresh_press());
    }

    #[test]
    fn test_clear() {
        let mut keyboard = Keyboard::new();

        for key in 0..16 {
            keyboard.key_down(key);
            assert_eq!(keyboard.fresh_press, Some(key));
        }

        keyboard.clear();

        for key in 0..16 {
            assert!(!keyboard.is_pressed(key));
        }
        assert_eq!(keyboard.fresh_press, None);
    }

    #[test]
    fn test_display() {
        let mut keyboard = Keyboard::new();
        keyboard.key_down(0x0);
        keyboard.key_down(0xF);

        assert_eq!(keyboard.to_string(), format!("o{}o", " ".repeat(14)));
    }
}
