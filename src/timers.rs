use log::debug;

/// The delay and sound timers. Both count down by one per tick until they reach zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    pub delay: u8,
    pub sound: u8,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advances both timers by one tick and returns `true` if the sound timer just ran out,
    /// which is when the beeper sounds.
    pub fn tick(&mut self) -> bool {
        self.delay = self.delay.saturating_sub(1);

        if self.sound == 0 {
            return false;
        }

        self.sound -= 1;
        if self.sound == 0 {
            debug!("Sound timer ran out");
            return true;
        }

        false
    }
}
