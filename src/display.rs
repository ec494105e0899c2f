use std::fmt;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// The original implementation of the Chip-8 language used a 64x32-pixel monochrome display with this format:
/// ( 0, 0)   (63, 0)
/// ( 0,31)   (63,31)
///
/// Only CLS and DRW mutate it. Renderers never see it directly, they get a [`Frame`] whenever
/// something was drawn since the last one was taken.
pub struct Display {
    pixels: [bool; DISPLAY_WIDTH * DISPLAY_HEIGHT],
    dirty: bool,
}

impl Display {
    pub fn new() -> Self {
        Display {
            pixels: [false; DISPLAY_WIDTH * DISPLAY_HEIGHT],
            dirty: false,
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(false);
        self.dirty = true;
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[compute_idx(x, y)]
    }

    /// Xors the pixel at position (`x`, `y`) and returns `true`
    /// if the pixel was cleared. Coordinates wrap around the edges.
    pub fn xor_pixel(&mut self, x: usize, y: usize, value: bool) -> bool {
        let idx = compute_idx(x, y);
        let last_value = self.pixels[idx];
        let new_value = last_value ^ value;
        self.pixels[idx] = new_value;

        last_value && !new_value
    }

    /// Xors an 8 pixel wide sprite onto the screen with its top left corner at (`x`, `y`),
    /// one byte per row with the most significant bit leftmost. Returns `true` on collision.
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        let mut collision = false;

        for (row, line) in sprite.iter().enumerate() {
            for col in 0..8 {
                let value = line & (0b1000_0000 >> col) != 0;
                if value && self.xor_pixel(x + col, y + row, true) {
                    collision = true;
                }
            }
        }

        self.dirty = true;
        collision
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Snapshot of the screen if it changed since the last call.
    pub fn take_frame(&mut self) -> Option<Frame> {
        if !self.dirty {
            return None;
        }

        self.dirty = false;
        Some(Frame {
            pixels: self.pixels.to_vec(),
        })
    }

    pub fn pixels(&self) -> &[bool] {
        &self.pixels
    }

    pub fn width(&self) -> usize {
        DISPLAY_WIDTH
    }

    pub fn height(&self) -> usize {
        DISPLAY_HEIGHT
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

fn compute_idx(x: usize, y: usize) -> usize {
    (y % DISPLAY_HEIGHT) * DISPLAY_WIDTH + (x % DISPLAY_WIDTH)
}

/// An immutable copy of the display contents, handed to renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pixels: Vec<bool>,
}

impl Frame {
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[compute_idx(x, y)]
    }

    /// Pixels in row major order.
    pub fn pixels(&self) -> &[bool] {
        &self.pixels
    }

    pub fn width(&self) -> usize {
        DISPLAY_WIDTH
    }

    pub fn height(&self) -> usize {
        DISPLAY_HEIGHT
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.pixels.chunks(DISPLAY_WIDTH) {
            let line: String = row.iter().map(|p| if *p { 'W' } else { '-' }).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
