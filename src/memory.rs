use log::{debug, warn};

use crate::error::LoadError;

pub const MEMORY_SIZE: usize = 0x1000;
pub const START_PROGRAM: usize = 0x200;
pub const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - START_PROGRAM;
pub const FONT_START: usize = 0x50;
/// Every glyph of the built-in font is five rows tall.
pub const FONT_GLYPH_SIZE: usize = 5;

const ADDRESS_MASK: u16 = 0x0FFF;

const FONT_DATA: &[u8] = &[
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// 4 KiB of byte addressable memory. Everything below `START_PROGRAM` belongs to the
/// interpreter (the font lives there), programs are loaded right after it.
#[derive(Debug)]
pub(crate) struct Memory(pub [u8; MEMORY_SIZE]);

impl Memory {
    pub fn new() -> Self {
        let mut memory = Memory([0; MEMORY_SIZE]);
        memory.reset();
        memory
    }

    /// Zeroes everything and seeds the font again.
    pub fn reset(&mut self) {
        self.0.fill(0);
        self.0[FONT_START..FONT_START + FONT_DATA.len()].copy_from_slice(FONT_DATA);
    }

    pub fn load_program(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        let size = bytes.len();
        if size > MAX_PROGRAM_SIZE {
            return Err(LoadError::TooLarge {
                size,
                max: MAX_PROGRAM_SIZE,
            });
        }

        self.0[START_PROGRAM..START_PROGRAM + size].copy_from_slice(bytes);

        debug!("Loaded {} bytes at {:#05x}", size, START_PROGRAM);
        for (i, line) in bytes.chunks(8).enumerate() {
            let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
            debug!("{:#05x}: {}", START_PROGRAM + i * 8, hex.join(" "));
        }

        Ok(())
    }

    /// Reads the big endian word at `address`. Addresses wrap inside the 12-bit address space.
    pub fn read_u16(&self, address: u16) -> u16 {
        let hi = self.read(address);
        let lo = self.read(address.wrapping_add(1));
        u16::from_be_bytes([hi, lo])
    }

    pub fn read(&self, address: u16) -> u8 {
        self.0[(address & ADDRESS_MASK) as usize]
    }

    /// Stores `value` at `address`. Writes into the interpreter area are dropped.
    pub fn write(&mut self, address: u16, value: u8) {
        let address = (address & ADDRESS_MASK) as usize;
        if address < START_PROGRAM {
            warn!("Dropped write of {:#04x} to reserved address {:#05x}", value, address);
            return;
        }

        self.0[address] = value;
    }

    /// Address of the font glyph for the hex digit `digit`.
    pub fn font_address(digit: u8) -> u16 {
        (FONT_START + (digit & 0xF) as usize * FONT_GLYPH_SIZE) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::{assert_matches, assert_ok};
    use fake::{Dummy, Fake, Faker};
    use quickcheck_macros::quickcheck;
    use rand::{rngs::StdRng, SeedableRng};

    #[derive(Debug, Clone, Dummy)]
    struct ProgramFixture {
        #[dummy(faker = "(Faker, 1..3584)")]
        bytes: Vec<u8>,
    }

    impl quickcheck::Arbitrary for ProgramFixture {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            let mut rng = StdRng::seed_from_u64(u64::arbitrary(g));

            Faker.fake_with_rng(&mut rng)
        }
    }

    #[quickcheck]
    fn test_load_program(program: ProgramFixture) {
        let num_bytes = program.bytes.len();

        let mut memory = Memory::new();
        assert_ok!(memory.load_program(&program.bytes));

        assert_eq!(memory.0[START_PROGRAM..START_PROGRAM + num_bytes], program.bytes);
        assert_eq!(memory.0[FONT_START..FONT_START + FONT_DATA.len()], *FONT_DATA);
    }

    #[test]
    fn test_load_program_exactly_max_size() {
        let mut memory = Memory::new();

        assert_ok!(memory.load_program(&[0xAB; MAX_PROGRAM_SIZE]));
        assert_eq!(memory.0[MEMORY_SIZE - 1], 0xAB);
    }

    #[test]
    fn test_load_program_too_large() {
        let mut memory = Memory::new();

        assert_matches!(
            memory.load_program(&[0xAB; MAX_PROGRAM_SIZE + 1]),
            Err(LoadError::TooLarge { size: 3585, max: 3584 })
        );
        assert!(memory.0[START_PROGRAM..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_reset_restores_font() {
        let mut memory = Memory::new();
        memory.load_program(&[1, 2, 3]).unwrap();
        memory.0[FONT_START] = 0;

        memory.reset();

        assert_eq!(memory.0[FONT_START..FONT_START + FONT_DATA.len()], *FONT_DATA);
        assert!(memory.0[START_PROGRAM..].iter().all(|b| *b == 0));
        assert!(memory.0[..FONT_START].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_read_u16_is_big_endian() {
        let mut memory = Memory::new();
        memory.load_program(&[0x12, 0x34]).unwrap();

        assert_eq!(memory.read_u16(START_PROGRAM as u16), 0x1234);
    }

    #[test]
    fn test_read_u16_wraps_at_end_of_memory() {
        let mut memory = Memory::new();
        memory.0[0xFFF] = 0xAA;
        memory.0[0x000] = 0xBB;

        assert_eq!(memory.read_u16(0xFFF), 0xAABB);
    }

    #[test]
    fn test_write_below_program_area_is_dropped() {
        let mut memory = Memory::new();

        memory.write(FONT_START as u16, 0x00);
        memory.write(0x300, 0x42);

        assert_eq!(memory.0[FONT_START], 0xF0);
        assert_eq!(memory.0[0x300], 0x42);
    }

    #[test]
    fn test_font_address() {
        assert_eq!(Memory::font_address(0x0), 0x50);
        assert_eq!(Memory::font_address(0xA), 0x50 + 50);
        assert_eq!(Memory::font_address(0x1F), 0x50 + 75);
    }
}
