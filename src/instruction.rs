use std::fmt;

/// Index of one of the general purpose registers V0 to VF.
pub type Register = usize;

/// A decoded Chip-8 instruction.
///
/// Opcodes are 16 bits each, the variant is selected by some combination of their nibbles:
/// - `(n, _, _, _)` broad categorization; applies to all opcodes
/// - `(_, _, _, n)` specific behavior within the `8xy_` category
/// - `(_, _, n, n)` specific behavior within the `Ex__` and `Fx__` categories
///
/// The remaining nibbles carry the operands:
/// - `(_, n, n, n)` a 12-bit address `nnn`
/// - `(_, _, n, n)` an immediate byte `kk`
/// - `(_, n, _, _)` the register Vx
/// - `(_, _, n, _)` the register Vy
/// - `(_, _, _, n)` the sprite height of DRW
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0 - CLS
    Clear,
    /// 00EE - RET
    Return,
    /// 1nnn - JP addr
    Jump(u16),
    /// 2nnn - CALL addr
    Call(u16),
    /// 3xkk - SE Vx, byte
    SkipIfEqualImmediate { x: Register, kk: u8 },
    /// 4xkk - SNE Vx, byte
    SkipIfNotEqualImmediate { x: Register, kk: u8 },
    /// 5xy0 - SE Vx, Vy
    SkipIfEqualRegister { x: Register, y: Register },
    /// 6xkk - LD Vx, byte
    LoadImmediate { x: Register, kk: u8 },
    /// 7xkk - ADD Vx, byte
    AddImmediate { x: Register, kk: u8 },
    /// 8xy0 - LD Vx, Vy
    LoadRegister { x: Register, y: Register },
    /// 8xy1 - OR Vx, Vy
    Or { x: Register, y: Register },
    /// 8xy2 - AND Vx, Vy
    And { x: Register, y: Register },
    /// 8xy3 - XOR Vx, Vy
    Xor { x: Register, y: Register },
    /// 8xy4 - ADD Vx, Vy
    AddRegister { x: Register, y: Register },
    /// 8xy5 - SUB Vx, Vy
    SubRegister { x: Register, y: Register },
    /// 8xy6 - SHR Vx {, Vy}
    ShiftRight { x: Register },
    /// 8xy7 - SUBN Vx, Vy
    SubRegisterNegated { x: Register, y: Register },
    /// 8xyE - SHL Vx {, Vy}
    ShiftLeft { x: Register },
    /// 9xy0 - SNE Vx, Vy
    SkipIfNotEqualRegister { x: Register, y: Register },
    /// Annn - LD I, addr
    LoadIndex(u16),
    /// Bnnn - JP V0, addr
    JumpOffset(u16),
    /// Cxkk - RND Vx, byte
    Random { x: Register, kk: u8 },
    /// Dxyn - DRW Vx, Vy, nibble
    Draw { x: Register, y: Register, n: u8 },
    /// Ex9E - SKP Vx
    SkipIfPressed { x: Register },
    /// ExA1 - SKNP Vx
    SkipIfNotPressed { x: Register },
    /// Fx07 - LD Vx, DT
    LoadDelay { x: Register },
    /// Fx0A - LD Vx, K
    WaitForKey { x: Register },
    /// Fx15 - LD DT, Vx
    SetDelay { x: Register },
    /// Fx18 - LD ST, Vx
    SetSound { x: Register },
    /// Fx1E - ADD I, Vx
    AddIndex { x: Register },
    /// Fx29 - LD F, Vx
    LoadFont { x: Register },
    /// Fx33 - LD B, Vx
    StoreBcd { x: Register },
    /// Fx55 - LD [I], Vx
    StoreRegisters { x: Register },
    /// Fx65 - LD Vx, [I]
    LoadRegisters { x: Register },
    /// Anything else, including the machine code routines of `0nnn`.
    Unknown(u16),
}

impl Instruction {
    pub fn decode(opcode: u16) -> Self {
        use Instruction::*;

        let nibbles = (
            ((opcode & 0xF000) >> 12) as u8,
            ((opcode & 0x0F00) >> 8) as u8,
            ((opcode & 0x00F0) >> 4) as u8,
            (opcode & 0x000F) as u8,
        );
        let x = nibbles.1 as Register;
        let y = nibbles.2 as Register;
        let n = nibbles.3;
        let kk = (opcode & 0x00FF) as u8;
        let nnn = opcode & 0x0FFF;

        match nibbles {
            (0x0, 0x0, 0xE, 0x0) => Clear,
            (0x0, 0x0, 0xE, 0xE) => Return,
            (0x1, ..) => Jump(nnn),
            (0x2, ..) => Call(nnn),
            (0x3, ..) => SkipIfEqualImmediate { x, kk },
            (0x4, ..) => SkipIfNotEqualImmediate { x, kk },
            (0x5, .., 0x0) => SkipIfEqualRegister { x, y },
            (0x6, ..) => LoadImmediate { x, kk },
            (0x7, ..) => AddImmediate { x, kk },
            (0x8, .., 0x0) => LoadRegister { x, y },
            (0x8, .., 0x1) => Or { x, y },
            (0x8, .., 0x2) => And { x, y },
            (0x8, .., 0x3) => Xor { x, y },
            (0x8, .., 0x4) => AddRegister { x, y },
            (0x8, .., 0x5) => SubRegister { x, y },
            (0x8, .., 0x6) => ShiftRight { x },
            (0x8, .., 0x7) => SubRegisterNegated { x, y },
            (0x8, .., 0xE) => ShiftLeft { x },
            (0x9, .., 0x0) => SkipIfNotEqualRegister { x, y },
            (0xA, ..) => LoadIndex(nnn),
            (0xB, ..) => JumpOffset(nnn),
            (0xC, ..) => Random { x, kk },
            (0xD, ..) => Draw { x, y, n },
            (0xE, _, 0x9, 0xE) => SkipIfPressed { x },
            (0xE, _, 0xA, 0x1) => SkipIfNotPressed { x },
            (0xF, _, 0x0, 0x7) => LoadDelay { x },
            (0xF, _, 0x0, 0xA) => WaitForKey { x },
            (0xF, _, 0x1, 0x5) => SetDelay { x },
            (0xF, _, 0x1, 0x8) => SetSound { x },
            (0xF, _, 0x1, 0xE) => AddIndex { x },
            (0xF, _, 0x2, 0x9) => LoadFont { x },
            (0xF, _, 0x3, 0x3) => StoreBcd { x },
            (0xF, _, 0x5, 0x5) => StoreRegisters { x },
            (0xF, _, 0x6, 0x5) => LoadRegisters { x },
            _ => Unknown(opcode),
        }
    }
}

/// Disassembly in the usual Chip-8 mnemonics.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match *self {
            Clear => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump(nnn) => write!(f, "JP {:#05x}", nnn),
            Call(nnn) => write!(f, "CALL {:#05x}", nnn),
            SkipIfEqualImmediate { x, kk } => write!(f, "SE V{:X}, {:#04x}", x, kk),
            SkipIfNotEqualImmediate { x, kk } => write!(f, "SNE V{:X}, {:#04x}", x, kk),
            SkipIfEqualRegister { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            LoadImmediate { x, kk } => write!(f, "LD V{:X}, {:#04x}", x, kk),
            AddImmediate { x, kk } => write!(f, "ADD V{:X}, {:#04x}", x, kk),
            LoadRegister { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddRegister { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            SubRegister { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight { x } => write!(f, "SHR V{:X}", x),
            SubRegisterNegated { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x } => write!(f, "SHL V{:X}", x),
            SkipIfNotEqualRegister { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            LoadIndex(nnn) => write!(f, "LD I, {:#05x}", nnn),
            JumpOffset(nnn) => write!(f, "JP V0, {:#05x}", nnn),
            Random { x, kk } => write!(f, "RND V{:X}, {:#04x}", x, kk),
            Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipIfPressed { x } => write!(f, "SKP V{:X}", x),
            SkipIfNotPressed { x } => write!(f, "SKNP V{:X}", x),
            LoadDelay { x } => write!(f, "LD V{:X}, DT", x),
            WaitForKey { x } => write!(f, "LD V{:X}, K", x),
            SetDelay { x } => write!(f, "LD DT, V{:X}", x),
            SetSound { x } => write!(f, "LD ST, V{:X}", x),
            AddIndex { x } => write!(f, "ADD I, V{:X}", x),
            LoadFont { x } => write!(f, "LD F, V{:X}", x),
            StoreBcd { x } => write!(f, "LD B, V{:X}", x),
            StoreRegisters { x } => write!(f, "LD [I], V{:X}", x),
            LoadRegisters { x } => write!(f, "LD V{:X}, [I]", x),
            Unknown(opcode) => write!(f, "DW {:#06x}", opcode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Instruction::{self, *};
    use quickcheck_macros::quickcheck;
    use test_case::test_case;

    #[test_case(0x00E0, Clear ; "CLS")]
    #[test_case(0x00EE, Return ; "RET")]
    #[test_case(0x1ABC, Jump(0xABC) ; "JP")]
    #[test_case(0x2123, Call(0x123) ; "CALL")]
    #[test_case(0x3A42, SkipIfEqualImmediate { x: 0xA, kk: 0x42 } ; "SE immediate")]
    #[test_case(0x4B13, SkipIfNotEqualImmediate { x: 0xB, kk: 0x13 } ; "SNE immediate")]
    #[test_case(0x5120, SkipIfEqualRegister { x: 1, y: 2 } ; "SE register")]
    #[test_case(0x6010, LoadImmediate { x: 0, kk: 0x10 } ; "LD immediate")]
    #[test_case(0x7005, AddImmediate { x: 0, kk: 0x05 } ; "ADD immediate")]
    #[test_case(0x8AC0, LoadRegister { x: 0xA, y: 0xC } ; "LD register")]
    #[test_case(0x8BD1, Or { x: 0xB, y: 0xD } ; "OR")]
    #[test_case(0x8E12, And { x: 0xE, y: 0x1 } ; "AND")]
    #[test_case(0x8973, Xor { x: 0x9, y: 0x7 } ; "XOR")]
    #[test_case(0x8014, AddRegister { x: 0, y: 1 } ; "ADD register")]
    #[test_case(0x8015, SubRegister { x: 0, y: 1 } ; "SUB")]
    #[test_case(0x8346, ShiftRight { x: 3 } ; "SHR")]
    #[test_case(0x8D47, SubRegisterNegated { x: 0xD, y: 0x4 } ; "SUBN")]
    #[test_case(0x853E, ShiftLeft { x: 5 } ; "SHL")]
    #[test_case(0x9750, SkipIfNotEqualRegister { x: 7, y: 5 } ; "SNE register")]
    #[test_case(0xA678, LoadIndex(0x678) ; "LD I")]
    #[test_case(0xB300, JumpOffset(0x300) ; "JP V0")]
    #[test_case(0xC40F, Random { x: 4, kk: 0x0F } ; "RND")]
    #[test_case(0xD125, Draw { x: 1, y: 2, n: 5 } ; "DRW")]
    #[test_case(0xE69E, SkipIfPressed { x: 6 } ; "SKP")]
    #[test_case(0xE6A1, SkipIfNotPressed { x: 6 } ; "SKNP")]
    #[test_case(0xF207, LoadDelay { x: 2 } ; "LD Vx DT")]
    #[test_case(0xF20A, WaitForKey { x: 2 } ; "LD Vx K")]
    #[test_case(0xF215, SetDelay { x: 2 } ; "LD DT Vx")]
    #[test_case(0xF218, SetSound { x: 2 } ; "LD ST Vx")]
    #[test_case(0xF21E, AddIndex { x: 2 } ; "ADD I Vx")]
    #[test_case(0xF229, LoadFont { x: 2 } ; "LD F Vx")]
    #[test_case(0xF233, StoreBcd { x: 2 } ; "LD B Vx")]
    #[test_case(0xF255, StoreRegisters { x: 2 } ; "LD [I] Vx")]
    #[test_case(0xF265, LoadRegisters { x: 2 } ; "LD Vx [I]")]
    fn test_decode(opcode: u16, instruction: Instruction) {
        assert_eq!(Instruction::decode(opcode), instruction);
    }

    #[test_case(0x0000 ; "zero")]
    #[test_case(0x0123 ; "machine code routine")]
    #[test_case(0x00E1 ; "near CLS")]
    #[test_case(0x5121 ; "SE register with trailing nibble")]
    #[test_case(0x8008 ; "ALU selector 8")]
    #[test_case(0x800F ; "ALU selector F")]
    #[test_case(0x9121 ; "SNE register with trailing nibble")]
    #[test_case(0xE100 ; "key group")]
    #[test_case(0xF0FF ; "misc group")]
    fn test_decode_unknown(opcode: u16) {
        assert_eq!(Instruction::decode(opcode), Unknown(opcode));
    }

    #[quickcheck]
    fn test_decode_unknown_keeps_opcode(opcode: u16) -> bool {
        match Instruction::decode(opcode) {
            Unknown(inner) => inner == opcode,
            _ => true,
        }
    }

    #[test_case(0x00E0, "CLS")]
    #[test_case(0x2123, "CALL 0x123")]
    #[test_case(0x6A0F, "LD VA, 0x0f")]
    #[test_case(0xD125, "DRW V1, V2, 5")]
    #[test_case(0xF30A, "LD V3, K")]
    #[test_case(0xF955, "LD [I], V9")]
    #[test_case(0x0123, "DW 0x0123")]
    fn test_disassembly(opcode: u16, text: &str) {
        assert_eq!(Instruction::decode(opcode).to_string(), text);
    }
}
