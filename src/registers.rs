use crate::memory::START_PROGRAM;

#[derive(Debug)]
pub(crate) struct Registers {
    /// 16 general purpose 8-bit registers, usually referred to as Vx, where x is a hexadecimal digit (0 through F).
    /// VF doubles as the flag register of the ALU and draw instructions.
    pub vx: [u8; 16],
    /// The index register, only the lowest 12 bits address memory.
    pub i: u16,
    /// Address of the next instruction to execute.
    pub pc: u16,
}

impl Registers {
    pub fn new() -> Self {
        Registers {
            vx: [0; 16],
            i: 0,
            pc: START_PROGRAM as u16,
        }
    }

    pub fn set_flag(&mut self, flag: bool) {
        self.vx[0xF] = flag as u8;
    }

    /// Moves the program counter past the current instruction.
    pub fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    /// Moves the program counter past the current and the next instruction.
    pub fn skip(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }
}
