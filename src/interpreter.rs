use log::{debug, error, trace, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    display::{Display, Frame},
    error::{LoadError, MachineError},
    instruction::{Instruction, Register},
    keyboard::Keyboard,
    memory::Memory,
    registers::Registers,
    stack::{CallStack, StackFault},
    timers::Timers,
};

/// What the interpreter does on the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Fetch and execute the instruction at pc.
    Running,
    /// Suspended on `Fx0A` until a key is pressed, the key goes into `Vx`.
    WaitingForKey { x: Register },
    /// Stopped by a fatal error.
    Halted,
}

/// What happened during one tick of the machine.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Cycle {
    /// Set when the screen changed during this tick.
    pub frame: Option<Frame>,
    /// Set when the sound timer ran out during this tick.
    pub beep: bool,
}

/// The whole machine. It owns every piece of hardware state, nothing else may touch it.
pub struct Interpreter {
    registers: Registers,
    memory: Memory,
    stack: CallStack,
    timers: Timers,
    display: Display,
    keyboard: Keyboard,
    state: State,
    rng: ChaCha8Rng,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_rng(ChaCha8Rng::from_entropy())
    }

    /// Makes `Cxkk` reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(rng: ChaCha8Rng) -> Self {
        Interpreter {
            registers: Registers::new(),
            memory: Memory::new(),
            stack: CallStack::new(),
            timers: Timers::new(),
            display: Display::new(),
            keyboard: Keyboard::new(),
            state: State::Running,
            rng,
        }
    }

    /// Puts the machine back into its power-on state. The loaded program is gone afterwards.
    pub fn reset(&mut self) {
        self.registers = Registers::new();
        self.memory.reset();
        self.stack.clear();
        self.timers.reset();
        self.display = Display::new();
        self.keyboard.clear();
        self.state = State::Running;
    }

    pub fn load_program(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        self.memory.load_program(bytes)
    }

    /// One tick of the machine: execute one instruction, advance the timers and collect
    /// a frame if the screen changed.
    pub fn cycle(&mut self) -> Result<Cycle, MachineError> {
        self.step()?;

        let beep = self.timers.tick();
        let frame = self.display.take_frame();
        if let Some(frame) = &frame {
            trace!("Frame\n{}", frame);
        }

        Ok(Cycle { frame, beep })
    }

    /// Executes the instruction at pc, or keeps waiting for a key.
    pub fn step(&mut self) -> Result<(), MachineError> {
        match self.state {
            State::Halted => Err(MachineError::Halted),
            State::WaitingForKey { x } => {
                self.resume_wait_for_key(x);
                Ok(())
            }
            State::Running => {
                let opcode = self.memory.read_u16(self.registers.pc);
                let instruction = Instruction::decode(opcode);
                debug!("{:#05x}: {:04x}  {}", self.registers.pc, opcode, instruction);

                self.execute(instruction).map_err(|e| {
                    error!("Halting: {}", e);
                    self.state = State::Halted;
                    e
                })
            }
        }
    }

    fn execute(&mut self, instruction: Instruction) -> Result<(), MachineError> {
        use Instruction::*;

        match instruction {
            Clear => self.handle_clear(),
            Return => self.handle_ret()?,
            Jump(nnn) => self.handle_jump(nnn),
            Call(nnn) => self.handle_call(nnn)?,
            SkipIfEqualImmediate { x, kk } => self.handle_skip_if_equal_immediate(x, kk),
            SkipIfNotEqualImmediate { x, kk } => self.handle_skip_if_not_equal_immediate(x, kk),
            SkipIfEqualRegister { x, y } => self.handle_skip_if_equal_register(x, y),
            LoadImmediate { x, kk } => self.handle_load_register_immediate(x, kk),
            AddImmediate { x, kk } => self.handle_add_register_immediate(x, kk),
            LoadRegister { x, y } => self.handle_load_register_register(x, y),
            Or { x, y } => self.handle_or_register_register(x, y),
            And { x, y } => self.handle_and_register_register(x, y),
            Xor { x, y } => self.handle_xor_register_register(x, y),
            AddRegister { x, y } => self.handle_add_register_register(x, y),
            SubRegister { x, y } => self.handle_sub_register_register(x, y),
            ShiftRight { x } => self.handle_shift_right_register_one(x),
            SubRegisterNegated { x, y } => self.handle_sub_register_register_negated(x, y),
            ShiftLeft { x } => self.handle_shift_left_register_one(x),
            SkipIfNotEqualRegister { x, y } => self.handle_skip_if_not_equal_register(x, y),
            LoadIndex(nnn) => self.handle_load_index(nnn),
            JumpOffset(nnn) => self.handle_jump_offset(nnn),
            Random { x, kk } => self.handle_random(x, kk),
            Draw { x, y, n } => self.handle_draw_sprite(x, y, n),
            SkipIfPressed { x } => self.handle_skip_if_pressed(x),
            SkipIfNotPressed { x } => self.handle_skip_if_not_pressed(x),
            LoadDelay { x } => self.handle_load_delay(x),
            WaitForKey { x } => self.handle_wait_for_key(x),
            SetDelay { x } => self.handle_set_delay(x),
            SetSound { x } => self.handle_set_sound(x),
            AddIndex { x } => self.handle_add_index(x),
            LoadFont { x } => self.handle_load_font(x),
            StoreBcd { x } => self.handle_store_bcd(x),
            StoreRegisters { x } => self.handle_store_registers(x),
            LoadRegisters { x } => self.handle_load_registers(x),
            Unknown(opcode) => {
                warn!("Unknown instruction {:#06x} at {:#05x}", opcode, self.registers.pc);
                self.registers.advance();
            }
        }

        Ok(())
    }

    /// 00E0 - CLS
    /// Clear the display.
    fn handle_clear(&mut self) {
        self.display.clear();
        self.registers.advance();
    }

    /// 00EE - RET
    /// Return from a subroutine.
    ///
    /// The interpreter sets the program counter to the address at the top of the stack, then subtracts 1 from the stack pointer.
    fn handle_ret(&mut self) -> Result<(), MachineError> {
        let pc = self.registers.pc;
        self.registers.pc = self.stack.pop().map_err(|fault| stack_error(fault, pc))?;
        Ok(())
    }

    /// 1nnn - JP addr
    /// Jump to location nnn.
    fn handle_jump(&mut self, nnn: u16) {
        self.registers.pc = nnn;
    }

    /// 2nnn - CALL addr
    /// Call subroutine at nnn.
    ///
    /// The address of the following instruction goes on the stack, then the PC is set to nnn.
    fn handle_call(&mut self, nnn: u16) -> Result<(), MachineError> {
        let pc = self.registers.pc;
        self.stack
            .push(pc.wrapping_add(2))
            .map_err(|fault| stack_error(fault, pc))?;
        trace!("CALL {:#05x}, stack depth {}", nnn, self.stack.depth());
        self.registers.pc = nnn;
        Ok(())
    }

    /// 3xkk - SE Vx, byte
    /// Skip next instruction if Vx = kk.
    fn handle_skip_if_equal_immediate(&mut self, x: Register, kk: u8) {
        self.skip_if(self.registers.vx[x] == kk);
    }

    /// 4xkk - SNE Vx, byte
    /// Skip next instruction if Vx != kk.
    fn handle_skip_if_not_equal_immediate(&mut self, x: Register, kk: u8) {
        self.skip_if(self.registers.vx[x] != kk);
    }

    /// 5xy0 - SE Vx, Vy
    /// Skip next instruction if Vx = Vy.
    fn handle_skip_if_equal_register(&mut self, x: Register, y: Register) {
        self.skip_if(self.registers.vx[x] == self.registers.vx[y]);
    }

    /// 6xkk - LD Vx, byte
    /// Set Vx = kk.
    fn handle_load_register_immediate(&mut self, x: Register, kk: u8) {
        self.registers.vx[x] = kk;
        self.registers.advance();
    }

    /// 7xkk - ADD Vx, byte
    /// Set Vx = Vx + kk. VF is left alone, there is no carry.
    fn handle_add_register_immediate(&mut self, x: Register, kk: u8) {
        self.registers.vx[x] = self.registers.vx[x].wrapping_add(kk);
        self.registers.advance();
    }

    /// 8xy0 - LD Vx, Vy
    /// Set Vx = Vy.
    fn handle_load_register_register(&mut self, x: Register, y: Register) {
        self.registers.vx[x] = self.registers.vx[y];
        self.registers.advance();
    }

    /// 8xy1 - OR Vx, Vy
    /// Set Vx = Vx OR Vy.
    fn handle_or_register_register(&mut self, x: Register, y: Register) {
        self.registers.vx[x] |= self.registers.vx[y];
        self.registers.advance();
    }

    /// 8xy2 - AND Vx, Vy
    /// Set Vx = Vx AND Vy.
    fn handle_and_register_register(&mut self, x: Register, y: Register) {
        self.registers.vx[x] &= self.registers.vx[y];
        self.registers.advance();
    }

    /// 8xy3 - XOR Vx, Vy
    /// Set Vx = Vx XOR Vy.
    fn handle_xor_register_register(&mut self, x: Register, y: Register) {
        self.registers.vx[x] ^= self.registers.vx[y];
        self.registers.advance();
    }

    /// 8xy4 - ADD Vx, Vy
    /// Set Vx = Vx + Vy, set VF = carry.
    ///
    /// The values of Vx and Vy are added together. If the result is greater than 8 bits
    /// (i.e., > 255,) VF is set to 1, otherwise 0. Only the lowest 8 bits of the result are kept, and stored in Vx.
    fn handle_add_register_register(&mut self, x: Register, y: Register) {
        let (result, overflow) = self.registers.vx[x].overflowing_add(self.registers.vx[y]);

        self.registers.vx[x] = result;
        self.registers.set_flag(overflow);
        self.registers.advance();
    }

    /// 8xy5 - SUB Vx, Vy
    /// Set Vx = Vx - Vy, set VF = NOT borrow.
    ///
    /// VF is 1 if Vx >= Vy, otherwise 0. The difference wraps around.
    fn handle_sub_register_register(&mut self, x: Register, y: Register) {
        let a = self.registers.vx[x];
        let b = self.registers.vx[y];

        self.registers.vx[x] = a.wrapping_sub(b);
        self.registers.set_flag(a >= b);
        self.registers.advance();
    }

    /// 8xy6 - SHR Vx {, Vy}
    /// Set Vx = Vx SHR 1, VF = the bit shifted out.
    fn handle_shift_right_register_one(&mut self, x: Register) {
        let a = self.registers.vx[x];

        self.registers.vx[x] = a >> 1;
        self.registers.set_flag(a & 1 == 1);
        self.registers.advance();
    }

    /// 8xy7 - SUBN Vx, Vy
    /// Set Vx = Vy - Vx, set VF = NOT borrow.
    ///
    /// VF is 1 if Vy >= Vx, otherwise 0. The difference wraps around.
    fn handle_sub_register_register_negated(&mut self, x: Register, y: Register) {
        let a = self.registers.vx[x];
        let b = self.registers.vx[y];

        self.registers.vx[x] = b.wrapping_sub(a);
        self.registers.set_flag(b >= a);
        self.registers.advance();
    }

    /// 8xyE - SHL Vx {, Vy}
    /// Set Vx = Vx SHL 1, VF = the bit shifted out.
    fn handle_shift_left_register_one(&mut self, x: Register) {
        let a = self.registers.vx[x];

        self.registers.vx[x] = a << 1;
        self.registers.set_flag(a & 0b1000_0000 != 0);
        self.registers.advance();
    }

    /// 9xy0 - SNE Vx, Vy
    /// Skip next instruction if Vx != Vy.
    fn handle_skip_if_not_equal_register(&mut self, x: Register, y: Register) {
        self.skip_if(self.registers.vx[x] != self.registers.vx[y]);
    }

    /// Annn - LD I, addr
    /// Set I = nnn.
    fn handle_load_index(&mut self, nnn: u16) {
        self.registers.i = nnn;
        self.registers.advance();
    }

    /// Bnnn - JP V0, addr
    /// Jump to location nnn + V0.
    fn handle_jump_offset(&mut self, nnn: u16) {
        self.registers.pc = (nnn + self.registers.vx[0] as u16) & 0x0FFF;
    }

    /// Cxkk - RND Vx, byte
    /// Set Vx = random byte AND kk.
    fn handle_random(&mut self, x: Register, kk: u8) {
        self.registers.vx[x] = self.rng.gen::<u8>() & kk;
        self.registers.advance();
    }

    /// Dxyn - DRW Vx, Vy, nibble
    /// Display n-byte sprite starting at memory location I at (Vx, Vy), set VF = collision.
    ///
    /// The interpreter reads n bytes from memory, starting at the address stored in I. These bytes
    /// are then displayed as sprites on screen at coordinates (Vx, Vy). Sprites are XORed onto the
    /// existing screen. If this causes any pixels to be erased, VF is set to 1, otherwise it is set
    /// to 0. If the sprite is positioned so part of it is outside the coordinates of the display, it
    /// wraps around to the opposite side of the screen.
    fn handle_draw_sprite(&mut self, x: Register, y: Register, n: u8) {
        let sprite: Vec<u8> = (0..n as u16)
            .map(|offset| self.memory.read(self.registers.i.wrapping_add(offset)))
            .collect();

        let col = self.registers.vx[x] as usize;
        let row = self.registers.vx[y] as usize;
        let collision = self.display.draw_sprite(col, row, &sprite);

        self.registers.set_flag(collision);
        self.registers.advance();
    }

    /// Ex9E - SKP Vx
    /// Skip next instruction if key with the value of Vx is pressed.
    fn handle_skip_if_pressed(&mut self, x: Register) {
        let key = self.registers.vx[x] & 0xF;
        self.skip_if(self.keyboard.is_pressed(key));
    }

    /// ExA1 - SKNP Vx
    /// Skip next instruction if key with the value of Vx is not pressed.
    fn handle_skip_if_not_pressed(&mut self, x: Register) {
        let key = self.registers.vx[x] & 0xF;
        self.skip_if(!self.keyboard.is_pressed(key));
    }

    /// Fx07 - LD Vx, DT
    /// Set Vx = delay timer value.
    fn handle_load_delay(&mut self, x: Register) {
        self.registers.vx[x] = self.timers.delay;
        self.registers.advance();
    }

    /// Fx0A - LD Vx, K
    /// Wait for a key press, store the value of the key in Vx.
    ///
    /// Only presses that happen after this instruction started count. The timers keep
    /// running while waiting, pc stays on this instruction until a key arrives.
    fn handle_wait_for_key(&mut self, x: Register) {
        self.keyboard.take_fresh_press();
        self.state = State::WaitingForKey { x };
    }

    fn resume_wait_for_key(&mut self, x: Register) {
        if let Some(key) = self.keyboard.take_fresh_press() {
            debug!("Key {:#x} pressed, resuming", key);
            self.registers.vx[x] = key;
            self.registers.advance();
            self.state = State::Running;
        }
    }

    /// Fx15 - LD DT, Vx
    /// Set delay timer = Vx.
    fn handle_set_delay(&mut self, x: Register) {
        self.timers.delay = self.registers.vx[x];
        self.registers.advance();
    }

    /// Fx18 - LD ST, Vx
    /// Set sound timer = Vx.
    fn handle_set_sound(&mut self, x: Register) {
        self.timers.sound = self.registers.vx[x];
        self.registers.advance();
    }

    /// Fx1E - ADD I, Vx
    /// Set I = I + Vx.
    fn handle_add_index(&mut self, x: Register) {
        self.registers.i = self.registers.i.wrapping_add(self.registers.vx[x] as u16);
        self.registers.advance();
    }

    /// Fx29 - LD F, Vx
    /// Set I = location of sprite for digit Vx.
    fn handle_load_font(&mut self, x: Register) {
        self.registers.i = Memory::font_address(self.registers.vx[x]);
        self.registers.advance();
    }

    /// Fx33 - LD B, Vx
    /// Store BCD representation of Vx in memory locations I, I+1, and I+2.
    ///
    /// The interpreter takes the decimal value of Vx, and places the hundreds digit in memory at
    /// location in I, the tens digit at location I+1, and the ones digit at location I+2.
    fn handle_store_bcd(&mut self, x: Register) {
        let value = self.registers.vx[x];
        let i = self.registers.i;

        self.memory.write(i, value / 100);
        self.memory.write(i.wrapping_add(1), (value / 10) % 10);
        self.memory.write(i.wrapping_add(2), value % 10);
        self.registers.advance();
    }

    /// Fx55 - LD [I], Vx
    /// Store registers V0 through Vx in memory starting at location I. I itself is not changed.
    fn handle_store_registers(&mut self, x: Register) {
        for offset in 0..=x {
            let address = self.registers.i.wrapping_add(offset as u16);
            self.memory.write(address, self.registers.vx[offset]);
        }
        self.registers.advance();
    }

    /// Fx65 - LD Vx, [I]
    /// Read registers V0 through Vx from memory starting at location I. I itself is not changed.
    fn handle_load_registers(&mut self, x: Register) {
        for offset in 0..=x {
            let address = self.registers.i.wrapping_add(offset as u16);
            self.registers.vx[offset] = self.memory.read(address);
        }
        self.registers.advance();
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.registers.skip();
        } else {
            self.registers.advance();
        }
    }

    pub fn keyboard_mut(&mut self) -> &mut Keyboard {
        &mut self.keyboard
    }

    pub fn state(&self) -> State {
        self.state
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn stack_error(fault: StackFault, pc: u16) -> MachineError {
    match fault {
        StackFault::Overflow => MachineError::StackOverflow { pc },
        StackFault::Underflow => MachineError::StackUnderflow { pc },
    }
}
