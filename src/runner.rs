//! The fixed rate execution loop.
//!
//! The interpreter lives on its own thread and is only reachable through two channels:
//! key events and the quit request go in, frames and beeps come out.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::{display::Frame, error::MachineError, interpreter::Interpreter};

/// One instruction and one timer decrement per tick, about 60 Hz.
pub const DEFAULT_TICK: Duration = Duration::from_millis(16);

#[derive(Debug, Clone)]
pub struct Config {
    pub tick: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config { tick: DEFAULT_TICK }
    }
}

/// Sent by the input source to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(u8),
    KeyUp(u8),
    Quit,
}

/// Sent by the machine to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineEvent {
    Frame(Frame),
    Beep,
}

/// How the loop ended when it was not a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
}

/// Runs `interpreter` until a quit request arrives, the input side hangs up, or a fatal error halts it.
pub fn run(
    interpreter: &mut Interpreter,
    config: &Config,
    input: &Receiver<InputEvent>,
    output: &Sender<MachineEvent>,
) -> Result<Exit, MachineError> {
    let mut deadline = Instant::now();

    loop {
        loop {
            match input.try_recv() {
                Ok(event) => {
                    if apply(interpreter, event) {
                        return Ok(Exit::Quit);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(hang_up()),
            }
        }

        let cycle = interpreter.cycle()?;

        // Nobody listening is not our problem, the input side decides when to stop
        if let Some(frame) = cycle.frame {
            output.send(MachineEvent::Frame(frame)).ok();
        }
        if cycle.beep {
            output.send(MachineEvent::Beep).ok();
        }

        deadline += config.tick;
        let now = Instant::now();
        if now > deadline + config.tick {
            debug!("Running {:?} behind, skipping ahead", now - deadline);
            deadline = now;
        }

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            match input.recv_timeout(deadline - now) {
                Ok(event) => {
                    if apply(interpreter, event) {
                        return Ok(Exit::Quit);
                    }
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return Ok(hang_up()),
            }
        }
    }
}

/// Returns `true` for a quit request.
fn apply(interpreter: &mut Interpreter, event: InputEvent) -> bool {
    match event {
        InputEvent::KeyDown(key) => interpreter.keyboard_mut().key_down(key),
        InputEvent::KeyUp(key) => interpreter.keyboard_mut().key_up(key),
        InputEvent::Quit => {
            info!("Quit requested");
            return true;
        }
    }
    false
}

fn hang_up() -> Exit {
    info!("Input closed, stopping");
    Exit::Quit
}

/// A machine running on its own thread.
pub struct MachineHandle {
    input: Sender<InputEvent>,
    output: Receiver<MachineEvent>,
    thread: JoinHandle<Result<Exit, MachineError>>,
}

impl MachineHandle {
    pub fn input(&self) -> &Sender<InputEvent> {
        &self.input
    }

    pub fn output(&self) -> &Receiver<MachineEvent> {
        &self.output
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Asks the machine to stop and waits for it.
    pub fn quit(self) -> Result<Exit, MachineError> {
        self.input.send(InputEvent::Quit).ok();
        self.join()
    }

    /// Waits for the machine to stop on its own.
    pub fn join(self) -> Result<Exit, MachineError> {
        let MachineHandle { input, output, thread } = self;
        drop(output);

        let result = thread.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
        drop(input);
        result
    }
}

pub fn spawn(mut interpreter: Interpreter, config: Config) -> std::io::Result<MachineHandle> {
    let (input, input_rx) = mpsc::channel();
    let (output_tx, output) = mpsc::channel();

    let thread = thread::Builder::new()
        .name("chip8-machine".into())
        .spawn(move || run(&mut interpreter, &config, &input_rx, &output_tx))?;

    Ok(MachineHandle { input, output, thread })
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::assert_matches;

    const FAST: Config = Config {
        tick: Duration::from_millis(1),
    };

    fn boot(program: &[u8]) -> Interpreter {
        let mut interpreter = Interpreter::with_seed(0);
        interpreter.load_program(program).unwrap();
        interpreter
    }

    fn next_event(handle: &MachineHandle) -> MachineEvent {
        handle.output().recv_timeout(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_quit_is_not_an_error() {
        // Jump to self forever
        let handle = spawn(boot(&[0x12, 0x00]), FAST).unwrap();

        assert_eq!(handle.quit(), Ok(Exit::Quit));
    }

    #[test]
    fn test_quit_within_one_tick() {
        let handle = spawn(boot(&[0x12, 0x00]), Config::default()).unwrap();
        thread::sleep(Duration::from_millis(50));

        let start = Instant::now();
        handle.input().send(InputEvent::Quit).unwrap();
        while !handle.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }

        assert!(start.elapsed() <= DEFAULT_TICK + Duration::from_millis(30));
        assert_eq!(handle.join(), Ok(Exit::Quit));
    }

    #[test]
    fn test_dropped_input_stops_machine() {
        let mut interpreter = boot(&[0x12, 0x00]);
        let (input, input_rx) = mpsc::channel();
        let (output, _output_rx) = mpsc::channel();
        drop(input);

        assert_eq!(run(&mut interpreter, &FAST, &input_rx, &output), Ok(Exit::Quit));
    }

    #[test]
    fn test_fatal_error_is_reported() {
        let handle = spawn(boot(&[0x00, 0xEE]), FAST).unwrap();

        assert_matches!(handle.join(), Err(MachineError::StackUnderflow { pc: 0x200 }));
    }

    #[test]
    fn test_frames_are_published() {
        // CLS, then jump to self
        let handle = spawn(boot(&[0x00, 0xE0, 0x12, 0x02]), FAST).unwrap();

        let MachineEvent::Frame(frame) = next_event(&handle) else {
            panic!("expected a frame");
        };
        assert!(frame.pixels().iter().all(|p| !p));

        // Nothing is drawn anymore, so no further frames
        assert!(handle.output().recv_timeout(Duration::from_millis(50)).is_err());
        assert_eq!(handle.quit(), Ok(Exit::Quit));
    }

    #[test]
    fn test_beep_is_published() {
        // LD V0, 1; LD ST, V0; jump to self
        let handle = spawn(boot(&[0x60, 0x01, 0xF0, 0x18, 0x12, 0x04]), FAST).unwrap();

        assert_eq!(next_event(&handle), MachineEvent::Beep);
        assert_eq!(handle.quit(), Ok(Exit::Quit));
    }

    #[test]
    fn test_key_events_reach_the_machine() {
        // LD V0, K; LD F, V0; DRW V1, V1, 5; jump to self
        let program = [0xF0, 0x0A, 0xF0, 0x29, 0xD1, 0x15, 0x12, 0x06];
        let handle = spawn(boot(&program), FAST).unwrap();
        thread::sleep(Duration::from_millis(20));

        handle.input().send(InputEvent::KeyDown(0x1)).unwrap();
        handle.input().send(InputEvent::KeyUp(0x1)).unwrap();

        let MachineEvent::Frame(frame) = next_event(&handle) else {
            panic!("expected a frame");
        };
        // Glyph "1" is 0x20, 0x60, 0x20, 0x20, 0x70
        assert!(!frame.pixel(0, 0));
        assert!(frame.pixel(2, 0));
        assert!(frame.pixel(1, 1));
        assert!(frame.pixel(1, 4));
        assert!(frame.pixel(3, 4));

        assert_eq!(handle.quit(), Ok(Exit::Quit));
    }
}
