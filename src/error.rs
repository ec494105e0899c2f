use std::path::PathBuf;

use thiserror::Error;

/// Failures while getting a program into memory. The machine never starts after one of these.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("program is too large ({size} bytes), max size is {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("unable to read program {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal faults that halt the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("stack overflow: CALL at {pc:#05x} with all 16 levels in use")]
    StackOverflow { pc: u16 },

    #[error("stack underflow: RET at {pc:#05x} with an empty call stack")]
    StackUnderflow { pc: u16 },

    #[error("machine is halted")]
    Halted,
}
