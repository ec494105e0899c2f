pub mod display;
pub mod error;
pub mod instruction;
pub mod interpreter;
pub mod keyboard;
pub mod loader;
mod memory;
mod registers;
pub mod runner;
mod stack;
pub mod timers;

pub use error::{LoadError, MachineError};

pub type Error = anyhow::Error;
pub type Result<T> = anyhow::Result<T>;
