use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::{error::ErrorKind, CommandFactory, Parser};
use log::{error, info, warn, LevelFilter};
use sdl2::{event::Event, keyboard::Keycode, pixels::Color, rect::Rect, render::Canvas, video::Window};

use chip8::display::{Frame, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use chip8::interpreter::Interpreter;
use chip8::runner::{self, Config, Exit, InputEvent, MachineEvent, MachineHandle};
use chip8::{loader, Error, MachineError, Result};

const EXIT_LOAD_FAILURE: u8 = 1;
const EXIT_FATAL: u8 = 3;

/// Flags that take no value, everything else starting with `-` is unknown unless listed in `OPTIONS`.
const FLAGS: &[&str] = &["--debug", "--error", "--help", "-h", "--version", "-V"];
const OPTIONS: &[&str] = &["--scale", "--seed"];

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The path of the program to load
    #[arg(value_name = "FILE")]
    program: Option<PathBuf>,

    /// Log every executed instruction, wins over `--error`
    #[arg(long)]
    debug: bool,

    /// Only log errors
    #[arg(long)]
    error: bool,

    /// Size of one pixel on screen
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=64))]
    scale: u32,

    /// Seed for the random number instruction, random if absent
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    fn level(&self) -> LevelFilter {
        if self.debug {
            LevelFilter::Debug
        } else if self.error {
            LevelFilter::Error
        } else {
            LevelFilter::Info
        }
    }
}

/// Process exit status for the way the machine stopped.
fn exit_code(outcome: &std::result::Result<Exit, MachineError>) -> u8 {
    match outcome {
        Ok(Exit::Quit) => 0,
        Err(_) => EXIT_FATAL,
    }
}

/// Splits the command line into the arguments we understand and the unknown flags,
/// which are ignored instead of rejected.
fn known_args(args: impl IntoIterator<Item = OsString>) -> (Vec<OsString>, Vec<OsString>) {
    let mut known = Vec::new();
    let mut ignored = Vec::new();
    let mut takes_value = false;

    for arg in args {
        let text = arg.to_string_lossy().into_owned();
        let name = text.split('=').next().unwrap_or_default();

        if takes_value || known.is_empty() || !text.starts_with('-') || FLAGS.contains(&name) {
            takes_value = false;
            known.push(arg);
        } else if OPTIONS.contains(&name) {
            takes_value = !text.contains('=');
            known.push(arg);
        } else {
            ignored.push(arg);
        }
    }

    (known, ignored)
}

fn keymap() -> HashMap<Keycode, u8> {
    HashMap::from([
        (Keycode::Num1, 0x1),
        (Keycode::Num2, 0x2),
        (Keycode::Num3, 0x3),
        (Keycode::Num4, 0xC),
        (Keycode::Q, 0x4),
        (Keycode::W, 0x5),
        (Keycode::E, 0x6),
        (Keycode::R, 0xD),
        (Keycode::A, 0x7),
        (Keycode::S, 0x8),
        (Keycode::D, 0x9),
        (Keycode::F, 0xE),
        (Keycode::Z, 0xA),
        (Keycode::X, 0x0),
        (Keycode::C, 0xB),
        (Keycode::V, 0xF),
    ])
}

fn render(canvas: &mut Canvas<Window>, frame: &Frame, scale: u32) -> Result<()> {
    canvas.set_draw_color(Color::BLACK);
    canvas.clear();

    let rects: Vec<Rect> = frame
        .pixels()
        .iter()
        .enumerate()
        .filter(|(_, on)| **on)
        .map(|(idx, _)| {
            let x = (idx % frame.width()) as i32 * scale as i32;
            let y = (idx / frame.width()) as i32 * scale as i32;
            Rect::new(x, y, scale, scale)
        })
        .collect();

    canvas.set_draw_color(Color::WHITE);
    canvas.fill_rects(&rects).map_err(Error::msg)?;
    canvas.present();

    Ok(())
}

/// Pumps SDL events into the machine and draws its frames until the window is closed
/// or the machine stops.
fn run_window(machine: &MachineHandle, scale: u32) -> Result<()> {
    let keymap = keymap();

    let sdl = sdl2::init().map_err(Error::msg)?;
    let video = sdl.video().map_err(Error::msg)?;
    let window = video
        .window(
            "Chip-8 - ESC to exit",
            DISPLAY_WIDTH as u32 * scale,
            DISPLAY_HEIGHT as u32 * scale,
        )
        .position_centered()
        .build()
        .context("unable to open window")?;
    let mut canvas = window.into_canvas().build().context("unable to create canvas")?;
    let mut events = sdl.event_pump().map_err(Error::msg)?;

    canvas.set_draw_color(Color::BLACK);
    canvas.clear();
    canvas.present();

    'running: loop {
        for event in events.poll_iter() {
            let input = match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => break 'running,
                Event::KeyDown {
                    keycode: Some(key),
                    repeat: false,
                    ..
                } => keymap.get(&key).map(|k| InputEvent::KeyDown(*k)),
                Event::KeyUp {
                    keycode: Some(key), ..
                } => keymap.get(&key).map(|k| InputEvent::KeyUp(*k)),
                _ => None,
            };

            if let Some(input) = input {
                machine.input().send(input).ok();
            }
        }

        let mut latest = None;
        for event in machine.output().try_iter() {
            match event {
                MachineEvent::Frame(frame) => latest = Some(frame),
                MachineEvent::Beep => info!("Beep!"),
            }
        }
        if let Some(frame) = latest {
            render(&mut canvas, &frame, scale)?;
        }

        if machine.is_finished() {
            break;
        }

        thread::sleep(Duration::from_millis(1));
    }

    Ok(())
}

fn main() -> ExitCode {
    let (args, ignored) = known_args(std::env::args_os());
    let cli = Cli::parse_from(args);

    env_logger::Builder::new()
        .filter_level(cli.level())
        .parse_default_env()
        .init();

    for arg in ignored {
        warn!("Ignoring unknown argument {}", arg.to_string_lossy());
    }

    let Some(path) = cli.program.as_deref() else {
        Cli::command()
            .error(ErrorKind::MissingRequiredArgument, "the path of the program to load is required")
            .exit();
    };

    let mut interpreter = match cli.seed {
        Some(seed) => Interpreter::with_seed(seed),
        None => Interpreter::new(),
    };

    let loaded = loader::read_program(path).and_then(|bytes| interpreter.load_program(&bytes));
    if let Err(e) = loaded {
        error!("{:#}", Error::from(e));
        return ExitCode::from(EXIT_LOAD_FAILURE);
    }

    info!("Starting {}", path.display());
    let machine = match runner::spawn(interpreter, Config::default()) {
        Ok(machine) => machine,
        Err(e) => {
            error!("Unable to start machine thread: {}", e);
            return ExitCode::from(EXIT_LOAD_FAILURE);
        }
    };
    let window = run_window(&machine, cli.scale);
    let outcome = machine.quit();

    if let Err(e) = window {
        error!("{:#}", e);
        return ExitCode::from(EXIT_LOAD_FAILURE);
    }

    if let Err(e) = &outcome {
        error!("{}", e);
    }
    ExitCode::from(exit_code(&outcome))
}
