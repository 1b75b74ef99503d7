// emulator module root
mod display;
mod pattern;
mod session;

use std::{str::FromStr, thread::JoinHandle};

use anyhow::Result;
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{error, info};

use crate::display::FrameEmitter;

pub use display::{ChannelDisplay, Display};
pub use pattern::PatternCore;
pub use session::{Session, SessionError};

/// A core driven on its own thread by an [`EmulatorHandle`].
pub trait Emulator {
    fn new(rom: Vec<u8>, frames: FrameEmitter) -> Result<Self>
    where
        Self: Sized;

    /// Runs until a `Stop` command arrives or the command channel closes.
    fn start(&mut self, receiver: &Receiver<EmulatorCommand>) -> Result<()>;
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EmulatorCommand {
    Start,
    Stop,
    Pause,
    KeyDown(EmulatorInput),
    KeyUp(EmulatorInput),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EmulatorInput {
    Start,
    Select,
    A,
    B,
    Up,
    Down,
    Left,
    Right,
}

impl FromStr for EmulatorInput {
    type Err = SessionError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let input = match key {
            "start" => EmulatorInput::Start,
            "select" => EmulatorInput::Select,
            "a" => EmulatorInput::A,
            "b" => EmulatorInput::B,
            "up" => EmulatorInput::Up,
            "down" => EmulatorInput::Down,
            "left" => EmulatorInput::Left,
            "right" => EmulatorInput::Right,
            _ => return Err(SessionError::InvalidKey(key.to_string())),
        };
        Ok(input)
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct JoypadState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub a: bool,
    pub b: bool,
    pub start: bool,
    pub select: bool,
}

impl JoypadState {
    pub fn set(&mut self, input: EmulatorInput, pressed: bool) {
        let button = match input {
            EmulatorInput::Up => &mut self.up,
            EmulatorInput::Down => &mut self.down,
            EmulatorInput::Left => &mut self.left,
            EmulatorInput::Right => &mut self.right,
            EmulatorInput::A => &mut self.a,
            EmulatorInput::B => &mut self.b,
            EmulatorInput::Start => &mut self.start,
            EmulatorInput::Select => &mut self.select,
        };
        *button = pressed;
    }
}

/// Owns the core thread and its command channel.
pub struct EmulatorHandle {
    sender: Sender<EmulatorCommand>,
    thread_handle: Option<JoinHandle<()>>,
}

impl EmulatorHandle {
    /// Spawns the core. It stays idle until the first `Start`.
    pub fn new<E: Emulator + 'static>(rom: Vec<u8>, frames: FrameEmitter) -> Result<Self> {
        let (tx, rx) = unbounded();

        let thread_handle = std::thread::Builder::new()
            .name("emulator".into())
            .spawn(move || {
                let mut emulator = match E::new(rom, frames) {
                    Ok(emulator) => emulator,
                    Err(e) => {
                        error!("Unable to construct emulator: {:#}", e);
                        return;
                    }
                };

                loop {
                    match rx.recv() {
                        Ok(EmulatorCommand::Start) => {
                            if let Err(e) = emulator.start(&rx) {
                                error!("Emulator stopped with error: {:#}", e);
                            }
                            break;
                        }
                        Ok(EmulatorCommand::Stop) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
            })?;

        Ok(Self {
            sender: tx,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn start(&self) -> Result<(), SessionError> {
        self.send(EmulatorCommand::Start)
    }

    pub fn pause(&self) -> Result<(), SessionError> {
        self.send(EmulatorCommand::Pause)
    }

    pub fn send_input(&self, input: EmulatorInput, down: bool) -> Result<(), SessionError> {
        let command = match down {
            true => EmulatorCommand::KeyDown(input),
            false => EmulatorCommand::KeyUp(input),
        };
        self.send(command)
    }

    /// Asks the core to stop and waits for its thread.
    pub fn stop(&mut self) {
        // The core may already be gone; joining is all that is left then.
        let _ = self.sender.send(EmulatorCommand::Stop);
        if let Some(thread_handle) = self.thread_handle.take() {
            if thread_handle.join().is_err() {
                error!("Emulator thread panicked.");
            } else {
                info!("Gracefully terminated emulator thread.");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn send(&self, command: EmulatorCommand) -> Result<(), SessionError> {
        self.sender
            .send(command)
            .map_err(|_| SessionError::CoreExited)
    }
}

impl Drop for EmulatorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
