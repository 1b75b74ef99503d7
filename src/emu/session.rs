//! Command surface for configuring, running and feeding input to a core.

use log::{info, warn};
use thiserror::Error;

use super::{Emulator, EmulatorHandle, EmulatorInput};
use crate::{
    display::FrameEmitter,
    library::{LibraryError, RomLibrary},
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no emulator loaded")]
    NotLoaded,
    #[error("invalid input key string {0:?}")]
    InvalidKey(String),
    #[error("emulator thread has exited")]
    CoreExited,
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error("could not start emulator: {0:#}")]
    Spawn(anyhow::Error),
}

pub struct Session {
    library: RomLibrary,
    frames: FrameEmitter,
    emulator_handle: Option<EmulatorHandle>,
    paused: bool,
}

impl Session {
    pub fn new(library: RomLibrary, frames: FrameEmitter) -> Self {
        Session {
            library,
            frames,
            emulator_handle: None,
            paused: false,
        }
    }

    /// Loads the named library ROM into a fresh core, replacing any loaded one.
    pub fn setup<E: Emulator + 'static>(&mut self, name: &str) -> Result<(), SessionError> {
        info!("Request to load emulator with ROM {} received.", name);
        let rom = self.library.read(name)?;

        if self.emulator_handle.is_some() {
            self.unload();
        }
        let handle =
            EmulatorHandle::new::<E>(rom, self.frames.clone()).map_err(SessionError::Spawn)?;
        self.emulator_handle = Some(handle);
        self.paused = false;
        info!("Initialized emulator with ROM {}", name);
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        info!("Starting emulator...");
        self.handle()?.start()?;
        self.paused = false;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        info!("Pausing emulator");
        self.handle()?.pause()?;
        self.paused = true;
        Ok(())
    }

    /// Stops the core but keeps it loaded until [`Session::unload`].
    pub fn stop(&mut self) -> Result<(), SessionError> {
        info!("Stopping emulator");
        match self.emulator_handle {
            Some(ref mut emulator_handle) => {
                emulator_handle.stop();
                Ok(())
            }
            None => Err(SessionError::NotLoaded),
        }
    }

    pub fn unload(&mut self) {
        match self.emulator_handle.take() {
            Some(mut emulator_handle) => {
                emulator_handle.stop();
                info!("Emulator unloaded.");
            }
            None => warn!("No emulator loaded!"),
        }
        self.paused = false;
    }

    pub fn register_input(&mut self, key: &str, down: bool) -> Result<(), SessionError> {
        let input: EmulatorInput = key.parse()?;
        self.handle()?.send_input(input, down)
    }

    pub fn is_loaded(&self) -> bool {
        self.emulator_handle.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_running(&self) -> bool {
        self.emulator_handle
            .as_ref()
            .is_some_and(EmulatorHandle::is_running)
    }

    fn handle(&self) -> Result<&EmulatorHandle, SessionError> {
        self.emulator_handle.as_ref().ok_or(SessionError::NotLoaded)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.emulator_handle.is_some() {
            self.unload();
        }
    }
}
