// test pattern core
use std::{
    thread,
    time::{Duration, Instant},
};

use anyhow::Result;
use crossbeam::channel::{Receiver, TryRecvError};
use log::{debug, info};

use super::{ChannelDisplay, Display, Emulator, EmulatorCommand, JoypadState};
use crate::{
    cart::Cartridge,
    display::{FrameEmitter, HEIGHT, WIDTH},
};

/// T-cycles per second on DMG hardware.
pub const SYSTEM_CLOCK_RATE: u32 = 4_194_304;

/// T-cycles per displayed frame.
pub const CYCLES_PER_FRAME: u32 = 70_224;

/// Stand-in core. Draws a checkerboard that scrolls with the d-pad; A and B
/// swap the shades, Start recentres it.
pub struct PatternCore<D: Display = ChannelDisplay> {
    cart: Cartridge,
    display: D,
    joypad: JoypadState,
    scroll_x: u8,
    scroll_y: u8,
    frames: u64,
}

impl<D: Display> PatternCore<D> {
    pub fn with_display(cart: Cartridge, display: D) -> Self {
        Self {
            cart,
            display,
            joypad: JoypadState::default(),
            scroll_x: 0,
            scroll_y: 0,
            frames: 0,
        }
    }

    /// Advances one frame and presents it.
    pub fn run_frame(&mut self) {
        if self.joypad.start {
            self.scroll_x = 0;
            self.scroll_y = 0;
        }
        if self.joypad.right {
            self.scroll_x = self.scroll_x.wrapping_sub(1);
        }
        if self.joypad.left {
            self.scroll_x = self.scroll_x.wrapping_add(1);
        }
        if self.joypad.down {
            self.scroll_y = self.scroll_y.wrapping_sub(1);
        }
        if self.joypad.up {
            self.scroll_y = self.scroll_y.wrapping_add(1);
        }

        let (light, dark) = match (self.joypad.a, self.joypad.b) {
            (true, _) => (0, 3),
            (_, true) => (3, 0),
            _ => (1, 2),
        };

        for y in 0..HEIGHT as u8 {
            for x in 0..WIDTH as u8 {
                let sx = x.wrapping_add(self.scroll_x) / 8;
                let sy = y.wrapping_add(self.scroll_y) / 8;
                let on = (sx ^ sy) & 1 == 1;
                self.display.push_pixel(x, y, if on { dark } else { light });
            }
        }
        self.display.present();
        self.frames += 1;
    }

    fn apply(&mut self, command: EmulatorCommand) {
        match command {
            EmulatorCommand::KeyDown(input) => self.joypad.set(input, true),
            EmulatorCommand::KeyUp(input) => self.joypad.set(input, false),
            _ => {}
        }
    }
}

impl Emulator for PatternCore {
    fn new(rom: Vec<u8>, frames: FrameEmitter) -> Result<Self> {
        let cart = Cartridge::from_rom(rom)?;
        Ok(Self::with_display(cart, ChannelDisplay::new(frames)))
    }

    fn start(&mut self, receiver: &Receiver<EmulatorCommand>) -> Result<()> {
        info!(
            "Running {:?} ({}).",
            self.cart.header.formatted_title, self.cart.header.cartridge_type
        );

        let frame_time =
            Duration::from_secs_f64(CYCLES_PER_FRAME as f64 / SYSTEM_CLOCK_RATE as f64);
        let mut next_frame = Instant::now();
        let mut paused = false;

        loop {
            loop {
                let command = if paused {
                    match receiver.recv() {
                        Ok(command) => command,
                        Err(_) => return Ok(()),
                    }
                } else {
                    match receiver.try_recv() {
                        Ok(command) => command,
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => return Ok(()),
                    }
                };

                match command {
                    EmulatorCommand::Stop => {
                        info!("Stopped after {} frames.", self.frames);
                        return Ok(());
                    }
                    EmulatorCommand::Pause => {
                        debug!("Paused.");
                        paused = true;
                    }
                    EmulatorCommand::Start => {
                        if paused {
                            debug!("Resumed.");
                            paused = false;
                            next_frame = Instant::now();
                        }
                    }
                    other => self.apply(other),
                }
            }

            self.run_frame();

            next_frame += frame_time;
            let now = Instant::now();
            if next_frame > now {
                thread::sleep(next_frame - now);
            } else {
                next_frame = now;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cart::header::HEADER_END,
        display::{source, PRESENT_FRAME_EVENT},
        emu::EmulatorInput,
    };

    #[derive(Default)]
    struct Capture {
        frame: Vec<u8>,
        presented: usize,
    }

    impl Display for Capture {
        fn push_pixel(&mut self, x: u8, y: u8, color: u8) {
            if self.frame.is_empty() {
                self.frame = vec![0; WIDTH * HEIGHT];
            }
            self.frame[y as usize * WIDTH + x as usize] = color;
        }

        fn present(&mut self) {
            self.presented += 1;
        }
    }

    fn checker() -> PatternCore<Capture> {
        let cart = Cartridge::from_rom(vec![0; HEADER_END]).unwrap();
        PatternCore::with_display(cart, Capture::default())
    }

    #[test]
    fn draws_checker_tiles() {
        let mut pattern = checker();
        pattern.run_frame();
        let frame = &pattern.display.frame;
        assert_eq!(pattern.display.presented, 1);
        assert_eq!(frame[0], 1);
        assert_eq!(frame[8], 2);
        assert_eq!(frame[8 * WIDTH], 2);
        assert_eq!(frame[8 * WIDTH + 8], 1);
        assert!(frame.iter().all(|&i| i <= 3));
    }

    #[test]
    fn buttons_change_pattern() {
        let mut pattern = checker();
        pattern.apply(EmulatorCommand::KeyDown(EmulatorInput::A));
        pattern.run_frame();
        assert_eq!(pattern.display.frame[0], 0);
        assert_eq!(pattern.display.frame[8], 3);

        pattern.apply(EmulatorCommand::KeyUp(EmulatorInput::A));
        pattern.apply(EmulatorCommand::KeyDown(EmulatorInput::Left));
        pattern.run_frame();
        assert_eq!(pattern.scroll_x, 1);
        assert_eq!(pattern.display.frame[7], 2);
    }

    #[test]
    fn rejects_truncated_rom() {
        let (emitter, _source) = source::channel();
        let result = <PatternCore as Emulator>::new(vec![0; 16], emitter);
        assert!(result.is_err());
    }

    #[test]
    fn emits_frames_until_stopped() {
        let (emitter, source) = source::channel();
        let sub = source.subscribe(PRESENT_FRAME_EVENT).unwrap();
        let rom = vec![0; HEADER_END];
        let mut pattern = <PatternCore as Emulator>::new(rom, emitter).unwrap();

        let (tx, rx) = crossbeam::channel::unbounded();
        let worker = thread::spawn(move || pattern.start(&rx));

        let deadline = Instant::now() + Duration::from_secs(5);
        let frame = loop {
            if let Some(frame) = sub.try_next().unwrap() {
                break frame;
            }
            assert!(Instant::now() < deadline, "no frame emitted");
            thread::sleep(Duration::from_millis(1));
        };
        assert_eq!(frame.len(), WIDTH * HEIGHT);

        tx.send(EmulatorCommand::Pause).unwrap();
        tx.send(EmulatorCommand::Stop).unwrap();
        worker.join().unwrap().unwrap();
    }
}
