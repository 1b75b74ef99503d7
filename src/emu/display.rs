use crate::display::{FrameEmitter, FRAME_LEN, HEIGHT, WIDTH};

/// Where a core draws its indexed pixels.
pub trait Display {
    /// Push a pixel to the current frame
    fn push_pixel(&mut self, x: u8, y: u8, color: u8);

    /// Hands the finished frame over. Should be called during VBlank.
    fn present(&mut self);
}

/// Collects a frame of palette indices and emits it on present.
pub struct ChannelDisplay {
    frames: FrameEmitter,
    buffer: [u8; FRAME_LEN],
    dropped: u64,
}

impl ChannelDisplay {
    pub fn new(frames: FrameEmitter) -> Self {
        ChannelDisplay {
            frames,
            buffer: [0; FRAME_LEN],
            dropped: 0,
        }
    }

    /// Frames presented while nobody was subscribed.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Display for ChannelDisplay {
    fn push_pixel(&mut self, x: u8, y: u8, color: u8) {
        debug_assert!(color <= 3, "Invalid color index {} provided to Display.", color);
        debug_assert!((x as usize) < WIDTH, "Invalid x-coordinate {} provided to Display.", x);
        debug_assert!((y as usize) < HEIGHT, "Invalid y-coordinate {} provided to Display.", y);

        self.buffer[y as usize * WIDTH + x as usize] = color;
    }

    fn present(&mut self) {
        if !self.frames.emit(self.buffer.to_vec()) {
            self.dropped += 1;
        }
    }
}
