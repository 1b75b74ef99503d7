//! Turning indexed frames from the core into RGBA rasters on a surface.

pub mod decoder;
pub mod palette;
pub mod pipeline;
pub mod source;

pub use decoder::{decode_frame, FrameError};
pub use palette::{Color, Palette, Theme};
pub use pipeline::{FramePipeline, PipelineError, RasterSurface, Surface, SurfaceError};
pub use source::{FrameEmitter, FrameSource, SourceClosed, SubscribeError, Subscription};

pub const WIDTH: usize = 160;
pub const HEIGHT: usize = 144;

/// Palette indices per frame.
pub const FRAME_LEN: usize = WIDTH * HEIGHT;

/// RGBA bytes per raster.
pub const RASTER_LEN: usize = FRAME_LEN * 4;

/// Event name frames are pushed under.
pub const PRESENT_FRAME_EVENT: &str = "gb-present-frame";
