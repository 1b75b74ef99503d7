//! Binds the frame transport to a display surface for the lifetime of a view.
//!
//! `Uninitialized` -> [`FramePipeline::mount`] -> `Subscribed` ->
//! [`FramePipeline::teardown`] (or drop) -> `TornDown`. Teardown always
//! cancels the subscription before the surface is released.

use log::{debug, info, trace, warn};
use thiserror::Error;

use super::{
    decoder::{decode_frame, FrameError},
    palette::Palette,
    source::{FrameSource, SubscribeError, Subscription},
    PRESENT_FRAME_EVENT, RASTER_LEN,
};

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("surface failed to present: {0}")]
    Present(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not subscribe to frame events: {0}")]
    Subscribe(#[from] SubscribeError),
    #[error("pipeline is already mounted")]
    AlreadyMounted,
    #[error("pipeline was torn down")]
    TornDown,
    #[error("rejected frame from core: {0}")]
    Decode(#[from] FrameError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error("frame source closed, keeping last frame")]
    SourceClosed,
}

/// Something that owns a raster and can show it.
pub trait Surface {
    fn raster(&self) -> &[u8];

    fn raster_mut(&mut self) -> &mut [u8];

    /// Shows the raster. `overlay` asks for the fade mask on top of it.
    fn present(&mut self, overlay: bool) -> Result<(), SurfaceError>;
}

/// In-memory surface for headless use.
pub struct RasterSurface {
    raster: Vec<u8>,
    presented: u64,
    overlay: bool,
}

impl RasterSurface {
    pub fn new() -> Self {
        Self {
            raster: vec![0; RASTER_LEN],
            presented: 0,
            overlay: false,
        }
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Whether the last presentation asked for the overlay.
    pub fn overlay(&self) -> bool {
        self.overlay
    }
}

impl Default for RasterSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for RasterSurface {
    fn raster(&self) -> &[u8] {
        &self.raster
    }

    fn raster_mut(&mut self) -> &mut [u8] {
        &mut self.raster
    }

    fn present(&mut self, overlay: bool) -> Result<(), SurfaceError> {
        self.presented += 1;
        self.overlay = overlay;
        Ok(())
    }
}

/// Copies `src` into `dst` at half brightness. Alpha is kept.
pub fn fade(src: &[u8], dst: &mut [u8]) {
    for (out, px) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        out[0] = px[0] / 2;
        out[1] = px[1] / 2;
        out[2] = px[2] / 2;
        out[3] = px[3];
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Closed {
    Open,
    Pending,
    Reported,
}

enum State<S> {
    Uninitialized,
    Subscribed {
        subscription: Subscription,
        surface: S,
        closed: Closed,
    },
    TornDown,
}

pub struct FramePipeline<S: Surface> {
    palette: Palette,
    overlay: bool,
    frames: u64,
    state: State<S>,
}

impl<S: Surface> FramePipeline<S> {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            overlay: false,
            frames: 0,
            state: State::Uninitialized,
        }
    }

    /// Takes the surface and subscribes to frame events.
    pub fn mount(&mut self, surface: S, source: &FrameSource) -> Result<(), PipelineError> {
        match self.state {
            State::Uninitialized => {}
            State::Subscribed { .. } => return Err(PipelineError::AlreadyMounted),
            State::TornDown => return Err(PipelineError::TornDown),
        }

        let subscription = source.subscribe(PRESENT_FRAME_EVENT)?;
        self.state = State::Subscribed {
            subscription,
            surface,
            closed: Closed::Open,
        };
        info!("Frame pipeline mounted.");
        Ok(())
    }

    /// Decodes and presents every pending frame in arrival order.
    ///
    /// Returns how many frames were presented. A rejected frame stops the
    /// pump and leaves the last good image on the surface. A closed source
    /// is reported once, by the first call that presents nothing.
    pub fn pump(&mut self) -> Result<usize, PipelineError> {
        let State::Subscribed {
            subscription,
            surface,
            closed,
        } = &mut self.state
        else {
            return Ok(0);
        };

        let mut presented = 0;
        loop {
            let frame = match subscription.try_next() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(_) => {
                    if *closed == Closed::Open {
                        warn!("Frame source closed after {} frames.", self.frames);
                        *closed = Closed::Pending;
                    }
                    break;
                }
            };

            decode_frame(&frame, &self.palette, surface.raster_mut())?;
            surface.present(self.overlay)?;
            self.frames += 1;
            presented += 1;
            trace!("Presented frame {}.", self.frames);
        }

        // Frames shown in this call are counted first; the close is
        // reported on the next call that has nothing to show.
        if presented == 0 && *closed == Closed::Pending {
            *closed = Closed::Reported;
            return Err(PipelineError::SourceClosed);
        }
        Ok(presented)
    }

    /// Presents the current raster again without decoding.
    pub fn redraw(&mut self) -> Result<(), PipelineError> {
        if let State::Subscribed { surface, .. } = &mut self.state {
            surface.present(self.overlay)?;
        }
        Ok(())
    }

    /// Toggles the fade mask. Decoding is unaffected.
    pub fn set_overlay(&mut self, enabled: bool) {
        self.overlay = enabled;
    }

    pub fn overlay(&self) -> bool {
        self.overlay
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_subscribed(&self) -> bool {
        matches!(self.state, State::Subscribed { .. })
    }

    pub fn surface(&self) -> Option<&S> {
        match &self.state {
            State::Subscribed { surface, .. } => Some(surface),
            _ => None,
        }
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        match &mut self.state {
            State::Subscribed { surface, .. } => Some(surface),
            _ => None,
        }
    }

    /// Cancels the subscription, then hands the surface back.
    pub fn teardown(&mut self) -> Option<S> {
        match std::mem::replace(&mut self.state, State::TornDown) {
            State::Subscribed {
                subscription,
                surface,
                ..
            } => {
                drop(subscription);
                info!("Frame pipeline torn down after {} frames.", self.frames);
                Some(surface)
            }
            _ => {
                debug!("Teardown of an unmounted pipeline.");
                None
            }
        }
    }
}

impl<S: Surface> Drop for FramePipeline<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
