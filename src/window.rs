// window + pixels surface for the play command
use anyhow::Result;
use log::{error, info, warn};
use pixels::{Pixels, SurfaceTexture};
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoopBuilder},
    window::WindowBuilder,
};

use gb_shell::{
    display::{
        pipeline::fade, FramePipeline, FrameSource, Palette, PipelineError, Surface,
        SurfaceError, HEIGHT, RASTER_LEN, WIDTH,
    },
    emu::Session,
};

/// Raster owned next to the window's pixel buffer. The raster holds the
/// decoded frame; presenting copies it into the window, faded if asked.
pub struct PixelsSurface {
    pixels: Pixels,
    raster: Vec<u8>,
}

impl PixelsSurface {
    pub fn new(pixels: Pixels) -> Self {
        Self {
            pixels,
            raster: vec![0; RASTER_LEN],
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Err(e) = self.pixels.resize_surface(width.max(1), height.max(1)) {
            warn!("Unable to resize surface: {}", e);
        }
    }
}

impl Surface for PixelsSurface {
    fn raster(&self) -> &[u8] {
        &self.raster
    }

    fn raster_mut(&mut self) -> &mut [u8] {
        &mut self.raster
    }

    fn present(&mut self, overlay: bool) -> Result<(), SurfaceError> {
        let frame = self.pixels.frame_mut();
        if overlay {
            fade(&self.raster, frame);
        } else {
            frame.copy_from_slice(&self.raster);
        }
        self.pixels
            .render()
            .map_err(|e| SurfaceError::Present(e.to_string()))
    }
}

pub struct PlayOptions {
    pub title: String,
    pub scale: u32,
    pub palette: Palette,
    pub fade: bool,
}

/// Opens the window and presents frames until it closes. Never returns on
/// success; winit owns the thread from here.
///
/// The loop sleeps until an event arrives. Each frame the core queues wakes
/// it with a user event, and that event pumps the pipeline.
pub fn run(mut session: Session, source: FrameSource, options: PlayOptions) -> Result<()> {
    let event_loop = EventLoopBuilder::<()>::with_user_event().build();
    let width = WIDTH as u32;
    let height = HEIGHT as u32;

    let window = WindowBuilder::new()
        .with_title(format!("{} - GB Shell", options.title))
        .with_inner_size(LogicalSize::new(
            (width * options.scale) as f64,
            (height * options.scale) as f64,
        ))
        .with_min_inner_size(LogicalSize::new(width as f64, height as f64))
        .build(&event_loop)?;

    let window_size = window.inner_size();
    let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
    let pixels = Pixels::new(width, height, surface_texture)?;

    let proxy = event_loop.create_proxy();
    source.set_waker(move || {
        // Fails only once the loop has exited.
        let _ = proxy.send_event(());
    });

    let mut pipeline = FramePipeline::new(options.palette);
    if let Err(e) = pipeline.mount(PixelsSurface::new(pixels), &source) {
        // Still show the window so the core can be stopped cleanly.
        warn!("{}", e);
    }
    session.start()?;

    let fade_on_pause = options.fade;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,

                WindowEvent::Resized(size) => {
                    if let Some(surface) = pipeline.surface_mut() {
                        surface.resize(size.width, size.height);
                    }
                    window.request_redraw();
                }

                WindowEvent::KeyboardInput { input: key, .. } => {
                    if handle_key(&mut session, key) {
                        pipeline.set_overlay(fade_on_pause && session.is_paused());
                        window.request_redraw();
                    }
                    if key.virtual_keycode == Some(VirtualKeyCode::Escape) {
                        *control_flow = ControlFlow::Exit;
                    }
                }

                _ => {}
            },

            Event::UserEvent(()) => match pipeline.pump() {
                Ok(_) => {}
                Err(PipelineError::Decode(e)) => error!("Core sent a bad frame: {}", e),
                Err(PipelineError::Surface(e)) => {
                    error!("{}", e);
                    *control_flow = ControlFlow::Exit;
                }
                Err(e) => warn!("{}", e),
            },

            Event::RedrawRequested(_) => {
                if let Err(e) = pipeline.redraw() {
                    error!("{}", e);
                    *control_flow = ControlFlow::Exit;
                }
            }

            Event::LoopDestroyed => {
                pipeline.teardown();
                session.unload();
                info!("Window closed.");
            }

            _ => {}
        }
    });
}

/// Forwards a key to the core. Returns true when the pause state changed.
fn handle_key(session: &mut Session, key: KeyboardInput) -> bool {
    let pressed = key.state == ElementState::Pressed;

    let name = match key.virtual_keycode {
        // D-Pad
        Some(VirtualKeyCode::Up) => "up",
        Some(VirtualKeyCode::Down) => "down",
        Some(VirtualKeyCode::Left) => "left",
        Some(VirtualKeyCode::Right) => "right",

        // Buttons
        Some(VirtualKeyCode::Z) => "a",
        Some(VirtualKeyCode::X) => "b",
        Some(VirtualKeyCode::Return) => "start",
        Some(VirtualKeyCode::RShift) => "select",

        Some(VirtualKeyCode::P) if pressed => {
            let result = if session.is_paused() {
                session.start()
            } else {
                session.pause()
            };
            if let Err(e) = result {
                warn!("{}", e);
            }
            return true;
        }

        _ => return false,
    };

    if let Err(e) = session.register_input(name, pressed) {
        warn!("{}", e);
    }
    false
}
