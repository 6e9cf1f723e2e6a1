//! Application event loop and frame pacing.
//!
//! [`run`] opens the window, creates the GPU context and the renderer, lets a
//! user supplied [`WorldConstructor`] build the scene, and then drives frames
//! until the window is closed.
//!
//! # Lifecycle Flow
//!
//! Each frame follows this pattern:
//! 1. Check the close flag set by the previous frame
//! 2. React to keys (ESC closes, Tab cycles the visualized channel)
//! 3. Move the camera from the input snapshot
//! 4. Update the scene (behaviours, depth-first) and follow the camera's parent
//! 5. Geometry pass, then screen pass, then present
//! 6. Roll the input snapshot and schedule the next frame

use std::{path::Path, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
use serde::{Deserialize, Serialize};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::KeyCode,
    window::{Window, WindowId},
};

use crate::{
    camera::{Camera, CameraController, Projection},
    config::Config,
    context::{Context, InitContext},
    data_structures::{
        gbuffer::GBufferChannel,
        scene_graph::{EntityId, Scene},
    },
    input::Input,
    logging,
    math::{Matrix, Vector3f},
    render::DeferredRenderer,
    resources::Assets,
};

/// Everything that is rendered: the scene, the meshes it refers to and the viewpoint.
#[derive(Debug)]
pub struct World {
    pub scene: Scene,
    pub assets: Assets,
    pub camera: Camera,
    /// Entity the camera is attached to, if any.
    pub camera_parent: Option<EntityId>,
    /// G-buffer channel shown by the screen pass.
    pub channel: GBufferChannel,
    pub light_position: Vector3f,
}

impl World {
    /// Empty world with camera, light and channel taken from `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            scene: Scene::new(),
            assets: Assets::new(),
            camera: Camera::from_config(&config.camera),
            camera_parent: None,
            channel: config.channel,
            light_position: config.light.position.into(),
        }
    }

    /// Move the camera along with its parent entity. A despawned parent
    /// detaches the camera at its last world position.
    pub fn sync_camera(&mut self) {
        let Some(parent) = self.camera_parent else {
            return;
        };
        match self.scene.world_matrix(parent) {
            Some(parent_world) => self.camera.set_parent_world(parent_world),
            None => {
                log::warn!("Camera parent {:?} is gone, detaching the camera", parent);
                let position = self.camera.world_position();
                self.camera.set_parent_world(Matrix::identity());
                self.camera.transform.position = position;
                self.camera_parent = None;
            }
        }
    }
}

/// Type alias for a world constructor (factory function).
///
/// A world constructor takes an `InitContext` and asynchronously returns the
/// [`World`]. This allows resource loading before the first frame.
pub type WorldConstructor =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = anyhow::Result<World>>>>>;

/// How frames are scheduled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum FramePacing {
    /// Present blocks on the display refresh.
    #[default]
    VSync,
    /// At most `fps` frames per second, waiting in between.
    Limited { fps: u32 },
    /// As fast as possible.
    Unlimited,
}

/// What the event loop should do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameDecision {
    RenderNow,
    WaitUntil(Instant),
}

/// Schedules frames according to a [`FramePacing`].
#[derive(Clone, Debug)]
pub struct FrameLimiter {
    pacing: FramePacing,
    next_frame: Option<Instant>,
}

impl FrameLimiter {
    pub fn new(pacing: FramePacing) -> Self {
        Self {
            pacing,
            next_frame: None,
        }
    }

    pub fn pacing(&self) -> FramePacing {
        self.pacing
    }

    /// Minimum time between two frames, if any.
    pub fn frame_duration(&self) -> Option<Duration> {
        match self.pacing {
            FramePacing::Limited { fps } if fps > 0 => Some(Duration::from_secs(1) / fps),
            _ => None,
        }
    }

    pub fn decide(&self, now: Instant) -> FrameDecision {
        match self.next_frame {
            Some(next) if now < next => FrameDecision::WaitUntil(next),
            _ => FrameDecision::RenderNow,
        }
    }

    /// Record that a frame started at `now`.
    pub fn frame_rendered(&mut self, now: Instant) {
        let Some(duration) = self.frame_duration() else {
            self.next_frame = None;
            return;
        };
        // Keep the cadence unless a whole frame was missed.
        self.next_frame = match self.next_frame {
            Some(previous) if now < previous + duration => Some(previous + duration),
            _ => Some(now + duration),
        };
    }
}

/// Everything that exists once the window and the GPU are up.
struct AppState {
    ctx: Context,
    renderer: DeferredRenderer,
    world: World,
    input: Input,
    controller: CameraController,
    projection: Projection,
    reported_errors: usize,
}

impl AppState {
    async fn new(
        window: Arc<Window>,
        config: &Config,
        constructor: WorldConstructor,
    ) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config.pacing).await?;
        let renderer = DeferredRenderer::new(&ctx.device, ctx.config.format, config)?;
        let world = constructor(InitContext::new(&ctx, config)).await?;
        log::info!(
            "World ready: {} entities, {} meshes",
            world.scene.len(),
            world.assets.mesh_count()
        );
        Ok(Self {
            ctx,
            renderer,
            world,
            input: Input::new(),
            controller: CameraController::from(&config.camera),
            projection: Projection::from(&config.camera),
            reported_errors: 0,
        })
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: Config,
    // We use Option to `take()` it after use.
    constructor: Option<WorldConstructor>,
    state: Option<AppState>,
    /// First fatal error; returned from [`run`].
    error: Option<anyhow::Error>,
    limiter: FrameLimiter,
    last_time: Instant,
    should_close: bool,
}

impl App {
    fn new(config: Config, constructor: WorldConstructor) -> anyhow::Result<Self> {
        let async_runtime = tokio::runtime::Runtime::new()?;
        let limiter = FrameLimiter::new(config.pacing);
        Ok(Self {
            async_runtime,
            config,
            constructor: Some(constructor),
            state: None,
            error: None,
            limiter,
            last_time: Instant::now(),
            should_close: false,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error.get_or_insert(error);
        event_loop.exit();
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_close {
            event_loop.exit();
            return;
        }
        let Some(state) = self.state.as_mut() else {
            return;
        };
        // Rendering requires the surface to be configured
        if !state.ctx.is_surface_configured() {
            return;
        }

        let now = Instant::now();
        let dt = now.duration_since(self.last_time).as_secs_f32();
        self.last_time = now;
        self.limiter.frame_rendered(now);

        if state.input.keys.key_down(KeyCode::Escape) {
            self.should_close = true;
        }
        if state.input.keys.key_down(KeyCode::Tab) {
            state.world.channel = state.world.channel.next();
            log::info!("Showing the {} channel", state.world.channel.label());
        }

        state
            .controller
            .update(&mut state.world.camera, &state.input, dt);
        state.world.scene.update_all(dt);
        state.world.sync_camera();
        let [width, height] = state.ctx.size();
        state
            .world
            .camera
            .update_projection(&state.projection, width, height);

        match state.renderer.render_frame(&state.ctx, &state.world) {
            Ok(report) => {
                if report.skipped > 0 {
                    log::debug!("{} entities skipped this frame", report.skipped);
                }
            }
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = state.ctx.window().inner_size();
                state.ctx.resize(size.width, size.height);
            }
            Err(e) => {
                log::error!("Unable to render {}", e);
            }
        }

        let errors = state.ctx.errors.count();
        if errors > state.reported_errors {
            log::warn!("{} GPU errors so far", errors);
            state.reported_errors = errors;
        }
        state.input.update_frame();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let Some(constructor) = self.constructor.take() else {
            return;
        };

        let window_attributes = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        let init = AppState::new(window, &self.config, constructor);
        match self.async_runtime.block_on(init) {
            Ok(mut state) => {
                let size = state.ctx.window().inner_size();
                state.ctx.resize(size.width, size.height);
                state.ctx.window().request_redraw();
                self.last_time = Instant::now();
                self.state = Some(state);
            }
            Err(e) => self.fail(event_loop, e.context("Initialisation failed")),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(state) = &mut self.state {
            state.input.handle_device_event(&event);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };
        state.input.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                self.should_close = true;
                state.ctx.window().request_redraw();
            }
            WindowEvent::Resized(size) => state.ctx.resize(size.width, size.height),
            WindowEvent::RedrawRequested => self.frame(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = &self.state else {
            return;
        };
        if self.should_close {
            event_loop.exit();
            return;
        }
        match self.limiter.decide(Instant::now()) {
            FrameDecision::RenderNow => {
                state.ctx.window().request_redraw();
                event_loop.set_control_flow(ControlFlow::Wait);
            }
            FrameDecision::WaitUntil(next) => {
                event_loop.set_control_flow(ControlFlow::WaitUntil(next));
            }
        }
    }
}

/// Open the window and run until it is closed.
///
/// Startup failures (window, GPU, G-buffer, world construction) stop the loop
/// and are returned here.
pub fn run(config: Config, constructor: WorldConstructor) -> anyhow::Result<()> {
    logging::init(&config);
    run_app(config, constructor)
}

/// [`run`] with the config read from `path`, falling back to the defaults
/// when the file is missing or invalid. The logger is installed before the
/// outcome of loading is reported.
pub fn run_with_config_file(
    path: impl AsRef<Path>,
    constructor: WorldConstructor,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    let loaded = Config::load_optional(path);
    let config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => Config::default(),
    };
    logging::init(&config);
    match loaded {
        Ok(Some(_)) => log::info!("Loaded config from {}", path.display()),
        Ok(None) => log::info!("No config at {}, using defaults", path.display()),
        Err(err) => log::warn!("{:#}. Using defaults.", err),
    }
    run_app(config, constructor)
}

fn run_app(config: Config, constructor: WorldConstructor) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, constructor)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
