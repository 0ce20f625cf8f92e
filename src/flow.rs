//! Application event loop.
//!
//! [`App`] drives the demo through winit's [`ApplicationHandler`]:
//!
//! 1. `resumed` creates the window, the GPU [`Context`] and the scene
//! 2. window / device events feed the camera and the inspector
//! 3. a left click release renders the pick pass and updates the selection
//! 4. `RedrawRequested` updates the world, uploads uniforms and draws
//! 5. `about_to_wait` paces redraws through the [`FrameLimiter`]
//!
//! Setup failures are kept and returned from [`run`] once the loop exits.

use std::sync::Arc;

use anyhow::Context as _;
use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window},
};

use crate::{
    config::Config,
    context::{Context, MouseButtonState},
    editor::Editor,
    fire::{FIRE_FRAME_DURATION, FireAnimation},
    map::VoxelMap,
    pick::PickBuffer,
    pipelines::light::LightUniform,
    render::Renderer,
    resources::Assets,
    scene::{SceneAssets, populate},
    world::World,
};

/// Mouse deltas are tiny; scale them before they reach the camera.
const MOUSE_SPEED_FACTOR: f64 = 5.0;

/// Caps the redraw rate by scheduling the next frame.
#[derive(Debug, Clone)]
pub struct FrameLimiter {
    frame: Duration,
    next: Option<Instant>,
}

impl FrameLimiter {
    pub fn new(target_fps: u32) -> Self {
        Self {
            frame: Duration::from_secs(1) / target_fps.max(1),
            next: None,
        }
    }

    pub fn frame(&self) -> Duration {
        self.frame
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Whether the next frame is due at `now`.
    pub fn ready(&self, now: Instant) -> bool {
        self.next.is_none_or(|next| now >= next)
    }

    /// Book a frame drawn at `now` and return when the following one is due.
    ///
    /// Frames keep a steady cadence while on time. A frame that is late by
    /// more than a whole period restarts the cadence from `now` instead of
    /// bursting to catch up.
    pub fn schedule(&mut self, now: Instant) -> Instant {
        let next = match self.next {
            Some(previous) if previous + self.frame > now => previous + self.frame,
            _ => now + self.frame,
        };
        self.next = Some(next);
        next
    }
}

/// Everything that exists once the window is up.
#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    world: World,
    assets: Assets,
    renderer: Renderer,
    editor: Editor,
    title: String,
}

impl AppState {
    async fn new(window: Arc<Window>, map: &VoxelMap, config: &Config) -> anyhow::Result<Self> {
        let mut ctx = Context::new(window)
            .await
            .context("App initialization failed. Cannot create the main context")?;

        let pick = PickBuffer::new(
            &ctx.device,
            &ctx.limits,
            ctx.pick_usages,
            ctx.config.width,
            ctx.config.height,
        )
        .context("the pick target is incomplete")?;

        let mut assets = Assets::new(config.asset_root.clone(), &ctx.device, &ctx.queue);
        let scene = SceneAssets::load(&mut assets, &ctx.device, &ctx.queue).await?;

        let mut world = World::new(FireAnimation::new(
            scene.fire_frames.clone(),
            FIRE_FRAME_DURATION,
        ));
        populate(map, &scene, &mut world);
        ctx.light.uniform =
            LightUniform::new(world.directional_light(), world.point_lights(), world.time());
        ctx.light.write(&ctx.queue);

        let editor = Editor::new(pick, config.title.clone());
        let mut renderer = Renderer::new(&ctx.device);
        renderer.prepare(&ctx, &world, &assets, editor.inspector().selection(&world));

        let mut state = Self {
            ctx,
            world,
            assets,
            renderer,
            editor,
            title: String::new(),
        };
        state.refresh_title();
        Ok(state)
    }

    fn resize(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        if !self.ctx.resize(width, height) {
            return Ok(());
        }
        let current = self.editor.pick_buffer();
        if current.width() == width && current.height() == height {
            return Ok(());
        }
        let pick = PickBuffer::new(
            &self.ctx.device,
            &self.ctx.limits,
            self.ctx.pick_usages,
            width,
            height,
        )
        .context("the pick target is incomplete after resizing")?;
        self.editor.set_pick_buffer(pick);
        Ok(())
    }

    fn refresh_title(&mut self) {
        let title = self.editor.title(&self.world);
        if title != self.title {
            self.ctx.window.set_title(&title);
            self.title = title;
        }
    }

    fn prepare(&mut self) {
        let selected = self.editor.inspector().selection(&self.world);
        self.renderer
            .prepare(&self.ctx, &self.world, &self.assets, selected);
    }

    fn pick(&mut self, async_runtime: &tokio::runtime::Runtime) {
        self.prepare();
        let cursor = self.ctx.mouse.coords;
        match self.editor.pick(
            &self.ctx,
            &self.renderer,
            &self.world,
            &self.assets,
            async_runtime,
            cursor,
        ) {
            Ok(true) => self.refresh_title(),
            Ok(false) => {}
            Err(e) => log::error!("Picking failed: {}", e),
        }
    }

    fn update(&mut self, dt: Duration) {
        self.world.update(dt);
        self.ctx.update_camera(dt);
        self.ctx.light.uniform.set_time(self.world.time());
        self.ctx.light.write(&self.ctx.queue);
        self.prepare();
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.renderer.render(&self.ctx, &self.world, &self.assets)
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: Config,
    map: VoxelMap,
    state: Option<AppState>,
    last_time: Instant,
    limiter: FrameLimiter,
    fatal: Option<anyhow::Error>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

impl App {
    pub fn new(config: Config, map: VoxelMap) -> anyhow::Result<Self> {
        let async_runtime =
            tokio::runtime::Runtime::new().context("failed to start the async runtime")?;
        Ok(Self {
            async_runtime,
            limiter: FrameLimiter::new(config.target_fps),
            config,
            map,
            state: None,
            last_time: Instant::now(),
            fatal: None,
        })
    }

    fn abort(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.fatal = Some(error);
        event_loop.exit();
    }

    fn window_attributes(&self) -> winit::window::WindowAttributes {
        Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_fullscreen(
                self.config
                    .fullscreen
                    .then_some(Fullscreen::Borderless(None)),
            )
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let window = match event_loop.create_window(self.window_attributes()) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.abort(event_loop, anyhow::Error::new(e).context("failed to create the window")),
        };

        match self
            .async_runtime
            .block_on(AppState::new(window, &self.map, &self.config))
        {
            Ok(state) => {
                log::info!("Scene ready with {} entities", state.world.len());
                state.ctx.window.request_redraw();
                self.state = Some(state);
                self.last_time = Instant::now();
            }
            Err(e) => self.abort(event_loop, e),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if state.ctx.mouse.pressed == MouseButtonState::Right {
                state
                    .ctx
                    .camera
                    .controller
                    .handle_mouse(dx * MOUSE_SPEED_FACTOR, dy * MOUSE_SPEED_FACTOR);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };

        state.ctx.camera.controller.handle_window_events(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Err(e) = state.resize(size.width, size.height) {
                    self.abort(event_loop, e);
                }
            }
            WindowEvent::CursorMoved { position, .. } => state.ctx.mouse.coords = position,
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                if key == KeyCode::Escape {
                    event_loop.exit();
                } else if state.editor.handle_key(key, &mut state.world) {
                    state.refresh_title();
                }
            }
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => match (button, button_state) {
                (MouseButton::Left, ElementState::Pressed) => {
                    state.ctx.mouse.pressed = MouseButtonState::Left;
                }
                (MouseButton::Left, ElementState::Released) => {
                    state.ctx.mouse.pressed = MouseButtonState::None;
                    state.pick(&self.async_runtime);
                }
                (MouseButton::Right, ElementState::Pressed) => {
                    state.ctx.mouse.pressed = MouseButtonState::Right;
                }
                (_, ElementState::Released) => state.ctx.mouse.pressed = MouseButtonState::None,
                _ => (),
            },
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                state.update(dt);
                match state.render() {
                    Ok(()) => state.refresh_title(),
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        if let Err(e) = state.resize(size.width, size.height) {
                            self.abort(event_loop, e);
                        }
                    }
                    Err(e) => log::error!("Unable to render {}", e),
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = &self.state else {
            return;
        };
        let now = Instant::now();
        let next = if self.limiter.ready(now) {
            state.ctx.window.request_redraw();
            self.limiter.schedule(now)
        } else {
            match self.limiter.deadline() {
                Some(next) => next,
                None => self.limiter.schedule(now),
            }
        };
        event_loop.set_control_flow(ControlFlow::WaitUntil(next));
    }
}

/// Install `env_logger`. `RUST_LOG` overrides the default `info` level.
pub fn init_logger() {
    let env = env_logger::Env::default().default_filter_or("info");
    if let Err(e) = env_logger::Builder::from_env(env).try_init() {
        log::debug!("Logger already initialized: {}", e);
    }
}

/// Open the window and run the demo on `map` until it is closed.
pub fn run(config: Config, map: VoxelMap) -> anyhow::Result<()> {
    init_logger();

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, map)?;
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_fps_is_a_sixtieth_of_a_second() {
        let limiter = FrameLimiter::new(60);
        assert_eq!(limiter.frame(), Duration::from_secs(1) / 60);
        assert_eq!(FrameLimiter::new(0).frame(), Duration::from_secs(1));
    }

    #[test]
    fn on_time_frames_keep_the_cadence() {
        let mut limiter = FrameLimiter::new(50);
        let start = Instant::now();
        assert!(limiter.ready(start));

        let first = limiter.schedule(start);
        assert_eq!(first, start + Duration::from_millis(20));
        assert!(!limiter.ready(start + Duration::from_millis(5)));

        // drawn 3 ms late, the next deadline stays on the 20 ms grid
        let second = limiter.schedule(first + Duration::from_millis(3));
        assert_eq!(second, start + Duration::from_millis(40));
    }

    #[test]
    fn late_frames_restart_the_cadence() {
        let mut limiter = FrameLimiter::new(50);
        let start = Instant::now();
        limiter.schedule(start);
        let late = start + Duration::from_millis(100);
        assert_eq!(limiter.schedule(late), late + Duration::from_millis(20));
    }
}
