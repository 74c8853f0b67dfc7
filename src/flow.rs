//! Application event loop.
//!
//! [`run`] builds the scene, starts preloading the level on a tokio runtime
//! and hands control to winit. The window and GPU context are created on
//! `resumed`; until the level has loaded the scene shows its placeholder.
//!
//! # Lifecycle
//!
//! Each redraw:
//! 1. advance the scene by the elapsed time (polls the mount, moves the
//!    character, steps physics, eases the camera)
//! 2. take a [`crate::scene::FrameSnapshot`]
//! 3. render it, recovering from a lost or outdated surface
//! 4. request the next redraw, or exit once the frame limit is reached

use std::sync::Arc;

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::SceneConfig,
    context::Context,
    level::partition::propagate_shadows,
    physics::RapierWorld,
    render::Renderer,
    resources::{AssetLoader, FsSource},
    scene::LevelScene,
};

/// Longest step handed to the simulation; longer gaps (window drags,
/// breakpoints) are clamped instead of tunnelling the character.
const MAX_FRAME_TIME: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub(crate) enum FlowEvent {
    /// The preload finished, successfully or not.
    AssetSettled { path: String, ok: bool },
}

struct AppState {
    ctx: Context,
    renderer: Renderer,
}

impl AppState {
    async fn new(window: Arc<Window>, config: &SceneConfig) -> anyhow::Result<Self> {
        let mut ctx = Context::new(window, &config.camera).await?;
        let size = ctx.window.inner_size();
        ctx.resize(size.width, size.height);
        let renderer = Renderer::new(&ctx, config)?;
        Ok(Self { ctx, renderer })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            if let Err(e) = self.renderer.resize(&self.ctx) {
                log::error!("Could not recreate render targets: {:#}", e);
            }
        }
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: SceneConfig,
    scene: LevelScene<RapierWorld>,
    state: Option<AppState>,
    dragging: bool,
    last_time: Instant,
    frames: u64,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(proxy: EventLoopProxy<FlowEvent>, config: SceneConfig) -> anyhow::Result<Self> {
        let async_runtime = tokio::runtime::Runtime::new()?;

        let root = config.asset.root.clone();
        let handle = async_runtime.handle().clone();
        let loader = AssetLoader::global(move || {
            AssetLoader::new(FsSource::new(root))
                .with_post_load(propagate_shadows)
                .with_runtime(handle)
        });

        let path = config.asset.path.clone();
        let preload = loader.preload(&path);
        async_runtime.spawn(async move {
            let ok = preload.await.is_ok();
            if proxy.send_event(FlowEvent::AssetSettled { path, ok }).is_err() {
                log::debug!("Event loop closed before the level finished loading");
            }
        });

        let scene = LevelScene::new(config.clone(), loader, RapierWorld::new(&config.physics));
        Ok(Self {
            async_runtime,
            config,
            scene,
            state: None,
            dragging: false,
            last_time: Instant::now(),
            frames: 0,
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let dt = self.last_time.elapsed().min(MAX_FRAME_TIME);
        self.last_time = Instant::now();
        self.scene.update(dt.as_secs_f32());

        let Some(state) = &mut self.state else {
            return;
        };
        if !state.ctx.is_surface_configured {
            return;
        }
        let snapshot = self.scene.snapshot();
        match state.renderer.render(&state.ctx, &snapshot) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow::anyhow!("GPU out of memory"));
                return;
            }
            Err(e) => log::error!("Unable to render {}", e),
        }

        self.frames += 1;
        if self
            .config
            .window
            .max_frames
            .is_some_and(|max| self.frames >= max)
        {
            log::info!("Rendered {} frames, exiting", self.frames);
            event_loop.exit();
            return;
        }
        state.ctx.window.request_redraw();
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes().with_title(self.config.window.title.clone());
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        match self
            .async_runtime
            .block_on(AppState::new(window, &self.config))
        {
            Ok(state) => {
                state.ctx.window.request_redraw();
                self.state = Some(state);
                self.last_time = Instant::now();
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            FlowEvent::AssetSettled { path, ok } => {
                log::info!("Preload of {} settled ({})", path, if ok { "ok" } else { "failed" });
                if let Some(state) = &self.state {
                    state.ctx.window.request_redraw();
                }
            }
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if self.dragging {
                self.scene.camera_mut().handle_drag(dx, dy);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left | MouseButton::Right,
                ..
            } => self.dragging = button_state.is_pressed(),
            WindowEvent::Focused(false) => {
                self.dragging = false;
                self.scene.handle_window_event(&event);
            }
            _ => {
                self.scene.handle_window_event(&event);
            }
        }
    }
}

/// Runs the walkthrough until the window closes or the frame limit is hit.
pub fn run(config: SceneConfig) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<FlowEvent> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        EventLoop::with_user_event().with_any_thread(true).build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<FlowEvent> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        EventLoop::with_user_event().with_any_thread(true).build()?
    };

    #[cfg(not(all(
        feature = "integration-tests",
        any(target_os = "linux", target_os = "windows")
    )))]
    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(event_loop.create_proxy(), config)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
