//! Frame driver of a diorama session.
//!
//! [`Diorama`] owns the [`Context`] and every subsystem and is driven from the
//! outside: a window event loop, a browser animation frame or a test harness
//! calls [`Diorama::tick`] once per frame and forwards input in between.
//!
//! # User-facing types
//!
//! - [`Diorama<R, A>`] is the orchestration core, generic over its render and audio backends
//! - [`FrameClock`] measures frame deltas with a platform-appropriate clock
//!
//! # Lifecycle
//!
//! Each tick does the following, in order:
//! 1. Apply asset completions that arrived since the last tick
//! 2. Update the camera navigator
//! 3. Converge hover highlights
//! 4. Advance procedural surface animation
//! 5. Mix audio
//! 6. Converge fog
//! 7. Hand the frame to the render backend
//! 8. Count the frame toward the startup dwell (may change the quality tier)
//!
//! Only ticks that began in `Settling` count toward the dwell, so the ramp
//! always renders at least one frame at the cheapest tier.
//!
//! Asset loads run elsewhere and only ever reach the context through
//! [`Diorama::apply_completion`], which checks the session's liveness first.

use cgmath::Vector2;
use futures::{
    FutureExt, StreamExt,
    channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded},
};
use instant::{Duration, Instant};
use winit::event::WindowEvent;

use crate::{
    atmosphere::FogController,
    audio::{AudioBackend, AudioMixer, Track},
    camera::CameraNavigator,
    context::{Context, DioramaConfig, Viewport},
    data_structures::instance::Instance,
    error::DioramaError,
    input::{InputEvent, InputTranslator, ScrollStep},
    pick::HitTester,
    quality::{QualityController, QualityTier},
    render::{FrameView, RenderBackend},
    resources::{
        Asset, AssetId, AssetLoader,
        audio::AudioClip,
        manifest::{EntityRole, SceneManifest},
        pipeline::{Liveness, LoadRequest, SlotCompletion, spawn_loads},
    },
    startup::{StartupSequence, StartupState},
    surface::SurfaceAnimator,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Measures the time between two frames.
#[derive(Debug)]
pub struct FrameClock {
    last: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    pub fn next_dt(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now.duration_since(self.last);
        self.last = now;
        dt
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Diorama<R: RenderBackend, A: AudioBackend> {
    ctx: Context,
    startup: StartupSequence,
    quality: QualityController,
    navigator: CameraNavigator,
    hits: HitTester,
    surfaces: SurfaceAnimator,
    mixer: AudioMixer,
    fog: FogController,
    render: R,
    audio: A,
    sender: UnboundedSender<SlotCompletion>,
    completions: UnboundedReceiver<SlotCompletion>,
    liveness: Liveness,
    torn_down: bool,
}

impl<R: RenderBackend, A: AudioBackend> Diorama<R, A> {
    /// Registers a slot for every manifest entry and applies the initial tier.
    pub fn new(config: DioramaConfig, manifest: SceneManifest, render: R, audio: A) -> Self {
        let (sender, completions) = unbounded();
        let startup = StartupSequence::new(config.settle_dwell);
        let navigator = CameraNavigator::new(config.camera.clone());
        let hits = HitTester::new(config.highlight.clone());
        let surfaces = SurfaceAnimator::new(&config.surface);
        let mixer = AudioMixer::new(config.audio.clone());
        let fog = FogController::new(config.fog.clone());
        let ctx = Context::new(config, manifest);
        let mut diorama = Self {
            ctx,
            startup,
            quality: QualityController::new(),
            navigator,
            hits,
            surfaces,
            mixer,
            fog,
            render,
            audio,
            sender,
            completions,
            liveness: Liveness::new(),
            torn_down: false,
        };
        diorama.apply_current_tier();
        // An empty manifest has nothing to wait for.
        diorama.step_startup(Duration::ZERO);
        diorama
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn navigator(&self) -> &CameraNavigator {
        &self.navigator
    }

    pub fn hit_tester(&self) -> &HitTester {
        &self.hits
    }

    pub fn surfaces(&self) -> &SurfaceAnimator {
        &self.surfaces
    }

    pub fn mixer(&self) -> &AudioMixer {
        &self.mixer
    }

    pub fn fog(&self) -> &FogController {
        &self.fog
    }

    pub fn startup(&self) -> &StartupSequence {
        &self.startup
    }

    pub fn quality(&self) -> &QualityController {
        &self.quality
    }

    pub fn tier(&self) -> QualityTier {
        self.ctx.tier
    }

    pub fn render_backend(&self) -> &R {
        &self.render
    }

    pub fn render_backend_mut(&mut self) -> &mut R {
        &mut self.render
    }

    pub fn audio_backend(&self) -> &A {
        &self.audio
    }

    pub fn audio_backend_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Per-asset load failures, in manifest order. Audio failures are kept by
    /// the [`AudioMixer`].
    pub fn errors(&self) -> Vec<DioramaError> {
        self.ctx
            .assets
            .errors()
            .into_iter()
            .map(|(id, source)| DioramaError::Load { id, source })
            .collect()
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    /// Sender for load completions produced outside [`Diorama::start_loading`].
    pub fn completion_sender(&self) -> UnboundedSender<SlotCompletion> {
        self.sender.clone()
    }

    pub fn load_requests(&self) -> Vec<LoadRequest> {
        self.ctx.manifest.requests()
    }

    /// Starts loading every manifest entry in the background.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn start_loading<L: AssetLoader + Send + 'static>(&self, loader: L) {
        let _ = spawn_loads(
            loader,
            self.load_requests(),
            self.ctx.config.load_timeout,
            self.liveness(),
            self.completion_sender(),
        );
    }

    #[cfg(target_arch = "wasm32")]
    pub fn start_loading<L: AssetLoader + 'static>(&self, loader: L) {
        spawn_loads(
            loader,
            self.load_requests(),
            self.ctx.config.load_timeout,
            self.liveness(),
            self.completion_sender(),
        );
    }

    /// Applies every completion that is already waiting. Never blocks.
    pub fn pump_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Some(Some(completion)) = self.completions.next().now_or_never() {
            if self.apply_completion(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Flips one slot and re-applies the current tier. Returns `false` if the
    /// completion was dropped.
    pub fn apply_completion(&mut self, completion: SlotCompletion) -> bool {
        if self.torn_down || !self.liveness.is_alive() {
            log::debug!("Ignoring completion of {} after teardown", completion.id);
            return false;
        }
        let SlotCompletion { id, result } = completion;
        let changed = match result {
            Ok(asset) => {
                let clip = asset.as_audio().cloned();
                let changed = self.ctx.assets.report_success(&id, asset);
                if changed {
                    self.index_loaded_asset(&id, clip);
                }
                changed
            }
            Err(err) => {
                log::warn!("Asset {} failed to load: {}", id, err);
                self.ctx.assets.report_failure(&id, err)
            }
        };
        if changed {
            self.apply_current_tier();
            self.step_startup(Duration::ZERO);
        }
        changed
    }

    fn index_loaded_asset(&mut self, id: &AssetId, clip: Option<AudioClip>) {
        let role = self.ctx.manifest.get(id).map(|def| def.role.clone());
        self.ctx.index_scene(id);
        match role {
            Some(EntityRole::Surface) => {
                if let Some(scene) = self.ctx.assets.handle(id).and_then(Asset::as_scene) {
                    self.surfaces.bind_surface(id, scene, &mut self.ctx.textures);
                }
            }
            Some(EntityRole::AmbientTrack) => {
                if let Some(clip) = clip {
                    self.mixer.attach(Track::Ambient, &clip, &mut self.audio);
                }
            }
            Some(EntityRole::SubmergedTrack) => {
                if let Some(clip) = clip {
                    self.mixer.attach(Track::Submerged, &clip, &mut self.audio);
                }
            }
            _ => {}
        }
    }

    fn apply_current_tier(&mut self) {
        self.quality
            .apply_tier(self.ctx.tier, &self.ctx, &mut self.render);
    }

    fn set_tier(&mut self, tier: QualityTier) {
        self.ctx.tier = tier;
        self.apply_current_tier();
    }

    fn step_startup(&mut self, elapsed: Duration) {
        let was_ready = self.startup.is_ready();
        if let Some(tier) = self
            .startup
            .advance(self.ctx.assets.is_fully_attempted(), elapsed)
        {
            self.set_tier(tier);
        }
        if !was_ready && self.startup.is_ready() {
            self.mixer.autoplay(&mut self.audio);
        }
    }

    /// Runs one frame. `dt` is the wall-clock time since the previous tick.
    pub fn tick(&mut self, dt: Duration) {
        if self.torn_down {
            return;
        }
        let settling = self.startup.state() == StartupState::Settling;
        self.pump_completions();
        let clamped = dt.min(self.ctx.config.max_frame_delta);

        self.navigator.update(&self.ctx);
        self.hits.converge_highlights(&mut self.ctx, &self.navigator);
        self.surfaces.update(clamped, self.ctx.tier, &mut self.ctx);
        self.mixer
            .update(dt, self.navigator.is_submerged(), &mut self.audio);
        let fog_submerged = self.navigator.waypoint_index() == 1
            && self.navigator.active_override().is_none();
        self.fog.update(fog_submerged, &mut self.render);

        let frame = FrameView {
            tier: self.ctx.tier,
            camera: self.navigator.pose(),
            fog: self.fog.current(),
            materials: &self.ctx.materials,
            textures: &self.ctx.textures,
            displacement: self.surfaces.active_displacement(),
            playback: &self.ctx.playback,
        };
        self.render.submit_frame(clamped, &frame);

        if settling {
            self.step_startup(clamped);
        }
    }

    pub fn on_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerMoved(ndc) => self.on_pointer_move(ndc),
            InputEvent::PointerDown(ndc) => {
                self.on_pointer_down(ndc);
            }
            InputEvent::Scroll(step) => {
                self.on_scroll(step);
            }
            InputEvent::Resized {
                width,
                height,
                device_pixel_ratio,
            } => self.on_resize(width, height, device_pixel_ratio),
        }
    }

    pub fn on_window_event(&mut self, translator: &mut InputTranslator, event: &WindowEvent) {
        if let Some(input) = translator.translate(event) {
            self.on_input(input);
        }
    }

    pub fn on_pointer_move(&mut self, ndc: Vector2<f32>) {
        if self.torn_down {
            return;
        }
        self.navigator.set_pointer(ndc);
        let ray = self.navigator.ray(ndc, self.ctx.viewport.aspect());
        self.hits
            .on_pointer_move(&ray, &mut self.ctx, &self.navigator);
    }

    /// Focuses the highlightable entity under the pointer, if any.
    pub fn on_pointer_down(&mut self, ndc: Vector2<f32>) -> Option<AssetId> {
        if self.torn_down {
            return None;
        }
        let ray = self.navigator.ray(ndc, self.ctx.viewport.aspect());
        self.hits
            .on_pointer_down(&ray, &self.ctx, &mut self.navigator)
    }

    /// Returns `true` if the waypoint changed.
    pub fn on_scroll(&mut self, step: ScrollStep) -> bool {
        if self.torn_down {
            return false;
        }
        match step {
            ScrollStep::Advance => self.navigator.advance(),
            ScrollStep::Retreat => self.navigator.retreat(),
        }
    }

    pub fn on_resize(&mut self, width: u32, height: u32, device_pixel_ratio: f32) {
        if self.torn_down {
            return;
        }
        self.ctx.viewport = Viewport {
            width,
            height,
            device_pixel_ratio,
        };
        self.render.resize(width, height);
        self.apply_current_tier();
    }

    pub fn close_override(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.navigator.close_override()
    }

    /// User tier selection, accepted once the startup ramp is done.
    pub fn select_tier(&mut self, tier: QualityTier) -> Result<(), DioramaError> {
        if !self.startup.is_ready() {
            return Err(DioramaError::TierLocked { requested: tier });
        }
        self.set_tier(tier);
        Ok(())
    }

    /// User play/pause of the ambient track. Returns whether it now plays.
    pub fn toggle_ambient(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.mixer.toggle_ambient(&mut self.audio)
    }

    pub fn set_entity_placement(
        &mut self,
        id: &AssetId,
        placement: Instance,
    ) -> Result<(), DioramaError> {
        self.ctx.set_placement(id, placement)
    }

    /// Ends the session: late completions are dropped, input is ignored,
    /// audio stops and loaded handles are released.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.liveness.kill();
        self.torn_down = true;
        self.completions.close();
        self.navigator.reset_pointer();
        self.mixer.teardown(&mut self.audio);
        self.ctx.assets.dispose();
        self.ctx.materials.clear();
        self.ctx.textures.clear();
        self.ctx.playback.clear();
        log::info!("Diorama torn down");
    }
}

/// Installs the platform logger: `env_logger` natively, the browser console on the web.
pub fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::log_1(&JsValue::from_str(&format!(
                "Warning: Could not initialize logger: {}",
                e
            )));
        }
    }
}
