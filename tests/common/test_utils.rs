use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use flow_diorama::{
    Vector2, Vector3,
    atmosphere::Fog,
    audio::{AudioBackend, ContextState, FilterBand, Track},
    camera::{CameraConfig, CameraPose, Waypoint},
    context::DioramaConfig,
    data_structures::{
        instance::Instance,
        material::{EmissiveParams, MaterialDesc, TextureSlot},
        scene_graph::{Aabb, ClipDesc, SceneAsset, SceneGraph},
    },
    flow::Diorama,
    quality::{BloomParams, QualityTier, ReflectionParams},
    render::{BackgroundSource, FrameView, PostPass, RenderBackend},
    resources::{
        Asset, AssetId, AssetKind, AssetLoader, LoadFuture,
        audio::{AudioClip, AudioEncoding},
        manifest::{AssetDef, EntityRole, HighlightDef, SceneManifest},
        pipeline::SlotCompletion,
        texture::{EnvironmentMap, EnvironmentResolution},
    },
};
use image::Rgb32FImage;
use instant::Duration;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum RecordedBackground {
    Environment { width: u32 },
    Solid(Vector3<f32>),
}

/// Backend state changes, in call order. Fog and frames are tracked separately
/// because they happen every tick.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum RenderCall {
    Resize(u32, u32),
    PixelRatio(f32),
    Pass(PostPass, bool),
    Bloom(BloomParams),
    Reflections(ReflectionParams),
    LightShadows(bool),
    ShadowMap(bool),
    Background(RecordedBackground),
    Environment(Option<u32>),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FrameRecord {
    pub dt: Duration,
    pub tier: QualityTier,
    pub camera: CameraPose,
    pub displacement: Option<Vector2<f32>>,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingRenderBackend {
    pub calls: Vec<RenderCall>,
    pub fog: Option<Fog>,
    pub frames: Vec<FrameRecord>,
}

impl RecordingRenderBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_calls(&mut self) -> Vec<RenderCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn last_background(&self) -> Option<&RecordedBackground> {
        self.calls.iter().rev().find_map(|call| match call {
            RenderCall::Background(bg) => Some(bg),
            _ => None,
        })
    }

    pub fn last_frame(&self) -> Option<&FrameRecord> {
        self.frames.last()
    }
}

impl RenderBackend for RecordingRenderBackend {
    fn resize(&mut self, width: u32, height: u32) {
        self.calls.push(RenderCall::Resize(width, height));
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.calls.push(RenderCall::PixelRatio(ratio));
    }

    fn set_pass_enabled(&mut self, pass: PostPass, enabled: bool) {
        self.calls.push(RenderCall::Pass(pass, enabled));
    }

    fn configure_bloom(&mut self, params: BloomParams) {
        self.calls.push(RenderCall::Bloom(params));
    }

    fn configure_reflections(&mut self, params: ReflectionParams) {
        self.calls.push(RenderCall::Reflections(params));
    }

    fn set_light_shadows(&mut self, enabled: bool) {
        self.calls.push(RenderCall::LightShadows(enabled));
    }

    fn set_shadow_map(&mut self, enabled: bool) {
        self.calls.push(RenderCall::ShadowMap(enabled));
    }

    fn set_background(&mut self, source: BackgroundSource<'_>) {
        let bg = match source {
            BackgroundSource::Environment(map) => RecordedBackground::Environment { width: map.width },
            BackgroundSource::Solid(colour) => RecordedBackground::Solid(colour),
        };
        self.calls.push(RenderCall::Background(bg));
    }

    fn set_environment(&mut self, environment: Option<&EnvironmentMap>) {
        self.calls
            .push(RenderCall::Environment(environment.map(|map| map.width)));
    }

    fn set_fog(&mut self, fog: &Fog) {
        self.fog = Some(*fog);
    }

    fn submit_frame(&mut self, dt: Duration, frame: &FrameView<'_>) {
        self.frames.push(FrameRecord {
            dt,
            tier: frame.tier,
            camera: *frame.camera,
            displacement: frame.displacement.map(|d| d.offset),
        });
    }
}

#[derive(Debug)]
pub(crate) struct RecordingAudioBackend {
    pub state: ContextState,
    pub fail_resume: bool,
    pub reject_play: HashSet<Track>,
    pub attached: Vec<Track>,
    pub plays: Vec<Track>,
    pub pauses: Vec<Track>,
    pub gains: HashMap<Track, f32>,
    pub filter_gains: [f32; 3],
    pub filters_configured: u32,
    pub closed: bool,
}

impl RecordingAudioBackend {
    pub fn new() -> Self {
        Self {
            state: ContextState::Running,
            fail_resume: false,
            reject_play: HashSet::new(),
            attached: Vec::new(),
            plays: Vec::new(),
            pauses: Vec::new(),
            gains: HashMap::new(),
            filter_gains: [0.0; 3],
            filters_configured: 0,
            closed: false,
        }
    }

    pub fn suspended() -> Self {
        Self {
            state: ContextState::Suspended,
            ..Self::new()
        }
    }

    pub fn plays_of(&self, track: Track) -> usize {
        self.plays.iter().filter(|t| **t == track).count()
    }

    pub fn pauses_of(&self, track: Track) -> usize {
        self.pauses.iter().filter(|t| **t == track).count()
    }
}

impl Default for RecordingAudioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for RecordingAudioBackend {
    fn attach(&mut self, track: Track, _clip: &AudioClip) -> anyhow::Result<()> {
        self.attached.push(track);
        Ok(())
    }

    fn context_state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> anyhow::Result<()> {
        if self.fail_resume {
            anyhow::bail!("audio device unavailable");
        }
        self.state = ContextState::Running;
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.state = ContextState::Closed;
        self.closed = true;
        Ok(())
    }

    fn play(&mut self, track: Track) -> anyhow::Result<()> {
        if self.reject_play.contains(&track) {
            anyhow::bail!("play() was blocked by the autoplay policy");
        }
        self.plays.push(track);
        Ok(())
    }

    fn pause(&mut self, track: Track) {
        self.pauses.push(track);
    }

    fn configure_filters(&mut self, _bands: &[FilterBand; 3]) {
        self.filters_configured += 1;
    }

    fn set_gain(&mut self, track: Track, gain: f32) {
        self.gains.insert(track, gain);
    }

    fn set_filter_gains(&mut self, gains: [f32; 3]) {
        self.filter_gains = gains;
    }
}

#[derive(Clone, Debug)]
pub(crate) enum StubResponse {
    Ok(Asset),
    Fail(String),
    Delay(Duration, Box<StubResponse>),
    Hang,
}

/// Answers loads from a fixed table. Unknown paths fail.
#[derive(Clone, Debug, Default)]
pub(crate) struct StubLoader {
    responses: HashMap<String, StubResponse>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, response: StubResponse) -> Self {
        self.responses.insert(path.to_string(), response);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

async fn respond(response: StubResponse) -> anyhow::Result<Asset> {
    let mut response = response;
    loop {
        match response {
            StubResponse::Ok(asset) => return Ok(asset),
            StubResponse::Fail(reason) => anyhow::bail!(reason),
            StubResponse::Delay(delay, next) => {
                tokio::time::sleep(delay).await;
                response = *next;
            }
            StubResponse::Hang => {
                futures::future::pending::<()>().await;
            }
        }
    }
}

impl AssetLoader for StubLoader {
    fn load<'a>(&'a self, path: &'a str, _kind: AssetKind) -> LoadFuture<'a> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(path.to_string());
        }
        let response = self.responses.get(path).cloned();
        Box::pin(async move {
            match response {
                Some(response) => respond(response).await,
                None => anyhow::bail!("{} not found", path),
            }
        })
    }
}

/// A single mesh node with a cube of half extent `half` and one material.
pub(crate) fn box_scene(half: f32, emissive: EmissiveParams) -> SceneAsset {
    let mut graph = SceneGraph::new();
    graph.add_node(
        None,
        Some("body".to_string()),
        Instance::new(),
        Some(Aabb::new(
            Vector3::new(-half, -half, -half),
            Vector3::new(half, half, half),
        )),
        vec![0],
    );
    SceneAsset {
        graph,
        materials: vec![MaterialDesc {
            name: Some("skin".to_string()),
            emissive,
            textures: Vec::new(),
        }],
        clips: Vec::new(),
    }
}

pub(crate) fn animated_box_scene(half: f32, clip_duration: f32) -> SceneAsset {
    let mut scene = box_scene(half, EmissiveParams::default());
    scene.clips.push(ClipDesc {
        name: "sway".to_string(),
        duration: clip_duration,
    });
    scene
}

/// Water plane with a texture in every animated slot.
pub(crate) fn surface_scene() -> SceneAsset {
    let mut scene = box_scene(10.0, EmissiveParams::default());
    scene.materials[0].textures = vec![
        (TextureSlot::Color, 0),
        (TextureSlot::Metallic, 1),
        (TextureSlot::Roughness, 1),
        (TextureSlot::Normal, 2),
        (TextureSlot::Emission, 3),
    ];
    scene.clips.push(ClipDesc {
        name: "ripple".to_string(),
        duration: 4.0,
    });
    scene
}

pub(crate) fn environment_map(width: u32) -> EnvironmentMap {
    EnvironmentMap {
        width,
        height: width / 2,
        texels: Rgb32FImage::new(width, width / 2),
    }
}

pub(crate) fn audio_clip(path: &str) -> AudioClip {
    AudioClip {
        path: path.to_string(),
        encoding: AudioEncoding::Wav,
        bytes: Arc::new(b"RIFF\0\0\0\0WAVE".to_vec()),
    }
}

pub(crate) const FROG: &str = "frog";
pub(crate) const PLUSH: &str = "plush";
pub(crate) const REEDS: &str = "reeds";
pub(crate) const WATER: &str = "water";
pub(crate) const SKY_LOW: &str = "sky_low";
pub(crate) const SKY_HIGH: &str = "sky_high";
pub(crate) const AMBIENT: &str = "ambient";
pub(crate) const UNDERWATER: &str = "underwater";

pub(crate) fn id(name: &str) -> AssetId {
    AssetId::from(name)
}

/// Two highlightables side by side, a speed-reactive reed bed, the water
/// surface, both sky maps and both audio tracks.
pub(crate) fn test_manifest() -> SceneManifest {
    SceneManifest::new(vec![
        AssetDef::visual(
            FROG,
            "models/frog.glb",
            Vector3::new(0.0, 0.0, 0.0),
            EntityRole::Highlightable(HighlightDef {
                priority: 0,
                hover_colour: Vector3::new(0.0, 1.0, 0.0),
                camera_offset: Vector3::new(0.0, 2.0, 10.0),
                look_at_offset: Vector3::new(0.0, 0.0, 0.0),
            }),
        ),
        AssetDef::visual(
            PLUSH,
            "models/plush.glb",
            Vector3::new(5.0, 0.0, 0.0),
            EntityRole::Highlightable(HighlightDef {
                priority: 1,
                hover_colour: Vector3::new(1.0, 1.0, 1.0),
                camera_offset: Vector3::new(3.0, 1.0, 8.0),
                look_at_offset: Vector3::new(0.0, -1.0, 0.0),
            }),
        ),
        AssetDef::visual(
            REEDS,
            "models/reeds.glb",
            Vector3::new(-5.0, 0.0, 0.0),
            EntityRole::SpeedReactive,
        ),
        AssetDef::visual(
            WATER,
            "models/water.glb",
            Vector3::new(0.0, -20.0, 0.0),
            EntityRole::Surface,
        ),
        AssetDef::environment(SKY_LOW, "hdri/sky_1k.hdr", EnvironmentResolution::Low),
        AssetDef::environment(SKY_HIGH, "hdri/sky_4k.hdr", EnvironmentResolution::High),
        AssetDef::audio(AMBIENT, "audio/pond.mp3", "audio/pond.wav", EntityRole::AmbientTrack),
        AssetDef::audio(
            UNDERWATER,
            "audio/underwater.mp3",
            "audio/underwater.wav",
            EntityRole::SubmergedTrack,
        ),
    ])
}

/// Successful loads for every entry of [`test_manifest`].
pub(crate) fn test_assets() -> Vec<(AssetId, Asset)> {
    vec![
        (id(FROG), Asset::Visual(box_scene(1.0, EmissiveParams::default()))),
        (id(PLUSH), Asset::Visual(box_scene(1.0, EmissiveParams::default()))),
        (id(REEDS), Asset::Visual(animated_box_scene(1.0, 2.0))),
        (id(WATER), Asset::Visual(surface_scene())),
        (id(SKY_LOW), Asset::Environment(environment_map(64))),
        (id(SKY_HIGH), Asset::Environment(environment_map(256))),
        (id(AMBIENT), Asset::Audio(audio_clip("audio/pond.mp3"))),
        (id(UNDERWATER), Asset::Audio(audio_clip("audio/underwater.mp3"))),
    ]
}

/// Camera that snaps to its target every frame and has parallax off, so
/// picking rays are predictable.
pub(crate) fn test_camera() -> CameraConfig {
    CameraConfig {
        waypoints: vec![
            Waypoint::new(Vector3::new(0.0, 0.0, 30.0), Vector3::new(0.0, 0.0, 0.0)),
            Waypoint::new(Vector3::new(0.0, -15.0, 30.0), Vector3::new(0.0, -15.0, 0.0)),
        ],
        lerp_factor: 1.0,
        parallax_enabled: false,
        ..CameraConfig::default()
    }
}

pub(crate) fn test_config() -> DioramaConfig {
    DioramaConfig {
        camera: test_camera(),
        ..DioramaConfig::default()
    }
}

pub(crate) type TestDiorama = Diorama<RecordingRenderBackend, RecordingAudioBackend>;

pub(crate) fn new_diorama(config: DioramaConfig) -> TestDiorama {
    Diorama::new(
        config,
        test_manifest(),
        RecordingRenderBackend::new(),
        RecordingAudioBackend::new(),
    )
}

pub(crate) fn complete_all(diorama: &mut TestDiorama, assets: Vec<(AssetId, Asset)>) {
    for (id, asset) in assets {
        assert!(diorama.apply_completion(SlotCompletion {
            id,
            result: Ok(asset),
        }));
    }
}

/// A diorama with every asset loaded and the startup ramp finished.
/// Ticks at the frame-delta cap until the startup ramp is done and returns
/// the number of frames it took.
pub(crate) fn settle(diorama: &mut TestDiorama) -> usize {
    let step = diorama.context().config.max_frame_delta;
    let mut frames = 0;
    while !diorama.startup().is_ready() && frames < 1000 {
        diorama.tick(step);
        frames += 1;
    }
    assert!(diorama.startup().is_ready());
    frames
}

pub(crate) fn ready_diorama(config: DioramaConfig) -> TestDiorama {
    let mut diorama = new_diorama(config);
    complete_all(&mut diorama, test_assets());
    settle(&mut diorama);
    diorama
}

/// Normalized device coordinates at which `point` appears on screen.
pub(crate) fn ndc_towards(diorama: &TestDiorama, point: Vector3<f32>) -> Vector2<f32> {
    use flow_diorama::{InnerSpace, Rad};
    let pose = diorama.navigator().pose();
    let (forward, right, up) = pose.basis();
    let delta = point - pose.position;
    let depth = delta.dot(forward);
    let config = diorama.navigator().config();
    let half_height = (Rad::from(config.fov_y).0 * 0.5).tan();
    let half_width = half_height * diorama.context().viewport.aspect();
    Vector2::new(
        delta.dot(right) / depth / half_width,
        delta.dot(up) / depth / half_height,
    )
}

pub(crate) fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}
