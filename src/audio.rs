//! Adaptive ambient audio.
//!
//! Two looping tracks play through an [`AudioBackend`]: the ambient pond
//! track, routed through a gain stage and a three-band filter chain, and the
//! submerged track, routed through a gain stage only. Every frame the mixer
//! picks the surface or submerged preset from the navigation state and moves
//! the current gains toward it with a wall-clock time constant.
//!
//! Failures never stop the frame loop. A rejected `play` is logged and retried
//! on the next user-initiated play; a failing audio context marks audio as
//! degraded for the rest of the session.

use instant::Duration;

use crate::{error::DioramaError, resources::audio::AudioClip};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Track {
    Ambient,
    Submerged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Suspended,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    LowShelf,
    Peaking,
    HighShelf,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterBand {
    pub kind: FilterKind,
    pub frequency: f32,
    pub q: f32,
}

pub trait AudioBackend {
    /// Hands the decoded-on-demand stream of `track` to the output graph.
    fn attach(&mut self, track: Track, clip: &AudioClip) -> anyhow::Result<()>;

    fn context_state(&self) -> ContextState;

    fn resume(&mut self) -> anyhow::Result<()>;

    fn close(&mut self) -> anyhow::Result<()>;

    fn play(&mut self, track: Track) -> anyhow::Result<()>;

    fn pause(&mut self, track: Track);

    fn configure_filters(&mut self, bands: &[FilterBand; 3]);

    fn set_gain(&mut self, track: Track, gain: f32);

    /// Gains in dB of the ambient track's filter bands.
    fn set_filter_gains(&mut self, gains: [f32; 3]);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MixPreset {
    pub ambient_gain: f32,
    pub filter_gains: [f32; 3],
    pub submerged_gain: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AudioConfig {
    pub surface: MixPreset,
    pub submerged: MixPreset,
    pub filters: [FilterBand; 3],
    pub time_constant: Duration,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            surface: MixPreset {
                ambient_gain: 0.4,
                filter_gains: [0.0, 0.0, 0.0],
                submerged_gain: 0.0,
            },
            submerged: MixPreset {
                ambient_gain: 0.2,
                filter_gains: [12.0, -6.0, -12.0],
                submerged_gain: 0.5,
            },
            filters: [
                FilterBand {
                    kind: FilterKind::LowShelf,
                    frequency: 200.0,
                    q: 1.0,
                },
                FilterBand {
                    kind: FilterKind::Peaking,
                    frequency: 1000.0,
                    q: 1.0,
                },
                FilterBand {
                    kind: FilterKind::HighShelf,
                    frequency: 4000.0,
                    q: 1.0,
                },
            ],
            time_constant: Duration::from_millis(300),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioChannel {
    pub gain_target: f32,
    pub gain_current: f32,
    pub filter_gain_targets: [f32; 3],
    pub filter_gain_currents: [f32; 3],
    pub playing: bool,
}

impl AudioChannel {
    fn new(gain: f32, filters: [f32; 3]) -> Self {
        Self {
            gain_target: gain,
            gain_current: gain,
            filter_gain_targets: filters,
            filter_gain_currents: filters,
            playing: false,
        }
    }

    fn converge(&mut self, alpha: f32) {
        self.gain_current += (self.gain_target - self.gain_current) * alpha;
        for (current, target) in self
            .filter_gain_currents
            .iter_mut()
            .zip(self.filter_gain_targets.iter())
        {
            *current += (target - *current) * alpha;
        }
    }
}

/// Fraction of the remaining distance covered after `dt` with time constant `tau`.
pub fn smoothing_alpha(dt: Duration, tau: Duration) -> f32 {
    if tau.is_zero() {
        return 1.0;
    }
    1.0 - (-dt.as_secs_f32() / tau.as_secs_f32()).exp()
}

#[derive(Debug)]
pub struct AudioMixer {
    config: AudioConfig,
    ambient: AudioChannel,
    submerged: AudioChannel,
    ambient_attached: bool,
    submerged_attached: bool,
    /// Start of the submerged track was attempted for the current submersion.
    submerged_requested: bool,
    manually_started: bool,
    degraded: bool,
    retry: Vec<Track>,
    errors: Vec<DioramaError>,
}

impl AudioMixer {
    pub fn new(config: AudioConfig) -> Self {
        let ambient = AudioChannel::new(config.surface.ambient_gain, config.surface.filter_gains);
        let submerged = AudioChannel::new(config.surface.submerged_gain, [0.0; 3]);
        Self {
            config,
            ambient,
            submerged,
            ambient_attached: false,
            submerged_attached: false,
            submerged_requested: false,
            manually_started: false,
            degraded: false,
            retry: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn channel(&self, track: Track) -> &AudioChannel {
        match track {
            Track::Ambient => &self.ambient,
            Track::Submerged => &self.submerged,
        }
    }

    fn channel_mut(&mut self, track: Track) -> &mut AudioChannel {
        match track {
            Track::Ambient => &mut self.ambient,
            Track::Submerged => &mut self.submerged,
        }
    }

    pub fn is_attached(&self, track: Track) -> bool {
        match track {
            Track::Ambient => self.ambient_attached,
            Track::Submerged => self.submerged_attached,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Failures observed so far, oldest first.
    pub fn errors(&self) -> &[DioramaError] {
        &self.errors
    }

    pub fn attach<A: AudioBackend + ?Sized>(&mut self, track: Track, clip: &AudioClip, backend: &mut A) {
        if let Err(err) = backend.attach(track, clip) {
            log::warn!("Could not attach {:?} ({}): {:#}", track, clip.path, err);
            return;
        }
        if track == Track::Ambient {
            backend.configure_filters(&self.config.filters);
        }
        match track {
            Track::Ambient => self.ambient_attached = true,
            Track::Submerged => self.submerged_attached = true,
        }
    }

    /// Makes sure the audio context runs. A failure degrades audio for good.
    fn ensure_running<A: AudioBackend + ?Sized>(&mut self, backend: &mut A) -> bool {
        if self.degraded {
            return false;
        }
        let result = match backend.context_state() {
            ContextState::Running => return true,
            ContextState::Suspended => backend.resume(),
            ContextState::Closed => Err(anyhow::anyhow!("audio context is closed")),
        };
        match result {
            Ok(()) => true,
            Err(err) => {
                log::error!("Audio context failure, disabling audio: {:#}", err);
                self.degraded = true;
                self.errors.push(DioramaError::Context {
                    reason: format!("{:#}", err),
                });
                false
            }
        }
    }

    fn start<A: AudioBackend + ?Sized>(&mut self, track: Track, backend: &mut A) -> bool {
        if !self.is_attached(track) || !self.ensure_running(backend) {
            return false;
        }
        match backend.play(track) {
            Ok(()) => {
                self.channel_mut(track).playing = true;
                self.retry.retain(|t| *t != track);
                true
            }
            Err(err) => {
                log::warn!("Playback of {:?} rejected: {:#}", track, err);
                if !self.retry.contains(&track) {
                    self.retry.push(track);
                }
                self.errors.push(DioramaError::Playback {
                    track,
                    reason: format!("{:#}", err),
                });
                false
            }
        }
    }

    fn stop<A: AudioBackend + ?Sized>(&mut self, track: Track, backend: &mut A) {
        if self.channel(track).playing {
            backend.pause(track);
            self.channel_mut(track).playing = false;
        }
        self.retry.retain(|t| *t != track);
    }

    /// Per-frame step. `dt` is raw wall-clock time so convergence does not
    /// depend on the frame rate.
    pub fn update<A: AudioBackend + ?Sized>(&mut self, dt: Duration, submerged: bool, backend: &mut A) {
        let preset = if submerged {
            self.config.submerged
        } else {
            self.config.surface
        };
        self.ambient.gain_target = preset.ambient_gain;
        self.ambient.filter_gain_targets = preset.filter_gains;
        self.submerged.gain_target = preset.submerged_gain;

        let alpha = smoothing_alpha(dt, self.config.time_constant);
        self.ambient.converge(alpha);
        self.submerged.converge(alpha);

        if self.ambient_attached {
            backend.set_gain(Track::Ambient, self.ambient.gain_current);
            backend.set_filter_gains(self.ambient.filter_gain_currents);
        }
        if self.submerged_attached {
            backend.set_gain(Track::Submerged, self.submerged.gain_current);
        }

        if submerged && !self.submerged_requested && self.submerged_attached && !self.degraded {
            self.submerged_requested = true;
            if !self.submerged.playing {
                self.start(Track::Submerged, backend);
            }
        } else if !submerged && self.submerged_requested {
            self.submerged_requested = false;
            self.stop(Track::Submerged, backend);
        }
    }

    /// Explicit user play/pause of the ambient track. Also retries any
    /// playback that was rejected earlier. Returns whether ambient now plays.
    pub fn toggle_ambient<A: AudioBackend + ?Sized>(&mut self, backend: &mut A) -> bool {
        if self.ambient.playing {
            self.stop(Track::Ambient, backend);
            return false;
        }
        self.manually_started = true;
        let playing = self.start(Track::Ambient, backend);
        if self.submerged_requested && self.retry.contains(&Track::Submerged) {
            self.start(Track::Submerged, backend);
        }
        playing
    }

    /// Starts the ambient track once the diorama is ready, unless the user
    /// already took control of it.
    pub fn autoplay<A: AudioBackend + ?Sized>(&mut self, backend: &mut A) {
        if self.manually_started || self.ambient.playing {
            return;
        }
        if !self.ambient_attached {
            log::info!("Ambient track is unavailable, skipping autoplay");
            return;
        }
        self.start(Track::Ambient, backend);
    }

    pub fn teardown<A: AudioBackend + ?Sized>(&mut self, backend: &mut A) {
        self.stop(Track::Ambient, backend);
        self.stop(Track::Submerged, backend);
        self.submerged_requested = false;
        if backend.context_state() != ContextState::Closed {
            if let Err(err) = backend.close() {
                log::error!("Could not close the audio context: {:#}", err);
                self.errors.push(DioramaError::Context {
                    reason: format!("{:#}", err),
                });
            }
        }
        self.degraded = true;
    }
}
