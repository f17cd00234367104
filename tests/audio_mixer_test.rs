use flow_diorama::{
    audio::{AudioConfig, AudioMixer, ContextState, Track, smoothing_alpha},
    error::DioramaError,
    input::ScrollStep,
};
use instant::Duration;

use crate::common::test_utils::{
    RecordingAudioBackend, approx, audio_clip, ready_diorama, test_config,
};

mod common;

const FRAME: Duration = Duration::from_millis(16);

fn attached_mixer(backend: &mut RecordingAudioBackend) -> AudioMixer {
    let mut mixer = AudioMixer::new(AudioConfig::default());
    mixer.attach(Track::Ambient, &audio_clip("pond.mp3"), backend);
    mixer.attach(Track::Submerged, &audio_clip("underwater.mp3"), backend);
    mixer
}

#[test]
fn smoothing_alpha_uses_wall_clock_time() {
    let tau = Duration::from_millis(300);
    assert_eq!(smoothing_alpha(Duration::ZERO, tau), 0.0);
    assert!(approx(
        smoothing_alpha(Duration::from_millis(300), tau),
        1.0 - (-1.0f32).exp()
    ));
    assert_eq!(smoothing_alpha(FRAME, Duration::ZERO), 1.0);
}

#[test]
fn convergence_does_not_depend_on_frame_rate() {
    let mut coarse_backend = RecordingAudioBackend::new();
    let mut fine_backend = RecordingAudioBackend::new();
    let mut coarse = attached_mixer(&mut coarse_backend);
    let mut fine = attached_mixer(&mut fine_backend);

    coarse.update(Duration::from_millis(400), true, &mut coarse_backend);
    for _ in 0..10 {
        fine.update(Duration::from_millis(40), true, &mut fine_backend);
    }
    for track in [Track::Ambient, Track::Submerged] {
        assert!(approx(
            coarse.channel(track).gain_current,
            fine.channel(track).gain_current
        ));
    }
    for band in 0..3 {
        assert!(approx(
            coarse.channel(Track::Ambient).filter_gain_currents[band],
            fine.channel(Track::Ambient).filter_gain_currents[band]
        ));
    }
}

#[test]
fn gains_reach_the_submerged_preset() {
    let mut backend = RecordingAudioBackend::new();
    let mut mixer = attached_mixer(&mut backend);
    let preset = AudioConfig::default().submerged;
    for _ in 0..300 {
        mixer.update(FRAME, true, &mut backend);
    }
    assert!(approx(mixer.channel(Track::Ambient).gain_current, preset.ambient_gain));
    assert!(approx(mixer.channel(Track::Submerged).gain_current, preset.submerged_gain));
    assert!(approx(backend.filter_gains[0], preset.filter_gains[0]));
    assert!(approx(backend.filter_gains[2], preset.filter_gains[2]));
    assert!(approx(backend.gains[&Track::Submerged], preset.submerged_gain));
}

#[test]
fn filters_are_configured_on_ambient_attach() {
    let mut backend = RecordingAudioBackend::new();
    let mixer = attached_mixer(&mut backend);
    assert_eq!(backend.filters_configured, 1);
    assert!(mixer.is_attached(Track::Ambient));
    assert!(mixer.is_attached(Track::Submerged));
}

#[test]
fn submerged_track_plays_once_per_submersion() {
    let mut backend = RecordingAudioBackend::new();
    let mut mixer = attached_mixer(&mut backend);

    for _ in 0..5 {
        mixer.update(FRAME, true, &mut backend);
    }
    assert_eq!(backend.plays_of(Track::Submerged), 1);

    for _ in 0..5 {
        mixer.update(FRAME, false, &mut backend);
    }
    assert_eq!(backend.pauses_of(Track::Submerged), 1);

    mixer.update(FRAME, true, &mut backend);
    assert_eq!(backend.plays_of(Track::Submerged), 2);
    assert!(mixer.channel(Track::Submerged).playing);
}

#[test]
fn missing_track_is_never_played() {
    let mut backend = RecordingAudioBackend::new();
    let mut mixer = AudioMixer::new(AudioConfig::default());
    mixer.update(FRAME, true, &mut backend);
    mixer.autoplay(&mut backend);
    assert!(!mixer.toggle_ambient(&mut backend));
    assert!(backend.plays.is_empty());
    assert!(backend.gains.is_empty());
}

#[test]
fn rejected_play_is_retried_on_user_play() {
    let mut backend = RecordingAudioBackend::new();
    backend.reject_play.insert(Track::Submerged);
    let mut mixer = attached_mixer(&mut backend);

    mixer.update(FRAME, true, &mut backend);
    mixer.update(FRAME, true, &mut backend);
    assert!(backend.plays.is_empty());
    assert_eq!(mixer.errors().len(), 1);
    assert!(matches!(
        mixer.errors()[0],
        DioramaError::Playback {
            track: Track::Submerged,
            ..
        }
    ));

    backend.reject_play.clear();
    assert!(mixer.toggle_ambient(&mut backend));
    assert_eq!(backend.plays, vec![Track::Ambient, Track::Submerged]);
}

#[test]
fn toggle_pauses_and_resumes_ambient() {
    let mut backend = RecordingAudioBackend::new();
    let mut mixer = attached_mixer(&mut backend);
    mixer.autoplay(&mut backend);
    assert_eq!(backend.plays_of(Track::Ambient), 1);

    assert!(!mixer.toggle_ambient(&mut backend));
    assert_eq!(backend.pauses_of(Track::Ambient), 1);
    assert!(mixer.toggle_ambient(&mut backend));
    assert_eq!(backend.plays_of(Track::Ambient), 2);

    // the user is in control now
    mixer.toggle_ambient(&mut backend);
    mixer.autoplay(&mut backend);
    assert_eq!(backend.plays_of(Track::Ambient), 2);
}

#[test]
fn suspended_context_is_resumed_before_playing() {
    let mut backend = RecordingAudioBackend::suspended();
    let mut mixer = attached_mixer(&mut backend);
    mixer.autoplay(&mut backend);
    assert_eq!(backend.state, ContextState::Running);
    assert_eq!(backend.plays_of(Track::Ambient), 1);
}

#[test]
fn failing_context_degrades_audio() {
    let mut backend = RecordingAudioBackend::suspended();
    backend.fail_resume = true;
    let mut mixer = attached_mixer(&mut backend);

    mixer.autoplay(&mut backend);
    assert!(mixer.is_degraded());
    assert!(matches!(mixer.errors()[0], DioramaError::Context { .. }));

    mixer.update(FRAME, true, &mut backend);
    assert!(!mixer.toggle_ambient(&mut backend));
    assert!(backend.plays.is_empty());
    assert_eq!(mixer.errors().len(), 1);
}

#[test]
fn teardown_stops_and_closes() {
    let mut backend = RecordingAudioBackend::new();
    let mut mixer = attached_mixer(&mut backend);
    mixer.autoplay(&mut backend);
    mixer.teardown(&mut backend);
    assert_eq!(backend.pauses_of(Track::Ambient), 1);
    assert!(backend.closed);
    assert!(!mixer.toggle_ambient(&mut backend));
}

#[test]
fn diving_switches_the_mix() {
    let mut diorama = ready_diorama(test_config());
    diorama.on_scroll(ScrollStep::Advance);
    for _ in 0..200 {
        diorama.tick(FRAME);
    }
    let preset = diorama.context().config.audio.submerged;
    assert_eq!(diorama.audio_backend().plays_of(Track::Submerged), 1);
    assert!(approx(diorama.mixer().channel(Track::Ambient).gain_current, preset.ambient_gain));

    diorama.on_scroll(ScrollStep::Retreat);
    diorama.tick(FRAME);
    assert_eq!(diorama.audio_backend().pauses_of(Track::Submerged), 1);
}
