use flow_diorama::{
    error::LoadError,
    resources::{
        Asset, AssetId, AssetKind,
        pipeline::{Liveness, LoadRequest, drive_loads, load_with_fallback},
        slot::{AssetRegistry, SlotStatus},
    },
};
use futures::{StreamExt, channel::mpsc::unbounded};
use instant::Duration;

use crate::common::test_utils::{StubLoader, StubResponse, audio_clip, environment_map};

mod common;

fn audio_request(id: &str) -> LoadRequest {
    LoadRequest {
        id: AssetId::from(id),
        kind: AssetKind::Audio,
        primary: format!("{}.mp3", id),
        fallback: Some(format!("{}.wav", id)),
    }
}

const TIMEOUT: Duration = Duration::from_millis(50);

#[tokio::test]
async fn primary_success_skips_fallback() {
    let loader = StubLoader::new().with("pond.mp3", StubResponse::Ok(Asset::Audio(audio_clip("pond.mp3"))));
    let asset = load_with_fallback(&loader, &audio_request("pond"), TIMEOUT)
        .await
        .expect("primary should load");
    assert_eq!(asset.as_audio().map(|clip| clip.path.as_str()), Some("pond.mp3"));
    assert_eq!(loader.calls(), vec!["pond.mp3".to_string()]);
}

#[tokio::test]
async fn failed_primary_falls_back_once() {
    let loader = StubLoader::new()
        .with("pond.mp3", StubResponse::Fail("codec not supported".to_string()))
        .with("pond.wav", StubResponse::Ok(Asset::Audio(audio_clip("pond.wav"))));
    let asset = load_with_fallback(&loader, &audio_request("pond"), TIMEOUT)
        .await
        .expect("fallback should load");
    assert_eq!(asset.as_audio().map(|clip| clip.path.as_str()), Some("pond.wav"));
    assert_eq!(loader.calls(), vec!["pond.mp3".to_string(), "pond.wav".to_string()]);
}

#[tokio::test]
async fn hanging_primary_times_out_then_falls_back() {
    let loader = StubLoader::new()
        .with("pond.mp3", StubResponse::Hang)
        .with("pond.wav", StubResponse::Ok(Asset::Audio(audio_clip("pond.wav"))));
    let asset = load_with_fallback(&loader, &audio_request("pond"), TIMEOUT).await;
    assert!(asset.is_ok());
}

#[tokio::test]
async fn exhausted_fallback_keeps_both_causes() {
    let loader = StubLoader::new()
        .with("pond.mp3", StubResponse::Hang)
        .with("pond.wav", StubResponse::Fail("404".to_string()));
    let err = load_with_fallback(&loader, &audio_request("pond"), TIMEOUT)
        .await
        .expect_err("both attempts fail");
    match &err {
        LoadError::FallbackExhausted { primary, fallback } => {
            assert!(matches!(**primary, LoadError::TimedOut { .. }));
            assert!(matches!(**fallback, LoadError::Failed { .. }));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.is_timeout());
}

#[tokio::test]
async fn no_fallback_reports_primary_error() {
    let loader = StubLoader::new();
    let request = LoadRequest {
        id: AssetId::from("frog"),
        kind: AssetKind::Visual,
        primary: "models/frog.glb".to_string(),
        fallback: None,
    };
    let err = load_with_fallback(&loader, &request, TIMEOUT)
        .await
        .expect_err("unknown path fails");
    assert!(matches!(err, LoadError::Failed { ref path, .. } if path == "models/frog.glb"));
}

#[tokio::test]
async fn wrong_asset_kind_is_a_failure() {
    let loader = StubLoader::new().with("sky.hdr", StubResponse::Ok(Asset::Audio(audio_clip("sky.hdr"))));
    let request = LoadRequest {
        id: AssetId::from("sky"),
        kind: AssetKind::Environment,
        primary: "sky.hdr".to_string(),
        fallback: None,
    };
    assert!(load_with_fallback(&loader, &request, TIMEOUT).await.is_err());
}

#[tokio::test]
async fn every_request_completes_exactly_once() {
    let loader = StubLoader::new()
        .with(
            "a.mp3",
            StubResponse::Delay(
                Duration::from_millis(20),
                Box::new(StubResponse::Ok(Asset::Audio(audio_clip("a.mp3")))),
            ),
        )
        .with("b.mp3", StubResponse::Fail("broken".to_string()))
        .with("b.wav", StubResponse::Ok(Asset::Audio(audio_clip("b.wav"))))
        .with("c.mp3", StubResponse::Hang)
        .with("c.wav", StubResponse::Hang);
    let requests = vec![audio_request("a"), audio_request("b"), audio_request("c")];
    let (sender, receiver) = unbounded();

    drive_loads(&loader, requests, TIMEOUT, Liveness::new(), sender).await;

    let mut completions: Vec<_> = receiver.collect().await;
    completions.sort_by(|a, b| a.id.cmp(&b.id));
    let ids: Vec<&str> = completions.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(completions[0].result.is_ok());
    assert!(completions[1].result.is_ok());
    assert!(completions[2].result.as_ref().is_err_and(|e| e.is_timeout()));
}

#[tokio::test]
async fn completions_after_teardown_are_discarded() {
    let loader = StubLoader::new().with("a.mp3", StubResponse::Ok(Asset::Audio(audio_clip("a.mp3"))));
    let liveness = Liveness::new();
    liveness.kill();
    let (sender, receiver) = unbounded();

    drive_loads(&loader, vec![audio_request("a")], TIMEOUT, liveness, sender).await;

    let completions: Vec<_> = receiver.collect().await;
    assert!(completions.is_empty());
}

#[test]
fn slots_flip_at_most_once() {
    let mut registry: AssetRegistry<Asset> = AssetRegistry::new();
    registry.register_slot("sky", AssetKind::Environment);
    registry.register_slot("pond", AssetKind::Audio);
    let sky = AssetId::from("sky");
    let pond = AssetId::from("pond");

    assert!(!registry.is_fully_attempted());
    assert!(registry.report_success(&sky, Asset::Environment(environment_map(16))));
    assert!(!registry.report_failure(
        &sky,
        LoadError::Failed {
            path: "sky.hdr".to_string(),
            reason: "late".to_string(),
        }
    ));
    assert_eq!(registry.status(&sky), Some(SlotStatus::Loaded));
    assert!(registry.handle(&sky).is_some());
    assert!(!registry.is_fully_attempted());

    assert!(registry.report_failure(
        &pond,
        LoadError::TimedOut {
            path: "pond.mp3".to_string(),
            timeout: TIMEOUT,
        }
    ));
    assert!(registry.is_fully_attempted());
    assert_eq!(registry.status(&pond), Some(SlotStatus::Failed));
    assert!(registry.handle(&pond).is_none());

    let errors = registry.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, pond);
}

#[test]
fn unknown_slot_reports_are_ignored() {
    let mut registry: AssetRegistry<Asset> = AssetRegistry::new();
    registry.register_slot("sky", AssetKind::Environment);
    assert!(!registry.report_success(&AssetId::from("moon"), Asset::Environment(environment_map(16))));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.status(&AssetId::from("sky")), Some(SlotStatus::Pending));
}

#[test]
fn empty_registry_is_trivially_attempted() {
    let registry: AssetRegistry<Asset> = AssetRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.is_fully_attempted());
}

#[test]
fn dispose_releases_handles_but_keeps_status() {
    let mut registry: AssetRegistry<Asset> = AssetRegistry::new();
    registry.register_slot("sky", AssetKind::Environment);
    let sky = AssetId::from("sky");
    registry.report_success(&sky, Asset::Environment(environment_map(16)));
    registry.dispose();
    assert!(registry.handle(&sky).is_none());
    assert!(registry.is_fully_attempted());
}
