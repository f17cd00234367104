//! Concurrent asset loading with timeout and fallback.
//!
//! Every [`LoadRequest`] is attempted against its primary path and, on error or
//! timeout, once against its fallback path. Completions are sent over an
//! unbounded channel as soon as each load settles; the owner of the
//! [`crate::context::Context`] applies them between frame ticks. A
//! [`Liveness`] token is checked before anything is sent, so completions that
//! settle after teardown go nowhere.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures::{StreamExt, channel::mpsc::UnboundedSender, stream::FuturesUnordered};
use instant::Duration;

use crate::{
    error::LoadError,
    resources::{Asset, AssetId, AssetKind, AssetLoader},
};

#[derive(Clone, Debug, PartialEq)]
pub struct LoadRequest {
    pub id: AssetId,
    pub kind: AssetKind,
    pub primary: String,
    pub fallback: Option<String>,
}

#[derive(Debug)]
pub struct SlotCompletion {
    pub id: AssetId,
    pub result: Result<Asset, LoadError>,
}

/// Shared flag that turns false once at teardown and never back.
#[derive(Clone, Debug)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn kill(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

async fn attempt<L: AssetLoader + ?Sized>(
    loader: &L,
    path: &str,
    kind: AssetKind,
    timeout: Duration,
) -> Result<Asset, LoadError> {
    #[cfg(not(target_arch = "wasm32"))]
    let result = match tokio::time::timeout(timeout, loader.load(path, kind)).await {
        Ok(result) => result,
        Err(_) => {
            return Err(LoadError::TimedOut {
                path: path.to_string(),
                timeout,
            });
        }
    };
    // The browser enforces its own network timeout.
    #[cfg(target_arch = "wasm32")]
    let result = {
        let _ = timeout;
        loader.load(path, kind).await
    };

    match result {
        Ok(asset) if asset.kind() == kind => Ok(asset),
        Ok(asset) => Err(LoadError::Failed {
            path: path.to_string(),
            reason: format!("expected a {:?} asset but got {:?}", kind, asset.kind()),
        }),
        Err(err) => Err(LoadError::failed(path, &err)),
    }
}

/// Primary attempt, then at most one fallback attempt.
pub async fn load_with_fallback<L: AssetLoader + ?Sized>(
    loader: &L,
    request: &LoadRequest,
    timeout: Duration,
) -> Result<Asset, LoadError> {
    let primary = match attempt(loader, &request.primary, request.kind, timeout).await {
        Ok(asset) => return Ok(asset),
        Err(err) => err,
    };
    let Some(fallback_path) = &request.fallback else {
        return Err(primary);
    };
    log::warn!(
        "Loading {} failed ({}), trying {}",
        request.id,
        primary,
        fallback_path
    );
    attempt(loader, fallback_path, request.kind, timeout)
        .await
        .map_err(|fallback| LoadError::FallbackExhausted {
            primary: Box::new(primary),
            fallback: Box::new(fallback),
        })
}

/// Runs all requests concurrently and forwards each completion while the
/// session is alive. Loads that are already in flight at teardown still run
/// to completion but their results are dropped.
pub async fn drive_loads<L: AssetLoader + ?Sized>(
    loader: &L,
    requests: Vec<LoadRequest>,
    timeout: Duration,
    liveness: Liveness,
    sender: UnboundedSender<SlotCompletion>,
) {
    let mut pending: FuturesUnordered<_> = requests
        .iter()
        .map(|request| async move {
            SlotCompletion {
                id: request.id.clone(),
                result: load_with_fallback(loader, request, timeout).await,
            }
        })
        .collect();

    while let Some(completion) = pending.next().await {
        if !liveness.is_alive() {
            log::debug!("Dropping completion of {} after teardown", completion.id);
            continue;
        }
        if let Err(err) = sender.unbounded_send(completion) {
            log::warn!("Completion receiver is gone: {}", err);
        }
    }
}

/// Starts [`drive_loads`] in the background: a dedicated thread with a
/// current-thread tokio runtime natively, `spawn_local` on the web.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_loads<L>(
    loader: L,
    requests: Vec<LoadRequest>,
    timeout: Duration,
    liveness: Liveness,
    sender: UnboundedSender<SlotCompletion>,
) -> std::thread::JoinHandle<()>
where
    L: AssetLoader + Send + 'static,
{
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                log::error!("Could not start the asset loading runtime: {}", err);
                // Fail every slot so the startup barrier still opens.
                for request in requests {
                    let completion = SlotCompletion {
                        result: Err(LoadError::Failed {
                            path: request.primary.clone(),
                            reason: err.to_string(),
                        }),
                        id: request.id,
                    };
                    if liveness.is_alive() {
                        let _ = sender.unbounded_send(completion);
                    }
                }
                return;
            }
        };
        runtime.block_on(drive_loads(&loader, requests, timeout, liveness, sender));
    })
}

#[cfg(target_arch = "wasm32")]
pub fn spawn_loads<L>(
    loader: L,
    requests: Vec<LoadRequest>,
    timeout: Duration,
    liveness: Liveness,
    sender: UnboundedSender<SlotCompletion>,
) where
    L: AssetLoader + 'static,
{
    wasm_bindgen_futures::spawn_local(async move {
        drive_loads(&loader, requests, timeout, liveness, sender).await;
    });
}
