//! Warm-up protocol run once per session.
//!
//! `Loading → RampToLow → Settling → RampToMedium → Ready`. The sequence waits
//! for every asset slot to be attempted, renders at the cheapest tier for a
//! fixed dwell, then switches to the medium tier and hands tier control to the
//! user.

use instant::Duration;

use crate::quality::QualityTier;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartupState {
    Loading,
    RampToLow,
    Settling,
    RampToMedium,
    Ready,
}

#[derive(Debug)]
pub struct StartupSequence {
    state: StartupState,
    dwell: Duration,
    settled_for: Duration,
    history: Vec<StartupState>,
}

impl StartupSequence {
    pub fn new(dwell: Duration) -> Self {
        Self {
            state: StartupState::Loading,
            dwell,
            settled_for: Duration::ZERO,
            history: vec![StartupState::Loading],
        }
    }

    pub fn state(&self) -> StartupState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == StartupState::Ready
    }

    /// Every state entered so far, in order.
    pub fn history(&self) -> &[StartupState] {
        &self.history
    }

    /// Fires whatever transitions are due and returns the tier they set.
    ///
    /// `elapsed` only counts toward the dwell if the sequence was already
    /// settling before this call, so the cheap tier gets at least one frame.
    pub fn advance(&mut self, fully_attempted: bool, elapsed: Duration) -> Option<QualityTier> {
        match self.state {
            StartupState::Loading if fully_attempted => {
                self.enter(StartupState::RampToLow);
                self.settled_for = Duration::ZERO;
                self.enter(StartupState::Settling);
                Some(QualityTier::Performance)
            }
            StartupState::Settling => {
                self.settled_for += elapsed;
                if self.settled_for < self.dwell {
                    return None;
                }
                self.enter(StartupState::RampToMedium);
                self.enter(StartupState::Ready);
                Some(QualityTier::Medium)
            }
            _ => None,
        }
    }

    fn enter(&mut self, state: StartupState) {
        log::info!("Startup: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.history.push(state);
    }
}
