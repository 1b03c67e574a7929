use thiserror::Error;

use crate::player::PlayerId;

/// Outcomes a match launch can end in; mirrors the `matches{queue, outcome}` metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Successful,
    TimedOut,
    AbortedByPlayer,
    Errored,
}

impl MatchOutcome {
    pub fn label(self) -> &'static str {
        match self {
            MatchOutcome::Successful => "SUCCESSFUL",
            MatchOutcome::TimedOut => "TIMED_OUT",
            MatchOutcome::AbortedByPlayer => "ABORTED_BY_PLAYER",
            MatchOutcome::Errored => "ERRORED",
        }
    }
}

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("not connected: {0:?}")]
    NotConnected(Vec<PlayerId>),
    #[error("game closed during setup: {0}")]
    GameClosed(PlayerId),
    #[error("no eligible map pool")]
    EmptyPool,
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] store::StoreError),
    #[error("launch failed: {0}")]
    Unexpected(String),
}

impl LaunchError {
    /// The per-queue players this failure should attribute violations to, if any.
    pub fn abandoners(&self) -> Vec<PlayerId> {
        match self {
            LaunchError::NotConnected(players) => players.clone(),
            LaunchError::GameClosed(player) => vec![player.clone()],
            _ => Vec::new(),
        }
    }

    pub fn outcome(&self) -> MatchOutcome {
        match self {
            LaunchError::NotConnected(_) => MatchOutcome::TimedOut,
            LaunchError::GameClosed(_) => MatchOutcome::AbortedByPlayer,
            LaunchError::EmptyPool | LaunchError::StoreUnavailable(_) | LaunchError::Unexpected(_) => {
                MatchOutcome::Errored
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum LadderError {
    #[error("store unavailable: {0}")]
    Store(#[from] store::StoreError),
    #[error("{0}")]
    Unexpected(String),
}
