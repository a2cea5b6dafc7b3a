use thiserror::Error;

/// Errors surfaced by the player command surface
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("player session has been torn down")]
    SessionClosed,

    #[error("playback failed: {0}")]
    Errored(String),

    #[error("media element rejected play request: {0}")]
    PlayRejected(String),

    #[error(transparent)]
    Media(#[from] anyhow::Error),
}

/// Errors returned by a remote progress gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("progress request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("progress endpoint returned status {0}")]
    Status(u16),

    #[error("invalid gateway url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{0}")]
    Unavailable(String),
}

pub type PlayerResult<T> = Result<T, PlayerError>;
