use reqwest::StatusCode;
use std::fmt::Display;
use thiserror::Error;

/// All errors generated by the tidemark data layer.
#[derive(Debug, Error)]
pub enum DataError {
    /// Network-level failure talking to the exchange (DNS, connect, timeout,
    /// TLS, body read). Aborts any series fetch in progress.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The exchange answered with a non-2xx status. Whether this propagates
    /// or is absorbed into an empty result is decided by the client's
    /// [`StatusPolicy`](crate::rest::StatusPolicy).
    #[error("upstream responded {status}: {message}")]
    UpstreamStatus { status: StatusCode, message: String },

    /// A single inbound message could not be decoded or applied. Isolated to
    /// that message; never fatal to a connection or a series.
    #[error("malformed message ({detail}): {payload}")]
    MalformedMessage { detail: String, payload: String },

    /// The requested upstream path is known to be incompletely supported.
    #[error("incomplete endpoint support: {0}")]
    EndpointIncomplete(&'static str),

    /// WebSocket protocol or connection failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A subscription could not be registered or sent.
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// The bounded request queue rejected a submission.
    #[error("request queue is full")]
    QueueFull,

    /// The request queue worker has shut down and will never answer.
    #[error("request queue closed")]
    QueueClosed,
}

impl DataError {
    /// Construct a [`DataError::MalformedMessage`] from a decode error and the
    /// offending payload.
    pub fn malformed(detail: impl Display, payload: impl Into<String>) -> Self {
        Self::MalformedMessage {
            detail: detail.to_string(),
            payload: payload.into(),
        }
    }
}
