use thiserror::Error;

/// Enumerates the failure modes of talking to the upstream API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The transport kept failing for the entire retry schedule.
    #[error("failed to fetch {url} after {tries} attempts")]
    UpstreamUnavailable { tries: usize, url: String },

    /// The server answered with an error status. Never retried.
    #[error("{status}: {url}\n{body}")]
    UpstreamHttp {
        status: u16,
        url: String,
        body: String,
    },

    /// The server answered OK but the body was not the expected JSON.
    /// Diagnostics are logged before this is raised.
    #[error("failed to decode server response")]
    UpstreamParse(#[from] serde_json::Error),

    /// A request asked for more records than the server will return.
    #[error("limit of {limit} is too large (max: {max})")]
    LimitTooLarge { limit: usize, max: usize },

    /// Client construction failed.
    #[error("connection error")]
    Network(#[from] reqwest::Error),

    /// The `profile` endpoint returned something that is not a user.
    #[error("failed to get user info: {0}")]
    InvalidProfile(serde_json::Value),
}
