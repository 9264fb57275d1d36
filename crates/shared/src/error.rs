use thiserror::Error;

/// Failure reading or writing the sent-articles database. Aborts the run.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open sent-articles database at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to create data directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sent-articles query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("invalid timestamp stored for {url}: {value}")]
    Timestamp { url: String, value: String },
}

/// Failure fetching or parsing a feed endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("feed request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("feed returned HTTP {status}")]
    Status { status: u16 },

    #[error("feed is neither RSS ({rss}) nor Atom ({atom})")]
    Parse { rss: String, atom: String },
}

/// Failure downloading an article page.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("article request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("article returned HTTP {status}")]
    Status { status: u16 },
}

/// Outcome of a single summarization service call that did not yield a summary.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("summarization request timed out")]
    Timeout,

    #[error("summarization transport error: {0}")]
    Transport(String),

    /// The service answered with an explicit `error` payload.
    #[error("summarization service declined: {0}")]
    Service(String),

    #[error("unexpected summarization response: {0}")]
    Malformed(String),
}

impl CallError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CallError::Timeout | CallError::Transport(_))
    }
}

impl From<reqwest::Error> for CallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CallError::Timeout
        } else if err.is_decode() {
            CallError::Malformed(err.to_string())
        } else {
            CallError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("failed to build summarizer: {0}")]
    Setup(String),

    #[error(transparent)]
    Call(#[from] CallError),
}
