use std::fmt;
use std::time::Duration;

/// Result of checking a single channel
#[derive(Debug, Clone, PartialEq, Eq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum Verdict {
    /// The channel has a linked discussion chat
    Open,

    /// The channel exists, but has no linked discussion chat
    Closed,

    Error(CheckError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum CheckError {
    #[error("username is not occupied")]
    NotOccupied,

    #[error("invalid username")]
    InvalidUsername,

    #[error("failed to resolve the channel: {message}")]
    ResolutionFailure { message: String },

    #[error("rate limited, retry after {} s.", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("unknown error: {message}")]
    Unknown { message: String },
}

impl Verdict {
    /// Short label of the verdict suitable for metrics
    pub(crate) fn label(&self) -> &'static str {
        self.into()
    }

    /// Short label of the error reason suitable for metrics
    pub(crate) fn reason_label(&self) -> &'static str {
        match self {
            Verdict::Open | Verdict::Closed => "none",
            Verdict::Error(err) => err.into(),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Open => f.write_str("open"),
            Verdict::Closed => f.write_str("closed"),
            Verdict::Error(err) => write!(f, "error, {err}"),
        }
    }
}

/// Usernames of the channels sorted into buckets by the verdict
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Tallies {
    pub(crate) opened: Vec<String>,
    pub(crate) closed: Vec<String>,
    pub(crate) errors: Vec<(String, CheckError)>,
}

impl Tallies {
    pub(crate) fn record(&mut self, username: String, verdict: Verdict) {
        match verdict {
            Verdict::Open => self.opened.push(username),
            Verdict::Closed => self.closed.push(username),
            Verdict::Error(err) => self.errors.push((username, err)),
        }
    }

    /// Total number of channels recorded in all buckets
    pub(crate) fn processed(&self) -> usize {
        self.opened.len() + self.closed.len() + self.errors.len()
    }
}

/// Entry of the ledger of channels that were checked during the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CheckedChannel {
    pub(crate) username: String,
    pub(crate) verdict: Verdict,
}

impl fmt::Display for CheckedChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.username, self.verdict)
    }
}
