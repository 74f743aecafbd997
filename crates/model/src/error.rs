use std::fmt::{self, Display, Formatter};

/// The kind of error a model provider reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The content was refused by the provider.
    Moderated,
    /// The provider rejected the request because of rate limits.
    RateLimitExceeded,
    /// Transport failures, malformed streams and everything else.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Moderated => f.write_str("moderated"),
            ErrorKind::RateLimitExceeded => f.write_str("rate limit exceeded"),
            ErrorKind::Other => f.write_str("other"),
        }
    }
}
