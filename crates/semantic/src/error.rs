use std::io;
use thiserror::Error;

/// Errors surfaced while initializing an embedding client or embedding a query.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Credentials are missing, unreadable, or the auth endpoint could not be reached.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The provider kept signalling rate limits after every permitted attempt.
    #[error("{message}")]
    RateLimitExceeded {
        /// Provider that rejected the requests.
        provider: String,
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Human-actionable explanation.
        message: String,
    },
    /// Provider answered with a non-success HTTP status.
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },
    /// The request never produced an HTTP response (DNS, TLS, connect, timeout).
    #[error("request failed: {0}")]
    Transport(String),
    /// Provider answered 2xx but the body could not be turned into a vector.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Caller handed in something that cannot be embedded (blank text).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Low-level IO failures while touching credential files.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl EmbedError {
    /// Whether the failure carries a rate-limit or quota signal.
    ///
    /// Bounded-retry providers use this to decide whether to back off; the
    /// orchestrator uses it to classify single-shot 429s as rate limits.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            EmbedError::RateLimitExceeded { .. } => true,
            EmbedError::Http { status, body } => *status == 429 || mentions_rate_limit(body),
            EmbedError::Transport(message) => {
                mentions_rate_limit(message) || contains_word(message, "429")
            }
            _ => false,
        }
    }

    /// Whether this error points at missing or broken credentials.
    pub fn is_configuration(&self) -> bool {
        matches!(self, EmbedError::Configuration(_) | EmbedError::Io(_))
    }
}

/// Case-insensitive scan for the quota vocabulary providers put in error bodies.
///
/// Bare status digits are not vocabulary: request ids and timestamps contain
/// them too.
pub fn mentions_rate_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("quota")
        || lower.contains("rate limit")
        || lower.contains("resource_exhausted")
        || lower.contains("too many requests")
}

/// `word` occurs in `message` with no alphanumeric character on either side.
fn contains_word(message: &str, word: &str) -> bool {
    message.match_indices(word).any(|(start, _)| {
        let before = message[..start].chars().next_back();
        let after = message[start + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

impl From<reqwest::Error> for EmbedError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => EmbedError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None => EmbedError::Transport(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_configuration() {
        let err = EmbedError::Configuration("OPENAI_API_KEY not set".into());
        assert!(err.to_string().contains("configuration error"));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
        assert!(err.is_configuration());
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn rate_limit_exceeded_displays_message_only() {
        let err = EmbedError::RateLimitExceeded {
            provider: "vertex".into(),
            attempts: 3,
            message: "Vertex AI rate limit exceeded".into(),
        };
        assert_eq!(err.to_string(), "Vertex AI rate limit exceeded");
        assert!(err.is_rate_limited());
    }

    #[test]
    fn http_429_is_rate_limited() {
        let err = EmbedError::Http {
            status: 429,
            body: "slow down".into(),
        };
        assert!(err.is_rate_limited());
    }

    #[test]
    fn http_body_quota_is_rate_limited() {
        let err = EmbedError::Http {
            status: 400,
            body: "Quota exceeded for aiplatform.googleapis.com".into(),
        };
        assert!(err.is_rate_limited());
    }

    #[test]
    fn http_401_is_not_rate_limited() {
        let err = EmbedError::Http {
            status: 401,
            body: "invalid api key".into(),
        };
        assert!(!err.is_rate_limited());
        assert!(!err.is_configuration());
    }

    #[test]
    fn mentions_rate_limit_vocabulary() {
        assert!(mentions_rate_limit("RESOURCE_EXHAUSTED"));
        assert!(mentions_rate_limit("Rate limit reached for requests"));
        assert!(mentions_rate_limit("429 Too Many Requests"));
        assert!(!mentions_rate_limit("status 429"));
        assert!(!mentions_rate_limit("connection refused"));
    }

    #[test]
    fn http_500_with_429_digits_in_body_is_not_rate_limited() {
        let err = EmbedError::Http {
            status: 500,
            body: "internal error, request id req-84291".into(),
        };
        assert!(!err.is_rate_limited());

        let err = EmbedError::Http {
            status: 503,
            body: "upstream 429".into(),
        };
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn transport_status_token_must_stand_alone() {
        assert!(EmbedError::Transport("server replied 429".into()).is_rate_limited());
        assert!(EmbedError::Transport("(429)".into()).is_rate_limited());
        assert!(!EmbedError::Transport("trace 84291 reset by peer".into()).is_rate_limited());
        assert!(!EmbedError::Transport("id a429b".into()).is_rate_limited());
    }

    #[test]
    fn error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: EmbedError = io_err.into();
        assert!(err.to_string().contains("io error"));
        assert!(err.is_configuration());
    }
}
