use serde::Serialize;
use thiserror::Error;

const HINT_MISSING_KEY: &str =
    "Add WAKATIME_API_KEY to your .env file. Get it from https://wakatime.com/settings/account";
const HINT_MALFORMED_KEY: &str =
    "API key should start with \"waka_\". Check https://wakatime.com/settings/account";
const HINT_AUTHENTICATION: &str = "Check your API key at https://wakatime.com/settings/account";
const HINT_AUTHORIZATION: &str = "Make sure your API key has the correct permissions";
const HINT_RATE_LIMIT: &str = "Too many requests. Please try again later";
const HINT_TRANSPORT: &str = "Check server logs for more details";

/// wakastats error types
#[derive(Error, Debug)]
pub enum WakastatsError {
    /// Failed to parse an upstream payload
    #[error("parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Stats gateway failure
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Result type alias for wakastats
pub type Result<T> = std::result::Result<T, WakastatsError>;

/// Coarse classification of gateway failures, used for operator diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Configuration,
    MethodNotAllowed,
    Authentication,
    Authorization,
    RateLimit,
    Upstream,
    Transport,
}

/// Failures of the stats gateway. Display is the user-facing `error` message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("WakaTime API key not configured")]
    MissingCredential,

    #[error("Invalid WakaTime API key format")]
    MalformedCredential,

    /// Upstream 401
    #[error("Invalid WakaTime API key")]
    Authentication { details: String },

    /// Upstream 403
    #[error("Access forbidden")]
    Authorization { details: String },

    /// Upstream 429
    #[error("Rate limit exceeded")]
    RateLimited { details: String },

    /// Any other non-2xx upstream status
    #[error("WakaTime API error: {status}")]
    Upstream { status: u16, details: String },

    /// Upstream unreachable, or a 2xx body that could not be read as JSON
    #[error("Failed to fetch WakaTime data")]
    Transport { details: String },
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MethodNotAllowed => ErrorKind::MethodNotAllowed,
            Self::MissingCredential | Self::MalformedCredential => ErrorKind::Configuration,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Authorization { .. } => ErrorKind::Authorization,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::Transport { .. } => ErrorKind::Transport,
        }
    }

    /// HTTP status returned to the caller. Upstream statuses are forwarded.
    pub fn status(&self) -> u16 {
        match self {
            Self::MethodNotAllowed => 405,
            Self::MissingCredential | Self::MalformedCredential => 500,
            Self::Authentication { .. } => 401,
            Self::Authorization { .. } => 403,
            Self::RateLimited { .. } => 429,
            Self::Upstream { status, .. } => *status,
            Self::Transport { .. } => 500,
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MethodNotAllowed | Self::Upstream { .. } => None,
            Self::MissingCredential => Some(HINT_MISSING_KEY),
            Self::MalformedCredential => Some(HINT_MALFORMED_KEY),
            Self::Authentication { .. } => Some(HINT_AUTHENTICATION),
            Self::Authorization { .. } => Some(HINT_AUTHORIZATION),
            Self::RateLimited { .. } => Some(HINT_RATE_LIMIT),
            Self::Transport { .. } => Some(HINT_TRANSPORT),
        }
    }

    /// Raw upstream body or transport error text, when there is one
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::MethodNotAllowed | Self::MissingCredential | Self::MalformedCredential => None,
            Self::Authentication { details }
            | Self::Authorization { details }
            | Self::RateLimited { details }
            | Self::Upstream { details, .. }
            | Self::Transport { details } => Some(details),
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            details: self.details().map(String::from),
            hint: self.hint().map(String::from),
        }
    }
}

/// JSON error body: `{ error, details?, hint? }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}
