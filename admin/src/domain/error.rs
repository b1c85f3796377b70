use serde_json::Value;
use thiserror::Error;

/// Failure of one call to the content API, already normalized for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// the request never produced a response
    #[error("{0}")]
    Transport(String),
    /// the server answered with a non-2xx status
    #[error("{message}")]
    Status { status: u16, message: String },
    /// a 2xx response whose body is not JSON
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Builds the error of a non-2xx response from its raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body).ok();
        Self::Status {
            status,
            message: error_message(status, parsed.as_ref()),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The body's `error`, else its `message`, else a generic text with the status.
pub fn error_message(status: u16, body: Option<&Value>) -> String {
    let field = |name: &str| {
        body.and_then(|body| body.get(name))
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
    };

    field("error")
        .or_else(|| field("message"))
        .map(String::from)
        .unwrap_or_else(|| format!("Request failed with {status}"))
}
