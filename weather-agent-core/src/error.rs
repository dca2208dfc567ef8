use thiserror::Error;

/// Failures raised by the weather client and the tool surface.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The provider does not know the requested location (HTTP 404).
    #[error("Location '{0}' not found")]
    LocationNotFound(String),

    /// The provider answered with a non-success status.
    #[error("Weather API error: {message}")]
    Upstream { status: u16, message: String },

    /// DNS, connect, timeout or body transfer failure.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// A success response whose body is not the expected JSON shape.
    #[error("Invalid response from weather API: {0}")]
    Decode(String),

    /// Caller-supplied arguments are out of range or malformed.
    #[error("{0}")]
    Validation(String),

    /// A host collaborator is missing or has been shut down.
    #[error("{0}")]
    ContextUnavailable(String),
}

impl WeatherError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn context_unavailable(msg: impl Into<String>) -> Self {
        Self::ContextUnavailable(msg.into())
    }

    /// Message shown to tool callers in an error result.
    pub fn tool_message(&self) -> String {
        match self {
            Self::LocationNotFound(_) => format!("Location error: {self}"),
            Self::Validation(_) | Self::ContextUnavailable(_) => self.to_string(),
            _ => format!("Weather service error: {self}"),
        }
    }
}
