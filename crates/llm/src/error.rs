//! Transport errors.

/// Errors from model API calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The API key environment variable is not set
    #[error("{0} is not set")]
    MissingApiKey(&'static str),

    /// The request could not be sent or its body not read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message reported by the API
        message: String,
    },

    /// The response body was not what the API documents
    #[error("response parse error: {0}")]
    Parse(String),

    /// The response carried no text
    #[error("empty response from LLM")]
    EmptyResponse,
}
