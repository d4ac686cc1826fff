use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong in one invocation. All variants are reported
/// as text; none of them abort the process with a panic.
#[derive(Error, Debug)]
pub enum Error {
    /// An input file path could not be read. Halts before any API call.
    #[error("the file {} was not found", .0.display())]
    FileNotFound(PathBuf),

    #[error("API key not found; pass --openai_api_key or set key under [API] in config.toml")]
    MissingApiKey,

    #[error("no model configured; pass --model or set default_model under [CONFIG] in config.toml")]
    MissingModel,

    #[error("no max_tokens configured; pass --max_tokens or set max_tokens under [CONFIG] in config.toml")]
    MissingMaxTokens,

    /// The stored or overridden max_tokens value did not parse as a positive integer.
    #[error("max_tokens is not a valid positive integer: {0}")]
    InvalidMaxTokens(String),

    /// The API call succeeded but the response carried zero choices.
    #[error("the API returned no choices")]
    EmptyResponse,

    /// Transport failure, non-success status, or an undecodable response body.
    /// Carries the underlying message.
    #[error("API call failed: {0}")]
    Upstream(String),

    #[error("could not write {}: {}", .path.display(), .message)]
    OutputWrite { path: PathBuf, message: String },
}
