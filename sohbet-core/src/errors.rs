use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required credential or environment variable is absent or unusable.
    #[error("Missing configuration: {0}")]
    Configuration(String),
    /// The private key material could not be normalized into valid PEM.
    #[error("Credential format error: {0}")]
    CredentialFormat(String),
    /// The request to a provider failed or the response body could not be
    /// read.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// A provider returned a non-success status code.
    #[error("Status error: {1} (Status {0})")]
    Status(reqwest::StatusCode, String),
    /// The model returned no candidate with usable text.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
    /// Both voice tiers were rejected by the speech provider.
    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
