use thiserror::Error;

/// Failures talking to the chat-completion service.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("completion contained no message content")]
    EmptyCompletion,
}

#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("failed to read secrets file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse secrets file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Everything a session hook can report back to the user.
///
/// `CredentialMissing` and `ServiceConnect` are fatal: the session halts and
/// every later hook fails with `Halted`. `CompletionRequest` only fails the
/// current turn.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Groq API key not found. Please set {name} in your environment variables or secrets file.")]
    CredentialMissing { name: String },

    #[error("Failed to initialize or connect with Groq client: {0}")]
    ServiceConnect(#[source] LlmError),

    #[error("An error occurred while communicating with Groq: {0}")]
    CompletionRequest(#[source] LlmError),

    #[error("{0}")]
    Halted(String),

    #[error("unknown {field} option: {value:?}")]
    UnknownOption { field: &'static str, value: String },

    #[error("the intake form has already been submitted; reset to edit it")]
    FormAlreadySubmitted,

    #[error("the chat is not open yet; submit the intake form first")]
    NotChatting,
}

impl SessionError {
    /// Whether this error ends the session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::CredentialMissing { .. }
                | SessionError::ServiceConnect(_)
                | SessionError::Halted(_)
        )
    }
}
