pub mod chat;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod llm_interaction;
pub mod profile;
pub mod prompt;
pub mod session;
pub mod web_server;

pub use error::{LlmError, SessionError};
pub use llm_interaction::{ClientSettings, GroqClient, Message, Role};
pub use profile::{AgeRange, FormSubmission, SessionContext, Temperament};
pub use session::{Session, SessionState, SessionView};
