//! The form-then-chat session.
//!
//! A session starts in [`SessionState::CollectingInfo`]. Submitting the intake
//! form moves it to [`SessionState::Chatting`]; the first arrival there runs a
//! one-time entry action ([`Session::enter_chat`]) that connects to Groq and
//! seeds the transcript with the system instruction and a welcome message. A
//! reset returns to the initial state from anywhere.
//!
//! Connecting is fail-fast: a missing API key or a failed probe halts the
//! session for good. A failed chat turn only reports an error; the user's
//! message stays in the transcript and the next message is sent normally.

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::credentials::CredentialSource;
use crate::error::SessionError;
use crate::llm_interaction::{ClientSettings, GroqClient, Message, Role};
use crate::profile::{FormSubmission, SessionContext};
use crate::prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    CollectingInfo,
    Chatting,
    Halted,
}

/// What a UI host needs to draw the current screen.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub state: SessionState,
    /// Transcript without the system instruction.
    pub messages: Vec<Message>,
    pub context_caption: String,
    pub model_caption: String,
    pub can_reset: bool,
    pub fatal_error: Option<String>,
}

pub struct Session {
    context: SessionContext,
    transcript: Vec<Message>,
    client: Option<GroqClient>,
    halted: Option<String>,
    settings: ClientSettings,
    credentials: CredentialSource,
}

impl Session {
    pub fn new(settings: ClientSettings, credentials: CredentialSource) -> Self {
        Self {
            context: SessionContext::default(),
            transcript: Vec::new(),
            client: None,
            halted: None,
            settings,
            credentials,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.halted.is_some() {
            SessionState::Halted
        } else if self.context.form_completed {
            SessionState::Chatting
        } else {
            SessionState::CollectingInfo
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// The message of the fatal error that halted the session, if any.
    pub fn halted_message(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    fn ensure_not_halted(&self) -> Result<(), SessionError> {
        match &self.halted {
            Some(message) => Err(SessionError::Halted(message.clone())),
            None => Ok(()),
        }
    }

    /// Form-submit hook: `CollectingInfo -> Chatting`.
    pub fn submit_form(&mut self, submission: FormSubmission) -> Result<(), SessionError> {
        self.ensure_not_halted()?;
        if self.context.form_completed {
            return Err(SessionError::FormAlreadySubmitted);
        }

        self.context = SessionContext::from_submission(submission);
        info!(
            age = ?self.context.child_age_range,
            traits = self.context.temperament_traits.len(),
            "Intake form submitted"
        );
        Ok(())
    }

    /// Entry action for `Chatting`. Runs once per session: returns immediately
    /// when a client already exists.
    #[instrument(skip(self))]
    pub async fn enter_chat(&mut self) -> Result<(), SessionError> {
        self.ensure_not_halted()?;
        if !self.context.form_completed {
            return Err(SessionError::NotChatting);
        }
        if self.client.is_some() {
            return Ok(());
        }

        info!("Connecting to the AI assistant...");
        let client = match self.connect().await {
            Ok(client) => client,
            Err(e) => {
                error!("Halting session: {}", e);
                self.halted = Some(e.to_string());
                return Err(e);
            }
        };
        self.client = Some(client);

        if self.transcript.is_empty() {
            let system_prompt = prompt::compose_system_prompt(
                self.context.child_age_range,
                &self.context.temperament_traits,
                &self.context.current_challenges,
            );
            debug!(chars = system_prompt.len(), "Composed system prompt");
            self.transcript.push(Message::system(system_prompt));
            self.transcript
                .push(Message::assistant(prompt::compose_welcome_message(&self.context)));
        }
        Ok(())
    }

    async fn connect(&self) -> Result<GroqClient, SessionError> {
        let api_key = self
            .credentials
            .resolve()
            .ok_or_else(|| SessionError::CredentialMissing {
                name: self.credentials.name().to_string(),
            })?;

        let client = GroqClient::new(api_key, self.settings.clone());
        client
            .list_models()
            .await
            .map_err(SessionError::ServiceConnect)?;
        info!(model = client.model(), "Connected to Groq");
        Ok(client)
    }

    /// Chat-input hook. Blank input is ignored and returns `Ok(None)`;
    /// otherwise returns the assistant's reply.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn send_user_message(&mut self, text: &str) -> Result<Option<String>, SessionError> {
        self.ensure_not_halted()?;
        if text.is_empty() {
            return Ok(None);
        }
        let client = match (&self.client, self.context.form_completed) {
            (Some(client), true) => client,
            _ => return Err(SessionError::NotChatting),
        };

        self.transcript.push(Message::user(text));
        match client.create_chat_completion(&self.transcript).await {
            Ok(reply) => {
                self.transcript.push(Message::assistant(reply.clone()));
                Ok(Some(reply))
            }
            Err(e) => {
                warn!("Chat turn failed: {}", e);
                Err(SessionError::CompletionRequest(e))
            }
        }
    }

    /// Reset trigger: back to `CollectingInfo` from any state.
    pub fn reset(&mut self) {
        info!("Resetting session");
        self.context = SessionContext::default();
        self.transcript.clear();
        self.client = None;
        self.halted = None;
    }

    /// Render hook.
    pub fn view(&self) -> SessionView {
        let state = self.state();
        SessionView {
            state,
            messages: self
                .transcript
                .iter()
                .filter(|m| m.role != Role::System)
                .cloned()
                .collect(),
            context_caption: format!("Context: {}", prompt::compose_context_caption(&self.context)),
            model_caption: format!("Powered by Groq ({})", self.settings.model),
            can_reset: state == SessionState::Chatting,
            fatal_error: self.halted.clone(),
        }
    }
}
