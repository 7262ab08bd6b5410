// Runtime defaults, overridable from the environment (or a .env file).

use std::env;

/// Name of the credential looked up in the environment and the secrets file.
pub const API_KEY_NAME: &str = "GROQ_API_KEY";

pub const PAGE_TITLE: &str = "Personalized Parenting Tips Chatbot";

// Fixed sampling parameters sent with every completion request.
pub const TEMPERATURE: f32 = 0.7;
pub const TOP_P: f32 = 1.0;
pub const MAX_TOKENS: u32 = 1500;

/// How much of the challenges text the context caption shows.
pub const CAPTION_FOCUS_CHARS: usize = 50;

lazy_static::lazy_static! {
    pub static ref GROQ_API_BASE: String = env::var("GROQ_API_BASE").unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string());
    pub static ref DEFAULT_MODEL: String = env::var("GROQ_MODEL").unwrap_or_else(|_| "llama3-8b-8192".to_string());
    pub static ref SECRETS_FILE: String = env::var("PARENTING_SECRETS_FILE").unwrap_or_else(|_| "secrets.toml".to_string());
}
