//! Text built from the intake form: the system instruction sent ahead of every
//! conversation, the assistant's opening message, and the one-line context
//! caption shown above the chat.
//!
//! Everything here is pure; the same answers always produce the same bytes.

use crate::constants::CAPTION_FOCUS_CHARS;
use crate::profile::{AgeRange, SessionContext, Temperament};

const PERSONA_LINES: [&str; 5] = [
    "You are a helpful, empathetic, and knowledgeable AI assistant specializing in providing personalized parenting tips and advice.",
    "Your tone should be supportive, understanding, and non-judgmental.",
    "Focus on practical, actionable suggestions and positive reinforcement techniques.",
    "Avoid overly technical jargon unless explaining a specific concept clearly.",
    "Respond concisely but thoroughly to user questions about parenting challenges and strategies.",
];

const UNSPECIFIED_AGE_LINE: &str = "The user has not specified a child's age range, so provide general advice or ask for clarification if age is crucial for the specific question.";

const SAFETY_LINE: &str = "Always prioritize safety and well-being in your advice. If a topic seems potentially serious (e.g., medical issues, severe behavioral problems), gently suggest consulting a professional (pediatrician, therapist, etc.).";

fn join_traits(traits: &[Temperament]) -> String {
    traits
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builds the system instruction for a conversation.
///
/// Lines, in order: persona, age (or the unspecified fallback), temperament
/// (only when traits were picked), challenges (only when the trimmed text is
/// non-empty), safety. Joined with `\n`.
pub fn compose_system_prompt(
    age_range: Option<AgeRange>,
    temperament_traits: &[Temperament],
    current_challenges: &str,
) -> String {
    let mut lines: Vec<String> = PERSONA_LINES.iter().map(|l| l.to_string()).collect();

    match age_range.filter(|age| age.is_specified()) {
        Some(age) => lines.push(format!(
            "The user is specifically asking for advice related to a child in the {} age range. Tailor your advice significantly based on this developmental stage.",
            age
        )),
        None => lines.push(UNSPECIFIED_AGE_LINE.to_string()),
    }

    if !temperament_traits.is_empty() {
        lines.push(format!(
            "The child's temperament is described as: {}. Keep these traits in mind when suggesting communication styles, activities, and discipline strategies.",
            join_traits(temperament_traits)
        ));
    }

    let challenges = current_challenges.trim();
    if !challenges.is_empty() {
        lines.push(format!(
            "The parent mentioned they are currently focusing on or facing challenges with: '{}'. Try to address this area proactively if relevant to the user's questions, or use it as context for your advice.",
            challenges
        ));
    }

    lines.push(SAFETY_LINE.to_string());
    lines.join("\n")
}

/// The assistant's first message once the chat opens.
pub fn compose_welcome_message(context: &SessionContext) -> String {
    let mut welcome = String::from("Hello! I'm ready to help with parenting tips");

    if let Some(age) = context.child_age_range.filter(|age| age.is_specified()) {
        welcome.push_str(&format!(" for your {}", age.label().to_lowercase()));
    }
    if !context.temperament_traits.is_empty() {
        welcome.push_str(&format!(
            " (described as {})",
            join_traits(&context.temperament_traits).to_lowercase()
        ));
    }
    welcome.push('.');
    if let Some(challenges) = context.challenges() {
        welcome.push_str(&format!(" I see you're interested in '{}'.", challenges));
    }
    welcome.push_str(" How can I assist you today?");
    welcome
}

/// One-line summary of the form answers, e.g.
/// `Child Age: Toddler (1-3 years) | Temperament: Shy / Cautious`.
pub fn compose_context_caption(context: &SessionContext) -> String {
    let age = context
        .child_age_range
        .map(|age| age.label())
        .unwrap_or("None");
    let mut caption = format!("Child Age: {}", age);

    if !context.temperament_traits.is_empty() {
        caption.push_str(&format!(
            " | Temperament: {}",
            join_traits(&context.temperament_traits)
        ));
    }
    if let Some(challenges) = context.challenges() {
        let focus: String = challenges.chars().take(CAPTION_FOCUS_CHARS).collect();
        caption.push_str(&format!(" | Focus: {}...", focus));
    }
    caption
}
