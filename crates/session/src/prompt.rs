//! Fixed prompts the assistant sends to the model.

use llm::Message;

/// Persona prepended to every chat request.
pub const DEFAULT_PERSONA: &str =
    "You are PapilioTask assistant. Help the user manage events.";

/// Prepend the persona system message to a conversation history.
pub fn with_persona(persona: &str, history: &[Message]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(Message::system(persona));
    messages.extend_from_slice(history);
    messages
}

/// Instruction asking the model to rewrite `input` and return only the
/// rewritten text.
pub fn polish(input: &str) -> String {
    format!(
        "You are a professional editor. Please rewrite the following text to be clearer \
         and more polished without adding any extra AI commentary. Reply with the \
         rewritten text only:\n\n{input}"
    )
}
