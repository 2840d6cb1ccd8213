use crate::models::{HandlerId, Message};

const CLASSIFIER_INSTRUCTION: &str = "You are an intent classifier. Classify the user's message \
     into EXACTLY one of these categories: joke, fact, advice, general. Reply with ONLY the \
     single category word, nothing else.";

/// Per-handler system instruction. Each responder gets its own persona; the
/// user message is passed through unchanged.
pub fn persona_instruction(handler: HandlerId) -> &'static str {
    match handler {
        HandlerId::JokeTeller => {
            "You are a hilarious comedian. Tell a short, funny joke related to what the user \
             said. Keep it clean and witty."
        }
        HandlerId::FactProvider => {
            "You are a knowledgeable encyclopedia. Provide a concise, fascinating fact related \
             to the user's topic. Include a 'Did you know?' opener."
        }
        HandlerId::Advisor => {
            "You are a wise and empathetic advisor. Give brief, actionable advice on the user's \
             topic. Be supportive and practical."
        }
        HandlerId::Fallback => {
            "You are a friendly, helpful assistant. Respond conversationally to the user."
        }
    }
}

pub fn classification_prompt(latest_user: &str) -> Vec<Message> {
    vec![
        Message::system(CLASSIFIER_INSTRUCTION),
        Message::user(latest_user),
    ]
}

pub fn handler_prompt(handler: HandlerId, latest_user: &str) -> Vec<Message> {
    vec![
        Message::system(persona_instruction(handler)),
        Message::user(latest_user),
    ]
}
