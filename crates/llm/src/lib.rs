mod error;
mod ollama;

use async_trait::async_trait;
use parley_core::Message;

pub use error::LlmError;
pub use ollama::OllamaGenerator;

/// Per-request sampling configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
}

impl Sampling {
    /// Temperature 0.0 — classification and every non-joke responder.
    pub const fn deterministic() -> Self {
        Self { temperature: 0.0 }
    }

    /// Temperature 0.9 — joke variety.
    pub const fn exploratory() -> Self {
        Self { temperature: 0.9 }
    }
}

/// A text-generation collaborator: role-tagged messages in, one assistant
/// message out. The sole external dependency of the classifier and every
/// responder; inject one shared handle rather than constructing clients
/// per call site.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, messages: &[Message], sampling: Sampling)
        -> Result<Message, LlmError>;

    /// Cheap reachability probe for diagnostics; not used on the turn path.
    async fn health_check(&self) -> Result<bool, LlmError> {
        Ok(true)
    }
}
