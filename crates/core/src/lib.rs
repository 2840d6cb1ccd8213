pub mod flow;
pub mod intent;
pub mod models;
pub mod prompts;
pub mod route;

pub use flow::{FlowError, FlowShape, TurnEvent, TurnFlow, TurnPhase};
pub use models::*;
pub use prompts::{classification_prompt, handler_prompt, persona_instruction};
pub use route::route_intent;
