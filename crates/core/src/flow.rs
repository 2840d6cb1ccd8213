use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{HandlerId, Intent};

/// Which turn topology is being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowShape {
    /// Single node: one handler consumes the transcript and replies.
    Direct,
    /// Classify, route, then exactly one of the four handlers.
    Routed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Start,
    Classifying,
    Routing,
    Handling,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnEvent {
    Begin,
    IntentResolved(Intent),
    HandlerSelected(HandlerId),
    ReplyProduced,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("invalid transition from {phase:?} on {event:?}")]
    InvalidTransition { phase: TurnPhase, event: TurnEvent },
}

/// Per-turn state machine. Created fresh for every turn; `Done` is terminal,
/// so a turn can pass through `Handling` at most once.
#[derive(Debug, Clone)]
pub struct TurnFlow {
    shape: FlowShape,
    phase: TurnPhase,
}

impl TurnFlow {
    pub fn new(shape: FlowShape) -> Self {
        Self {
            shape,
            phase: TurnPhase::Start,
        }
    }

    pub fn routed() -> Self {
        Self::new(FlowShape::Routed)
    }

    pub fn direct() -> Self {
        Self::new(FlowShape::Direct)
    }

    pub fn shape(&self) -> FlowShape {
        self.shape
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == TurnPhase::Done
    }

    pub fn advance(&mut self, event: TurnEvent) -> Result<TurnPhase, FlowError> {
        let next = match (self.shape, self.phase, event) {
            (FlowShape::Routed, TurnPhase::Start, TurnEvent::Begin) => TurnPhase::Classifying,
            (FlowShape::Routed, TurnPhase::Classifying, TurnEvent::IntentResolved(_)) => {
                TurnPhase::Routing
            }
            (FlowShape::Routed, TurnPhase::Routing, TurnEvent::HandlerSelected(_)) => {
                TurnPhase::Handling
            }
            (FlowShape::Direct, TurnPhase::Start, TurnEvent::Begin) => TurnPhase::Handling,
            (_, TurnPhase::Handling, TurnEvent::ReplyProduced) => TurnPhase::Done,
            (_, phase, event) => {
                return Err(FlowError::InvalidTransition { phase, event });
            }
        };

        self.phase = next;
        Ok(next)
    }
}

/// Render the turn topology as a Mermaid flowchart for human inspection.
pub fn mermaid(shape: FlowShape) -> String {
    match shape {
        FlowShape::Direct => "flowchart TD\n    start([start]) --> chatbot\n    chatbot --> finish([end])\n".to_string(),
        FlowShape::Routed => {
            let mut diagram = String::from("flowchart TD\n    start([start]) --> classifier\n");
            for (label, handler) in [
                ("joke", HandlerId::JokeTeller),
                ("fact", HandlerId::FactProvider),
                ("advice", HandlerId::Advisor),
                ("general", HandlerId::Fallback),
            ] {
                diagram.push_str(&format!(
                    "    classifier -->|{label}| {}\n",
                    handler.as_name()
                ));
            }
            for handler in [
                HandlerId::JokeTeller,
                HandlerId::FactProvider,
                HandlerId::Advisor,
                HandlerId::Fallback,
            ] {
                diagram.push_str(&format!("    {} --> finish([end])\n", handler.as_name()));
            }
            diagram
        }
    }
}
