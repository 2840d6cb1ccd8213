use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parley_core::{
    classification_prompt, handler_prompt, route_intent, FlowError, HandlerId, Intent, Message,
    Transcript, TurnEvent, TurnFlow,
};
use parley_llm::{LlmError, Sampling, TextGenerator};
use parley_observability::AppMetrics;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TurnError {
    /// The transcript holds no user message to respond to.
    #[error("transcript has no user message to respond to")]
    EmptyTranscript,

    /// The text-generation collaborator failed; the turn is aborted and
    /// nothing is appended. Not recovered at this layer.
    #[error(transparent)]
    Model(#[from] LlmError),

    /// Turn state machine misuse. Unreachable through the public executors.
    #[error(transparent)]
    Flow(#[from] FlowError),
}

/// Classifies the most recent user message into the closed intent set.
///
/// Holds a shared generator handle injected at construction; classification
/// is always deterministic. Malformed model output collapses to
/// `Intent::General` and is never an error.
pub struct IntentClassifier<G> {
    generator: Arc<G>,
}

impl<G: TextGenerator> IntentClassifier<G> {
    pub fn new(generator: Arc<G>) -> Self {
        Self { generator }
    }

    pub async fn classify(&self, latest_user: &str) -> Result<Intent, LlmError> {
        let prompt = classification_prompt(latest_user);
        let raw = self
            .generator
            .generate(&prompt, Sampling::deterministic())
            .await?;
        let intent = Intent::parse(&raw.content);
        info!(intent = intent.as_label(), "detected intent");
        Ok(intent)
    }
}

/// One responder persona. All four share the same contract: latest user
/// message in, one assistant message out of a single generation request.
pub struct Responder<G> {
    id: HandlerId,
    generator: Arc<G>,
}

impl<G: TextGenerator> Responder<G> {
    pub fn new(id: HandlerId, generator: Arc<G>) -> Self {
        Self { id, generator }
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    fn sampling(&self) -> Sampling {
        match self.id {
            HandlerId::JokeTeller => Sampling::exploratory(),
            _ => Sampling::deterministic(),
        }
    }

    pub async fn respond(&self, latest_user: &str) -> Result<Message, LlmError> {
        info!(handler = self.id.as_name(), "handler responding");
        let prompt = handler_prompt(self.id, latest_user);
        let reply = self.generator.generate(&prompt, self.sampling()).await?;
        Ok(Message::assistant(reply.content))
    }
}

/// The single assistant message produced by one routed pass, plus how it was
/// selected.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub message: Message,
    pub intent: Intent,
    pub handler: HandlerId,
}

/// Receipt for one committed turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub turn_id: Uuid,
    pub at: DateTime<Utc>,
    pub intent: Intent,
    pub handler: HandlerId,
    pub reply: Message,
}

/// Drives one routed turn: classify, route, invoke exactly one responder.
///
/// Owns the transcript for the life of the process; turns are strictly
/// sequential and each successful turn appends the staged user message plus
/// exactly one assistant message. A failed turn appends nothing.
pub struct TurnExecutor<G: TextGenerator> {
    classifier: IntentClassifier<G>,
    joke_teller: Responder<G>,
    fact_provider: Responder<G>,
    advisor: Responder<G>,
    fallback: Responder<G>,
    transcript: Transcript,
    metrics: Arc<AppMetrics>,
}

impl<G: TextGenerator> TurnExecutor<G> {
    pub fn new(generator: Arc<G>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            classifier: IntentClassifier::new(generator.clone()),
            joke_teller: Responder::new(HandlerId::JokeTeller, generator.clone()),
            fact_provider: Responder::new(HandlerId::FactProvider, generator.clone()),
            advisor: Responder::new(HandlerId::Advisor, generator.clone()),
            fallback: Responder::new(HandlerId::Fallback, generator),
            transcript: Transcript::new(),
            metrics,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    fn responder(&self, handler: HandlerId) -> &Responder<G> {
        match handler {
            HandlerId::JokeTeller => &self.joke_teller,
            HandlerId::FactProvider => &self.fact_provider,
            HandlerId::Advisor => &self.advisor,
            HandlerId::Fallback => &self.fallback,
        }
    }

    /// One routed pass over a transcript that already ends with the user's
    /// message. Returns exactly one assistant message without mutating
    /// anything; `EmptyTranscript` if no user message exists.
    pub async fn respond(&self, transcript: &Transcript) -> Result<TurnReply, TurnError> {
        let latest_user = transcript
            .latest_user_content()
            .ok_or(TurnError::EmptyTranscript)?
            .to_string();

        let mut flow = TurnFlow::routed();
        flow.advance(TurnEvent::Begin)?;

        let intent = self.classifier.classify(&latest_user).await?;
        self.metrics.inc_model_call();
        flow.advance(TurnEvent::IntentResolved(intent))?;

        let handler = route_intent(intent);
        flow.advance(TurnEvent::HandlerSelected(handler))?;

        let message = self.responder(handler).respond(&latest_user).await?;
        self.metrics.inc_model_call();
        flow.advance(TurnEvent::ReplyProduced)?;

        Ok(TurnReply {
            message,
            intent,
            handler,
        })
    }

    /// Stage the user message, run one routed pass, and commit user plus
    /// reply to the owned transcript only if the pass succeeded.
    #[instrument(skip(self, user_text))]
    pub async fn run_turn(&mut self, user_text: &str) -> Result<TurnOutcome, TurnError> {
        let started = Instant::now();
        self.metrics.inc_turn();

        let result = self.attempt_turn(user_text).await;
        match &result {
            Ok(outcome) => {
                if outcome.handler == HandlerId::Fallback {
                    self.metrics.inc_fallback();
                }
                self.metrics.observe_latency(started.elapsed());
                info!(
                    turn_id = %outcome.turn_id,
                    intent = outcome.intent.as_label(),
                    handler = outcome.handler.as_name(),
                    transcript_len = self.transcript.len(),
                    "turn handled"
                );
            }
            Err(error) => {
                self.metrics.inc_failed_turn();
                warn!(%error, "turn aborted, transcript unchanged");
            }
        }
        result
    }

    async fn attempt_turn(&mut self, user_text: &str) -> Result<TurnOutcome, TurnError> {
        if user_text.trim().is_empty() {
            return Err(TurnError::EmptyTranscript);
        }

        let user = Message::user(user_text);
        let mut staged = self.transcript.clone();
        staged.push(user.clone());

        let reply = self.respond(&staged).await?;

        self.transcript.push(user);
        self.transcript.push(reply.message.clone());

        Ok(TurnOutcome {
            turn_id: Uuid::new_v4(),
            at: Utc::now(),
            intent: reply.intent,
            handler: reply.handler,
            reply: reply.message,
        })
    }
}

/// The single-node variant: no classification, no routing. The whole
/// transcript goes to the generator and the reply is appended.
pub struct EchoExecutor<G: TextGenerator> {
    generator: Arc<G>,
    transcript: Transcript,
    metrics: Arc<AppMetrics>,
}

impl<G: TextGenerator> EchoExecutor<G> {
    pub fn new(generator: Arc<G>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            generator,
            transcript: Transcript::new(),
            metrics,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub async fn respond(&self, transcript: &Transcript) -> Result<Message, TurnError> {
        if transcript.latest_user_content().is_none() {
            return Err(TurnError::EmptyTranscript);
        }

        let mut flow = TurnFlow::direct();
        flow.advance(TurnEvent::Begin)?;

        info!("chatbot replying over full transcript");
        let reply = self
            .generator
            .generate(transcript.messages(), Sampling::deterministic())
            .await?;
        self.metrics.inc_model_call();
        flow.advance(TurnEvent::ReplyProduced)?;

        Ok(Message::assistant(reply.content))
    }

    #[instrument(skip(self, user_text))]
    pub async fn run_turn(&mut self, user_text: &str) -> Result<Message, TurnError> {
        let started = Instant::now();
        self.metrics.inc_turn();

        if user_text.trim().is_empty() {
            self.metrics.inc_failed_turn();
            return Err(TurnError::EmptyTranscript);
        }

        let user = Message::user(user_text);
        let mut staged = self.transcript.clone();
        staged.push(user.clone());

        match self.respond(&staged).await {
            Ok(reply) => {
                self.transcript.push(user);
                self.transcript.push(reply.clone());
                self.metrics.observe_latency(started.elapsed());
                Ok(reply)
            }
            Err(error) => {
                self.metrics.inc_failed_turn();
                warn!(%error, "turn aborted, transcript unchanged");
                Err(error)
            }
        }
    }
}
