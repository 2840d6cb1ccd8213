use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parley_agents::{EchoExecutor, TurnError, TurnExecutor};
use parley_core::{persona_instruction, HandlerId, Intent, Message, Role, Transcript};
use parley_llm::{LlmError, Sampling, TextGenerator};
use parley_observability::AppMetrics;

/// Scripted collaborator: pops queued results in order and records every
/// call so tests can observe which prompts ran at which temperature.
struct ScriptedGenerator {
    script: Mutex<Vec<Result<String, LlmError>>>,
    calls: Mutex<Vec<(Vec<Message>, Sampling)>>,
}

impl ScriptedGenerator {
    fn new(script: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(Vec<Message>, Sampling)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        messages: &[Message],
        sampling: Sampling,
    ) -> Result<Message, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), sampling));
        let mut script = self.script.lock().unwrap();
        assert!(!script.is_empty(), "generator called more than scripted");
        script.remove(0).map(Message::assistant)
    }
}

#[tokio::test]
async fn routed_session_accumulates_history_across_turns() {
    let generator = ScriptedGenerator::new(vec![
        Ok("joke".to_string()),
        Ok("Why did the telescope blush? It saw a heavenly body.".to_string()),
        Ok("fact".to_string()),
        Ok("Did you know? A day on Venus outlasts its year.".to_string()),
    ]);
    let metrics = AppMetrics::shared();
    let mut executor = TurnExecutor::new(generator.clone(), metrics.clone());

    let first = executor.run_turn("tell me a joke").await.expect("turn 1");
    assert_eq!(first.intent, Intent::Joke);
    assert_eq!(first.handler, HandlerId::JokeTeller);

    let second = executor
        .run_turn("give me a fact about space")
        .await
        .expect("turn 2");
    assert_eq!(second.intent, Intent::Fact);
    assert_eq!(second.handler, HandlerId::FactProvider);

    let messages = executor.transcript().messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(
        messages.iter().map(|m| m.role).collect::<Vec<_>>(),
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.turns_total, 2);
    assert_eq!(snapshot.model_calls_total, 4);
    assert_eq!(snapshot.failed_turns_total, 0);
}

#[tokio::test]
async fn classifier_output_is_normalized_before_routing() {
    // (raw classifier output, expected handler)
    let cases = [
        ("  JOKE\n", HandlerId::JokeTeller),
        ("Fact", HandlerId::FactProvider),
        ("advice", HandlerId::Advisor),
        ("sports", HandlerId::Fallback),
        ("general", HandlerId::Fallback),
    ];

    for (raw, expected) in cases {
        let generator = ScriptedGenerator::new(vec![
            Ok(raw.to_string()),
            Ok("a reply".to_string()),
        ]);
        let mut executor = TurnExecutor::new(generator.clone(), AppMetrics::shared());

        let outcome = executor.run_turn("hello").await.expect("turn succeeds");
        assert_eq!(outcome.handler, expected, "raw label {raw:?}");

        // The selected persona is the only handler instruction that ran.
        let calls = generator.calls();
        assert_eq!(calls.len(), 2, "classifier plus exactly one handler");
        assert_eq!(calls[1].0[0].content, persona_instruction(expected));
    }
}

#[tokio::test]
async fn only_the_joke_teller_uses_exploratory_sampling() {
    for (raw, temperature) in [("joke", 0.9_f32), ("fact", 0.0), ("advice", 0.0), ("nope", 0.0)] {
        let generator = ScriptedGenerator::new(vec![
            Ok(raw.to_string()),
            Ok("a reply".to_string()),
        ]);
        let mut executor = TurnExecutor::new(generator.clone(), AppMetrics::shared());
        executor.run_turn("anything").await.expect("turn succeeds");

        let calls = generator.calls();
        assert_eq!(calls[0].1, Sampling::deterministic(), "classifier call");
        assert_eq!(calls[1].1.temperature, temperature, "handler call for {raw}");
    }
}

#[tokio::test]
async fn failed_turn_appends_nothing_and_the_session_continues() {
    let generator = ScriptedGenerator::new(vec![
        Err(LlmError::Unreachable("connection refused".to_string())),
        Ok("sports".to_string()),
        Ok("Happy to chat!".to_string()),
    ]);
    let metrics = AppMetrics::shared();
    let mut executor = TurnExecutor::new(generator, metrics.clone());

    let error = executor.run_turn("hello").await.expect_err("turn 1 fails");
    assert!(matches!(error, TurnError::Model(LlmError::Unreachable(_))));
    assert!(executor.transcript().is_empty());

    let outcome = executor.run_turn("hello again").await.expect("turn 2");
    assert_eq!(outcome.handler, HandlerId::Fallback);
    assert_eq!(executor.transcript().len(), 2);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.turns_total, 2);
    assert_eq!(snapshot.failed_turns_total, 1);
    assert_eq!(snapshot.fallback_total, 1);
}

#[tokio::test]
async fn respond_appends_one_assistant_message_per_pass() {
    let generator = ScriptedGenerator::new(vec![
        Ok("advice".to_string()),
        Ok("Sleep on it, then start small.".to_string()),
    ]);
    let executor = TurnExecutor::new(generator, AppMetrics::shared());

    let mut transcript = Transcript::from_messages([
        Message::user("earlier question"),
        Message::assistant("earlier answer"),
        Message::user("I need advice on studying"),
    ]);
    let initial_len = transcript.len();

    let reply = executor.respond(&transcript).await.expect("one reply");
    transcript.push(reply.message.clone());

    assert_eq!(transcript.len(), initial_len + 1);
    assert_eq!(transcript.messages()[initial_len].role, Role::Assistant);
    assert_eq!(reply.intent, Intent::Advice);
}

#[tokio::test]
async fn echo_session_feeds_the_growing_transcript_back_to_the_model() {
    let generator = ScriptedGenerator::new(vec![
        Ok("Hello!".to_string()),
        Ok("Yes, still listening.".to_string()),
    ]);
    let mut executor = EchoExecutor::new(generator.clone(), AppMetrics::shared());

    executor.run_turn("hi").await.expect("turn 1");
    executor.run_turn("you there?").await.expect("turn 2");

    let calls = generator.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0.len(), 1);
    assert_eq!(calls[1].0.len(), 3);
    assert!(calls
        .iter()
        .all(|(_, sampling)| *sampling == Sampling::deterministic()));

    assert_eq!(executor.transcript().len(), 4);
}

#[tokio::test]
async fn empty_transcript_is_rejected_before_any_model_call() {
    let generator = ScriptedGenerator::new(Vec::new());
    let executor = TurnExecutor::new(generator.clone(), AppMetrics::shared());

    let transcript = Transcript::new();
    let error = executor
        .respond(&transcript)
        .await
        .expect_err("nothing to respond to");
    assert!(matches!(error, TurnError::EmptyTranscript));
    assert!(generator.calls().is_empty());
}
