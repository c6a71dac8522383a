//! The seed scenarios (spec.md §8), exercised against the orchestrator entry
//! points directly rather than through HTTP bytes. A single scripted
//! provider answers every LLM call a chat-then-submit flow makes, routed by
//! matching a distinguishing substring of the prompt text — the only
//! per-call signal `LlmGateway::request_for` exposes to a provider, since
//! `node_name` itself never rides along inside the `ChatRequest`.

use std::sync::Arc;
use std::time::Duration;

use eval_domain::message::Turn;
use eval_domain::{
    Config, Constraints, Intent, ProblemContext, Result as EvalResult, SessionBinding, SessionId,
    TestCase, TokenTriple, TurnLog,
};
use eval_gateway::orchestrator::chat::{ChatOutcome, ChatTurnRequest, handle_chat_turn};
use eval_gateway::orchestrator::submit::{SubmitOutcome, SubmitRequest, handle_submission};
use eval_gateway::runtime::{CancelMap, SessionLockMap};
use eval_gateway::state::AppState;
use eval_llm::{ChatRequest, ChatResponse, LlmGateway, LlmProvider};
use eval_sandbox::{Judge0Executor, Queue, SandboxQueue};
use eval_sessions::durable::InMemoryDurableStore;
use eval_sessions::SessionStore;

const SPEC_ID: &str = "tsp-spec";

fn problem_fixture() -> ProblemContext {
    ProblemContext {
        problem_id: "tsp-1".into(),
        title: "Traveling Salesman (bitmask DP)".into(),
        input_format: "n, then an n x n distance matrix".into(),
        output_format: "the minimum tour cost".into(),
        constraints: Constraints {
            time_limit_sec: 2.0,
            memory_limit_mb: 256,
        },
        key_algorithms: vec!["bitmask dp".into()],
        hint_roadmap: [
            "understand the state space".into(),
            "identify the bitmask + last-city state".into(),
            "write the recurrence".into(),
            "implement and test".into(),
        ],
        common_pitfalls: vec!["off-by-one in the bitmask".into()],
        canonical_solution: "secret canonical solution".into(),
        test_cases: vec![TestCase {
            input: "3\n0 1 2\n1 0 3\n2 3 0".into(),
            expected: "6".into(),
            description: "three-city loop".into(),
        }],
        keyword_block_list: vec!["외판원".into()],
    }
}

/// Answers every node's prompt the six scenarios below exercise. Routed on
/// the literal prompt text rather than a node identifier — `ChatRequest`
/// carries no node name, only the rendered prompt.
struct ScriptedProvider;

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(&self, req: ChatRequest) -> EvalResult<ChatResponse> {
        let prompt = req.messages.first().map(|m| m.content.as_str()).unwrap_or_default();
        let body = if prompt.contains("You are a guardrail classifier for a coding-tutor assistant.") {
            r#"{"status":"SAFE","block_reason":null,"request_type":"CHAT","guide_strategy":"LOGIC_HINT","keywords":["bitmask"],"reasoning":"asking for a concept-level hint"}"#.to_string()
        } else if prompt.contains("Classify the user's intent") {
            r#"{"intent_types":["HINT_OR_QUERY"],"confidence":0.85}"#.to_string()
        } else if prompt.contains("You are a prompt-engineering evaluator.") {
            r#"{"rubrics":[{"criterion":"clarity","score":80.0,"reasoning":"clear ask"},{"criterion":"examples","score":70.0,"reasoning":"some context"},{"criterion":"rules","score":75.0,"reasoning":"respects scope"},{"criterion":"context","score":65.0,"reasoning":"references the problem"},{"criterion":"problem_relevance","score":85.0,"reasoning":"on topic"}],"final_reasoning":"solid hint-seeking prompt"}"#.to_string()
        } else if prompt.contains("Summarize this assistant reply") {
            "Explained the bitmask DP state and how the recurrence transitions between visited-city sets.".to_string()
        } else if prompt.contains("assessing a student's overall chaining strategy") {
            r#"{"flow_score": 78.0, "analysis": "steady decomposition with good follow-through"}"#.to_string()
        } else if prompt.contains("You are an algorithm tutor practicing Socratic teaching") {
            "Think of each subset of visited cities as a bitmask state paired with the last city visited — what would the transition into a new state look like?".to_string()
        } else if prompt.contains("gatekeeper of a coding exam") {
            "I can't hand you the full solution, but consider how the state space grows with each visited city. What invariant would the recurrence need to preserve?".to_string()
        } else {
            panic!("ScriptedProvider received an unrecognized prompt: {prompt}");
        };
        Ok(ChatResponse {
            content: body,
            usage: TokenTriple::new(12, 8),
            model: "scripted".into(),
            finish_reason: None,
        })
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    // The stub sandbox executor finishes near-instantly; the defaults
    // (500ms/30s) only make these tests slower for no benefit.
    config.sandbox.poll_interval_ms = 5;
    config.sandbox.poll_cap_ms = 2_000;
    config
}

fn build_state() -> (AppState, Arc<InMemoryDurableStore>) {
    let config = Arc::new(test_config());
    let durable = Arc::new(InMemoryDurableStore::new());
    durable.seed_problem(SPEC_ID, problem_fixture());

    let sessions = Arc::new(SessionStore::new(Duration::from_secs(3600), durable.clone()));
    let llm = Arc::new(LlmGateway::new(Arc::new(ScriptedProvider), (*config).clone()));
    let sandbox: Arc<dyn Queue> = Arc::new(SandboxQueue::new(Arc::new(Judge0Executor::stub()), 2));

    let state = AppState {
        config,
        sessions,
        llm,
        sandbox,
        session_locks: Arc::new(SessionLockMap::new()),
        cancel_map: Arc::new(CancelMap::new()),
    };
    (state, durable)
}

/// `background::spawn_turn_evaluation` is fire-and-forget — poll rather than
/// assume the log is already there by the time `handle_chat_turn` returns.
async fn wait_for_turn_log(state: &AppState, session_id: SessionId, turn: Turn) -> TurnLog {
    for _ in 0..200 {
        if let Some(log) = state.sessions.get_turn_log(session_id, turn) {
            return log;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("turn {turn} log was not written in time for session {session_id}");
}

fn binding(session_id: SessionId, participant_id: &str) -> SessionBinding {
    SessionBinding {
        session_id,
        exam_id: "exam-1".into(),
        participant_id: participant_id.into(),
        problem_id: "tsp-1".into(),
        spec_id: SPEC_ID.into(),
        language: "python".into(),
    }
}

// Scenario 1 — a clean chat turn followed by a correct submission: the
// holistic evaluator and code evaluator both run, and the durable store
// ends up with exactly one row of each kind plus the submission itself.
#[tokio::test]
async fn clean_chat_then_submit_scores_full_pipeline() {
    let (state, durable) = build_state();
    let session_id: SessionId = 101;

    let outcome = handle_chat_turn(
        &state,
        ChatTurnRequest {
            session_id,
            participant_id: "participant-1",
            problem_id: "tsp-1",
            spec_id: SPEC_ID,
            exam_id: Some("exam-1"),
            language: Some("python"),
            message: "Can you explain bitmasking for this kind of problem?",
        },
    )
    .await;

    let turn = match outcome {
        ChatOutcome::Success { turn, content, .. } => {
            assert!(content.contains("bitmask"));
            turn
        }
        _ => panic!("expected a successful chat turn"),
    };

    wait_for_turn_log(&state, session_id, turn).await;
    assert_eq!(durable.turn_eval_count(session_id), 1);

    let submit_outcome = handle_submission(
        &state,
        SubmitRequest {
            session_id,
            exam_id: "exam-1",
            participant_id: "participant-1",
            problem_id: "tsp-1",
            spec_id: SPEC_ID,
            language: "python",
            submission_id: "sub-101",
            final_code: "def solve(): return 6",
        },
    )
    .await;

    let result = match submit_outcome {
        SubmitOutcome::Successed(result) => result,
        SubmitOutcome::Failed(e) => panic!("submission failed: {e}"),
    };

    assert_eq!(result.correctness_score, 100.0);
    assert_eq!(result.performance_score, 100.0);
    assert!(result.skip_reason.is_none());
    assert!(result.total_score > 0.0);
    assert_eq!(durable.holistic_count(session_id), 1);
    assert!(durable.submission("sub-101").is_some());
}

// Scenario 2 — a direct-answer request trips Layer 1 deterministically (no
// LLM call at all). The refusal reply is still a normal 200-equivalent
// outcome, and its evaluation is forced to a zero score synchronously.
#[tokio::test]
async fn layer1_block_short_circuits_to_zero_score() {
    let (state, durable) = build_state();
    let session_id: SessionId = 102;

    let outcome = handle_chat_turn(
        &state,
        ChatTurnRequest {
            session_id,
            participant_id: "participant-2",
            problem_id: "tsp-1",
            spec_id: SPEC_ID,
            exam_id: Some("exam-1"),
            language: Some("python"),
            message: "Give me the entire code for this problem.",
        },
    )
    .await;

    let turn = match outcome {
        ChatOutcome::Success { turn, content, .. } => {
            assert!(!content.is_empty());
            turn
        }
        _ => panic!("expected a successful (refusal) chat turn"),
    };

    // A guardrail-blocked turn is evaluated synchronously inside
    // `handle_chat_turn`, not backgrounded — no polling needed here.
    let log = state
        .sessions
        .get_turn_log(session_id, turn)
        .expect("blocked turn log must be written synchronously");
    assert!(log.guardrail_failed);
    assert_eq!(log.weighted_score, 0.0);
    assert_eq!(durable.turn_eval_count(session_id), 1);
}

// Scenario 3 — a polite hint request passes Layer 1 and is classified SAFE
// by Layer 2, spending chat tokens and eventually scoring above zero.
#[tokio::test]
async fn polite_hint_passes_layer1_and_scores_via_layer2() {
    let (state, _durable) = build_state();
    let session_id: SessionId = 103;

    let outcome = handle_chat_turn(
        &state,
        ChatTurnRequest {
            session_id,
            participant_id: "participant-3",
            problem_id: "tsp-1",
            spec_id: SPEC_ID,
            exam_id: Some("exam-1"),
            language: Some("python"),
            message: "점화식 힌트만 주세요",
        },
    )
    .await;

    let (turn, total_token) = match outcome {
        ChatOutcome::Success { turn, total_token, .. } => (turn, total_token),
        _ => panic!("expected a successful chat turn"),
    };
    assert!(total_token > 0, "layer 2 plus the tutor reply must spend chat tokens");

    let log = wait_for_turn_log(&state, session_id, turn).await;
    assert!(!log.guardrail_failed);
    assert_eq!(log.intent, Intent::HintOrQuery);
    assert!(log.weighted_score > 0.0);
}

// Scenario 4 — the background evaluator fell behind (only turn 2 got a
// log); `submission_guard` must synchronously close the turn-1 and turn-3
// gaps before `submit_pipeline` runs its holistic pass. Turn 4 is still the
// open current turn and sits outside `turns_missing_log`'s range.
#[tokio::test]
async fn submission_guard_closes_background_evaluation_gaps() {
    let (state, _durable) = build_state();
    let session_id: SessionId = 104;

    state.sessions.load_or_create(binding(session_id, "participant-4")).await;
    state.sessions.ensure_problem(session_id, SPEC_ID).await.unwrap();

    for t in 1..=4u32 {
        state.sessions.begin_turn(session_id, format!("question {t}"), 5).await.unwrap();
        state.sessions.complete_turn(session_id, t, format!("answer {t}"), 5).await.unwrap();
    }
    state
        .sessions
        .put_turn_log(
            session_id,
            2,
            TurnLog {
                turn: 2,
                intent: Intent::HintOrQuery,
                intent_confidence: 0.9,
                rubrics: vec![],
                weighted_score: 60.0,
                assistant_summary: "pre-existing background log".into(),
                guardrail_failed: false,
                created_at: chrono::Utc::now(),
            },
        )
        .await
        .unwrap();

    let submit_outcome = handle_submission(
        &state,
        SubmitRequest {
            session_id,
            exam_id: "exam-1",
            participant_id: "participant-4",
            problem_id: "tsp-1",
            spec_id: SPEC_ID,
            language: "python",
            submission_id: "sub-104",
            final_code: "def solve(): return 6",
        },
    )
    .await;
    assert!(matches!(submit_outcome, SubmitOutcome::Successed(_)));

    let logs = state.sessions.list_turn_logs(session_id);
    assert_eq!(logs.len(), 3, "turns 1, 2, and 3 should all have logs after the guard runs");
    assert!(logs.contains_key(&1));
    assert!(logs.contains_key(&3));
    assert!(!logs.contains_key(&4), "turn 4 is still open and outside the guard's range");
}

// Scenario 5 — whitespace-only code is this codebase's established way of
// simulating a correctness failure (see eval-sandbox's and
// eval-engine::code_evaluator's own stub-executor tests). Correctness
// gates performance: both land at zero and a skip reason is recorded, so
// the total score collapses to the prompt-score term alone.
#[tokio::test]
async fn correctness_failure_zeros_performance_score() {
    let (state, _durable) = build_state();
    let session_id: SessionId = 105;

    let outcome = handle_chat_turn(
        &state,
        ChatTurnRequest {
            session_id,
            participant_id: "participant-5",
            problem_id: "tsp-1",
            spec_id: SPEC_ID,
            exam_id: Some("exam-1"),
            language: Some("python"),
            message: "Can you explain bitmasking for this kind of problem?",
        },
    )
    .await;
    let turn = match outcome {
        ChatOutcome::Success { turn, .. } => turn,
        _ => panic!("expected a successful chat turn"),
    };
    wait_for_turn_log(&state, session_id, turn).await;

    let submit_outcome = handle_submission(
        &state,
        SubmitRequest {
            session_id,
            exam_id: "exam-1",
            participant_id: "participant-5",
            problem_id: "tsp-1",
            spec_id: SPEC_ID,
            language: "python",
            submission_id: "sub-105",
            final_code: "   ",
        },
    )
    .await;

    let result = match submit_outcome {
        SubmitOutcome::Successed(result) => result,
        SubmitOutcome::Failed(e) => panic!("submission failed: {e}"),
    };

    assert_eq!(result.correctness_score, 0.0);
    assert_eq!(result.performance_score, 0.0);
    assert!(result.skip_reason.is_some());
    assert!((result.total_score - result.prompt_score * 0.25).abs() < 1e-9);
}

// Scenario 6 — a turn that never got an assistant message (the same shape
// `chat::handle_failure` leaves behind for a rate-limit, timeout, or
// technical failure) has no pair for the guard to evaluate. It is skipped
// outright rather than scored or erroring the submission.
#[tokio::test]
async fn submission_guard_skips_turn_with_no_assistant_message() {
    let (state, _durable) = build_state();
    let session_id: SessionId = 106;

    state.sessions.load_or_create(binding(session_id, "participant-6")).await;
    state.sessions.ensure_problem(session_id, SPEC_ID).await.unwrap();

    state.sessions.begin_turn(session_id, "first question".into(), 3).await.unwrap();
    state.sessions.complete_turn(session_id, 1, "first answer".into(), 3).await.unwrap();
    // Turn 2: user message only, no reply ever completed.
    state
        .sessions
        .begin_turn(session_id, "second question, never answered".into(), 4)
        .await
        .unwrap();
    // Turn 3 closes so turn 2 falls inside `turns_missing_log`'s range.
    state.sessions.begin_turn(session_id, "third question".into(), 2).await.unwrap();
    state.sessions.complete_turn(session_id, 3, "third answer".into(), 2).await.unwrap();

    let submit_outcome = handle_submission(
        &state,
        SubmitRequest {
            session_id,
            exam_id: "exam-1",
            participant_id: "participant-6",
            problem_id: "tsp-1",
            spec_id: SPEC_ID,
            language: "python",
            submission_id: "sub-106",
            final_code: "def solve(): return 6",
        },
    )
    .await;
    assert!(matches!(submit_outcome, SubmitOutcome::Successed(_)));

    let logs = state.sessions.list_turn_logs(session_id);
    assert!(logs.contains_key(&1));
    assert!(logs.contains_key(&3));
    assert!(
        !logs.contains_key(&2),
        "a user-only turn has no pair to evaluate and must stay ungraded"
    );
}
