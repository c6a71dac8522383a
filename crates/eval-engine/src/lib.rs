//! Evaluation core (spec.md §4.E-4.H): the Tutor Reply Generator, Turn
//! Evaluator, Holistic Evaluator, and Code Evaluator. Pure-ish async
//! functions over `eval-llm`/`eval-sandbox` handles — no session-store
//! access lives here, that's `eval-gateway::orchestrator`'s job.

pub mod code_evaluator;
pub mod holistic;
pub mod tutor;
pub mod turn_evaluator;

pub use code_evaluator::{evaluate as evaluate_code, CodeEvaluation};
pub use holistic::evaluate as evaluate_holistic;
pub use tutor::{generate as generate_tutor_reply, generate_stream as generate_tutor_reply_stream, DialogueTurn, TutorOutcome, TutorReply, TutorRequest};
pub use turn_evaluator::evaluate_turn;
