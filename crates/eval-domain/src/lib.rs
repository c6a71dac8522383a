pub mod config;
pub mod error;
pub mod eval;
pub mod message;
pub mod problem;
pub mod session;
pub mod token;

pub use config::Config;
pub use error::{Error, Result};
pub use eval::{
    BlockReason, Criterion, Grade, GuideStrategy, HolisticLog, Intent, RequestType, RubricEntry,
    SubmissionResult, TestOutcome, TurnLog, ALL_CRITERIA,
};
pub use message::{DialogueBuffer, Message, Role, Turn};
pub use problem::{Constraints, ProblemContext, TestCase};
pub use session::{ephemeral_key, SessionBinding, SessionId, SessionLifecycle};
pub use token::{TokenCounters, TokenTriple};
