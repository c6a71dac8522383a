pub mod gateway;
pub mod openai_compat;
pub mod rate_limit;
pub mod structured;
pub mod traits;

pub use gateway::LlmGateway;
pub use openai_compat::OpenAiCompatProvider;
pub use rate_limit::RateLimiter;
pub use structured::{extract_json, parse_structured, provider_native_fallback};
pub use traits::{ChatDelta, ChatMessage, ChatRequest, ChatResponse, ChatRole, LlmProvider};
