//! Local LLM — model catalog, downloads, discovery, and inference.

pub mod engine;
#[cfg(feature = "local-llm")]
pub mod llama;
pub mod locate;
pub mod model_manager;
pub mod model_registry;
pub mod prompt;
pub mod service;

pub use engine::{Completion, Engine, EngineError, EngineSettings, GenerationParams};
pub use service::{startup, ChatError, ChatRequest, ChatResponse, ChatService};
