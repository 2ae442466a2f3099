//! Inference engine seam.
//!
//! The server only talks to an engine through [`Engine`]. Generation is
//! blocking; callers on the async runtime go through `spawn_blocking`.

/// Sampling knobs for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub stop: Vec<String>,
}

/// Text produced by one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    /// Prompt plus generated tokens, if the engine tracks them.
    pub tokens_used: Option<u32>,
}

/// Load-time settings for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub n_ctx: u32,
    pub n_threads: i32,
    pub n_gpu_layers: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            n_ctx: 2048,
            n_threads: 8,
            n_gpu_layers: 1,
        }
    }
}

/// A loaded model able to complete prompts.
pub trait Engine: Send + Sync {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Completion, EngineError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Backend init failed: {0}")]
    Backend(String),

    #[error("Failed to load model: {0}")]
    Load(String),

    #[error("Context creation failed: {0}")]
    Context(String),

    #[error("Tokenization failed: {0}")]
    Tokenize(String),

    #[error("Prompt is {tokens} tokens, context window is {n_ctx}")]
    PromptTooLong { tokens: usize, n_ctx: u32 },

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Generation task failed: {0}")]
    Task(String),
}
