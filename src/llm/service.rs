//! Chat service — the one owner of the loaded engine.
//!
//! Built once by `startup` and handed to the HTTP layer behind an `Arc`. The
//! engine is set at construction and never replaced, so handlers read it
//! without locking. Dropping the service releases the model.

use super::engine::{Engine, EngineError, EngineSettings, GenerationParams};
use super::locate::{locate_model, ModelSource};
use super::prompt::{build_prompt, cut_at_stop, STOP_SEQUENCES};
use crate::config::ServerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_MAX_TOKENS: u32 = 512;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TOP_P: f32 = 0.9;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_top_p() -> f32 {
    DEFAULT_TOP_P
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }

    fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            stop: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub tokens_used: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Model is not loaded. Check the server logs.")]
    ModelNotLoaded,

    #[error("inference failed: {0}")]
    Generation(#[from] EngineError),
}

pub struct ChatService {
    engine: Option<Arc<dyn Engine>>,
    model_name: Option<String>,
}

impl ChatService {
    pub fn new(engine: Arc<dyn Engine>, model_name: impl Into<String>) -> Self {
        Self {
            engine: Some(engine),
            model_name: Some(model_name.into()),
        }
    }

    /// Degraded mode: health endpoints work, chat returns `ModelNotLoaded`.
    pub fn unloaded() -> Self {
        Self {
            engine: None,
            model_name: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.is_some()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    /// Run one single-turn completion.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let engine = self.engine.clone().ok_or(ChatError::ModelNotLoaded)?;

        let start = Instant::now();
        let prompt = build_prompt(&request.message);
        let params = request.generation_params();

        let completion =
            tokio::task::spawn_blocking(move || engine.generate(&prompt, &params))
                .await
                .map_err(|e| EngineError::Task(e.to_string()))??;

        let mut text = completion.text;
        cut_at_stop(&mut text, &STOP_SEQUENCES);
        let response = text.trim().to_string();
        let tokens_used = completion.tokens_used.unwrap_or(0);

        log::info!(
            "[CHAT] {} chars in, {} chars out, {} tokens, {}ms",
            request.message.len(),
            response.len(),
            tokens_used,
            start.elapsed().as_millis()
        );

        Ok(ChatResponse {
            response,
            tokens_used,
        })
    }
}

/// Locate and load the model named by `config`. Never fails: every problem
/// is logged and yields an unloaded service, so the server still comes up.
pub async fn startup(config: &ServerConfig) -> ChatService {
    let location = match locate_model(config.model_path.as_deref(), &config.models_dir) {
        Ok(location) => location,
        Err(e) => {
            log::error!("[MODEL] {}", e);
            return degraded();
        }
    };

    if let ModelSource::Discovered { configured: Some(missing) } = &location.source {
        log::warn!(
            "[MODEL] Using auto-discovered {} instead of MODEL_PATH={}",
            location.path.display(),
            missing.display()
        );
    }

    load_engine(&location.path, config.engine).await
}

fn degraded() -> ChatService {
    log::warn!("[SERVER] Starting without a model; /chat will return 503");
    ChatService::unloaded()
}

#[cfg(feature = "local-llm")]
async fn load_engine(path: &Path, settings: EngineSettings) -> ChatService {
    use super::llama::LlamaEngine;

    log::info!("[MODEL] Loading {}", path.display());
    let owned = path.to_path_buf();
    let loaded = tokio::task::spawn_blocking(move || LlamaEngine::load(&owned, settings)).await;

    match loaded {
        Ok(Ok(engine)) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            ChatService::new(Arc::new(engine), name)
        }
        Ok(Err(e)) => {
            log::error!("[MODEL] Engine failed to load {}: {}", path.display(), e);
            degraded()
        }
        Err(e) => {
            log::error!("[MODEL] Load task failed for {}: {}", path.display(), e);
            degraded()
        }
    }
}

#[cfg(not(feature = "local-llm"))]
async fn load_engine(path: &Path, _settings: EngineSettings) -> ChatService {
    log::error!(
        "[MODEL] Built without the `local-llm` feature, cannot load {}",
        path.display()
    );
    degraded()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::engine::Completion;
    use std::sync::Mutex;

    struct Recording {
        reply: String,
        tokens: Option<u32>,
        seen: Mutex<Vec<(String, GenerationParams)>>,
    }

    impl Engine for Recording {
        fn generate(
            &self,
            prompt: &str,
            params: &GenerationParams,
        ) -> Result<Completion, EngineError> {
            self.seen
                .lock()
                .unwrap()
                .push((prompt.to_string(), params.clone()));
            Ok(Completion {
                text: self.reply.clone(),
                tokens_used: self.tokens,
            })
        }
    }

    fn recording(reply: &str, tokens: Option<u32>) -> Arc<Recording> {
        Arc::new(Recording {
            reply: reply.to_string(),
            tokens,
            seen: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn request_defaults_apply() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(req, ChatRequest::new("hi"));
        assert_eq!(req.max_tokens, 512);
    }

    #[tokio::test]
    async fn unloaded_service_rejects_chat() {
        let service = ChatService::unloaded();
        assert!(!service.is_loaded());
        let err = service.chat(ChatRequest::new("hello")).await.unwrap_err();
        assert!(matches!(err, ChatError::ModelNotLoaded));
    }

    #[tokio::test]
    async fn passes_template_params_and_stops() {
        let engine = recording(" Hi! ", Some(12));
        let service = ChatService::new(engine.clone(), "stub.gguf");

        let mut req = ChatRequest::new("hello");
        req.max_tokens = 64;
        req.temperature = 0.2;
        let resp = service.chat(req).await.unwrap();

        assert_eq!(resp.response, "Hi!");
        assert_eq!(resp.tokens_used, 12);

        let seen = engine.seen.lock().unwrap();
        let (prompt, params) = &seen[0];
        assert_eq!(prompt, "Human: hello\nAssistant:");
        assert_eq!(params.max_tokens, 64);
        assert_eq!(params.temperature, 0.2);
        assert_eq!(params.top_p, 0.9);
        assert_eq!(params.stop, vec!["Human:".to_string(), "\n\n".to_string()]);
    }

    #[tokio::test]
    async fn output_is_cut_at_stop_even_if_engine_ignores_it() {
        let service = ChatService::new(recording("Fine.\n\nHuman: more", None), "stub.gguf");
        let resp = service.chat(ChatRequest::new("hey")).await.unwrap();
        assert_eq!(resp.response, "Fine.");
        assert_eq!(resp.tokens_used, 0);
    }

    #[tokio::test]
    async fn engine_errors_surface_as_generation() {
        struct Failing;
        impl Engine for Failing {
            fn generate(&self, _: &str, _: &GenerationParams) -> Result<Completion, EngineError> {
                Err(EngineError::Decode("kv cache full".into()))
            }
        }

        let service = ChatService::new(Arc::new(Failing), "stub.gguf");
        let err = service.chat(ChatRequest::new("x")).await.unwrap_err();
        assert_eq!(err.to_string(), "inference failed: Decode failed: kv cache full");
    }

    #[tokio::test]
    async fn startup_without_any_model_is_degraded() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            model_path: Some(dir.path().join("missing.gguf")),
            models_dir: dir.path().to_path_buf(),
            host: "127.0.0.1".into(),
            port: 0,
            engine: EngineSettings::default(),
            cors_origins: Vec::new(),
        };

        let service = startup(&config).await;
        assert!(!service.is_loaded());
        assert_eq!(service.model_name(), None);
    }
}
