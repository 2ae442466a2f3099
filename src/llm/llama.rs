//! llama.cpp engine — load a GGUF file and generate with llama-cpp-2.
//!
//! The model is loaded once and shared read-only across requests. Each
//! generation creates a fresh context, so concurrent calls never share KV
//! state; `LlamaContext` is !Send and lives entirely inside the blocking
//! call.

use super::engine::{Completion, Engine, EngineError, EngineSettings, GenerationParams};
use super::prompt::cut_at_stop;
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel};
use llama_cpp_2::sampling::LlamaSampler;
use std::num::NonZeroU32;
use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub struct LlamaEngine {
    // Must drop before `backend`.
    model: LlamaModel,
    backend: LlamaBackend,
    settings: EngineSettings,
}

impl LlamaEngine {
    /// Initialize the backend and load a GGUF model from disk.
    ///
    /// llama.cpp allows one backend per process, so a second engine in the
    /// same process fails with `EngineError::Backend`.
    pub fn load(path: &Path, settings: EngineSettings) -> Result<Self, EngineError> {
        let start = Instant::now();
        let backend = LlamaBackend::init().map_err(|e| EngineError::Backend(e.to_string()))?;

        let params = LlamaModelParams::default().with_n_gpu_layers(settings.n_gpu_layers);
        let model = LlamaModel::load_from_file(&backend, path, &params)
            .map_err(|e| EngineError::Load(format!("{}: {}", path.display(), e)))?;

        log::info!(
            "[LOCAL_LLM] Model loaded: {} in {}ms (n_ctx={}, threads={}, gpu_layers={})",
            path.display(),
            start.elapsed().as_millis(),
            settings.n_ctx,
            settings.n_threads,
            settings.n_gpu_layers
        );

        Ok(Self {
            model,
            backend,
            settings,
        })
    }

    fn context_params(&self) -> LlamaContextParams {
        LlamaContextParams::default()
            .with_n_ctx(NonZeroU32::new(self.settings.n_ctx))
            .with_n_batch(self.settings.n_ctx)
            .with_n_threads(self.settings.n_threads)
            .with_n_threads_batch(self.settings.n_threads)
    }
}

impl Engine for LlamaEngine {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Completion, EngineError> {
        let start = Instant::now();
        let n_ctx = self.settings.n_ctx;

        let mut ctx = self
            .model
            .new_context(&self.backend, self.context_params())
            .map_err(|e| EngineError::Context(e.to_string()))?;

        let tokens = self
            .model
            .str_to_token(prompt, AddBos::Always)
            .map_err(|e| EngineError::Tokenize(e.to_string()))?;

        let prompt_len = tokens.len();
        if prompt_len == 0 || prompt_len >= n_ctx as usize {
            return Err(EngineError::PromptTooLong {
                tokens: prompt_len,
                n_ctx,
            });
        }
        log::debug!("[LOCAL_LLM] Prompt: {} tokens", prompt_len);

        let mut batch = LlamaBatch::new(n_ctx as usize, 1);
        for (pos, &token) in tokens.iter().enumerate() {
            let is_last = pos == prompt_len - 1;
            batch
                .add(token, pos as i32, &[0], is_last)
                .map_err(|e| EngineError::Decode(format!("batch add: {}", e)))?;
        }

        ctx.decode(&mut batch)
            .map_err(|e| EngineError::Decode(format!("prefill: {}", e)))?;

        let prefill_ms = start.elapsed().as_millis();

        let mut sampler = build_sampler(params);
        let mut output = String::new();
        let mut n_decoded = 0u32;
        let mut decoder = encoding_rs::UTF_8.new_decoder();
        let budget = token_budget(params.max_tokens, n_ctx, prompt_len as u32);

        while n_decoded < budget {
            let token = sampler.sample(&ctx, -1);
            sampler.accept(token);

            if self.model.is_eog_token(token) {
                break;
            }
            n_decoded += 1;

            let piece = self
                .model
                .token_to_piece(token, &mut decoder, false, None)
                .unwrap_or_default();
            output.push_str(&piece);

            if cut_at_stop(&mut output, &params.stop) {
                break;
            }

            // Position of this token is prompt_len + (n_decoded - 1), 0-indexed.
            batch.clear();
            batch
                .add(token, (prompt_len as u32 + n_decoded - 1) as i32, &[0], true)
                .map_err(|e| EngineError::Decode(format!("batch add: {}", e)))?;
            ctx.decode(&mut batch)
                .map_err(|e| EngineError::Decode(e.to_string()))?;
        }

        let total_ms = start.elapsed().as_millis();
        let gen_ms = total_ms - prefill_ms;
        let tps = if gen_ms > 0 {
            (n_decoded as f64 / gen_ms as f64) * 1000.0
        } else {
            0.0
        };

        log::info!(
            "[LOCAL_LLM] Generated {} tokens in {}ms ({:.1} tok/s, prefill={}ms)",
            n_decoded,
            total_ms,
            tps,
            prefill_ms
        );

        Ok(Completion {
            text: output,
            tokens_used: Some(prompt_len as u32 + n_decoded),
        })
    }
}

/// Tokens left to generate. `max_tokens == 0` means "until the context is
/// full"; any other value is capped by the room left after the prompt.
fn token_budget(max_tokens: u32, n_ctx: u32, prompt_len: u32) -> u32 {
    let room = n_ctx.saturating_sub(prompt_len);
    if max_tokens == 0 {
        room
    } else {
        max_tokens.min(room)
    }
}

/// Sampler chain matching llama.cpp's usual defaults for the knobs we
/// don't expose (top_k=40, min_p=0.05). Non-positive temperature is greedy.
fn build_sampler(params: &GenerationParams) -> LlamaSampler {
    if params.temperature <= 0.0 {
        return LlamaSampler::greedy();
    }

    LlamaSampler::chain_simple([
        LlamaSampler::top_k(40),
        LlamaSampler::top_p(params.top_p, 1),
        LlamaSampler::min_p(0.05, 1),
        LlamaSampler::temp(params.temperature),
        LlamaSampler::dist(seed()),
    ])
}

fn seed() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0)
}
