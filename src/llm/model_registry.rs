//! Downloadable models — static catalog of GGUF artifacts.
//!
//! Every entry is a Q4_K_M quantization hosted on HuggingFace. The order of
//! `MODELS` is the order the fetcher lists them in, and menu numbers are
//! 1-based positions in this slice.

/// Metadata for a downloadable model.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub id: &'static str,
    pub filename: &'static str,
    pub url: &'static str,
    /// Approximate; the remote Content-Length is authoritative.
    pub size_bytes: u64,
    pub description: &'static str,
}

static MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "llama-2-7b-chat",
        filename: "llama-2-7b-chat.Q4_K_M.gguf",
        url: "https://huggingface.co/TheBloke/Llama-2-7B-Chat-GGUF/resolve/main/llama-2-7b-chat.Q4_K_M.gguf",
        size_bytes: 4_081_004_224, // ~4 GB
        description: "Llama 2 7B Chat (Q4_K_M quantization)",
    },
    ModelInfo {
        id: "mistral-7b",
        filename: "mistral-7b-instruct-v0.1.Q4_K_M.gguf",
        url: "https://huggingface.co/TheBloke/Mistral-7B-Instruct-v0.1-GGUF/resolve/main/mistral-7b-instruct-v0.1.Q4_K_M.gguf",
        size_bytes: 4_368_438_944, // ~4 GB
        description: "Mistral 7B Instruct (Q4_K_M quantization)",
    },
    ModelInfo {
        id: "phi-2",
        filename: "phi-2.Q4_K_M.gguf",
        url: "https://huggingface.co/TheBloke/phi-2-GGUF/resolve/main/phi-2.Q4_K_M.gguf",
        size_bytes: 1_789_239_136, // ~2 GB
        description: "Phi-2 (Q4_K_M quantization, smaller and faster)",
    },
];

/// Return all available models.
pub fn available_models() -> &'static [ModelInfo] {
    MODELS
}

/// Look up a model by catalog key.
pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

/// Resolve a 1-based menu choice as typed by the user.
pub fn select_by_number(input: &str) -> Option<&'static ModelInfo> {
    let n: usize = input.trim().parse().ok()?;
    n.checked_sub(1).and_then(|i| MODELS.get(i))
}
