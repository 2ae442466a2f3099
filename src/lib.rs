//! Local LLM server — library shared by the `llm-server` and `fetch-model`
//! binaries.
//!
//! - Model catalog and downloader (llm/model_registry.rs, llm/model_manager.rs)
//! - Model discovery and the llama.cpp engine (llm/locate.rs, llm/llama.rs)
//! - Chat service and HTTP router (llm/service.rs, server/)

pub mod config;
pub mod llm;
pub mod server;
