//! Text-generation integration crate for Curator.
//!
//! This crate provides a provider-agnostic abstraction over the completion
//! backends Curator talks to. Every backend receives a single prompt string
//! plus generation parameters and answers with JSON whose shape varies by
//! backend; [`extract`] probes the known shapes in a fixed order.
//!
//! # Providers
//! - **llama-cpp**: llama.cpp server `/completion` endpoint (default)
//! - **ollama**: Ollama `/api/generate`
//!
//! # Example
//! ```no_run
//! use curator_llm::{create_client, LlmRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_client("llama-cpp", "http://127.0.0.1:8081/completion", "")?;
//! let request = LlmRequest::new("Hello, world!").with_max_tokens(32);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod extract;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse};
pub use extract::{extract_text, ResponseShape, EXTRACTION_ORDER};
pub use factory::create_client;
pub use providers::{LlamaCppClient, OllamaClient};
pub use types::ProviderType;
