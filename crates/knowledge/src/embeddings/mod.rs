//! Query embedding.
//!
//! The embedding call is the one mandatory external dependency of a query:
//! every failure is reported as [`AppError::DependencyOffline`] and ends the
//! request.
//!
//! [`AppError::DependencyOffline`]: curator_core::AppError::DependencyOffline

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{HttpEmbeddingProvider, MockProvider};
