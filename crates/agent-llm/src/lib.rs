//! LLM layer for agent-rs
//!
//! This crate provides:
//!
//! - The model catalog: pricing, context window and capability tier of
//!   every routable (provider, model) pair, plus the routing rules
//! - Provider availability snapshots
//! - Completion request/response types and the [`LLMProvider`] trait
//! - OpenAI-compatible and Anthropic backends and a registry of them

pub mod availability;
pub mod catalog;
pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;
pub mod registry;

pub use availability::ProviderAvailability;
pub use catalog::{CatalogConfig, ModelCatalog, ModelEntry, RoutingRule};
pub use completion::{CompletionRequest, CompletionResponse, StopReason};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;
pub use registry::{ProviderRegistry, ProvidersConfig};
