//! Configuration loading and wiring of the store, embedder, pipeline and retriever.

pub mod bootstrap;
pub mod config;

pub use bootstrap::{Services, resolve_config_path};
pub use config::Config;
