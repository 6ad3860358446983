pub mod config;
pub mod generator;
pub mod logging;
pub mod models;
pub mod service;

pub use config::ServiceConfig;
pub use generator::{AssistantError, MovieAssistant, OpenRouterGenerator, TextGenerator};
pub use service::{AppState, create_app};
