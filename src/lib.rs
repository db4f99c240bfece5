pub mod app;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod notify;
pub mod prompt;
pub mod response;
pub mod scorer;
pub mod scraper;
pub mod store;
pub mod types;

pub use app::Curator;
pub use client::{ChatModel, CompletionOptions, ModelConfig, OpenAiChatModel, ScriptedChatModel};
pub use config::{Config, SourceConfig};
pub use notify::DiscordNotifier;
pub use scorer::RelevanceScorer;
pub use scraper::{NewsScraper, Selectors};
pub use store::ArticleStore;
pub use types::*;
