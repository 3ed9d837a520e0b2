pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

// Re-export recommendation core components
pub use catalog::Catalog;
pub use models::{Action, EngineName, InteractionEvent, Item, ItemId, ItemSummary, Query};
pub use services::{
    fuse_ranked_lists, EngineRouter, Feedback, InteractionRecorder, InteractionSink,
    JsonLinesSink, RankFusionEngine, Recommendation, RecommendationService, Strategy,
};
