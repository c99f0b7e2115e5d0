pub mod config;
pub mod constants;
pub mod enricher;
pub mod error;
pub mod llm;
pub mod models;
pub mod slug;
pub mod store;
pub mod tagger;
pub mod utils;

pub use enricher::{Enricher, EnrichmentListener, EnrichmentOutcome};
pub use llm::TextGenerationClient;
pub use models::{Asset, AssetEvent, Tag};
pub use store::{LocalStore, Store};
