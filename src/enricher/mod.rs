pub mod listener;
pub mod merge;
pub mod orchestrator;

pub use listener::{EnrichmentListener, ListenerHandle};
pub use merge::prefer_user;
pub use orchestrator::{Enricher, EnrichmentOutcome};
