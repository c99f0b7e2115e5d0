pub mod generator;
pub mod reconciler;

pub use generator::{GeneratedMetadata, MetadataGenerator};
pub use reconciler::TagReconciler;
