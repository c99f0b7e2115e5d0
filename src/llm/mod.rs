pub mod client;
pub mod openai;
pub mod retry;
pub mod r#trait;

pub use client::TextGenerationClient;
pub use openai::OpenAiBackend;
pub use r#trait::{ChatBackend, CompletionRequest};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
