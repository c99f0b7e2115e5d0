use crate::constants::{ALT_TEXT_PROMPT, TAGS_PROMPT, TITLE_PROMPT};
use crate::error::EnrichmentError;
use crate::llm::TextGenerationClient;
use std::sync::Arc;

/// Raw metadata produced for one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedMetadata {
    pub title: String,
    pub alt_text: String,
    /// Tag names in the order the provider listed them, not deduplicated
    pub tag_names: Vec<String>,
}

impl GeneratedMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.alt_text.is_empty() && self.tag_names.is_empty()
    }
}

/// Builds the title, alt-text and tag prompts for a filename and runs them
pub struct MetadataGenerator {
    client: Arc<TextGenerationClient>,
}

impl MetadataGenerator {
    pub fn new(client: Arc<TextGenerationClient>) -> Self {
        Self { client }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_enabled()
    }

    /// Generate title, alt text and tag names for `filename`.
    ///
    /// The three prompts run concurrently and are all awaited. If any of
    /// them fails, the first failure (title, then alt text, then tags) is
    /// returned. A disabled client yields empty metadata.
    pub async fn generate(&self, filename: &str) -> Result<GeneratedMetadata, EnrichmentError> {
        if !self.client.is_enabled() {
            return Ok(GeneratedMetadata::default());
        }

        let title_prompt = build_prompt(TITLE_PROMPT, filename);
        let alt_text_prompt = build_prompt(ALT_TEXT_PROMPT, filename);
        let tags_prompt = build_prompt(TAGS_PROMPT, filename);

        let (title, alt_text, tags) = tokio::join!(
            self.client.complete(&title_prompt),
            self.client.complete(&alt_text_prompt),
            self.client.complete(&tags_prompt),
        );

        let metadata = GeneratedMetadata {
            title: clean_reply(&title?),
            alt_text: clean_reply(&alt_text?),
            tag_names: parse_tag_list(&tags?),
        };

        tracing::debug!(
            filename,
            title = %metadata.title,
            tags = metadata.tag_names.len(),
            "Generated metadata"
        );

        Ok(metadata)
    }
}

/// Substitute the filename into a prompt template
pub fn build_prompt(template: &str, filename: &str) -> String {
    template.replace("{filename}", filename)
}

/// Split a comma or newline separated tag list. Entries are trimmed, empty
/// entries dropped, order kept, duplicates left in place.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Models like to wrap short answers in quotes
fn clean_reply(reply: &str) -> String {
    reply
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\u{201c}' || c == '\u{201d}')
        .trim()
        .to_string()
}
