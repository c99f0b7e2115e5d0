/// Constants used throughout assetkit
/// This module centralizes defaults and prompt templates

/// OpenAI-compatible API root used when none is configured
pub const DEFAULT_PROVIDER_URL: &str = "https://api.openai.com/v1";

/// Environment variable holding the provider credential
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Low temperature keeps generated metadata stable across runs
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

pub const DEFAULT_MAX_TOKENS: u32 = 200;

/// Total attempts per prompt
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_BASE_DELAY_MS: u64 = 500;

pub const DEFAULT_MAX_DELAY_MS: u64 = 8_000;

/// How many times the reconciler re-runs lookup/create when a conflicting
/// tag disappears before it can be re-read
pub const TAG_CONFLICT_RETRIES: u32 = 3;

/// Attempts at a revision-guarded enrichment write before giving up
pub const STALE_WRITE_RETRIES: u32 = 3;

pub const DEFAULT_STORE_PATH: &str = "~/.local/share/assetkit/store.json";

/// Config file locations, in lookup order
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config/settings.toml",
    "./config/settings.toml",
    "~/.config/assetkit/settings.toml",
];

/// Capacity of the asset change broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Prompt asking for a short title. `{filename}` is substituted.
pub const TITLE_PROMPT: &str = "You are a content metadata generator. Given a file name, create a short, professional title. Reply with the title only. File: {filename}";

/// Prompt asking for accessibility alt text. `{filename}` is substituted.
pub const ALT_TEXT_PROMPT: &str = "You are an alt text generator. Write ADA-compliant alt text for this file in one sentence. Reply with the alt text only. File: {filename}";

/// Prompt asking for a tag list. `{filename}` is substituted.
pub const TAGS_PROMPT: &str = "You are a tagging system. Generate 5-10 highly relevant search tags describing this media file. Reply with a comma separated list only. File: {filename}";
