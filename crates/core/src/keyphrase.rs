//! Key-phrase annotation through a language-model provider.
//!
//! The provider sits behind [`CompletionProvider`] so the pipeline can run
//! against a deterministic double in tests.

use crate::{ProviderError, IMAGE_SLIDE_SENTINEL};
use serde::{Deserialize, Serialize};

/// Maximum number of words in a key phrase.
pub const MAX_PHRASE_WORDS: usize = 12;

/// Response-length cap for a key-phrase request.
pub const MAX_RESPONSE_TOKENS: u32 = 50;

/// Instruction sent as the system message.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that extracts key phrases from text. \
Select a consecutive string of words (maximum 12 words) from the input text that best represents \
its main topic. Do not generate new text - only extract existing words in the same order they appear.";

/// Prefix of the user message; the slide text follows it.
pub const USER_PROMPT_PREFIX: &str =
    "Extract a key phrase (max 12 consecutive words) from this text that hints at its contents: ";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single chat-completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    /// Build the key-phrase request for a slide's text.
    pub fn key_phrase(text: &str) -> Self {
        Self {
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(format!("{}{}", USER_PROMPT_PREFIX, text)),
            ],
            max_tokens: MAX_RESPONSE_TOKENS,
            temperature: 0.0,
        }
    }

    /// Content of the last user message.
    pub fn user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// A synchronous chat-completion capability.
pub trait CompletionProvider {
    /// Send one request and return the text of the first choice.
    fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

impl<P: CompletionProvider + ?Sized> CompletionProvider for &P {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        (**self).complete(request)
    }
}

impl<P: CompletionProvider + ?Sized> CompletionProvider for Box<P> {
    fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        (**self).complete(request)
    }
}

/// Derives a short verbatim key phrase for slide text.
#[derive(Debug)]
pub struct KeyPhraseExtractor<P> {
    provider: P,
}

impl<P: CompletionProvider> KeyPhraseExtractor<P> {
    /// Create an extractor backed by the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Whether `text` would be sent to the provider.
    pub fn needs_provider(text: &str) -> bool {
        !text.trim().is_empty() && text != IMAGE_SLIDE_SENTINEL
    }

    /// Extract a key phrase from slide text.
    ///
    /// Empty, whitespace-only and image-sentinel inputs are returned unchanged
    /// without calling the provider. Provider failures come back classified;
    /// nothing is retried.
    pub fn extract_key_phrase(&self, text: &str) -> Result<String, ProviderError> {
        if !Self::needs_provider(text) {
            return Ok(text.to_string());
        }

        let request = CompletionRequest::key_phrase(text);
        let response = self.provider.complete(&request).map_err(|e| {
            if e.is_fatal() {
                log::error!("Provider reported a quota or billing problem: {}", e.message());
            } else {
                log::warn!("Key phrase request failed: {}", e);
            }
            e
        })?;

        let phrase = normalize_phrase(&response);
        if phrase.is_empty() {
            log::warn!("Provider returned an empty key phrase");
            return Ok(phrase);
        }

        if !is_verbatim_excerpt(&phrase, text) {
            log::warn!("Key phrase is not a verbatim excerpt of the slide text: {:?}", phrase);
        }

        Ok(phrase)
    }
}

/// Trim the response, strip one wrapping quote pair and bound it to [`MAX_PHRASE_WORDS`] words.
fn normalize_phrase(response: &str) -> String {
    let trimmed = strip_wrapping_quotes(response.trim()).trim();
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.len() <= MAX_PHRASE_WORDS {
        trimmed.to_string()
    } else {
        words[..MAX_PHRASE_WORDS].join(" ")
    }
}

/// Remove one pair of quotes enclosing the whole phrase.
fn strip_wrapping_quotes(s: &str) -> &str {
    const PAIRS: [(char, char); 5] = [
        ('"', '"'),
        ('\'', '\''),
        ('\u{201C}', '\u{201D}'),
        ('\u{2018}', '\u{2019}'),
        ('`', '`'),
    ];

    PAIRS
        .iter()
        .find_map(|&(open, close)| s.strip_prefix(open)?.strip_suffix(close))
        .unwrap_or(s)
}

/// Case- and whitespace-insensitive containment check.
fn is_verbatim_excerpt(phrase: &str, text: &str) -> bool {
    fn canonical(s: &str) -> String {
        s.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    canonical(text).contains(&canonical(phrase))
}
