use crate::Language;
use serde::{Deserialize, Serialize};

pub const WIRE_DELIMITER: char = '|';
pub const UNKNOWN_REPOSITORY: &str = "unknown_repo";
pub const UNKNOWN_LANGUAGE: &str = "unknown_lang";

/// A single word mined from one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEvent {
    pub repository: String,
    pub language: Language,
    pub word: String,
}

impl TokenEvent {
    pub fn new(repository: impl Into<String>, language: Language, word: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            language,
            word: word.into(),
        }
    }

    /// Encode as `repository|language|word`.
    pub fn encode(&self) -> String {
        format!(
            "{}{WIRE_DELIMITER}{}{WIRE_DELIMITER}{}",
            self.repository,
            self.language.as_str(),
            self.word
        )
    }
}

/// A token as seen by the consumer.
///
/// The language stays a string: the consumer counts whatever partition the
/// producer named, including the `unknown_lang` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireToken {
    pub repository: String,
    pub language: String,
    pub word: String,
}

impl WireToken {
    /// Lenient decode. Fields are taken from the right so the word is always the
    /// last segment; missing or empty leading fields become placeholders.
    pub fn decode(payload: &str) -> Self {
        let mut parts = payload.rsplitn(3, WIRE_DELIMITER);
        let word = parts.next().unwrap_or_default().trim().to_string();
        let language = non_empty_or(parts.next(), UNKNOWN_LANGUAGE);
        let repository = non_empty_or(parts.next(), UNKNOWN_REPOSITORY);
        Self {
            repository,
            language,
            word,
        }
    }
}

impl From<TokenEvent> for WireToken {
    fn from(event: TokenEvent) -> Self {
        Self {
            repository: event.repository,
            language: event.language.as_str().to_string(),
            word: event.word,
        }
    }
}

fn non_empty_or(field: Option<&str>, placeholder: &str) -> String {
    match field.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => placeholder.to_string(),
    }
}
