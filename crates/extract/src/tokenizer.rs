use once_cell::sync::Lazy;
use regex::Regex;

/// Lowercase letter directly followed by an uppercase one.
static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{Ll})(\p{Lu})").expect("Invalid camel boundary regex"));

const MIN_WORD_LEN: usize = 2;

/// Split an identifier into lowercase word tokens.
///
/// Underscores separate words, and so does every lower→upper transition.
/// Runs of capitals stay together, so `HTTPServer` yields `["httpserver"]`
/// rather than one token per letter. Fragments that are not purely alphabetic or
/// are shorter than two characters are dropped.
pub fn split_identifier(identifier: &str) -> Vec<String> {
    let spaced = identifier.replace('_', " ");
    let spaced = CAMEL_BOUNDARY.replace_all(&spaced, "$1 $2");

    spaced
        .to_lowercase()
        .split_whitespace()
        .filter(|fragment| is_word(fragment))
        .map(str::to_string)
        .collect()
}

/// A valid token: at least two alphabetic characters, none of them uppercase.
///
/// Non-ASCII letters count, so `ünïcöde` is a word; digits and symbols are not.
pub fn is_word(fragment: &str) -> bool {
    fragment.chars().count() >= MIN_WORD_LEN
        && fragment
            .chars()
            .all(|c| c.is_alphabetic() && !c.is_uppercase())
}
