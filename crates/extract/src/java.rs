//! Regex-based method extraction for Java.
//!
//! Works on raw text without a parser, so it is best effort: four signatures of
//! decreasing strictness are applied and their matches unioned, then a denylist
//! of reserved words and well-known type names removes the obvious noise. The
//! broadest signature still admits some calls that are not declarations.

use crate::extractor::NameExtractor;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use wordminer_protocol::Language;

const MODIFIERS: &str = r"(?:(?:public|protected|private|static|final|abstract|synchronized|native|default|strictfp)\s+)*";
const TYPE_PARAMS: &str = r"(?:<[^;{}()]*>\s+)?";
const RETURN_TYPE: &str = r"[\w$.]+(?:\s*<[^;{}()]*>)?(?:\s*\[\s*\])*";
const NAME: &str = r"[A-Za-z_$][\w$]*";

/// Signatures in the order they are applied. Each captures `name`; the third also
/// captures `ret` so statements such as `new Foo() {` can be rejected.
static SIGNATURES: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        // @Override public String toString(
        Regex::new(&format!(
            r"(?:@[\w$.]+(?:\s*\([^)]*\))?\s+)+(?:public|protected|private)\s+{MODIFIERS}{TYPE_PARAMS}{RETURN_TYPE}\s+(?P<name>{NAME})\s*\("
        ))
        .expect("Invalid annotated signature regex"),
        // public static <T> List<T> copyOf(
        Regex::new(&format!(
            r"\b(?:public|protected|private)\s+{MODIFIERS}{TYPE_PARAMS}{RETURN_TYPE}\s+(?P<name>{NAME})\s*\("
        ))
        .expect("Invalid access modifier signature regex"),
        // void reset() throws IOException {
        Regex::new(&format!(
            r"(?m)^\s*{MODIFIERS}{TYPE_PARAMS}(?P<ret>{RETURN_TYPE})\s+(?P<name>{NAME})\s*\([^)]*\)\s*(?:throws\s+[\w$.,\s]+?)?\s*\{{"
        ))
        .expect("Invalid package-private signature regex"),
        // runIf() {
        Regex::new(r"\b(?P<name>[a-z][a-zA-Z0-9]*)\s*\([^)]*\)\s*\{")
            .expect("Invalid minimal signature regex"),
    ]
});

/// Reserved words and common built-in type names that are never method names.
static DENYLIST: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // keywords and literals
        "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char",
        "class", "const", "continue", "default", "do", "double", "else", "enum",
        "extends", "final", "finally", "float", "for", "goto", "if", "implements",
        "import", "instanceof", "int", "interface", "long", "native", "new",
        "package", "private", "protected", "public", "return", "short", "static",
        "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
        "transient", "try", "void", "volatile", "while", "true", "false", "null",
        "var", "yield", "record", "sealed", "permits",
        // java.lang
        "Boolean", "Byte", "Character", "Short", "Integer", "Long", "Float",
        "Double", "Void", "String", "Object", "Number", "Class", "System", "Math",
        "Thread", "Runnable", "Exception", "RuntimeException", "Error", "Throwable",
        "StringBuilder", "Override", "Deprecated",
        // java.util
        "List", "ArrayList", "LinkedList", "Map", "HashMap", "TreeMap",
        "LinkedHashMap", "Set", "HashSet", "TreeSet", "LinkedHashSet", "Collection",
        "Collections", "Arrays", "Optional", "Iterator", "Iterable", "Queue",
        "Deque", "Stream",
    ]
    .into_iter()
    .collect()
});

/// Statement keywords that can sit where the third signature expects a return type.
const NON_TYPE_KEYWORDS: &[&str] = &["new", "return", "throw", "else", "case", "yield"];

#[derive(Debug, Default, Clone, Copy)]
pub struct JavaExtractor;

impl JavaExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Deduplicated method names recovered from unparsed Java text.
    pub fn extract_methods(&self, source: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();

        for signature in SIGNATURES.iter() {
            for caps in signature.captures_iter(source) {
                let Some(name) = caps.name("name") else {
                    continue;
                };
                if caps
                    .name("ret")
                    .is_some_and(|ret| NON_TYPE_KEYWORDS.contains(&ret.as_str()))
                {
                    continue;
                }
                found.insert(name.as_str().to_string());
            }
        }

        found.retain(|name| name.chars().count() >= 2 && !is_denied(name));
        found
    }
}

impl NameExtractor for JavaExtractor {
    fn language(&self) -> Language {
        Language::Java
    }

    fn extract_names(&self, source: &str) -> Vec<String> {
        self.extract_methods(source).into_iter().collect()
    }
}

pub fn is_denied(name: &str) -> bool {
    DENYLIST.contains(name)
}
