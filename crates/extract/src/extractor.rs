use crate::java::JavaExtractor;
use crate::python::PythonExtractor;
use crate::tokenizer::split_identifier;
use wordminer_protocol::Language;

/// Recovers function or method names from the source text of one language.
///
/// Implementations never fail: input they cannot make sense of yields no names.
pub trait NameExtractor: Send + Sync {
    fn language(&self) -> Language;

    fn extract_names(&self, source: &str) -> Vec<String>;
}

/// Extractor for a language, chosen once per mining pass.
pub fn extractor_for(language: Language) -> Box<dyn NameExtractor> {
    match language {
        Language::Python => Box::new(PythonExtractor::new()),
        Language::Java => Box::new(JavaExtractor::new()),
    }
}

/// Extract every identifier from `source` and split each into word tokens.
pub fn words_from_source(extractor: &dyn NameExtractor, source: &str) -> Vec<String> {
    extractor
        .extract_names(source)
        .iter()
        .flat_map(|name| split_identifier(name))
        .collect()
}
