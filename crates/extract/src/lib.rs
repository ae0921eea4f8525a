//! # Word Miner Extract
//!
//! Turns source text into natural-language word tokens.
//!
//! ```text
//! Source text
//!     │
//!     ├──> NameExtractor (chosen per language)
//!     │     ├─> Python: tree-sitter, every function_definition
//!     │     └─> Java: ordered regex signatures + denylist
//!     │
//!     └──> split_identifier
//!           └─> ["make", "response", ...]
//! ```
//!
//! ## Example
//!
//! ```rust
//! use wordminer_extract::{extractor_for, words_from_source};
//! use wordminer_protocol::Language;
//!
//! let extractor = extractor_for(Language::Python);
//! let words = words_from_source(extractor.as_ref(), "def make_response(): pass");
//! assert_eq!(words, vec!["make", "response"]);
//! ```

mod error;
mod extractor;
mod java;
mod python;
mod tokenizer;

pub use error::{ExtractError, Result};
pub use extractor::{extractor_for, words_from_source, NameExtractor};
pub use java::{is_denied, JavaExtractor};
pub use python::PythonExtractor;
pub use tokenizer::{is_word, split_identifier};
