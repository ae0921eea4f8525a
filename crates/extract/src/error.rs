use thiserror::Error;

/// Result type for extractor setup
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors raised while preparing an extractor.
///
/// Extraction itself never fails: unparseable input yields no names.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Tree-sitter grammar could not be loaded
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),
}

impl ExtractError {
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitter(msg.into())
    }
}
