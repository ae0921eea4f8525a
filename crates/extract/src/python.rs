use crate::error::{ExtractError, Result};
use crate::extractor::NameExtractor;
use tree_sitter::{Node, Parser, Tree};
use wordminer_protocol::Language;

const FUNCTION_DEFINITION: &str = "function_definition";

/// Structural extractor for Python: every `def` in the syntax tree, at any depth.
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonExtractor;

impl PythonExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Names of all function definitions in document order.
    ///
    /// Module-level functions, methods, nested functions and `async def` are all
    /// included. Source that does not parse cleanly yields an empty list.
    pub fn extract_functions(&self, source: &str) -> Vec<String> {
        let tree = match parse(source) {
            Ok(Some(tree)) => tree,
            Ok(None) => return Vec::new(),
            Err(err) => {
                log::warn!("Python parser unavailable: {err}");
                return Vec::new();
            }
        };

        let root = tree.root_node();
        if root.has_error() {
            log::debug!("Discarding Python source with syntax errors");
            return Vec::new();
        }

        collect_function_names(root, source.as_bytes())
    }
}

impl NameExtractor for PythonExtractor {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extract_names(&self, source: &str) -> Vec<String> {
        self.extract_functions(source)
    }
}

fn parse(source: &str) -> Result<Option<Tree>> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| ExtractError::tree_sitter(format!("Failed to set language: {e}")))?;
    Ok(parser.parse(source, None))
}

/// Pre-order walk over an explicit stack so deeply nested sources cannot
/// exhaust the call stack.
fn collect_function_names(root: Node, bytes: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if node.kind() == FUNCTION_DEFINITION {
            if let Some(name) = node
                .child_by_field_name("name")
                .and_then(|name| name.utf8_text(bytes).ok())
            {
                names.push(name.to_string());
            }
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    names
}
