use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tree_sitter::{Language as TsLanguage, Node, Parser as TsParser, Tree};

/// Why a source file contributed nothing to an index or extraction run.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unsupported source language for {0}")]
    UnsupportedLanguage(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tree-sitter grammar rejected: {0}")]
    Grammar(String),

    #[error("tree-sitter produced no tree for {0}")]
    NoTree(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    Java,
    Python,
}

impl SourceLanguage {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase());

        match ext.as_deref() {
            Some("java") => Some(Self::Java),
            Some("py") => Some(Self::Python),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Python => "python",
        }
    }

    fn tree_sitter_language(self) -> TsLanguage {
        match self {
            Self::Java => tree_sitter_java::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }
}

/// A source file together with its syntax tree. Trees are kept alive for the
/// lifetime of a workspace index so method bodies can be re-entered later.
#[derive(Debug)]
pub struct ParsedSource {
    pub path: PathBuf,
    pub language: SourceLanguage,
    pub source: String,
    pub tree: Tree,
}

impl ParsedSource {
    pub fn parse(
        path: impl Into<PathBuf>,
        language: SourceLanguage,
        source: impl Into<String>,
    ) -> Result<Self, ParseError> {
        let path = path.into();
        let source = source.into();

        let mut parser = TsParser::new();
        parser
            .set_language(&language.tree_sitter_language())
            .map_err(|err| ParseError::Grammar(err.to_string()))?;

        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| ParseError::NoTree(path.clone()))?;

        Ok(Self {
            path,
            language,
            source,
            tree,
        })
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn text(&self, node: Node<'_>) -> String {
        node_text(&node, &self.source)
    }

    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

pub fn parse_file(path: &Path) -> Result<ParsedSource, ParseError> {
    let language = SourceLanguage::from_path(path)
        .ok_or_else(|| ParseError::UnsupportedLanguage(path.to_path_buf()))?;
    let source = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ParsedSource::parse(path, language, source)
}

pub fn node_text(node: &Node, content: &str) -> String {
    let start = node.start_byte();
    let end = node.end_byte();
    let bytes = content.as_bytes();
    if start >= bytes.len() || end > bytes.len() || start >= end {
        return String::new();
    }
    String::from_utf8_lossy(&bytes[start..end]).to_string()
}

pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    (0..node.named_child_count())
        .filter_map(|idx| node.named_child(idx))
        .collect()
}

/// Pre-order walk of `node` and everything beneath it, in source order.
pub fn descendants<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        out.push(current);
        for idx in (0..current.named_child_count()).rev() {
            if let Some(child) = current.named_child(idx) {
                stack.push(child);
            }
        }
    }
    out
}

pub fn is_comment(node: &Node) -> bool {
    matches!(node.kind(), "comment" | "line_comment" | "block_comment")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_follows_extension() {
        assert_eq!(
            SourceLanguage::from_path(Path::new("src/test/LoginTest.java")),
            Some(SourceLanguage::Java)
        );
        assert_eq!(
            SourceLanguage::from_path(Path::new("tests/test_login.PY")),
            Some(SourceLanguage::Python)
        );
        assert_eq!(SourceLanguage::from_path(Path::new("README.md")), None);
    }

    #[test]
    fn java_source_parses_into_class_tree() {
        let parsed = ParsedSource::parse(
            "LoginTest.java",
            SourceLanguage::Java,
            "class LoginTest { void run() {} }",
        )
        .expect("parse java");

        let root = parsed.root();
        let class = named_children(root)
            .into_iter()
            .find(|n| n.kind() == "class_declaration")
            .expect("class declaration");
        let name = class.child_by_field_name("name").expect("class name");
        assert_eq!(parsed.text(name), "LoginTest");
    }

    #[test]
    fn unsupported_extension_is_a_parse_error() {
        let err = parse_file(Path::new("notes.txt")).expect_err("txt is unsupported");
        assert!(matches!(err, ParseError::UnsupportedLanguage(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = parse_file(Path::new("/definitely/not/here/Missing.java"))
            .expect_err("missing file");
        assert!(matches!(err, ParseError::Io { .. }));
    }
}
