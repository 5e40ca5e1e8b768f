//! Source positions attached to every AST node.

use std::fmt;
use std::rc::Rc;

/// Line/column/file location of a token or node.
///
/// `file` is a cheaply-clonable interned path so every node can carry a
/// full position without forcing an allocation per clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
    pub file: Rc<str>,
}

impl Pos {
    pub fn new(line: u32, col: u32, file: impl Into<Rc<str>>) -> Self {
        Pos {
            line,
            col,
            file: file.into(),
        }
    }

    /// A position with no meaningful source location, used for nodes
    /// synthesized by the compiler itself (e.g. an implicit `Return`).
    pub fn synthetic() -> Self {
        Pos {
            line: 0,
            col: 0,
            file: Rc::from("<synthetic>"),
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}
