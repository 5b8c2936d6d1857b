//! Minimal AST surface.
//!
//! The lexer, parser, and evaluator are external collaborators: this crate
//! does not parse anything. It defines the narrow view of a syntax tree
//! node that the debug engine needs — a source [`Location`] and a
//! [`NodeKind`] discriminant — so the debugger can be built and tested
//! against a concrete node shape without a real parser sitting underneath
//! it. A real parser's node type implements [`AstNode`] directly.

use std::fmt;

/// A position in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Coarse discriminant for the kinds of node the debugger cares about.
///
/// This is not a full grammar: it only distinguishes statement-level nodes
/// (candidates for a stepping stop) from everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,
    Block,
    VarDeclaration,
    Assignment,
    ExpressionStatement,
    Return,
    If,
    While,
    For,
    ForEach,
    Loop,
    Break,
    Continue,
    FunctionDeclaration,
    /// Anything else: plain expressions, literals, identifiers.
    Expression,
}

impl NodeKind {
    /// A node is steppable iff stepping may pause on it (§4.2).
    ///
    /// Expressions, blocks, and function declarations are not steppable on
    /// their own — only the statement forms that wrap them are.
    pub fn is_steppable(self) -> bool {
        matches!(
            self,
            NodeKind::VarDeclaration
                | NodeKind::Assignment
                | NodeKind::ExpressionStatement
                | NodeKind::Return
                | NodeKind::If
                | NodeKind::While
                | NodeKind::For
                | NodeKind::ForEach
                | NodeKind::Loop
                | NodeKind::Break
                | NodeKind::Continue
        )
    }
}

/// The view of a syntax tree node the debugger consults.
///
/// A real parser's node type implements this directly; [`StubNode`] is a
/// ready-made implementation for tests and for host binaries that have not
/// wired in a parser yet.
pub trait AstNode {
    /// This node's own kind.
    fn kind(&self) -> NodeKind;

    /// This node's own source location, if it carries one.
    fn own_location(&self) -> Option<Location>;

    /// For `Program`/`Block` nodes, the first contained statement.
    /// Irrelevant for every other kind.
    fn first_statement(&self) -> Option<&dyn AstNode>;
}

/// Resolve a node's effective location per §4.2's extraction rule.
///
/// For `Program` or `Block`, the location is that of the first contained
/// statement; otherwise it is the node's own token. If no location is
/// available at all, `None` — the caller should not treat this node as a
/// stepping/breakpoint site.
pub fn effective_location(node: &dyn AstNode) -> Option<Location> {
    match node.kind() {
        NodeKind::Program | NodeKind::Block => {
            node.first_statement().and_then(effective_location)
        }
        _ => node.own_location(),
    }
}

/// A minimal, concrete [`AstNode`] for tests and reference wiring.
#[derive(Debug, Clone)]
pub struct StubNode {
    pub kind: NodeKind,
    pub location: Option<Location>,
    pub first_statement: Option<Box<StubNode>>,
}

impl StubNode {
    pub fn new(kind: NodeKind, location: Location) -> Self {
        Self {
            kind,
            location: Some(location),
            first_statement: None,
        }
    }

    pub fn without_location(kind: NodeKind) -> Self {
        Self {
            kind,
            location: None,
            first_statement: None,
        }
    }

    pub fn block(first_statement: StubNode) -> Self {
        Self {
            kind: NodeKind::Block,
            location: None,
            first_statement: Some(Box::new(first_statement)),
        }
    }
}

impl AstNode for StubNode {
    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn own_location(&self) -> Option<Location> {
        self.location.clone()
    }

    fn first_statement(&self) -> Option<&dyn AstNode> {
        self.first_statement.as_deref().map(|n| n as &dyn AstNode)
    }
}
