//! Provisional syntax tree.
//!
//! A single left-to-right pass over the tokens sorts them into nodes: parenthesized
//! groups, function calls and the `and`/`or` markers between them. Nodes live in an arena
//! and refer to each other by [`NodeId`]; the parent link is only used to walk back up
//! while building. The tree is thrown away once the compiler has read it.

use crate::error::{ParseError, Result};
use crate::operator::registry;
use crate::scanner::Token;
use crate::token_type::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum NodeKind {
    /// Plain run of tokens, or a wrapper holding other nodes.
    Unknown,
    /// An `and`/`or` marker between two runs.
    Binary,
    /// A parenthesized group with a conjunction at its top level.
    BinaryGroup,
    Group,
    /// A function call. Its only token is the function name.
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub tokens: Vec<Token>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind, parent: Option<NodeId>, tokens: Vec<Token>) -> Self {
        Node {
            kind,
            tokens,
            children: Vec::new(),
            parent,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.tokens.is_empty() && self.children.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl SyntaxTree {
    fn new() -> Self {
        SyntaxTree {
            nodes: vec![Node::new(NodeKind::Unknown, None, Vec::new())],
            root: NodeId(0),
        }
    }

    /// Builds the tree for `tokens`. Whitespace and end-of-input tokens are ignored.
    ///
    /// Unless the whole input is already one parenthesized group, it is wrapped in a
    /// synthetic pair so the root always holds a single group.
    pub fn build(tokens: &[Token]) -> Result<SyntaxTree> {
        let significant: Vec<&Token> = tokens.iter().filter(|t| !t.kind.is_trivia()).collect();
        check_balance(&significant)?;

        let mut tree = SyntaxTree::new();
        if significant.is_empty() {
            return Ok(tree);
        }

        let stream = wrap(&significant);
        let mut cursor = tree.root;

        for (index, token) in stream.iter().enumerate() {
            if token.is_symbol("(") {
                cursor = tree.open(cursor, &stream, index);
            } else if token.is_symbol(")") {
                cursor = tree.close(cursor, token)?;
            } else if token.conjunction().is_some() {
                let scope = tree.scope(cursor).unwrap_or(tree.root);
                tree.add(NodeKind::Binary, scope, vec![token.clone()]);
                cursor = tree.add(NodeKind::Unknown, scope, Vec::new());
            } else {
                tree.nodes[cursor.0].tokens.push(token.clone());
            }
        }

        tree.prune(tree.root);
        tracing::trace!(nodes = tree.nodes.len(), "built syntax tree");
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn tokens(&self, id: NodeId) -> &[Token] {
        &self.node(id).tokens
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// True when nothing is left under `id` after pruning.
    pub fn is_empty(&self, id: NodeId) -> bool {
        self.node(id).is_leaf()
    }

    pub fn has_binary_children(&self, id: NodeId) -> bool {
        self.children(id)
            .iter()
            .any(|child| self.kind(*child) == NodeKind::Binary)
    }

    /// Skips `Unknown` wrappers that have no tokens and a single child.
    pub fn elide(&self, mut id: NodeId) -> NodeId {
        loop {
            let node = self.node(id);
            match node.children.as_slice() {
                [only] if node.kind == NodeKind::Unknown && node.tokens.is_empty() => id = *only,
                _ => return id,
            }
        }
    }

    /// The node that actually holds the content of `id`: the first node going down
    /// through single children that has tokens or conjunction markers of its own.
    pub fn dominant(&self, mut id: NodeId) -> NodeId {
        loop {
            let node = self.node(id);
            if !node.tokens.is_empty() || self.has_binary_children(id) {
                return id;
            }
            match node.children.as_slice() {
                [only] => id = *only,
                _ => return id,
            }
        }
    }

    /// Nearest group or function around `id`, walking up through `Unknown` wrappers.
    pub fn scope(&self, mut id: NodeId) -> Option<NodeId> {
        loop {
            match self.kind(id) {
                NodeKind::Unknown | NodeKind::Binary => id = self.parent(id)?,
                NodeKind::Group | NodeKind::BinaryGroup | NodeKind::Function => return Some(id),
            }
        }
    }

    fn add(&mut self, kind: NodeKind, parent: NodeId, tokens: Vec<Token>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind, Some(parent), tokens));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Opens a function call when the cursor's last token names a function, a group
    /// otherwise. Returns the new cursor inside it.
    fn open(&mut self, cursor: NodeId, stream: &[Token], index: usize) -> NodeId {
        let calls_function = self.nodes[cursor.0]
            .tokens
            .last()
            .is_some_and(|t| t.kind == TokenKind::Word && registry().is_function(&t.text));

        if calls_function {
            if let Some(name) = self.nodes[cursor.0].tokens.pop() {
                let function = self.add(NodeKind::Function, cursor, vec![name]);
                return self.add(NodeKind::Unknown, function, Vec::new());
            }
        }

        let kind = if has_top_level_conjunction(stream, index) {
            NodeKind::BinaryGroup
        } else {
            NodeKind::Group
        };
        let group = self.add(kind, cursor, Vec::new());
        self.add(NodeKind::Unknown, group, Vec::new())
    }

    /// Leaves the innermost open group or call and continues next to it.
    fn close(&mut self, cursor: NodeId, token: &Token) -> Result<NodeId> {
        let parent = self
            .scope(cursor)
            .and_then(|scope| self.parent(scope))
            .ok_or_else(|| ParseError::structural_at("unmatched ')'", &token.text, token.location()))?;
        Ok(self.add(NodeKind::Unknown, parent, Vec::new()))
    }

    /// Drops nodes with neither tokens nor children, bottom-up.
    fn prune(&mut self, id: NodeId) {
        let children = self.nodes[id.0].children.clone();
        for child in &children {
            self.prune(*child);
        }
        let kept: Vec<NodeId> = children
            .into_iter()
            .filter(|child| !self.nodes[child.0].is_leaf())
            .collect();
        self.nodes[id.0].children = kept;
    }

    /// Indented XML dump of the tree, for trace output.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(self.root, 0, &mut out);
        out
    }

    fn write_xml(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        let indent = "  ".repeat(depth);
        let tokens = if node.tokens.is_empty() {
            String::new()
        } else {
            let text: Vec<&str> = node.tokens.iter().map(|t| t.text.as_str()).collect();
            format!(" tokens=\"{}\"", escape_xml(&text.join(" ")))
        };

        if node.children.is_empty() {
            out.push_str(&format!("{}<{}{} />\n", indent, node.kind, tokens));
            return;
        }

        out.push_str(&format!("{}<{}{}>\n", indent, node.kind, tokens));
        for child in &node.children {
            self.write_xml(*child, depth + 1, out);
        }
        out.push_str(&format!("{}</{}>\n", indent, node.kind));
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Deepest parenthesis nesting accepted in a filter.
pub const MAX_DEPTH: usize = 64;

/// Every `)` must close an earlier `(`, every `(` must be closed and no more than
/// [`MAX_DEPTH`] may be open at once.
fn check_balance(tokens: &[&Token]) -> Result<()> {
    let mut open: Vec<&Token> = Vec::new();
    for token in tokens {
        if token.is_symbol("(") {
            if open.len() == MAX_DEPTH {
                return Err(ParseError::structural_at(
                    format!("nesting deeper than {} levels", MAX_DEPTH),
                    &token.text,
                    token.location(),
                ));
            }
            open.push(*token);
        } else if token.is_symbol(")") && open.pop().is_none() {
            return Err(ParseError::structural_at(
                "unmatched ')'",
                &token.text,
                token.location(),
            ));
        }
    }
    match open.last() {
        Some(token) => Err(ParseError::structural_at(
            "unclosed '('",
            &token.text,
            token.location(),
        )),
        None => Ok(()),
    }
}

/// Index of the `)` closing the `(` at `open`.
fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate().skip(open) {
        if token.is_symbol("(") {
            depth += 1;
        } else if token.is_symbol(")") {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(index);
            }
        }
    }
    None
}

/// Looks ahead from the `(` at `open` for an `and`/`or` at its own nesting level.
fn has_top_level_conjunction(tokens: &[Token], open: usize) -> bool {
    let mut depth = 0usize;
    for token in tokens.iter().skip(open + 1) {
        if token.is_symbol("(") {
            depth += 1;
        } else if token.is_symbol(")") {
            if depth == 0 {
                return false;
            }
            depth -= 1;
        } else if depth == 0 && token.conjunction().is_some() {
            return true;
        }
    }
    false
}

fn wrap(tokens: &[&Token]) -> Vec<Token> {
    let mut stream: Vec<Token> = tokens.iter().map(|t| (*t).clone()).collect();
    let wrapped = stream.first().is_some_and(|t| t.is_symbol("("))
        && matching_close(&stream, 0) == Some(stream.len() - 1);
    if wrapped {
        return stream;
    }

    let (Some(first), Some(last)) = (stream.first(), stream.last()) else {
        return stream;
    };
    let open = Token::new(TokenKind::Symbol, "(", first.line, first.column);
    let close = Token::new(
        TokenKind::Symbol,
        ")",
        last.line,
        last.column + last.text.chars().count(),
    );
    stream.insert(0, open);
    stream.push(close);
    stream
}
