//! Arena-allocated abstract syntax tree.
//!
//! Nodes live in a single `Vec` and refer to their children by `NodeId`.
//! A child is always pushed before its parent, so every id stored inside a
//! node is smaller than the node's own id and cycles cannot be formed.

mod display;

use crate::span::Span;

/// Dense key of a node inside an [`Ast`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Eq,
}

impl InfixOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Lt => "<",
            InfixOp::Gt => ">",
            InfixOp::Eq => "==",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, InfixOp::Lt | InfixOp::Gt | InfixOp::Eq)
    }

    /// Returns (left binding power, right binding power).
    /// Higher binding power = higher precedence.
    pub fn binding_power(&self) -> (u8, u8) {
        match self {
            InfixOp::Lt | InfixOp::Gt | InfixOp::Eq => (2, 3),
            InfixOp::Add | InfixOp::Sub => (4, 5),
            InfixOp::Mul | InfixOp::Div => (6, 7),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefixOp {
    Neg,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// Top-level items of one input, in source order.
    Program(Vec<NodeId>),
    /// A statement list (function or branch body) or argument list.
    List(Vec<NodeId>),
    Integer(i64),
    Floating(f64),
    Ident(String),
    Infix {
        op: InfixOp,
        left: NodeId,
        right: NodeId,
    },
    Prefix {
        op: PrefixOp,
        right: NodeId,
    },
    /// `args` is a `List` node.
    Call {
        name: String,
        args: NodeId,
    },
    Let {
        name: String,
        expr: NodeId,
    },
    Set {
        name: String,
        expr: NodeId,
    },
    /// Bodies are `List` nodes.
    If {
        cond: NodeId,
        then_body: NodeId,
        else_body: Option<NodeId>,
    },
    /// Counts `index` from 0 while `index < bound`.
    For {
        index: String,
        bound: NodeId,
        body: NodeId,
    },
    Return(NodeId),
    FnDef {
        name: String,
        params: Vec<String>,
        body: NodeId,
    },
}

impl NodeKind {
    fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Program(items) | NodeKind::List(items) => items.clone(),
            NodeKind::Integer(_) | NodeKind::Floating(_) | NodeKind::Ident(_) => Vec::new(),
            NodeKind::Infix { left, right, .. } => vec![*left, *right],
            NodeKind::Prefix { right, .. } => vec![*right],
            NodeKind::Call { args, .. } => vec![*args],
            NodeKind::Let { expr, .. } | NodeKind::Set { expr, .. } => vec![*expr],
            NodeKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let mut out = vec![*cond, *then_body];
                out.extend(else_body.iter().copied());
                out
            }
            NodeKind::For { bound, body, .. } => vec![*bound, *body],
            NodeKind::Return(expr) => vec![*expr],
            NodeKind::FnDef { body, .. } => vec![*body],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

/// Owner of every node produced while parsing one input.
#[derive(Clone, Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node. Children must already be in the arena.
    pub fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        debug_assert!(
            kind.children().iter().all(|child| child.0 < id.0),
            "child ids must precede their parent"
        );
        self.nodes.push(Node { kind, span });
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.get(id).kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.get(id).span
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Elements of a `Program` or `List` node; empty for anything else.
    pub fn items(&self, id: NodeId) -> &[NodeId] {
        match self.kind(id) {
            NodeKind::Program(items) | NodeKind::List(items) => items,
            _ => &[],
        }
    }
}
