//! AST node shapes consumed (never produced) by the inference engine.
//!
//! The lexer/parser that builds this tree is out of scope for this crate
//! (§1 Non-goals); `Arena`/`NodeId` exist only so the engine has something
//! concrete to walk and cache against. Node identity (`NodeId`) is the key
//! for every per-node cache in `gs-checker`.

use gs_common::Span;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtendsRef {
    /// `extends Node`
    Name(String),
    /// `extends "res://some/script.gs"`
    Path(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExprKind {
    NullLiteral,
    BoolLiteral(bool),
    /// Raw lexeme, preserved so `gs_common::numeric::is_float_lexeme` can
    /// classify it without the AST needing to pre-decide int vs float.
    NumberLiteral(String),
    StringLiteral(String),
    ArrayLiteral(Vec<NodeId>),
    DictLiteral(Vec<(NodeId, NodeId)>),
    Identifier(String),
    SelfExpr,
    SuperExpr,
    MemberAccess {
        receiver: NodeId,
        member: String,
    },
    Index {
        receiver: NodeId,
        index: NodeId,
    },
    Call {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    IsExpr {
        value: NodeId,
        type_name: String,
    },
    InExpr {
        value: NodeId,
        container: NodeId,
    },
    AsExpr {
        value: NodeId,
        type_name: String,
    },
    Ternary {
        cond: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
    },
    Paren(NodeId),
    /// `$Foo/Bar` (unique = false) or `%Unique` (unique = true).
    NodePath {
        path: String,
        unique: bool,
    },
    Await(NodeId),
    /// Anonymous function literal; body is a statement list evaluated for
    /// its `return`s, or (for an expression-bodied lambda) a single
    /// implicit-return expression.
    Lambda(NodeId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPattern {
    Wildcard,
    /// `var name` binding pattern, optionally narrowed by a `when x is T`
    /// guard to `narrowed_type`.
    Binding {
        name: String,
        narrowed_type: Option<String>,
    },
    Literal(NodeId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchArm {
    pub pattern: MatchPattern,
    pub body: Vec<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StmtKind {
    Expr(NodeId),
    Return(Option<NodeId>),
    VarDecl(NodeId),
    If {
        cond: NodeId,
        then_branch: Vec<NodeId>,
        else_branch: Vec<NodeId>,
    },
    Match {
        subject: NodeId,
        arms: Vec<MatchArm>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub declared_type: Option<String>,
    pub default_value: Option<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub declared_type: Option<String>,
    pub initializer: Option<NodeId>,
    pub is_const: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub declared_return: Option<String>,
    pub body: Vec<NodeId>,
    pub is_static: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDecl {
    pub name: String,
    pub params: Vec<ParamDecl>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: Option<String>,
    pub extends: Option<ExtendsRef>,
    pub is_abstract: bool,
    pub variables: Vec<NodeId>,
    pub methods: Vec<NodeId>,
    pub signals: Vec<NodeId>,
    pub enums: Vec<NodeId>,
    pub inner_classes: Vec<NodeId>,
}

/// A unique, stable identity for a lambda literal, used as the key into an
/// external `CallSiteRegistry` (§4.6.1) — the registry is an opaque oracle
/// this crate never implements, only calls through a trait.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LambdaId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaDecl {
    pub id: LambdaId,
    pub params: Vec<ParamDecl>,
    pub declared_return: Option<String>,
    pub body: Vec<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclKind {
    Param(ParamDecl),
    Variable(VariableDecl),
    Method(MethodDecl),
    Signal(SignalDecl),
    Enum(EnumDecl),
    Class(ClassDecl),
    Lambda(LambdaDecl),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Expr(ExprKind),
    Stmt(StmtKind),
    Decl(DeclKind),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    pub span: Span,
    pub kind: NodeKind,
}
