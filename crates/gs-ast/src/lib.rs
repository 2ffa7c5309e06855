//! Minimal AST representation consumed by the GS type inference engine.
//!
//! The lexer/parser producing this tree is explicitly out of scope for the
//! inference engine (see the engine crate's module docs); this crate only
//! fixes the node shapes the engine needs to walk.

pub mod arena;
pub mod node;
pub mod script;

pub use arena::Arena;
pub use node::{
    BinaryOp, ClassDecl, DeclKind, EnumDecl, ExprKind, ExtendsRef, LambdaDecl, LambdaId,
    MatchArm, MatchPattern, MethodDecl, NodeData, NodeId, NodeKind, ParamDecl, SignalDecl,
    StmtKind, UnaryOp, VariableDecl,
};
pub use script::ScriptFile;
