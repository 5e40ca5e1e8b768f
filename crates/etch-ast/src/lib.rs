//! AST and type data model for the Etch language (spec.md §3, §4.1).
//!
//! Everything here is a closed, tagged-variant data type produced once by
//! the (external) parser and then mutated in place by later pipeline
//! stages: the type checker fills `Expr::typ` and rewrites `CallExpr::fname`
//! to a monomorphized key, and the comptime folder replaces nodes with
//! literals and rewrites `comptime` blocks into injected declarations.

pub mod expr;
pub mod mangle;
pub mod pos;
pub mod program;
pub mod stmt;
pub mod types;

pub use expr::{
    BinaryExpr, BinaryOp, CallExpr, CastExpr, ComptimeExpr, Expr, ExprKind, IfExpr, IndexExpr,
    MatchCase, MatchExpr, MatchPattern, SliceExpr, UnaryExpr, UnaryOp,
};
pub use mangle::{generate_overload_signature, mangle_instance_key};
pub use pos::Pos;
pub use program::{FunDecl, Param, Program, TypeDef, TypeParam};
pub use stmt::{
    AssignStmt, FieldAssignStmt, FieldDef, ForIterable, ForStmt, IfStmt, ImportStmt, Stmt,
    StmtKind, TypeDeclStmt, VarStmt, WhileStmt,
};
pub use types::{Concept, Type, COMPTIME_INFER};
