//! Statement AST nodes (spec.md §3 "Statement").

use crate::expr::Expr;
use crate::pos::Pos;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub pos: Pos,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(pos: Pos, kind: StmtKind) -> Stmt {
        Stmt { pos, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Var(VarStmt),
    Assign(AssignStmt),
    FieldAssign(FieldAssignStmt),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Break,
    Expr(Expr),
    Return(Option<Expr>),
    Comptime(Vec<Stmt>),
    Defer(Expr),
    Discard(Expr),
    TypeDecl(TypeDeclStmt),
    Import(ImportStmt),
}

/// `let`/`var` declaration. `is_mutable == false` for `let` bindings — an
/// assignment to such a name is a type error (spec.md §4.2).
#[derive(Debug, Clone, PartialEq)]
pub struct VarStmt {
    pub name: String,
    pub declared_type: Option<Type>,
    pub initializer: Option<Expr>,
    pub is_mutable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldAssignStmt {
    pub target: Expr,
    pub field: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_body: Vec<Stmt>,
    /// Ordered `elif` chain: each entry is `(condition, body)`.
    pub elifs: Vec<(Expr, Vec<Stmt>)>,
    pub else_body: Option<Vec<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForIterable {
    /// `for var in start..end` (or `..=` for an inclusive range).
    Range {
        start: Expr,
        end: Expr,
        inclusive: bool,
    },
    /// `for var in array_expr`.
    Array(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub var_name: String,
    pub iterable: ForIterable,
    pub body: Vec<Stmt>,
}

/// A named type declaration: either a record (named fields) or a
/// C-like enum (ordered variant names). Not one of the closed `Type`
/// tags itself — `Type::UserDefined`/`Type::Enum` refer to entries
/// registered here by name (see `etch_ast::Program::types`).
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDeclStmt {
    Record { name: String, fields: Vec<FieldDef> },
    Enum { name: String, variants: Vec<String> },
    /// `type Foo = distinct int` and similar aliasing/distinct declarations.
    Alias { name: String, underlying: Type },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportStmt {
    pub path: String,
}
