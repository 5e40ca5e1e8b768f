//! Function declarations and the whole-program table (spec.md §3
//! "Function declaration", "Program").

use rustc_hash::FxHashMap;

use crate::expr::Expr;
use crate::pos::Pos;
use crate::stmt::{FieldDef, Stmt};
use crate::types::{Concept, Type};

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: String,
    /// Bounded-parameter (concept) constraint name, if any, e.g. `T: Addable`.
    pub bound: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub default_value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunDecl {
    pub name: String,
    pub typarams: Vec<TypeParam>,
    pub params: Vec<Param>,
    /// Absent ⇒ must be inferred from `return` statements (spec.md §4.2
    /// "Return-type inference").
    pub declared_return: Option<Type>,
    pub body: Vec<Stmt>,
    pub is_exported: bool,
    pub is_cffi: bool,
    pub pos: Pos,
}

impl FunDecl {
    pub fn is_generic(&self) -> bool {
        !self.typarams.is_empty()
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn min_arity(&self) -> usize {
        self.params
            .iter()
            .take_while(|p| p.default_value.is_none())
            .count()
    }
}

/// A registered named type: either a record, a C-like enum, or an alias,
/// as declared by a `TypeDecl` statement. `Program::types` maps the name
/// carried by `Type::UserDefined`/`Type::Enum` to one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    Record { fields: Vec<FieldDef> },
    Enum { variants: Vec<String> },
    Alias { underlying: Type },
}

impl TypeDef {
    pub fn field(&self, name: &str) -> Option<&Type> {
        match self {
            TypeDef::Record { fields } => fields.iter().find(|f| f.name == name).map(|f| &f.ty),
            _ => None,
        }
    }
}

/// The whole compiled unit: function templates and their monomorphic
/// instances, the type/concept tables, and ordered top-level globals.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Declared function templates, grouped by name to support overloading.
    pub funs: FxHashMap<String, Vec<FunDecl>>,
    /// One monomorphic copy per (template, resolved-type-tuple) pair
    /// actually instantiated at a call site, keyed by mangled signature
    /// (invariant I2/I3).
    pub fun_instances: FxHashMap<String, FunDecl>,
    pub types: FxHashMap<String, TypeDef>,
    pub concepts: FxHashMap<String, Concept>,
    pub globals: Vec<Stmt>,
}

impl Program {
    pub fn new() -> Program {
        let mut concepts = FxHashMap::default();
        for c in [
            Concept::Addable,
            Concept::Divisible,
            Concept::Comparable,
            Concept::Derefable,
        ] {
            concepts.insert(c.name().to_string(), c);
        }
        Program {
            funs: FxHashMap::default(),
            fun_instances: FxHashMap::default(),
            types: FxHashMap::default(),
            concepts,
            globals: Vec::new(),
        }
    }

    pub fn add_fun(&mut self, decl: FunDecl) {
        self.funs.entry(decl.name.clone()).or_default().push(decl);
    }

    pub fn overloads(&self, name: &str) -> &[FunDecl] {
        self.funs.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }
}
