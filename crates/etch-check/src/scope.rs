//! Lexical scopes: a stack of name → `(Type, mutable)` maps (spec.md §4.2
//! "Scopes").

use etch_ast::Type;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Let,
    Var,
}

impl Mutability {
    pub fn is_mutable(self) -> bool {
        matches!(self, Mutability::Var)
    }
}

#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<FxHashMap<String, (Type, Mutability)>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack { frames: vec![FxHashMap::default()] }
    }

    pub fn push(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
        debug_assert!(!self.frames.is_empty(), "popped the outermost scope");
    }

    /// Shadowing is allowed: declaring into the innermost frame never
    /// consults outer frames.
    pub fn declare(&mut self, name: impl Into<String>, ty: Type, mutability: Mutability) {
        self.frames
            .last_mut()
            .expect("scope stack is never empty")
            .insert(name.into(), (ty, mutability));
    }

    pub fn lookup(&self, name: &str) -> Option<&(Type, Mutability)> {
        self.frames.iter().rev().find_map(|f| f.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_shadows_outer() {
        let mut s = ScopeStack::new();
        s.declare("x", Type::Int, Mutability::Let);
        s.push();
        s.declare("x", Type::Float, Mutability::Var);
        assert_eq!(s.lookup("x"), Some(&(Type::Float, Mutability::Var)));
        s.pop();
        assert_eq!(s.lookup("x"), Some(&(Type::Int, Mutability::Let)));
    }

    #[test]
    fn unknown_name_is_none() {
        let s = ScopeStack::new();
        assert_eq!(s.lookup("nope"), None);
    }
}
